use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const TASKS_KEY: &str = "tasks";
pub const IDEAS_KEY: &str = "ideas";
pub const TAGS_KEY: &str = "allAvailableTags";

// Namespaced key-value store: one <key>.json per key under the data dir,
// rewritten in full on every mutation.
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened storage");
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }

    #[tracing::instrument(skip(self))]
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let path = self.key_path(key);
        if !path.exists() {
            debug!(file = %path.display(), "no stored value for key");
            return Ok(None);
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        debug!(file = %path.display(), bytes = raw.len(), "read stored value");
        Ok(Some(value))
    }

    #[tracing::instrument(skip(self, value))]
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let path = self.key_path(key);
        let serialized = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize value for key {key}"))?;

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(serialized.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

        debug!(file = %path.display(), bytes = serialized.len(), "wrote stored value");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Storage;
    use tempfile::tempdir;

    #[test]
    fn read_missing_key_is_none() {
        let temp = tempdir().expect("tempdir");
        let storage = Storage::open(temp.path()).expect("open storage");
        let value: Option<Vec<String>> = storage.read("tasks").expect("read");
        assert!(value.is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let temp = tempdir().expect("tempdir");
        let storage = Storage::open(temp.path()).expect("open storage");

        let tags = vec!["Work".to_string(), "home".to_string()];
        storage.write("allAvailableTags", &tags).expect("write");

        let back: Option<Vec<String>> = storage.read("allAvailableTags").expect("read");
        assert_eq!(back, Some(tags));
    }

    #[test]
    fn corrupt_value_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let storage = Storage::open(temp.path()).expect("open storage");
        std::fs::write(temp.path().join("tasks.json"), "not json").expect("write raw");

        let result = storage.read::<Vec<String>>("tasks");
        assert!(result.is_err());
    }
}
