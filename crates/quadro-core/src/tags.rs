use tracing::{debug, info, warn};

use crate::idea::IdeaStore;
use crate::storage::{self, Storage};
use crate::store::TaskStore;

// Registry membership is case-insensitive but tags keep the casing they were
// entered with, and rewrites on individual tasks match exactly. Both halves
// of that rule are load-bearing; do not unify them.
#[derive(Debug)]
pub struct TagRegistry {
    names: Vec<String>,
    storage: Storage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTagOutcome {
    Added,
    EmptyName,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameTagOutcome {
    Renamed { retagged: usize },
    EmptyName,
    Unchanged,
    Duplicate,
}

impl TagRegistry {
    #[tracing::instrument(skip(storage))]
    pub fn load(storage: Storage) -> Self {
        let names: Vec<String> = match storage.read(storage::TAGS_KEY) {
            Ok(Some(names)) => names,
            Ok(None) => vec![],
            Err(err) => {
                warn!(error = %err, "failed to load tag registry; starting empty");
                vec![]
            }
        };

        info!(count = names.len(), "loaded tag registry");
        Self { names, storage }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn persist(&self) {
        if let Err(err) = self.storage.write(storage::TAGS_KEY, &self.names) {
            warn!(error = %err, "failed to persist tag registry; in-memory state is ahead of disk");
        }
    }

    fn contains_ci(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.names.iter().any(|tag| tag.to_lowercase() == lower)
    }

    // Union of the registry with tags discovered on tasks and idea
    // sub-tasks; anything discovered but unregistered gets registered on
    // the spot.
    #[tracing::instrument(skip(self, tasks, ideas))]
    pub fn all_unique_tags(&mut self, tasks: &TaskStore, ideas: &IdeaStore) -> Vec<String> {
        let mut union = self.names.clone();
        let mut registered = 0_usize;

        let discovered = tasks
            .iter()
            .flat_map(|task| task.tags.iter())
            .chain(
                ideas
                    .iter()
                    .flat_map(|idea| idea.sub_tasks.iter())
                    .flat_map(|sub| sub.tags.iter()),
            );
        for tag in discovered {
            let lower = tag.to_lowercase();
            if !union.iter().any(|known| known.to_lowercase() == lower) {
                union.push(tag.clone());
                self.names.push(tag.clone());
                registered += 1;
            }
        }

        if registered > 0 {
            debug!(registered, "auto-registered tags discovered on tasks");
            self.persist();
        }

        union.sort_by_key(|tag| tag.to_lowercase());
        union
    }

    #[tracing::instrument(skip(self, name))]
    pub fn add(&mut self, name: &str) -> AddTagOutcome {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return AddTagOutcome::EmptyName;
        }
        if self.contains_ci(trimmed) {
            return AddTagOutcome::Duplicate;
        }

        self.names.push(trimmed.to_string());
        self.persist();
        AddTagOutcome::Added
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn rename(&mut self, old: &str, new: &str, tasks: &mut TaskStore) -> RenameTagOutcome {
        let new = new.trim();
        if new.is_empty() {
            return RenameTagOutcome::EmptyName;
        }
        if new == old {
            return RenameTagOutcome::Unchanged;
        }

        let old_lower = old.to_lowercase();
        let new_lower = new.to_lowercase();
        let collides = self
            .names
            .iter()
            .any(|tag| tag.to_lowercase() == new_lower && tag.to_lowercase() != old_lower);
        if collides {
            return RenameTagOutcome::Duplicate;
        }

        let retagged = tasks.retag(old, new);
        if let Some(entry) = self.names.iter_mut().find(|tag| *tag == old) {
            *entry = new.to_string();
            self.persist();
        }

        info!(old, new, retagged, "renamed tag");
        RenameTagOutcome::Renamed { retagged }
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn delete(&mut self, name: &str, tasks: &mut TaskStore) -> bool {
        let stripped = tasks.strip_tag(name);

        let mut removed = false;
        if let Some(idx) = self.names.iter().position(|tag| tag == name) {
            self.names.remove(idx);
            self.persist();
            removed = true;
        }

        info!(name, stripped, removed, "deleted tag");
        stripped > 0 || removed
    }
}

#[cfg(test)]
mod tests {
    use super::{AddTagOutcome, RenameTagOutcome, TagRegistry};
    use crate::idea::IdeaStore;
    use crate::storage::Storage;
    use crate::store::TaskStore;
    use crate::task::Priority;
    use chrono::Utc;
    use tempfile::tempdir;

    fn fixtures() -> (tempfile::TempDir, TagRegistry, TaskStore, IdeaStore) {
        let temp = tempdir().expect("tempdir");
        let storage = Storage::open(temp.path()).expect("open storage");
        (
            temp,
            TagRegistry::load(storage.clone()),
            TaskStore::load(storage.clone()),
            IdeaStore::load(storage),
        )
    }

    #[test]
    fn add_rejects_blank_and_case_insensitive_duplicates() {
        let (_temp, mut registry, _tasks, _ideas) = fixtures();

        assert_eq!(registry.add("  "), AddTagOutcome::EmptyName);
        assert_eq!(registry.add("Work"), AddTagOutcome::Added);
        assert_eq!(registry.add("work"), AddTagOutcome::Duplicate);
        assert_eq!(registry.names(), &["Work".to_string()]);
    }

    #[test]
    fn all_unique_tags_merges_and_auto_registers() {
        let (_temp, mut registry, mut tasks, mut ideas) = fixtures();
        let now = Utc::now();

        registry.add("Work");
        tasks.add_task(
            "review PR",
            None,
            Priority::None,
            vec!["work".to_string(), "code".to_string()],
            now,
        );
        let idea = ideas.add_idea("reading list", "", vec![], now);
        let sub = ideas
            .add_sub_task(idea.id, "queue papers", now)
            .expect("sub-task added");
        ideas.set_sub_task_priority(idea.id, sub.id, Priority::Low);

        let union = registry.all_unique_tags(&tasks, &ideas);
        // "work" is already registered as "Work"; only "code" is new.
        assert_eq!(union, vec!["code".to_string(), "Work".to_string()]);
        assert!(registry.names().contains(&"code".to_string()));
    }

    #[test]
    fn all_unique_tags_sorts_case_insensitively() {
        let (_temp, mut registry, tasks, ideas) = fixtures();
        registry.add("banana");
        registry.add("Apple");
        registry.add("cherry");

        assert_eq!(
            registry.all_unique_tags(&tasks, &ideas),
            vec!["Apple".to_string(), "banana".to_string(), "cherry".to_string()]
        );
    }

    #[test]
    fn rename_rewrites_tasks_and_registry() {
        let (_temp, mut registry, mut tasks, _ideas) = fixtures();
        let now = Utc::now();

        registry.add("urgent");
        let tagged = tasks.add_task(
            "pay invoice",
            None,
            Priority::None,
            vec!["urgent".to_string(), "finance".to_string()],
            now,
        );
        let untouched = tasks.add_task(
            "water plants",
            None,
            Priority::None,
            vec!["home".to_string()],
            now,
        );

        let outcome = registry.rename("urgent", "asap", &mut tasks);
        assert_eq!(outcome, RenameTagOutcome::Renamed { retagged: 1 });

        let stored = tasks.get(tagged.id).expect("task exists");
        assert_eq!(stored.tags, vec!["asap".to_string(), "finance".to_string()]);
        let stored = tasks.get(untouched.id).expect("task exists");
        assert_eq!(stored.tags, vec!["home".to_string()]);
        assert!(registry.names().contains(&"asap".to_string()));
        assert!(!registry.names().contains(&"urgent".to_string()));
    }

    #[test]
    fn rename_validation_outcomes() {
        let (_temp, mut registry, mut tasks, _ideas) = fixtures();

        registry.add("alpha");
        registry.add("beta");

        assert_eq!(registry.rename("alpha", "", &mut tasks), RenameTagOutcome::EmptyName);
        assert_eq!(
            registry.rename("alpha", "alpha", &mut tasks),
            RenameTagOutcome::Unchanged
        );
        assert_eq!(
            registry.rename("alpha", "BETA", &mut tasks),
            RenameTagOutcome::Duplicate
        );
        // Re-casing a tag onto itself is allowed.
        assert_eq!(
            registry.rename("alpha", "Alpha", &mut tasks),
            RenameTagOutcome::Renamed { retagged: 0 }
        );
        assert!(registry.names().contains(&"Alpha".to_string()));
    }

    #[test]
    fn rename_never_leaves_duplicate_tags_on_a_task() {
        let (_temp, mut registry, mut tasks, _ideas) = fixtures();
        let now = Utc::now();

        registry.add("old");
        let task = tasks.add_task(
            "double tagged",
            None,
            Priority::None,
            vec!["old".to_string(), "new".to_string()],
            now,
        );

        registry.rename("old", "new", &mut tasks);
        let stored = tasks.get(task.id).expect("task exists");
        assert_eq!(stored.tags, vec!["new".to_string()]);
    }

    #[test]
    fn delete_strips_tag_but_keeps_tasks() {
        let (_temp, mut registry, mut tasks, _ideas) = fixtures();
        let now = Utc::now();

        registry.add("stale");
        let task = tasks.add_task(
            "still here",
            None,
            Priority::None,
            vec!["stale".to_string(), "keep".to_string()],
            now,
        );

        assert!(registry.delete("stale", &mut tasks));
        let stored = tasks.get(task.id).expect("task exists");
        assert_eq!(stored.text, "still here");
        assert_eq!(stored.tags, vec!["keep".to_string()]);
        assert!(!registry.names().contains(&"stale".to_string()));
    }
}
