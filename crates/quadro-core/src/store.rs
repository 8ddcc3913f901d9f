use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::storage::{self, Storage};
use crate::task::{Priority, Status, Task};

// The task list is a process-wide singleton in the original app; here it is
// an explicit store loaded once at startup and persisted on every mutation.
#[derive(Debug)]
pub struct TaskStore {
    tasks: Vec<Task>,
    storage: Storage,
    last_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.due_date.is_none()
    }
}

impl TaskStore {
    #[tracing::instrument(skip(storage))]
    pub fn load(storage: Storage) -> Self {
        let tasks: Vec<Task> = match storage.read(storage::TASKS_KEY) {
            Ok(Some(tasks)) => tasks,
            Ok(None) => vec![],
            Err(err) => {
                warn!(error = %err, "failed to load tasks; starting from an empty store");
                vec![]
            }
        };

        let last_id = tasks.iter().map(|task| task.id).max().unwrap_or(0);
        info!(count = tasks.len(), "loaded task store");
        Self {
            tasks,
            storage,
            last_id,
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    // Ids are millisecond timestamps, bumped when two mutations land within
    // the same millisecond so they stay unique and monotonic.
    pub(crate) fn next_id(&mut self, now: DateTime<Utc>) -> i64 {
        let candidate = now.timestamp_millis();
        let id = if candidate > self.last_id {
            candidate
        } else {
            self.last_id + 1
        };
        self.last_id = id;
        id
    }

    // A failed write leaves in-memory state ahead of disk; the next
    // successful mutation catches the file up.
    fn persist(&self) {
        if let Err(err) = self.storage.write(storage::TASKS_KEY, &self.tasks) {
            warn!(error = %err, "failed to persist tasks; in-memory state is ahead of disk");
        }
    }

    #[tracing::instrument(skip(self, now))]
    pub fn add_task(
        &mut self,
        text: &str,
        due_date: Option<NaiveDate>,
        priority: Priority,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Task {
        let id = self.next_id(now);
        let task = Task::new(
            id,
            text.trim().to_string(),
            due_date,
            priority,
            dedup_tags(tags),
            now,
        );
        self.tasks.push(task.clone());
        self.persist();

        debug!(id, count = self.tasks.len(), "task added");
        task
    }

    #[tracing::instrument(skip(self, patch))]
    pub fn update_details(&mut self, id: i64, patch: TaskPatch) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            warn!(id, "task not found; cannot update");
            return false;
        };

        if let Some(text) = patch.text {
            task.text = text.trim().to_string();
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        self.persist();
        true
    }

    #[tracing::instrument(skip(self, now))]
    pub fn toggle_completed(&mut self, id: i64, now: DateTime<Utc>) -> Option<Status> {
        let task = self.tasks.iter_mut().find(|task| task.id == id)?;

        match task.status {
            Status::Completed => {
                task.status = Status::Active;
                task.completed_at = None;
            }
            _ => {
                task.status = Status::Completed;
                task.completed_at = Some(now);
                task.trashed_at = None;
            }
        }
        let status = task.status;
        self.persist();
        Some(status)
    }

    #[tracing::instrument(skip(self, priority))]
    pub fn set_priority(&mut self, id: i64, priority: Priority) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            warn!(id, "task not found; cannot set priority");
            return false;
        };

        task.priority = priority;
        self.persist();
        true
    }

    // Reachable from both active and completed; always lands in trashed.
    #[tracing::instrument(skip(self, now))]
    pub fn trash(&mut self, id: i64, now: DateTime<Utc>) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            warn!(id, "task not found; cannot move to trash");
            return false;
        };

        task.status = Status::Trashed;
        task.trashed_at = Some(now);
        task.completed_at = None;
        self.persist();
        true
    }

    #[tracing::instrument(skip(self))]
    pub fn restore(&mut self, id: i64) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            warn!(id, "task not found; cannot restore");
            return false;
        };

        task.status = Status::Active;
        task.trashed_at = None;
        self.persist();
        true
    }

    #[tracing::instrument(skip(self))]
    pub fn purge(&mut self, id: i64) -> bool {
        let Some(idx) = self.tasks.iter().position(|task| task.id == id) else {
            warn!(id, "task not found; cannot permanently delete");
            return false;
        };

        self.tasks.remove(idx);
        self.persist();
        true
    }

    #[tracing::instrument(skip(self))]
    pub fn empty_trash(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.status != Status::Trashed);
        let purged = before - self.tasks.len();
        if purged > 0 {
            self.persist();
        }
        info!(purged, "emptied trash");
        purged
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.status != Status::Completed);
        let cleared = before - self.tasks.len();
        if cleared > 0 {
            self.persist();
        }
        info!(cleared, "cleared completed tasks");
        cleared
    }

    #[tracing::instrument(skip(self, today))]
    pub fn postpone_overdue(&mut self, today: NaiveDate) -> usize {
        let mut postponed = 0;
        for task in &mut self.tasks {
            if task.is_overdue(today) {
                task.due_date = Some(today);
                postponed += 1;
            }
        }
        if postponed > 0 {
            self.persist();
        }
        info!(postponed, "postponed overdue tasks to today");
        postponed
    }

    #[tracing::instrument(skip(self, old, new))]
    pub(crate) fn retag(&mut self, old: &str, new: &str) -> usize {
        let mut retagged = 0;
        for task in &mut self.tasks {
            if task.tags.iter().any(|tag| tag == old) {
                for tag in &mut task.tags {
                    if tag == old {
                        *tag = new.to_string();
                    }
                }
                task.tags = dedup_tags(std::mem::take(&mut task.tags));
                retagged += 1;
            }
        }
        if retagged > 0 {
            self.persist();
        }
        retagged
    }

    #[tracing::instrument(skip(self, name))]
    pub(crate) fn strip_tag(&mut self, name: &str) -> usize {
        let mut stripped = 0;
        for task in &mut self.tasks {
            let before = task.tags.len();
            task.tags.retain(|tag| tag != name);
            if task.tags.len() != before {
                stripped += 1;
            }
        }
        if stripped > 0 {
            self.persist();
        }
        stripped
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.last_id = tasks.iter().map(|task| task.id).max().unwrap_or(0);
        self.tasks = tasks;
        self.persist();
        info!(count = self.tasks.len(), "replaced task list");
    }
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{TaskPatch, TaskStore};
    use crate::storage::Storage;
    use crate::task::{Priority, Status};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, TaskStore) {
        let temp = tempdir().expect("tempdir");
        let storage = Storage::open(temp.path()).expect("open storage");
        (temp, TaskStore::load(storage))
    }

    #[test]
    fn add_assigns_unique_monotonic_ids() {
        let (_temp, mut store) = store();
        let now = Utc
            .with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
            .single()
            .expect("valid now");

        let first = store.add_task("one", None, Priority::None, vec![], now);
        let second = store.add_task("two", None, Priority::None, vec![], now);
        let third = store.add_task("three", None, Priority::None, vec![], now + Duration::seconds(1));

        assert!(second.id > first.id);
        assert!(third.id > second.id);
        assert_eq!(store.tasks().len(), 3);
    }

    #[test]
    fn add_trims_text_and_drops_duplicate_tags() {
        let (_temp, mut store) = store();
        let now = Utc::now();

        let task = store.add_task(
            "  buy milk  ",
            None,
            Priority::Low,
            vec!["home".to_string(), "home".to_string(), "errand".to_string()],
            now,
        );

        assert_eq!(task.text, "buy milk");
        assert_eq!(task.tags, vec!["home".to_string(), "errand".to_string()]);
    }

    #[test]
    fn completion_stamp_invariant_holds_across_toggles() {
        let (_temp, mut store) = store();
        let now = Utc::now();
        let task = store.add_task("report", None, Priority::High, vec![], now);

        assert_eq!(store.toggle_completed(task.id, now), Some(Status::Completed));
        let stored = store.get(task.id).expect("task exists");
        assert_eq!(stored.status, Status::Completed);
        assert!(stored.completed_at.is_some());

        assert_eq!(store.toggle_completed(task.id, now), Some(Status::Active));
        let stored = store.get(task.id).expect("task exists");
        assert_eq!(stored.status, Status::Active);
        assert!(stored.completed_at.is_none());
    }

    #[test]
    fn trash_restore_purge_lifecycle() {
        let (_temp, mut store) = store();
        let now = Utc::now();
        let task = store.add_task("old news", None, Priority::None, vec![], now);

        assert!(store.trash(task.id, now));
        let stored = store.get(task.id).expect("task exists");
        assert_eq!(stored.status, Status::Trashed);
        assert!(stored.trashed_at.is_some());

        assert!(store.restore(task.id));
        let stored = store.get(task.id).expect("task exists");
        assert_eq!(stored.status, Status::Active);
        assert!(stored.trashed_at.is_none());

        assert!(store.trash(task.id, now));
        assert!(store.purge(task.id));
        assert!(store.get(task.id).is_none());
    }

    #[test]
    fn trashing_a_completed_task_clears_its_completion_stamp() {
        let (_temp, mut store) = store();
        let now = Utc::now();
        let task = store.add_task("done then gone", None, Priority::None, vec![], now);

        store.toggle_completed(task.id, now);
        store.trash(task.id, now);

        let stored = store.get(task.id).expect("task exists");
        assert_eq!(stored.status, Status::Trashed);
        assert!(stored.completed_at.is_none());
        assert!(stored.trashed_at.is_some());
    }

    #[test]
    fn empty_trash_removes_only_trashed_tasks() {
        let (_temp, mut store) = store();
        let now = Utc::now();
        let keep = store.add_task("keep", None, Priority::None, vec![], now);
        let toss = store.add_task("toss", None, Priority::None, vec![], now);
        store.trash(toss.id, now);

        assert_eq!(store.empty_trash(), 1);
        assert!(store.get(keep.id).is_some());
        assert!(store.get(toss.id).is_none());
    }

    #[test]
    fn postpone_rewrites_only_strictly_overdue_active_tasks() {
        let (_temp, mut store) = store();
        let now = Utc
            .with_ymd_and_hms(2026, 3, 10, 8, 0, 0)
            .single()
            .expect("valid now");
        let today = now.date_naive();
        let yesterday = today.pred_opt().expect("valid date");

        let overdue = store.add_task("late", Some(yesterday), Priority::None, vec![], now);
        let due_today = store.add_task("on time", Some(today), Priority::None, vec![], now);
        let undated = store.add_task("someday", None, Priority::None, vec![], now);
        let done = store.add_task("finished", Some(yesterday), Priority::None, vec![], now);
        store.toggle_completed(done.id, now);

        assert_eq!(store.postpone_overdue(today), 1);
        assert_eq!(store.get(overdue.id).and_then(|t| t.due_date), Some(today));
        assert_eq!(store.get(due_today.id).and_then(|t| t.due_date), Some(today));
        assert_eq!(store.get(undated.id).and_then(|t| t.due_date), None);
        assert_eq!(
            store.get(done.id).and_then(|t| t.due_date),
            Some(yesterday)
        );
    }

    #[test]
    fn update_details_merges_fields_and_ignores_unknown_ids() {
        let (_temp, mut store) = store();
        let now = Utc::now();
        let today = now.date_naive();
        let task = store.add_task("draft", Some(today), Priority::None, vec![], now);

        assert!(store.update_details(
            task.id,
            TaskPatch {
                text: Some("final draft".to_string()),
                due_date: Some(None),
            },
        ));
        let stored = store.get(task.id).expect("task exists");
        assert_eq!(stored.text, "final draft");
        assert_eq!(stored.due_date, None);

        assert!(!store.update_details(42, TaskPatch::default()));
    }

    #[test]
    fn store_reloads_what_it_persisted() {
        let temp = tempdir().expect("tempdir");
        let storage = Storage::open(temp.path()).expect("open storage");
        let now = Utc::now();

        let mut store = TaskStore::load(storage.clone());
        let task = store.add_task(
            "persisted",
            Some(now.date_naive()),
            Priority::Medium,
            vec!["work".to_string()],
            now,
        );

        let reloaded = TaskStore::load(storage);
        assert_eq!(reloaded.tasks(), vec![task]);
    }

    #[test]
    fn corrupt_tasks_file_falls_back_to_empty_store() {
        let temp = tempdir().expect("tempdir");
        let storage = Storage::open(temp.path()).expect("open storage");
        std::fs::write(temp.path().join("tasks.json"), "{broken").expect("write raw");

        let store = TaskStore::load(storage);
        assert!(store.is_empty());
    }
}
