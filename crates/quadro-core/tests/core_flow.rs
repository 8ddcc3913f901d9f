use chrono::Utc;
use quadro_core::idea::IdeaStore;
use quadro_core::storage::Storage;
use quadro_core::store::TaskStore;
use quadro_core::task::{Priority, Status, Task};
use quadro_core::views::{self, SortMode, ViewKind};
use tempfile::tempdir;

#[test]
fn store_roundtrip_and_view_selection() {
    let temp = tempdir().expect("tempdir");
    let storage = Storage::open(temp.path()).expect("open storage");

    let now = Utc::now();
    let today = now.date_naive();

    let mut tasks = TaskStore::load(storage.clone());
    let urgent = tasks.add_task(
        "prepare the demo",
        Some(today),
        Priority::High,
        vec!["work".to_string()],
        now,
    );
    tasks.add_task("sort photos", None, Priority::Low, vec![], now);

    let reloaded = TaskStore::load(storage);
    assert_eq!(reloaded.tasks(), tasks.tasks());

    let today_view = views::select(&reloaded, ViewKind::Today, SortMode::Date, today);
    assert_eq!(today_view.len(), 1);
    assert_eq!(today_view[0].id, urgent.id);

    let inbox = views::select(&reloaded, ViewKind::NoDeadline, SortMode::Priority, today);
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].text, "sort photos");
}

#[test]
fn convert_sub_task_flow_persists_both_stores() {
    let temp = tempdir().expect("tempdir");
    let storage = Storage::open(temp.path()).expect("open storage");

    let now = Utc::now();
    let mut tasks = TaskStore::load(storage.clone());
    let mut ideas = IdeaStore::load(storage.clone());

    let idea = ideas.add_idea("weekend project", "", vec![], now);
    let sub = ideas
        .add_sub_task(idea.id, "sketch the layout", now)
        .expect("sub-task added");
    ideas.set_sub_task_priority(idea.id, sub.id, Priority::Medium);

    let task = ideas
        .convert_sub_task(idea.id, sub.id, &mut tasks, now)
        .expect("converted");
    assert_eq!(task.text, "sketch the layout");
    assert_eq!(task.status, Status::Active);

    let tasks_again = TaskStore::load(storage.clone());
    let ideas_again = IdeaStore::load(storage);
    assert_eq!(tasks_again.tasks().len(), 1);
    assert!(
        ideas_again
            .get(idea.id)
            .expect("idea exists")
            .sub_tasks
            .is_empty()
    );
}

#[test]
fn exported_json_parses_back_into_the_same_tasks() {
    let temp = tempdir().expect("tempdir");
    let storage = Storage::open(temp.path()).expect("open storage");

    let now = Utc::now();
    let mut tasks = TaskStore::load(storage);
    tasks.add_task(
        "round trip",
        Some(now.date_naive()),
        Priority::Medium,
        vec!["io".to_string()],
        now,
    );
    let done = tasks.add_task("already done", None, Priority::None, vec![], now);
    tasks.toggle_completed(done.id, now);

    let exported = serde_json::to_string_pretty(&tasks.tasks()).expect("serialize");
    let imported: Vec<Task> = serde_json::from_str(&exported).expect("parse");
    assert_eq!(imported, tasks.tasks());
}
