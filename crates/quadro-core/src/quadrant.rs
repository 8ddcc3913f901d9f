use tracing::debug;

use crate::store::TaskStore;
use crate::task::{Priority, Status, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quadrant {
    pub fn label(self) -> &'static str {
        match self {
            Self::Q1 => "Q1 urgent & important",
            Self::Q2 => "Q2 important, not urgent",
            Self::Q3 => "Q3 urgent, not important",
            Self::Q4 => "Q4 neither",
        }
    }

    // Dropping a task on a quadrant rewrites its priority; Q2 and Q3 both
    // map back to medium.
    pub fn priority(self) -> Priority {
        match self {
            Self::Q1 => Priority::High,
            Self::Q2 | Self::Q3 => Priority::Medium,
            Self::Q4 => Priority::Low,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Board {
    pub q1: Vec<Task>,
    pub q2: Vec<Task>,
    pub q3: Vec<Task>,
    pub q4: Vec<Task>,
}

impl Board {
    pub fn len(&self) -> usize {
        self.q1.len() + self.q2.len() + self.q3.len() + self.q4.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// High lands in Q1, medium alternates between Q2 and Q3 by encounter
// parity, low fills Q4 followed by anything unprioritized.
#[tracing::instrument(skip(store))]
pub fn bucket(store: &TaskStore) -> Board {
    let mut board = Board::default();
    let mut unprioritized = Vec::new();
    let mut medium_seen = 0_usize;

    for task in store.iter().filter(|task| task.status == Status::Active) {
        match task.priority {
            Priority::High => board.q1.push(task.clone()),
            Priority::Medium => {
                if medium_seen % 2 == 0 {
                    board.q2.push(task.clone());
                } else {
                    board.q3.push(task.clone());
                }
                medium_seen += 1;
            }
            Priority::Low => board.q4.push(task.clone()),
            Priority::None => unprioritized.push(task.clone()),
        }
    }
    board.q4.extend(unprioritized);

    debug!(
        q1 = board.q1.len(),
        q2 = board.q2.len(),
        q3 = board.q3.len(),
        q4 = board.q4.len(),
        "bucketed tasks into quadrants"
    );
    board
}

pub fn reassign(store: &mut TaskStore, id: i64, quadrant: Quadrant) -> bool {
    store.set_priority(id, quadrant.priority())
}

#[cfg(test)]
mod tests {
    use super::{Quadrant, bucket, reassign};
    use crate::storage::Storage;
    use crate::store::TaskStore;
    use crate::task::Priority;
    use chrono::Utc;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, TaskStore) {
        let temp = tempdir().expect("tempdir");
        let storage = Storage::open(temp.path()).expect("open storage");
        (temp, TaskStore::load(storage))
    }

    #[test]
    fn high_goes_to_q1_and_low_or_none_to_q4() {
        let (_temp, mut store) = store();
        let now = Utc::now();

        store.add_task("urgent", None, Priority::High, vec![], now);
        store.add_task("someday", None, Priority::Low, vec![], now);
        store.add_task("unsorted", None, Priority::None, vec![], now);

        let board = bucket(&store);
        assert_eq!(board.q1.len(), 1);
        assert_eq!(board.q1[0].text, "urgent");
        assert_eq!(board.q4.len(), 2);
        assert_eq!(board.q4[0].text, "someday");
        assert_eq!(board.q4[1].text, "unsorted");
    }

    #[test]
    fn medium_alternates_between_q2_and_q3() {
        let (_temp, mut store) = store();
        let now = Utc::now();

        store.add_task("first", None, Priority::Medium, vec![], now);
        store.add_task("second", None, Priority::Medium, vec![], now);
        store.add_task("third", None, Priority::Medium, vec![], now);

        let board = bucket(&store);
        let q2: Vec<&str> = board.q2.iter().map(|t| t.text.as_str()).collect();
        let q3: Vec<&str> = board.q3.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(q2, vec!["first", "third"]);
        assert_eq!(q3, vec!["second"]);
    }

    #[test]
    fn completed_and_trashed_tasks_stay_off_the_board() {
        let (_temp, mut store) = store();
        let now = Utc::now();

        let done = store.add_task("done", None, Priority::High, vec![], now);
        store.toggle_completed(done.id, now);
        let gone = store.add_task("gone", None, Priority::Medium, vec![], now);
        store.trash(gone.id, now);

        assert!(bucket(&store).is_empty());
    }

    #[test]
    fn reassign_rewrites_priority_from_drop_target() {
        let (_temp, mut store) = store();
        let now = Utc::now();
        let task = store.add_task("float", None, Priority::None, vec![], now);

        assert!(reassign(&mut store, task.id, Quadrant::Q1));
        assert_eq!(store.get(task.id).map(|t| t.priority), Some(Priority::High));

        assert!(reassign(&mut store, task.id, Quadrant::Q3));
        assert_eq!(store.get(task.id).map(|t| t.priority), Some(Priority::Medium));

        assert!(reassign(&mut store, task.id, Quadrant::Q4));
        assert_eq!(store.get(task.id).map(|t| t.priority), Some(Priority::Low));

        assert!(!reassign(&mut store, 7, Quadrant::Q2));
    }
}
