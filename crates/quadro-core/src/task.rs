use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Completed,
    Trashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
    #[default]
    None,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::None => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Trashed => "trashed",
        };
        f.write_str(text)
    }
}

// Field names mirror the localStorage blobs of the original desktop app so
// exported files round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,

    pub text: String,

    #[serde(default)]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub tags: Vec<String>,

    pub status: Status,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trashed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        id: i64,
        text: String,
        due_date: Option<NaiveDate>,
        priority: Priority,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            text,
            due_date,
            priority,
            tags,
            status: Status::Active,
            created_at: now,
            completed_at: None,
            trashed_at: None,
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == Status::Active && self.due_date.map(|due| due < today).unwrap_or(false)
    }

    pub fn completion_stamp(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::{Priority, Status, Task};
    use chrono::{TimeZone, Utc};

    #[test]
    fn priority_rank_orders_high_first() {
        let mut priorities = vec![Priority::Low, Priority::High, Priority::None, Priority::Medium];
        priorities.sort_by_key(|p| p.rank());
        assert_eq!(
            priorities,
            vec![Priority::High, Priority::Medium, Priority::Low, Priority::None]
        );
    }

    #[test]
    fn task_json_uses_original_field_names() {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid now");
        let mut task = Task::new(
            1,
            "write report".to_string(),
            Some(now.date_naive()),
            Priority::High,
            vec!["work".to_string()],
            now,
        );
        task.status = Status::Completed;
        task.completed_at = Some(now);

        let json = serde_json::to_value(&task).expect("serialize task");
        assert_eq!(json["dueDate"], "2026-03-01");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["status"], "completed");
        assert!(json["completedAt"].is_string());
        assert!(json.get("trashedAt").is_none());

        let back: Task = serde_json::from_value(json).expect("deserialize task");
        assert_eq!(back, task);
    }
}
