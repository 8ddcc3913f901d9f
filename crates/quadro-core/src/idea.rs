use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::storage::{self, Storage};
use crate::store::TaskStore;
use crate::task::{Priority, Status, Task};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: i64,

    pub text: String,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: i64,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,

    pub created_at: DateTime<Utc>,

    pub status: Status,
}

#[derive(Debug, PartialEq)]
pub enum ConvertOutcome {
    Converted(Vec<Task>),
    NoActiveSubTasks,
    NotFound,
}

#[derive(Debug)]
pub struct IdeaStore {
    ideas: Vec<Idea>,
    storage: Storage,
    last_id: i64,
}

impl IdeaStore {
    #[tracing::instrument(skip(storage))]
    pub fn load(storage: Storage) -> Self {
        let ideas: Vec<Idea> = match storage.read(storage::IDEAS_KEY) {
            Ok(Some(ideas)) => ideas,
            Ok(None) => vec![],
            Err(err) => {
                warn!(error = %err, "failed to load ideas; starting from an empty store");
                vec![]
            }
        };

        let last_id = ideas
            .iter()
            .flat_map(|idea| {
                std::iter::once(idea.id).chain(idea.sub_tasks.iter().map(|sub| sub.id))
            })
            .max()
            .unwrap_or(0);
        info!(count = ideas.len(), "loaded idea store");
        Self {
            ideas,
            storage,
            last_id,
        }
    }

    pub fn ideas(&self) -> Vec<Idea> {
        self.ideas.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Idea> {
        self.ideas.iter()
    }

    pub fn get(&self, id: i64) -> Option<&Idea> {
        self.ideas.iter().find(|idea| idea.id == id)
    }

    fn next_id(&mut self, now: DateTime<Utc>) -> i64 {
        let candidate = now.timestamp_millis();
        let id = if candidate > self.last_id {
            candidate
        } else {
            self.last_id + 1
        };
        self.last_id = id;
        id
    }

    fn persist(&self) {
        if let Err(err) = self.storage.write(storage::IDEAS_KEY, &self.ideas) {
            warn!(error = %err, "failed to persist ideas; in-memory state is ahead of disk");
        }
    }

    #[tracing::instrument(skip(self, description, tags, now))]
    pub fn add_idea(
        &mut self,
        title: &str,
        description: &str,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Idea {
        let id = self.next_id(now);
        let idea = Idea {
            id,
            title: title.trim().to_string(),
            description: description.to_string(),
            tags,
            sub_tasks: vec![],
            created_at: now,
            status: Status::Active,
        };
        self.ideas.push(idea.clone());
        self.persist();

        debug!(id, count = self.ideas.len(), "idea added");
        idea
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_idea(&mut self, id: i64) -> bool {
        let Some(idx) = self.ideas.iter().position(|idea| idea.id == id) else {
            warn!(id, "idea not found; cannot delete");
            return false;
        };

        self.ideas.remove(idx);
        self.persist();
        true
    }

    #[tracing::instrument(skip(self, now))]
    pub fn add_sub_task(&mut self, idea_id: i64, text: &str, now: DateTime<Utc>) -> Option<SubTask> {
        let Some(idx) = self.ideas.iter().position(|idea| idea.id == idea_id) else {
            warn!(idea_id, "idea not found; cannot add sub-task");
            return None;
        };

        let id = self.next_id(now);
        let sub = SubTask {
            id,
            text: text.trim().to_string(),
            completed: false,
            priority: Priority::None,
            tags: vec![],
            created_at: now,
            status: Status::Active,
        };
        self.ideas[idx].sub_tasks.push(sub.clone());
        self.persist();
        Some(sub)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_sub_task(&mut self, idea_id: i64, sub_id: i64) -> bool {
        let Some(idea) = self.ideas.iter_mut().find(|idea| idea.id == idea_id) else {
            warn!(idea_id, "idea not found; cannot delete sub-task");
            return false;
        };
        let Some(idx) = idea.sub_tasks.iter().position(|sub| sub.id == sub_id) else {
            warn!(idea_id, sub_id, "sub-task not found; cannot delete");
            return false;
        };

        idea.sub_tasks.remove(idx);
        self.persist();
        true
    }

    #[tracing::instrument(skip(self))]
    pub fn set_sub_task_completed(&mut self, idea_id: i64, sub_id: i64, completed: bool) -> bool {
        let Some(sub) = self.find_sub_task(idea_id, sub_id) else {
            warn!(idea_id, sub_id, "sub-task not found; cannot update completion");
            return false;
        };

        sub.completed = completed;
        self.persist();
        true
    }

    #[tracing::instrument(skip(self, priority))]
    pub fn set_sub_task_priority(&mut self, idea_id: i64, sub_id: i64, priority: Priority) -> bool {
        let Some(sub) = self.find_sub_task(idea_id, sub_id) else {
            warn!(idea_id, sub_id, "sub-task not found; cannot update priority");
            return false;
        };

        sub.priority = priority;
        self.persist();
        true
    }

    #[tracing::instrument(skip(self))]
    pub fn complete_all_sub_tasks(&mut self, idea_id: i64) -> Option<usize> {
        let Some(idea) = self.ideas.iter_mut().find(|idea| idea.id == idea_id) else {
            warn!(idea_id, "idea not found; cannot complete sub-tasks");
            return None;
        };

        for sub in &mut idea.sub_tasks {
            sub.completed = true;
        }
        let count = idea.sub_tasks.len();
        self.persist();
        Some(count)
    }

    // Identity transfer: the sub-task leaves the idea and a fresh Task takes
    // over its text, priority, and tags. No due date is carried.
    #[tracing::instrument(skip(self, tasks, now))]
    pub fn convert_sub_task(
        &mut self,
        idea_id: i64,
        sub_id: i64,
        tasks: &mut TaskStore,
        now: DateTime<Utc>,
    ) -> Option<Task> {
        let idea = self.ideas.iter_mut().find(|idea| idea.id == idea_id);
        let Some(idea) = idea else {
            warn!(idea_id, "idea not found; cannot convert sub-task");
            return None;
        };
        let Some(idx) = idea.sub_tasks.iter().position(|sub| sub.id == sub_id) else {
            warn!(idea_id, sub_id, "sub-task not found; cannot convert");
            return None;
        };

        let sub = idea.sub_tasks.remove(idx);
        let task = tasks.add_task(&sub.text, None, sub.priority, sub.tags, now);
        self.persist();

        info!(idea_id, sub_id, task_id = task.id, "converted sub-task to task");
        Some(task)
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn convert_idea(
        &mut self,
        idea_id: i64,
        tasks: &mut TaskStore,
        now: DateTime<Utc>,
    ) -> ConvertOutcome {
        let Some(idea) = self.ideas.iter_mut().find(|idea| idea.id == idea_id) else {
            warn!(idea_id, "idea not found; cannot convert");
            return ConvertOutcome::NotFound;
        };

        if !idea.sub_tasks.iter().any(|sub| sub.status == Status::Active) {
            return ConvertOutcome::NoActiveSubTasks;
        }

        let mut converted = Vec::new();
        let mut remaining = Vec::with_capacity(idea.sub_tasks.len());
        for sub in idea.sub_tasks.drain(..) {
            if sub.status == Status::Active {
                converted.push(tasks.add_task(&sub.text, None, sub.priority, sub.tags, now));
            } else {
                remaining.push(sub);
            }
        }
        idea.sub_tasks = remaining;
        self.persist();

        info!(idea_id, converted = converted.len(), "converted idea sub-tasks to tasks");
        ConvertOutcome::Converted(converted)
    }

    fn find_sub_task(&mut self, idea_id: i64, sub_id: i64) -> Option<&mut SubTask> {
        self.ideas
            .iter_mut()
            .find(|idea| idea.id == idea_id)?
            .sub_tasks
            .iter_mut()
            .find(|sub| sub.id == sub_id)
    }
}
