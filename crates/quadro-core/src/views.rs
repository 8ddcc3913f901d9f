use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use tracing::debug;

use crate::datetime::project_timezone;
use crate::store::TaskStore;
use crate::task::{Status, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Overdue,
    Today,
    NoDeadline,
    Completed,
    Trash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Date,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Today,
    Week,
    Month,
    All,
}

#[derive(Debug, Clone, Default)]
pub struct CompletedQuery {
    pub search: Option<String>,
    pub range: Option<TimeRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionStats {
    pub today: usize,
    pub week: usize,
    pub month: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagHit {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub tasks: Vec<Task>,
    pub tags: Vec<TagHit>,
}

#[tracing::instrument(skip(store, today))]
pub fn select(store: &TaskStore, view: ViewKind, sort: SortMode, today: NaiveDate) -> Vec<Task> {
    let mut tasks: Vec<Task> = store
        .iter()
        .filter(|task| matches_view(task, view, today))
        .cloned()
        .collect();

    match view {
        ViewKind::Completed => tasks.sort_by(|a, b| b.completion_stamp().cmp(&a.completion_stamp())),
        ViewKind::Trash => tasks.sort_by(|a, b| b.trashed_at.cmp(&a.trashed_at)),
        _ => sort_tasks(&mut tasks, sort),
    }

    debug!(?view, count = tasks.len(), "selected view");
    tasks
}

fn matches_view(task: &Task, view: ViewKind, today: NaiveDate) -> bool {
    match view {
        ViewKind::Overdue => task.is_overdue(today),
        ViewKind::Today => {
            task.status == Status::Active && task.due_date.map(|due| due == today).unwrap_or(false)
        }
        ViewKind::NoDeadline => task.status == Status::Active && task.due_date.is_none(),
        ViewKind::Completed => task.status == Status::Completed,
        ViewKind::Trash => task.status == Status::Trashed,
    }
}

pub fn sort_tasks(tasks: &mut [Task], sort: SortMode) {
    match sort {
        SortMode::Priority => tasks.sort_by_key(|task| task.priority.rank()),
        SortMode::Date => tasks.sort_by_key(|task| match task.due_date {
            Some(due) => (0, due),
            None => (1, NaiveDate::MAX),
        }),
    }
}

// The completed view stacks a free-text search and a completion-time window
// on top of the base predicate; ordering defaults to newest-completed first.
#[tracing::instrument(skip(store, query, today))]
pub fn select_completed(
    store: &TaskStore,
    query: &CompletedQuery,
    sort: Option<SortMode>,
    today: NaiveDate,
) -> Vec<Task> {
    let mut tasks = select(store, ViewKind::Completed, SortMode::Date, today);

    if let Some(term) = query.search.as_deref() {
        let term = term.to_lowercase();
        tasks.retain(|task| {
            task.text.to_lowercase().contains(&term)
                || task.tags.iter().any(|tag| tag.to_lowercase().contains(&term))
        });
    }

    let range = query.range.unwrap_or(TimeRange::All);
    if range != TimeRange::All {
        let cutoff = range_start(range, today);
        tasks.retain(|task| stamp_date(task.completion_stamp()) >= cutoff);
    }

    if sort == Some(SortMode::Priority) {
        tasks.sort_by_key(|task| task.priority.rank());
    }

    tasks
}

fn range_start(range: TimeRange, today: NaiveDate) -> NaiveDate {
    match range {
        TimeRange::Today | TimeRange::All => today,
        TimeRange::Week => {
            let back = Days::new(u64::from(today.weekday().num_days_from_sunday()));
            today.checked_sub_days(back).unwrap_or(today)
        }
        TimeRange::Month => NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today),
    }
}

fn stamp_date(stamp: DateTime<Utc>) -> NaiveDate {
    stamp.with_timezone(project_timezone()).date_naive()
}

#[tracing::instrument(skip(store, today))]
pub fn completion_stats(store: &TaskStore, today: NaiveDate) -> CompletionStats {
    let completed: Vec<&Task> = store
        .iter()
        .filter(|task| task.status == Status::Completed)
        .collect();

    let week_start = range_start(TimeRange::Week, today);
    let month_start = range_start(TimeRange::Month, today);

    CompletionStats {
        today: completed
            .iter()
            .filter(|task| stamp_date(task.completion_stamp()) == today)
            .count(),
        week: completed
            .iter()
            .filter(|task| stamp_date(task.completion_stamp()) >= week_start)
            .count(),
        month: completed
            .iter()
            .filter(|task| stamp_date(task.completion_stamp()) >= month_start)
            .count(),
        total: completed.len(),
    }
}

// Quick-search overlay: substring match over text and tags of everything
// that is not in the trash, plus matching tag names with usage counts.
#[tracing::instrument(skip(store))]
pub fn quick_search(store: &TaskStore, term: &str) -> SearchResults {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return SearchResults::default();
    }

    let tasks: Vec<Task> = store
        .iter()
        .filter(|task| task.status != Status::Trashed)
        .filter(|task| {
            task.text.to_lowercase().contains(&term)
                || task.tags.iter().any(|tag| tag.to_lowercase().contains(&term))
        })
        .cloned()
        .collect();

    let mut tags: Vec<TagHit> = Vec::new();
    for task in store.iter().filter(|task| task.status != Status::Trashed) {
        for tag in &task.tags {
            if !tag.to_lowercase().contains(&term) {
                continue;
            }
            match tags.iter_mut().find(|hit| hit.name == *tag) {
                Some(hit) => hit.count += 1,
                None => tags.push(TagHit {
                    name: tag.clone(),
                    count: 1,
                }),
            }
        }
    }

    SearchResults { tasks, tags }
}
