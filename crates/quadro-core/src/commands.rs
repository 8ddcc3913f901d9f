use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use crate::cli::{Command, IdeaCmd, QuadrantCmd, RangeArg, SubtaskCmd, TagsCmd, ViewArg};
use crate::config::Config;
use crate::confirm::Confirm;
use crate::datetime;
use crate::idea::{ConvertOutcome, IdeaStore};
use crate::quadrant::{self, Quadrant};
use crate::render::Renderer;
use crate::store::{TaskPatch, TaskStore};
use crate::tags::{AddTagOutcome, RenameTagOutcome, TagRegistry};
use crate::task::{Priority, Status, Task};
use crate::views::{self, CompletedQuery, SortMode, ViewKind};

pub struct CommandContext<'a> {
    pub tasks: &'a mut TaskStore,
    pub ideas: &'a mut IdeaStore,
    pub tags: &'a mut TagRegistry,
    pub cfg: &'a Config,
    pub renderer: &'a mut Renderer,
    pub confirm: &'a mut dyn Confirm,
}

#[instrument(skip(ctx, command))]
pub fn dispatch(ctx: &mut CommandContext<'_>, command: Command) -> anyhow::Result<()> {
    let now = Utc::now();
    let today = datetime::today(now);

    debug!(?command, "dispatching command");

    match command {
        Command::Add {
            text,
            due,
            priority,
            tags,
        } => cmd_add(ctx, &text, due.as_deref(), priority.map(Into::into), tags, now, today),
        Command::List {
            view,
            sort,
            search,
            range,
        } => cmd_list(ctx, view, sort.map(Into::into), search, range, today),
        Command::Edit {
            id,
            text,
            due,
            clear_due,
        } => cmd_edit(ctx, id, text, due.as_deref(), clear_due, today),
        Command::Done { id } => cmd_done(ctx, id, now),
        Command::Trash { id } => cmd_trash(ctx, id, now),
        Command::Restore { id } => cmd_restore(ctx, id),
        Command::Purge { id } => cmd_purge(ctx, id),
        Command::EmptyTrash => cmd_empty_trash(ctx),
        Command::ClearCompleted => cmd_clear_completed(ctx),
        Command::Postpone => cmd_postpone(ctx, today),
        Command::Quadrant { action } => cmd_quadrant(ctx, action, today),
        Command::Idea { action } => cmd_idea(ctx, action, now),
        Command::Tags { action } => cmd_tags(ctx, action),
        Command::Search { term } => cmd_search(ctx, &term, today),
        Command::Stats => cmd_stats(ctx, today),
        Command::Export { path } => cmd_export(ctx, path.as_deref()),
        Command::Import { path } => cmd_import(ctx, &path),
    }
}

fn resolve_sort(cfg: &Config, flag: Option<SortMode>) -> SortMode {
    if let Some(sort) = flag {
        return sort;
    }
    match cfg.get("default.sort").as_deref() {
        Some("priority") => SortMode::Priority,
        _ => SortMode::Date,
    }
}

#[instrument(skip(ctx, text, due, priority, tags, now, today))]
fn cmd_add(
    ctx: &mut CommandContext<'_>,
    text: &[String],
    due: Option<&str>,
    priority: Option<Priority>,
    tags: Vec<String>,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command add");

    let text = text.join(" ");
    if text.trim().is_empty() {
        println!("Task text cannot be empty.");
        return Ok(());
    }

    let due_date = due.map(|expr| datetime::parse_due_expr(expr, today));
    let task = ctx.tasks.add_task(
        &text,
        due_date,
        priority.unwrap_or_default(),
        tags,
        now,
    );

    println!("Created task {}.", task.id);
    Ok(())
}

#[instrument(skip(ctx, sort, search, range, today))]
fn cmd_list(
    ctx: &mut CommandContext<'_>,
    view: ViewArg,
    sort: Option<SortMode>,
    search: Option<String>,
    range: Option<RangeArg>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!(?view, "command list");

    let resolved = resolve_sort(ctx.cfg, sort);

    match view.kind() {
        Some(ViewKind::Completed) => {
            let query = CompletedQuery {
                search,
                range: range.map(Into::into),
            };
            let tasks = views::select_completed(ctx.tasks, &query, sort, today);
            ctx.renderer.print_task_section("Completed", &tasks, today)?;
        }
        Some(kind) => {
            let tasks = views::select(ctx.tasks, kind, resolved, today);
            ctx.renderer
                .print_task_section(view_title(kind), &tasks, today)?;
        }
        None => {
            for kind in [ViewKind::Overdue, ViewKind::Today, ViewKind::NoDeadline] {
                let tasks = views::select(ctx.tasks, kind, resolved, today);
                ctx.renderer
                    .print_task_section(view_title(kind), &tasks, today)?;
                println!();
            }
            let stats = views::completion_stats(ctx.tasks, today);
            println!("Completed ({})", stats.total);
        }
    }
    Ok(())
}

fn view_title(kind: ViewKind) -> &'static str {
    match kind {
        ViewKind::Overdue => "Overdue",
        ViewKind::Today => "Today",
        ViewKind::NoDeadline => "No deadline",
        ViewKind::Completed => "Completed",
        ViewKind::Trash => "Trash",
    }
}

#[instrument(skip(ctx, text, due, today))]
fn cmd_edit(
    ctx: &mut CommandContext<'_>,
    id: i64,
    text: Option<String>,
    due: Option<&str>,
    clear_due: bool,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!(id, "command edit");

    if let Some(new_text) = text.as_deref()
        && new_text.trim().is_empty()
    {
        println!("Task text cannot be empty.");
        return Ok(());
    }

    let due_date = if clear_due {
        Some(None)
    } else {
        due.map(|expr| Some(datetime::parse_due_expr(expr, today)))
    };

    let patch = TaskPatch {
        text,
        due_date,
    };
    if patch.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }

    if ctx.tasks.update_details(id, patch) {
        println!("Updated task {id}.");
    } else {
        println!("No task with id {id}.");
    }
    Ok(())
}

#[instrument(skip(ctx, now))]
fn cmd_done(ctx: &mut CommandContext<'_>, id: i64, now: DateTime<Utc>) -> anyhow::Result<()> {
    info!(id, "command done");

    match ctx.tasks.toggle_completed(id, now) {
        Some(Status::Completed) => println!("Completed task {id}."),
        Some(_) => println!("Reopened task {id}."),
        None => println!("No task with id {id}."),
    }
    Ok(())
}

#[instrument(skip(ctx, now))]
fn cmd_trash(ctx: &mut CommandContext<'_>, id: i64, now: DateTime<Utc>) -> anyhow::Result<()> {
    info!(id, "command trash");

    if ctx.tasks.trash(id, now) {
        println!("Moved task {id} to the trash.");
    } else {
        println!("No task with id {id}.");
    }
    Ok(())
}

#[instrument(skip(ctx))]
fn cmd_restore(ctx: &mut CommandContext<'_>, id: i64) -> anyhow::Result<()> {
    info!(id, "command restore");

    if ctx.tasks.restore(id) {
        println!("Restored task {id}.");
    } else {
        println!("No task with id {id}.");
    }
    Ok(())
}

#[instrument(skip(ctx))]
fn cmd_purge(ctx: &mut CommandContext<'_>, id: i64) -> anyhow::Result<()> {
    info!(id, "command purge");

    let Some(task) = ctx.tasks.get(id) else {
        println!("No task with id {id}.");
        return Ok(());
    };

    let prompt = format!("Permanently delete task \"{}\"? This cannot be undone.", task.text);
    if !ctx.confirm.confirm(&prompt)? {
        println!("Cancelled.");
        return Ok(());
    }

    ctx.tasks.purge(id);
    println!("Permanently deleted task {id}.");
    Ok(())
}

#[instrument(skip(ctx))]
fn cmd_empty_trash(ctx: &mut CommandContext<'_>) -> anyhow::Result<()> {
    info!("command empty-trash");

    let count = ctx
        .tasks
        .iter()
        .filter(|task| task.status == Status::Trashed)
        .count();
    if count == 0 {
        println!("The trash is already empty.");
        return Ok(());
    }

    let prompt = format!("Permanently delete {count} trashed task(s)? This cannot be undone.");
    if !ctx.confirm.confirm(&prompt)? {
        println!("Cancelled.");
        return Ok(());
    }

    let purged = ctx.tasks.empty_trash();
    println!("Emptied the trash ({purged} task(s)).");
    Ok(())
}

#[instrument(skip(ctx))]
fn cmd_clear_completed(ctx: &mut CommandContext<'_>) -> anyhow::Result<()> {
    info!("command clear-completed");

    let count = ctx
        .tasks
        .iter()
        .filter(|task| task.status == Status::Completed)
        .count();
    if count == 0 {
        println!("No completed tasks to clear.");
        return Ok(());
    }

    let prompt = format!("Permanently delete all {count} completed task(s)? This cannot be undone.");
    if !ctx.confirm.confirm(&prompt)? {
        println!("Cancelled.");
        return Ok(());
    }

    let cleared = ctx.tasks.clear_completed();
    println!("Cleared {cleared} completed task(s).");
    Ok(())
}

#[instrument(skip(ctx, today))]
fn cmd_postpone(ctx: &mut CommandContext<'_>, today: NaiveDate) -> anyhow::Result<()> {
    info!("command postpone");

    let postponed = ctx.tasks.postpone_overdue(today);
    if postponed == 0 {
        println!("No overdue tasks to postpone.");
    } else {
        println!("Postponed {postponed} overdue task(s) to today.");
    }
    Ok(())
}

#[instrument(skip(ctx, action, today))]
fn cmd_quadrant(
    ctx: &mut CommandContext<'_>,
    action: Option<QuadrantCmd>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    match action {
        None | Some(QuadrantCmd::Show) => {
            info!("command quadrant show");
            let board = quadrant::bucket(ctx.tasks);
            ctx.renderer.print_board(&board, today)?;
        }
        Some(QuadrantCmd::Move { id, target }) => {
            info!(id, ?target, "command quadrant move");
            let target: Quadrant = target.into();
            if quadrant::reassign(ctx.tasks, id, target) {
                println!(
                    "Moved task {id} to {}; priority is now {}.",
                    target.label(),
                    target.priority()
                );
            } else {
                println!("No task with id {id}.");
            }
        }
    }
    Ok(())
}

#[instrument(skip(ctx, action, now))]
fn cmd_idea(
    ctx: &mut CommandContext<'_>,
    action: IdeaCmd,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    match action {
        IdeaCmd::Add {
            title,
            description,
            tags,
        } => {
            info!("command idea add");
            if title.trim().is_empty() {
                println!("Idea title cannot be empty.");
                return Ok(());
            }
            let idea = ctx.ideas.add_idea(&title, &description, tags, now);
            println!("Created idea {}.", idea.id);
        }
        IdeaCmd::List => {
            info!("command idea list");
            let mut ideas = ctx.ideas.ideas();
            ideas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            ctx.renderer.print_idea_list(&ideas)?;
        }
        IdeaCmd::Delete { id } => {
            info!(id, "command idea delete");
            let Some(idea) = ctx.ideas.get(id) else {
                println!("No idea with id {id}.");
                return Ok(());
            };
            let prompt = format!(
                "Delete idea \"{}\" and its {} sub-task(s)?",
                idea.title,
                idea.sub_tasks.len()
            );
            if !ctx.confirm.confirm(&prompt)? {
                println!("Cancelled.");
                return Ok(());
            }
            ctx.ideas.delete_idea(id);
            println!("Deleted idea {id}.");
        }
        IdeaCmd::Subtask { action } => cmd_subtask(ctx, action, now)?,
        IdeaCmd::Convert { id, subtask } => cmd_convert(ctx, id, subtask, now)?,
        IdeaCmd::CompleteAll { id } => {
            info!(id, "command idea complete-all");
            match ctx.ideas.complete_all_sub_tasks(id) {
                Some(count) => println!("Marked {count} sub-task(s) completed."),
                None => println!("No idea with id {id}."),
            }
        }
    }
    Ok(())
}

#[instrument(skip(ctx, action, now))]
fn cmd_subtask(
    ctx: &mut CommandContext<'_>,
    action: SubtaskCmd,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    match action {
        SubtaskCmd::Add { idea, text } => {
            info!(idea, "command idea subtask add");
            let text = text.join(" ");
            if text.trim().is_empty() {
                println!("Sub-task text cannot be empty.");
                return Ok(());
            }
            match ctx.ideas.add_sub_task(idea, &text, now) {
                Some(sub) => println!("Added sub-task {} to idea {idea}.", sub.id),
                None => println!("No idea with id {idea}."),
            }
        }
        SubtaskCmd::Done { idea, sub, undo } => {
            info!(idea, sub, undo, "command idea subtask done");
            if ctx.ideas.set_sub_task_completed(idea, sub, !undo) {
                if undo {
                    println!("Reopened sub-task {sub}.");
                } else {
                    println!("Completed sub-task {sub}.");
                }
            } else {
                println!("No such sub-task.");
            }
        }
        SubtaskCmd::Priority {
            idea,
            sub,
            priority,
        } => {
            info!(idea, sub, "command idea subtask priority");
            let priority: Priority = priority.into();
            if ctx.ideas.set_sub_task_priority(idea, sub, priority) {
                println!("Sub-task {sub} priority is now {priority}.");
            } else {
                println!("No such sub-task.");
            }
        }
        SubtaskCmd::Delete { idea, sub } => {
            info!(idea, sub, "command idea subtask delete");
            if ctx.ideas.delete_sub_task(idea, sub) {
                println!("Deleted sub-task {sub}.");
            } else {
                println!("No such sub-task.");
            }
        }
    }
    Ok(())
}

#[instrument(skip(ctx, now))]
fn cmd_convert(
    ctx: &mut CommandContext<'_>,
    id: i64,
    subtask: Option<i64>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!(id, ?subtask, "command idea convert");

    if let Some(sub_id) = subtask {
        match ctx.ideas.convert_sub_task(id, sub_id, ctx.tasks, now) {
            Some(task) => println!("Converted sub-task into task {} (\"{}\").", task.id, task.text),
            None => println!("No such sub-task."),
        }
        return Ok(());
    }

    match ctx.ideas.convert_idea(id, ctx.tasks, now) {
        ConvertOutcome::Converted(tasks) => {
            println!("Converted {} sub-task(s) into independent tasks.", tasks.len());
        }
        ConvertOutcome::NoActiveSubTasks => {
            println!("Idea {id} has no active sub-tasks to convert.");
        }
        ConvertOutcome::NotFound => println!("No idea with id {id}."),
    }
    Ok(())
}

#[instrument(skip(ctx, action))]
fn cmd_tags(ctx: &mut CommandContext<'_>, action: Option<TagsCmd>) -> anyhow::Result<()> {
    match action {
        None | Some(TagsCmd::List) => {
            info!("command tags list");
            let names = ctx.tags.all_unique_tags(ctx.tasks, ctx.ideas);
            println!("Tags ({})", names.len());
            for name in names {
                let count = ctx
                    .tasks
                    .iter()
                    .filter(|task| task.tags.iter().any(|tag| tag == &name))
                    .count();
                println!("  {name} ({count} task(s))");
            }
        }
        Some(TagsCmd::Add { name }) => {
            info!("command tags add");
            match ctx.tags.add(&name) {
                AddTagOutcome::Added => println!("Added tag \"{}\".", name.trim()),
                AddTagOutcome::EmptyName => println!("Tag name cannot be empty."),
                AddTagOutcome::Duplicate => println!("Tag \"{}\" already exists.", name.trim()),
            }
        }
        Some(TagsCmd::Rename { old, new }) => {
            info!("command tags rename");
            match ctx.tags.rename(&old, &new, ctx.tasks) {
                RenameTagOutcome::Renamed { retagged } => {
                    println!("Renamed tag \"{old}\" to \"{}\" ({retagged} task(s) updated).", new.trim());
                }
                RenameTagOutcome::EmptyName => println!("Tag name cannot be empty."),
                RenameTagOutcome::Unchanged => println!("Tag name is unchanged."),
                RenameTagOutcome::Duplicate => println!("Tag \"{}\" already exists.", new.trim()),
            }
        }
        Some(TagsCmd::Delete { name }) => {
            info!("command tags delete");
            let prompt = format!(
                "Remove tag \"{name}\" from every task? The tasks themselves are kept."
            );
            if !ctx.confirm.confirm(&prompt)? {
                println!("Cancelled.");
                return Ok(());
            }
            if ctx.tags.delete(&name, ctx.tasks) {
                println!("Deleted tag \"{name}\".");
            } else {
                println!("No tag named \"{name}\".");
            }
        }
    }
    Ok(())
}

#[instrument(skip(ctx, term, today))]
fn cmd_search(ctx: &mut CommandContext<'_>, term: &[String], today: NaiveDate) -> anyhow::Result<()> {
    info!("command search");

    let term = term.join(" ");
    let results = views::quick_search(ctx.tasks, &term);
    ctx.renderer.print_search_results(&results, today)?;
    Ok(())
}

#[instrument(skip(ctx, today))]
fn cmd_stats(ctx: &mut CommandContext<'_>, today: NaiveDate) -> anyhow::Result<()> {
    info!("command stats");

    let stats = views::completion_stats(ctx.tasks, today);
    ctx.renderer.print_stats(&stats)?;
    Ok(())
}

// The desktop shell exchanged a plain Task[] JSON blob with the core; the
// same blob is the export/import file format here.
#[instrument(skip(ctx, path))]
fn cmd_export(ctx: &mut CommandContext<'_>, path: Option<&Path>) -> anyhow::Result<()> {
    info!("command export");

    let tasks = ctx.tasks.tasks();
    let json = serde_json::to_string_pretty(&tasks).context("failed to serialize task list")?;

    match path {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported {} task(s) to {}.", tasks.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[instrument(skip(ctx, path))]
fn cmd_import(ctx: &mut CommandContext<'_>, path: &PathBuf) -> anyhow::Result<()> {
    info!("command import");

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let imported: Vec<Task> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a task list", path.display()))?;

    let prompt = format!(
        "Replace the current {} task(s) with {} imported task(s)?",
        ctx.tasks.len(),
        imported.len()
    );
    if !ctx.confirm.confirm(&prompt)? {
        println!("Cancelled.");
        return Ok(());
    }

    let count = imported.len();
    ctx.tasks.replace_all(imported);
    println!("Imported {count} task(s).");
    Ok(())
}
