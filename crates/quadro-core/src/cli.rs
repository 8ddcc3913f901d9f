use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::quadrant::Quadrant;
use crate::task::Priority;
use crate::views::{SortMode, TimeRange, ViewKind};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "quadro",
    version,
    about = "Quadro: quadrant-first to-do manager",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[arg(short = 'y', long = "yes", global = true)]
    pub assume_yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Capture a new task
    Add {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Show one of the task views
    List {
        #[arg(value_enum, default_value = "today")]
        view: ViewArg,
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        range: Option<RangeArg>,
    },
    /// Change a task's text or due date
    Edit {
        id: i64,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
    },
    /// Toggle a task between active and completed
    Done { id: i64 },
    /// Move a task to the trash
    Trash { id: i64 },
    /// Restore a task from the trash
    Restore { id: i64 },
    /// Permanently delete a task
    Purge { id: i64 },
    /// Permanently delete every trashed task
    EmptyTrash,
    /// Permanently delete every completed task
    ClearCompleted,
    /// Move every overdue task's due date to today
    Postpone,
    /// Eisenhower board
    Quadrant {
        #[command(subcommand)]
        action: Option<QuadrantCmd>,
    },
    /// Ideas and their sub-tasks
    Idea {
        #[command(subcommand)]
        action: IdeaCmd,
    },
    /// Tag registry
    Tags {
        #[command(subcommand)]
        action: Option<TagsCmd>,
    },
    /// Search task text and tags
    Search {
        #[arg(required = true, trailing_var_arg = true)]
        term: Vec<String>,
    },
    /// Completion statistics
    Stats,
    /// Write the task list as JSON
    Export { path: Option<PathBuf> },
    /// Replace the task list from a JSON file
    Import { path: PathBuf },
}

#[derive(Subcommand, Debug, Clone)]
pub enum QuadrantCmd {
    Show,
    Move {
        id: i64,
        #[arg(value_enum)]
        target: QuadrantArg,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum IdeaCmd {
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    List,
    Delete {
        id: i64,
    },
    Subtask {
        #[command(subcommand)]
        action: SubtaskCmd,
    },
    /// Convert active sub-tasks (or one sub-task) into independent tasks
    Convert {
        id: i64,
        #[arg(long)]
        subtask: Option<i64>,
    },
    CompleteAll {
        id: i64,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubtaskCmd {
    Add {
        idea: i64,
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    Done {
        idea: i64,
        sub: i64,
        #[arg(long)]
        undo: bool,
    },
    Priority {
        idea: i64,
        sub: i64,
        #[arg(value_enum)]
        priority: PriorityArg,
    },
    Delete {
        idea: i64,
        sub: i64,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TagsCmd {
    List,
    Add { name: String },
    Rename { old: String, new: String },
    Delete { name: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewArg {
    Overdue,
    Today,
    Inbox,
    Completed,
    Trash,
    All,
}

impl ViewArg {
    pub fn kind(self) -> Option<ViewKind> {
        match self {
            Self::Overdue => Some(ViewKind::Overdue),
            Self::Today => Some(ViewKind::Today),
            Self::Inbox => Some(ViewKind::NoDeadline),
            Self::Completed => Some(ViewKind::Completed),
            Self::Trash => Some(ViewKind::Trash),
            Self::All => None,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    Date,
    Priority,
}

impl From<SortArg> for SortMode {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Date => Self::Date,
            SortArg::Priority => Self::Priority,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeArg {
    Today,
    Week,
    Month,
    All,
}

impl From<RangeArg> for TimeRange {
    fn from(value: RangeArg) -> Self {
        match value {
            RangeArg::Today => Self::Today,
            RangeArg::Week => Self::Week,
            RangeArg::Month => Self::Month,
            RangeArg::All => Self::All,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityArg {
    High,
    Medium,
    Low,
    None,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::High => Self::High,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::Low => Self::Low,
            PriorityArg::None => Self::None,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadrantArg {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl From<QuadrantArg> for Quadrant {
    fn from(value: QuadrantArg) -> Self {
        match value {
            QuadrantArg::Q1 => Self::Q1,
            QuadrantArg::Q2 => Self::Q2,
            QuadrantArg::Q3 => Self::Q3,
            QuadrantArg::Q4 => Self::Q4,
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            if let Some((k, v)) = rest.split_once('=') {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((format!("rc.{k}"), v.to_string()));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}
