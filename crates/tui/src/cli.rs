use std::path::PathBuf;

use anyhow::Result;
use clap::{value_parser, ArgAction, Args, Parser, Subcommand};

use crate::core::view::{PageSize, SortField};
use crate::model::{parse_due_date, Credentials, Priority, RecordId, TaskDraft, TaskPatch, TaskStatus};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdesk",
    version,
    about = "Keyboard-first client for a shared task board.",
    after_help = "Examples:\n  taskdesk login --email eve.holt@reqres.in --password cityslicka\n  taskdesk             Launch the TUI (same as `taskdesk tui`)\n  taskdesk list --search report --sort due-date --desc\n  taskdesk add \"Write report\" -d \"Q3 numbers\" --priority high --due 2025-03-01\n  taskdesk delete 65f0c2"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the task API
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Base URL of the user directory that issues login tokens
    #[arg(long, value_name = "URL", global = true)]
    pub directory_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", value_name = "SECONDS", global = true, value_parser = value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Tracing filter (e.g. "info", "taskdesk_core=debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Launch the keyboard-first terminal UI (default command)
    Tui,
    /// Print one page of the task list
    List(ListArgs),
    /// Create a task
    Add(AddArgs),
    /// Change fields of an existing task
    Edit(EditArgs),
    /// Delete one or more tasks by id
    Delete(DeleteArgs),
    /// Log in against the user directory and remember the session
    Login(CredentialArgs),
    /// Create a directory account
    Register(CredentialArgs),
    /// Forget the stored session
    Logout,
    /// Show the logged-in user's profile
    Whoami,
    /// List every directory user (administrators only)
    Users,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only show tasks whose title contains this text (case-insensitive)
    #[arg(long, short = 's', value_name = "TEXT")]
    pub search: Option<String>,

    /// Sort key
    #[arg(long, value_enum, default_value_t = SortField::Title)]
    pub sort: SortField,

    /// Sort descending instead of ascending
    #[arg(long)]
    pub desc: bool,

    /// Rows per page (10, 25 or 50)
    #[arg(long = "page-size", value_name = "ROWS", default_value = "10", value_parser = parse_page_size)]
    pub page_size: PageSize,

    /// 1-based page number
    #[arg(long, default_value_t = 1, value_parser = value_parser!(u64).range(1..))]
    pub page: u64,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title
    #[arg(value_name = "TITLE", required = true)]
    pub title: String,

    /// Longer description
    #[arg(long, short = 'd', default_value = "")]
    pub description: String,

    /// Initial status (defaults to todo)
    #[arg(long, value_enum)]
    pub status: Option<TaskStatus>,

    /// Priority (defaults to medium)
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Due date (YYYY-MM-DD)
    #[arg(long = "due", value_name = "DATE")]
    pub due_date: Option<String>,

    /// Id of the assigned user
    #[arg(long, value_name = "USER_ID")]
    pub assignee: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Id of the task to change
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, value_enum)]
    pub status: Option<TaskStatus>,

    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Due date (YYYY-MM-DD), or "none" to clear it
    #[arg(long = "due", value_name = "DATE")]
    pub due_date: Option<String>,

    /// Assigned user id, or "none" to unassign
    #[arg(long, value_name = "USER_ID")]
    pub assignee: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// One or more task ids to delete
    #[arg(value_name = "ID", required = true, action = ArgAction::Append)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    #[arg(long, value_name = "EMAIL")]
    pub email: String,

    #[arg(long, value_name = "PASSWORD", env = "TASKDESK_PASSWORD", hide_env_values = true)]
    pub password: String,
}

fn parse_page_size(raw: &str) -> std::result::Result<PageSize, String> {
    let rows: usize = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    PageSize::try_from(rows).map_err(|err| err.to_string())
}

const CLEAR_KEYWORD: &str = "none";

fn is_clear(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case(CLEAR_KEYWORD) || raw.trim().is_empty()
}

impl AddArgs {
    pub fn to_draft(&self) -> Result<TaskDraft> {
        let mut draft = TaskDraft::new(self.title.trim(), self.description.trim());
        if let Some(status) = self.status {
            draft.status = status;
        }
        if let Some(priority) = self.priority {
            draft.priority = priority;
        }
        draft.due_date = self.due_date.as_deref().map(parse_due_date).transpose()?;
        draft.assignee = self
            .assignee
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(RecordId::from);
        Ok(draft)
    }
}

impl EditArgs {
    pub fn to_patch(&self) -> Result<TaskPatch> {
        let due_date = match self.due_date.as_deref() {
            None => None,
            Some(raw) if is_clear(raw) => Some(None),
            Some(raw) => Some(Some(parse_due_date(raw)?)),
        };
        let assignee = self.assignee.as_deref().map(|raw| {
            if is_clear(raw) {
                None
            } else {
                Some(RecordId::from(raw.trim()))
            }
        });
        Ok(TaskPatch {
            title: self.title.as_ref().map(|t| t.trim().to_string()),
            description: self.description.as_ref().map(|d| d.trim().to_string()),
            status: self.status,
            due_date,
            priority: self.priority,
            assignee,
        })
    }
}

impl From<&CredentialArgs> for Credentials {
    fn from(args: &CredentialArgs) -> Self {
        Credentials {
            email: args.email.trim().to_string(),
            password: args.password.clone(),
        }
    }
}
