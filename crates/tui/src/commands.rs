use std::fmt;
use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};

use crate::cli::{AddArgs, CliCommand, CredentialArgs, DeleteArgs, EditArgs, ListArgs};
use crate::config::AppConfig;
use crate::core::directory::DirectoryClient;
use crate::core::error::{RequestError, TaskError};
use crate::core::remote::{HttpTaskSource, TaskSource};
use crate::core::services::{AuthError, AuthService, TaskBoard};
use crate::core::session::{SessionContext, SessionStore};
use crate::core::view::{PagedResult, SortDirection, ViewState};
use crate::model::{Credentials, RequiredFields, Task, TaskId};

pub(crate) const NOT_LOGGED_IN: &str = "Not logged in. Run `taskdesk login` first.";
pub(crate) const SESSION_EXPIRED: &str =
    "Session expired and was cleared. Run `taskdesk login` again.";

/// The collaborators a command talks to, wired to one shared session.
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub source: Arc<dyn TaskSource>,
    pub required: RequiredFields,
}

impl Services {
    pub fn new(auth: AuthService, source: Arc<dyn TaskSource>) -> Self {
        Self {
            auth,
            source,
            required: RequiredFields::default(),
        }
    }

    /// Build the HTTP clients for `config` and load the stored session.
    pub fn connect(config: &AppConfig) -> Result<Self> {
        let context = SessionContext::anonymous();
        let directory = DirectoryClient::new(config)?;
        let auth = AuthService::new(
            Arc::new(directory),
            SessionStore::for_config(config),
            context.clone(),
        );
        if let Err(err) = auth.restore() {
            tracing::warn!(error = %err, "ignoring unreadable session");
        }
        let source = HttpTaskSource::new(config, context)?;
        Ok(Self::new(auth, Arc::new(source)))
    }

    pub fn board(&self) -> TaskBoard {
        TaskBoard::new(Arc::clone(&self.source), self.required)
    }

    fn require_session(&self) -> Result<()> {
        if self.auth.context().is_authenticated() {
            Ok(())
        } else {
            Err(anyhow!(NOT_LOGGED_IN))
        }
    }

    /// Convert a task failure into a command error, dropping the session when
    /// the server no longer accepts it.
    fn check<T>(&self, result: Result<T, TaskError>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) if err.is_unauthorized() => {
                self.auth.expire_session()?;
                Err(anyhow!(SESSION_EXPIRED))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn loaded_board(&self) -> Result<TaskBoard> {
        self.require_session()?;
        let mut board = self.board();
        let loaded = board.refresh().await.map_err(TaskError::from);
        self.check(loaded).context("failed to load tasks")?;
        Ok(board)
    }
}

pub fn execute<W: Write>(config: &AppConfig, command: CliCommand, writer: W) -> Result<()> {
    let services = Services::connect(config)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run_command(&services, command, writer))
}

pub async fn run_command<W: Write>(
    services: &Services,
    command: CliCommand,
    mut writer: W,
) -> Result<()> {
    match command {
        CliCommand::List(args) => handle_list(services, &args, &mut writer).await,
        CliCommand::Add(args) => handle_add(services, &args, &mut writer).await,
        CliCommand::Edit(args) => handle_edit(services, &args, &mut writer).await,
        CliCommand::Delete(args) => handle_delete(services, &args, &mut writer).await,
        CliCommand::Login(args) => handle_login(services, &args, &mut writer).await,
        CliCommand::Register(args) => handle_register(services, &args, &mut writer).await,
        CliCommand::Logout => {
            services.auth.logout()?;
            writeln!(writer, "Logged out")?;
            Ok(())
        }
        CliCommand::Whoami => handle_whoami(services, &mut writer).await,
        CliCommand::Users => handle_users(services, &mut writer).await,
        CliCommand::Tui => Err(anyhow!("launch the terminal UI directly")),
    }
}

async fn handle_list<W: Write>(services: &Services, args: &ListArgs, mut writer: W) -> Result<()> {
    let mut board = services.loaded_board().await?;
    if let Some(search) = &args.search {
        board.set_search(search.as_str());
    }
    board.set_sort_field(args.sort);
    if args.desc {
        board.set_direction(SortDirection::Descending);
    }
    board.set_page_size(args.page_size);
    board.set_page(usize::try_from(args.page).unwrap_or(usize::MAX));

    let report = ListReport {
        page: board.view(),
        view: board.view_state().clone(),
    };
    report.write_to(&mut writer)
}

async fn handle_add<W: Write>(services: &Services, args: &AddArgs, mut writer: W) -> Result<()> {
    services.require_session()?;
    let draft = args.to_draft()?;
    let mut board = services.board();
    let created = board.create(draft).await;
    let task = services.check(created)?;
    writeln!(writer, "Created task {}: {}", task.id, task.title)?;
    Ok(())
}

async fn handle_edit<W: Write>(services: &Services, args: &EditArgs, mut writer: W) -> Result<()> {
    let patch = args.to_patch()?;
    if patch.is_empty() {
        bail!("Nothing to change: pass at least one field to edit");
    }
    let mut board = services.loaded_board().await?;
    let updated = board.update(&TaskId::from(args.id.trim()), &patch).await;
    let task = services.check(updated)?;
    writeln!(writer, "Updated task {}: {}", task.id, task.title)?;
    Ok(())
}

async fn handle_delete<W: Write>(
    services: &Services,
    args: &DeleteArgs,
    mut writer: W,
) -> Result<()> {
    let mut board = services.loaded_board().await?;
    let mut summary = DeleteSummary::default();
    for raw in &args.ids {
        let id = TaskId::from(raw.trim());
        if board.find(&id).is_none() {
            summary.missing.push(id.to_string());
            continue;
        }
        match board.delete(&id).await {
            Ok(()) => summary.deleted += 1,
            Err(TaskError::Request(RequestError::NotFound(id))) => {
                summary.missing.push(id.to_string())
            }
            Err(err) => {
                summary.write_to(&mut writer)?;
                return services.check(Err(err));
            }
        }
    }
    summary.write_to(&mut writer)
}

async fn handle_login<W: Write>(
    services: &Services,
    args: &CredentialArgs,
    mut writer: W,
) -> Result<()> {
    let session = services.auth.login(&Credentials::from(args)).await?;
    writeln!(writer, "Logged in as {} ({})", session.email, session.role)?;
    Ok(())
}

async fn handle_register<W: Write>(
    services: &Services,
    args: &CredentialArgs,
    mut writer: W,
) -> Result<()> {
    let credentials = Credentials::from(args);
    services.auth.register(&credentials).await?;
    writeln!(
        writer,
        "Registered {}. Run `taskdesk login` to sign in.",
        credentials.email
    )?;
    Ok(())
}

async fn handle_whoami<W: Write>(services: &Services, mut writer: W) -> Result<()> {
    let Some(session) = services.auth.context().current() else {
        writeln!(writer, "Not logged in")?;
        return Ok(());
    };
    let profile = services.auth.profile().await?;
    writeln!(writer, "{} <{}>", profile.full_name(), profile.email)?;
    writeln!(writer, "role: {}", session.role)?;
    Ok(())
}

async fn handle_users<W: Write>(services: &Services, mut writer: W) -> Result<()> {
    let users = match services.auth.admin_users().await {
        Ok(users) => users,
        Err(AuthError::NotLoggedIn) => bail!(NOT_LOGGED_IN),
        Err(err) => return Err(err.into()),
    };
    for user in &users {
        writeln!(
            writer,
            "{:>4}  {:<24} {}",
            user.id,
            user.full_name(),
            user.email
        )?;
    }
    writeln!(writer, "{}", CountLine::new(users.len(), "user"))?;
    Ok(())
}

struct ListReport {
    page: PagedResult,
    view: ViewState,
}

impl ListReport {
    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        if self.page.is_empty() {
            if self.view.search().is_empty() {
                writeln!(writer, "No tasks yet")?;
            } else {
                writeln!(writer, "No tasks match \"{}\"", self.view.search())?;
            }
            return Ok(());
        }

        for task in &self.page.items {
            writeln!(writer, "{}", format_row(task))?;
        }
        writeln!(
            writer,
            "Page {} of {} | {} | sorted by {} ({})",
            self.page.page,
            self.page.total_pages,
            CountLine::new(self.page.total_matches, "task"),
            self.view.sort_field().label(),
            self.view.direction().label().to_lowercase(),
        )?;
        Ok(())
    }
}

fn format_row(task: &Task) -> String {
    let due = task
        .due_date
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| String::from("-"));
    let mut row = format!(
        "{:<10} {:<11} {:<6} {:<10} {}",
        task.id.as_str(),
        task.status.as_str(),
        task.priority.as_str(),
        due,
        task.title
    );
    if let Some(assignee) = &task.assignee {
        row.push_str(&format!(" (@{})", assignee.display_name()));
    }
    row
}

#[derive(Default)]
struct DeleteSummary {
    deleted: usize,
    missing: Vec<String>,
}

impl DeleteSummary {
    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", SummaryLine::deleted(self.deleted))?;
        if !self.missing.is_empty() {
            writeln!(writer, "Not found: {}", self.missing.join(", "))?;
        }
        Ok(())
    }
}

enum SummaryLine {
    Deleted(usize),
    NoneDeleted,
}

impl SummaryLine {
    fn deleted(count: usize) -> Self {
        if count > 0 {
            SummaryLine::Deleted(count)
        } else {
            SummaryLine::NoneDeleted
        }
    }
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLine::Deleted(count) => write!(f, "Deleted {}", CountLine::new(*count, "task")),
            SummaryLine::NoneDeleted => write!(f, "No tasks deleted"),
        }
    }
}

struct CountLine {
    count: usize,
    noun: &'static str,
}

impl CountLine {
    fn new(count: usize, noun: &'static str) -> Self {
        Self { count, noun }
    }
}

impl fmt::Display for CountLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}",
            self.count,
            self.noun,
            if self.count == 1 { "" } else { "s" }
        )
    }
}
