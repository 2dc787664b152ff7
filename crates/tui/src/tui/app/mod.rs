use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use ratatui::style::{Color, Style};
use ratatui::widgets::TableState;

use super::buffer::TextBuffer;
use super::constants::*;
use super::form::{FormMode, TaskForm};
use super::message::{Effect, Message};
use crate::core::error::{RequestError, TaskError};
use crate::core::mutation::{MutationKind, MutationOutcome, PendingMutation, RemoteAck};
use crate::core::remote::TaskSource;
use crate::core::services::{AuthService, FetchTicket, RefreshOutcome, TaskBoard};
use crate::core::session::Session;
use crate::model::Task;

mod input;
mod render;
#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    Form,
    ConfirmDelete,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfirmChoice {
    Yes,
    No,
}

impl ConfirmChoice {
    fn toggle(self) -> Self {
        match self {
            ConfirmChoice::Yes => ConfirmChoice::No,
            ConfirmChoice::No => ConfirmChoice::Yes,
        }
    }
}

#[derive(Debug, Clone)]
struct StatusMessage {
    text: String,
    kind: StatusKind,
    created_at: Instant,
}

impl StatusMessage {
    fn new<T: Into<String>>(text: T, kind: StatusKind) -> Self {
        Self {
            text: text.into(),
            kind,
            created_at: Instant::now(),
        }
    }

    fn style(&self) -> Style {
        match self.kind {
            StatusKind::Info => Style::default().fg(Color::Cyan),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Info,
    Error,
}

/// Interactive state around one [`TaskBoard`]. Remote work is queued as
/// [`Effect`]s and its results come back through [`App::on_message`], so the
/// board is only ever touched from the UI loop.
pub(crate) struct App {
    board: TaskBoard,
    auth: AuthService,
    session: Session,
    signed_out: bool,
    selected: usize,
    table_state: TableState,
    input_mode: InputMode,
    search: TextBuffer,
    form: Option<TaskForm>,
    delete_target: Option<Task>,
    confirm_choice: ConfirmChoice,
    status: Option<StatusMessage>,
    effects: Vec<Effect>,
    should_quit: bool,
}

impl App {
    pub(crate) fn new(board: TaskBoard, auth: AuthService, session: Session) -> Self {
        Self {
            board,
            auth,
            session,
            signed_out: false,
            selected: 0,
            table_state: TableState::default(),
            input_mode: InputMode::Normal,
            search: TextBuffer::new(),
            form: None,
            delete_target: None,
            confirm_choice: ConfirmChoice::No,
            status: None,
            effects: Vec::new(),
            should_quit: false,
        }
    }

    pub(crate) fn start(&mut self) {
        self.refresh();
    }

    pub(crate) fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub(crate) fn on_tick(&mut self) {
        if let Some(status) = &self.status {
            if status.created_at.elapsed() > STATUS_TTL {
                self.status = None;
            }
        }
    }

    pub(crate) fn source(&self) -> Arc<dyn TaskSource> {
        self.board.source()
    }

    pub(crate) fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub(crate) fn on_message(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Fetched(ticket, result) => self.handle_fetched(ticket, result)?,
            Message::Settled(pending, result) => self.handle_settled(pending, result)?,
        }
        self.sync_selection();
        Ok(())
    }

    fn handle_fetched(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Task>, RequestError>,
    ) -> Result<()> {
        match self.board.complete_refresh(ticket, result) {
            RefreshOutcome::Applied { count, duplicates } if duplicates > 0 => self
                .set_status_info(format!(
                    "Loaded {count} tasks ({duplicates} duplicate ids ignored)"
                )),
            RefreshOutcome::Applied { count, .. } => {
                self.set_status_info(format!("Loaded {count} tasks"))
            }
            RefreshOutcome::Stale => {}
            RefreshOutcome::Failed(err) if err.is_unauthorized() => self.expire_session()?,
            RefreshOutcome::Failed(err) => {
                self.set_status_error(format!("Failed to load tasks: {err}"))
            }
        }
        Ok(())
    }

    fn handle_settled(
        &mut self,
        pending: PendingMutation,
        result: Result<RemoteAck, RequestError>,
    ) -> Result<()> {
        let kind = pending.kind();
        match self.board.settle(pending, result) {
            Ok(MutationOutcome::Created(task)) => {
                self.set_status_info(format!("Created \"{}\"", task.title))
            }
            Ok(MutationOutcome::Updated(task)) => {
                self.set_status_info(format!("Saved \"{}\"", task.title))
            }
            Ok(MutationOutcome::Deleted(id)) => self.set_status_info(format!("Deleted task {id}")),
            Err(err) if err.is_unauthorized() => self.expire_session()?,
            Err(err) => self.report_failure(kind, &err),
        }
        self.board.acknowledge();
        Ok(())
    }

    fn report_failure(&mut self, kind: MutationKind, err: &TaskError) {
        let message = match kind {
            MutationKind::Create => format!("Could not create task: {err}"),
            MutationKind::Update => format!("Update failed, changes reverted: {err}"),
            MutationKind::Delete => format!("Could not delete task: {err}"),
        };
        self.set_status_error(message);
    }

    fn expire_session(&mut self) -> Result<()> {
        self.auth.expire_session()?;
        self.signed_out = true;
        self.set_status_error(STATUS_SIGNED_OUT);
        Ok(())
    }

    /// Whether a new remote call may start now.
    fn can_reach_server(&mut self) -> bool {
        if self.signed_out {
            self.set_status_error(STATUS_SIGNED_OUT);
            return false;
        }
        true
    }

    fn ensure_idle(&mut self) -> bool {
        if !self.can_reach_server() {
            return false;
        }
        if self.board.is_busy() {
            self.set_status_info(STATUS_BUSY);
            return false;
        }
        true
    }

    fn refresh(&mut self) {
        if !self.can_reach_server() {
            return;
        }
        let ticket = self.board.begin_refresh();
        self.effects.push(Effect::Fetch(ticket));
        self.set_status_info(STATUS_LOADING);
    }

    fn page_items(&self) -> Vec<Task> {
        self.board.view().items
    }

    fn selected_task(&self) -> Option<Task> {
        self.page_items().into_iter().nth(self.selected)
    }

    fn sync_selection(&mut self) {
        let len = self.page_items().len();
        if len == 0 {
            self.selected = 0;
            self.table_state.select(None);
        } else {
            self.selected = self.selected.min(len - 1);
            self.table_state.select(Some(self.selected));
        }
    }

    /// The visible rows changed wholesale (new page, sort or search).
    fn view_changed(&mut self) {
        self.selected = 0;
        self.sync_selection();
    }

    fn select_next(&mut self) {
        self.selected = self.selected.saturating_add(1);
        self.sync_selection();
    }

    fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.sync_selection();
    }

    fn select_last(&mut self) {
        self.selected = usize::MAX;
        self.sync_selection();
    }

    fn apply_search(&mut self) {
        self.board.set_search(self.search.as_str());
        self.view_changed();
    }

    fn open_create_form(&mut self) {
        if !self.ensure_idle() {
            return;
        }
        self.form = Some(TaskForm::create());
        self.input_mode = InputMode::Form;
        self.set_status_info(STATUS_CREATE);
    }

    fn open_edit_form(&mut self) {
        if !self.ensure_idle() {
            return;
        }
        let Some(task) = self.selected_task() else {
            self.set_status_info("Nothing to edit");
            return;
        };
        self.form = Some(TaskForm::edit(&task));
        self.input_mode = InputMode::Form;
        self.set_status_info(STATUS_EDIT);
    }

    fn cancel_form(&mut self) {
        self.form = None;
        self.input_mode = InputMode::Normal;
        self.status = None;
    }

    fn submit_form(&mut self) {
        let Some(form) = self.form.clone() else {
            self.input_mode = InputMode::Normal;
            return;
        };
        if !self.ensure_idle() {
            return;
        }

        let begun = match form.mode() {
            FormMode::Create => match form.to_draft() {
                Ok(draft) => self.board.begin_create(draft),
                Err(err) => {
                    self.set_status_error(err.to_string());
                    return;
                }
            },
            FormMode::Edit(id) => match form.to_patch() {
                Ok(patch) => self.board.begin_update(id, &patch),
                Err(err) => {
                    self.set_status_error(err.to_string());
                    return;
                }
            },
        };

        match begun {
            Ok(pending) => {
                let verb = match pending.kind() {
                    MutationKind::Create => "Creating task…",
                    _ => "Saving changes…",
                };
                self.effects.push(Effect::Send(pending));
                self.form = None;
                self.input_mode = InputMode::Normal;
                self.set_status_info(verb);
                self.sync_selection();
            }
            Err(err) => self.set_status_error(err.to_string()),
        }
    }

    fn prompt_delete(&mut self) {
        if !self.ensure_idle() {
            return;
        }
        let Some(task) = self.selected_task() else {
            self.set_status_info("Nothing to delete");
            return;
        };
        self.delete_target = Some(task);
        self.confirm_choice = ConfirmChoice::No;
        self.input_mode = InputMode::ConfirmDelete;
        self.set_status_info(STATUS_CONFIRM_DELETE);
    }

    fn cancel_delete(&mut self) {
        self.delete_target = None;
        self.input_mode = InputMode::Normal;
        self.set_status_info("Deletion cancelled");
    }

    fn perform_delete(&mut self) {
        self.input_mode = InputMode::Normal;
        let Some(task) = self.delete_target.take() else {
            return;
        };
        if !self.ensure_idle() {
            return;
        }
        match self.board.begin_delete(&task.id) {
            Ok(pending) => {
                self.effects.push(Effect::Send(pending));
                self.set_status_info(format!("Deleting \"{}\"…", task.title));
            }
            Err(err) => self.set_status_error(err.to_string()),
        }
    }

    fn reset_view(&mut self) {
        self.search.clear();
        self.board.reset_view();
        self.view_changed();
        self.set_status_info(STATUS_RESET);
    }

    fn show_help_overlay(&mut self) {
        self.input_mode = InputMode::Help;
        self.set_status_info(STATUS_HELP);
    }

    pub(crate) fn set_status_info<T: Into<String>>(&mut self, message: T) {
        self.status = Some(StatusMessage::new(message, StatusKind::Info));
    }

    pub(crate) fn set_status_error<T: Into<String>>(&mut self, message: T) {
        self.status = Some(StatusMessage::new(message, StatusKind::Error));
    }
}
