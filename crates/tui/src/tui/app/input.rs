use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::constants::STATUS_SEARCH;

use super::{App, ConfirmChoice, InputMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NormalAction {
    Quit,
    SelectNext,
    SelectPrev,
    SelectFirst,
    SelectLast,
    PrevPage,
    NextPage,
    Search,
    CycleSort,
    ToggleDirection,
    CyclePageSize,
    ResetView,
    Create,
    Edit,
    Delete,
    Refresh,
    ShowHelp,
}

impl NormalAction {
    fn from_event(key: &KeyEvent) -> Option<Self> {
        if matches!(key.code, KeyCode::Char('c')) && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Self::Quit);
        }

        match key.code {
            KeyCode::Char('q') => Some(Self::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Self::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Self::SelectPrev),
            KeyCode::Char('g') | KeyCode::Home => Some(Self::SelectFirst),
            KeyCode::Char('G') | KeyCode::End => Some(Self::SelectLast),
            KeyCode::Char('[') | KeyCode::Left | KeyCode::PageUp => Some(Self::PrevPage),
            KeyCode::Char(']') | KeyCode::Right | KeyCode::PageDown => Some(Self::NextPage),
            KeyCode::Char('/') => Some(Self::Search),
            KeyCode::Char('s') => Some(Self::CycleSort),
            KeyCode::Char('o') => Some(Self::ToggleDirection),
            KeyCode::Char('p') => Some(Self::CyclePageSize),
            KeyCode::Char('R') => Some(Self::ResetView),
            KeyCode::Char('a') => Some(Self::Create),
            KeyCode::Char('e') | KeyCode::Enter => Some(Self::Edit),
            KeyCode::Char('x') | KeyCode::Delete => Some(Self::Delete),
            KeyCode::Char('r') => Some(Self::Refresh),
            KeyCode::Char('h') | KeyCode::Char('?') => Some(Self::ShowHelp),
            _ => None,
        }
    }
}

impl App {
    pub(crate) fn on_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_mode(key),
            InputMode::Search => self.handle_search_mode(key),
            InputMode::Form => self.handle_form_mode(key),
            InputMode::ConfirmDelete => self.handle_confirm_delete_mode(key),
            InputMode::Help => self.handle_help_mode(key),
        }
        Ok(())
    }

    fn handle_normal_mode(&mut self, key: KeyEvent) {
        if let Some(action) = NormalAction::from_event(&key) {
            self.execute_normal_action(action);
        }
    }

    fn execute_normal_action(&mut self, action: NormalAction) {
        match action {
            NormalAction::Quit => self.should_quit = true,
            NormalAction::SelectNext => self.select_next(),
            NormalAction::SelectPrev => self.select_prev(),
            NormalAction::SelectFirst => self.view_changed(),
            NormalAction::SelectLast => self.select_last(),
            NormalAction::PrevPage => {
                self.board.prev_page();
                self.view_changed();
            }
            NormalAction::NextPage => {
                self.board.next_page();
                self.view_changed();
            }
            NormalAction::Search => {
                self.search.set(self.board.view_state().search().to_string());
                self.input_mode = InputMode::Search;
                self.set_status_info(STATUS_SEARCH);
            }
            NormalAction::CycleSort => {
                let field = self.board.view_state().sort_field().next();
                self.board.set_sort_field(field);
                self.view_changed();
                self.set_status_info(format!("Sorted by {}", field.label()));
            }
            NormalAction::ToggleDirection => {
                self.board.toggle_direction();
                self.view_changed();
                let direction = self.board.view_state().direction();
                self.set_status_info(format!("Order: {}", direction.label()));
            }
            NormalAction::CyclePageSize => {
                let size = self.board.view_state().page_size().next();
                self.board.set_page_size(size);
                self.view_changed();
                self.set_status_info(format!("Showing {size} per page"));
            }
            NormalAction::ResetView => self.reset_view(),
            NormalAction::Create => self.open_create_form(),
            NormalAction::Edit => self.open_edit_form(),
            NormalAction::Delete => self.prompt_delete(),
            NormalAction::Refresh => self.refresh(),
            NormalAction::ShowHelp => self.show_help_overlay(),
        }
    }

    fn handle_search_mode(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.search.clear();
                self.apply_search();
                self.input_mode = InputMode::Normal;
                self.status = None;
                return;
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.status = None;
                return;
            }
            KeyCode::Backspace => self.search.backspace(),
            KeyCode::Delete => self.search.delete_char(),
            KeyCode::Left => self.search.move_left(),
            KeyCode::Right => self.search.move_right(),
            KeyCode::Home => self.search.move_home(),
            KeyCode::End => self.search.move_end(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search.insert_char(ch)
            }
            _ => return,
        }
        if self.search.as_str() != self.board.view_state().search() {
            self.apply_search();
        }
    }

    fn handle_form_mode(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => return self.cancel_form(),
            KeyCode::Enter => return self.submit_form(),
            _ => {}
        }
        let Some(form) = self.form.as_mut() else {
            self.input_mode = InputMode::Normal;
            return;
        };

        match key.code {
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
            _ if form.focus().is_choice() => match key.code {
                KeyCode::Left => form.cycle(false),
                KeyCode::Right | KeyCode::Char(' ') => form.cycle(true),
                _ => {}
            },
            code => {
                if let Some(buffer) = form.focused_buffer() {
                    match code {
                        KeyCode::Backspace => buffer.backspace(),
                        KeyCode::Delete => buffer.delete_char(),
                        KeyCode::Left => buffer.move_left(),
                        KeyCode::Right => buffer.move_right(),
                        KeyCode::Home => buffer.move_home(),
                        KeyCode::End => buffer.move_end(),
                        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                            buffer.insert_char(ch)
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn handle_confirm_delete_mode(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab | KeyCode::Char(' ') => {
                self.confirm_choice = self.confirm_choice.toggle();
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.confirm_choice = ConfirmChoice::Yes;
                self.perform_delete();
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.cancel_delete(),
            KeyCode::Enter => match self.confirm_choice {
                ConfirmChoice::Yes => self.perform_delete(),
                ConfirmChoice::No => self.cancel_delete(),
            },
            _ => {}
        }
    }

    fn handle_help_mode(&mut self, key: KeyEvent) {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('h') | KeyCode::Char('?') | KeyCode::Char('q')
        ) {
            self.input_mode = InputMode::Normal;
            self.status = None;
        }
    }
}
