use std::cmp::min;

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use crate::core::mutation::MutationPhase;
use crate::core::services::LoadState;
use crate::core::session::Role;
use crate::core::view::SortDirection;
use crate::tui::constants::APP_VERSION;
use crate::model::RequiredFields;
use crate::tui::form::{FormField, FormMode};
use crate::tui::helpers::{
    accent_title, build_help_lines, centered_rect, format_due, priority_style, short_id,
    status_style, BG_ACCENT, BG_BASE, BG_PANEL,
};

use super::{App, ConfirmChoice, InputMode};

impl App {
    pub(crate) fn draw(&mut self, f: &mut Frame<'_>) {
        let size = f.size();
        f.render_widget(Clear, size);
        f.render_widget(Block::default().style(Style::default().bg(BG_BASE)), size);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(2),
            ])
            .split(size);

        self.draw_header(f, chunks[0]);
        self.draw_toolbar(f, chunks[1]);
        self.draw_tasks(f, chunks[2]);
        self.draw_footer(f, chunks[3]);

        match self.input_mode {
            InputMode::Form => self.draw_form_overlay(f, size),
            InputMode::Help => self.draw_help_overlay(f, size),
            InputMode::ConfirmDelete => self.draw_confirm_overlay(f, size),
            InputMode::Normal | InputMode::Search => {}
        }
    }

    fn draw_header(&self, f: &mut Frame<'_>, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(area);

        let role_style = match self.session.role {
            Role::Admin => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            Role::Member => Style::default().fg(Color::Gray),
        };
        let left = Line::from(vec![
            Span::styled(
                format!(" taskdesk v{} ", APP_VERSION),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("| {} ", self.session.email)),
            Span::styled(format!("[{}]", self.session.role), role_style),
        ]);
        f.render_widget(
            Paragraph::new(left).style(Style::default().bg(BG_BASE)),
            cols[0],
        );

        let (label, style) = self.connection_label();
        let right = Paragraph::new(Line::from(vec![Span::styled(label, style)]))
            .alignment(Alignment::Right)
            .style(Style::default().bg(BG_BASE));
        f.render_widget(right, cols[1]);
    }

    fn connection_label(&self) -> (String, Style) {
        if self.signed_out {
            return (
                String::from("signed out "),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            );
        }
        if let MutationPhase::Pending { kind, .. } = self.board.phase() {
            return (
                format!("{kind} in progress… "),
                Style::default().fg(Color::Yellow),
            );
        }
        match self.board.load_state() {
            LoadState::Idle => (String::from("idle "), Style::default().fg(Color::DarkGray)),
            LoadState::Loading => (String::from("loading… "), Style::default().fg(Color::Yellow)),
            LoadState::Ready => (
                format!("{} tasks ", self.board.tasks().len()),
                Style::default().fg(Color::DarkGray),
            ),
            LoadState::Failed(_) => (String::from("offline "), Style::default().fg(Color::Red)),
        }
    }

    fn draw_toolbar(&self, f: &mut Frame<'_>, area: Rect) {
        let view = self.board.view_state();
        let page = self.board.view();
        let searching = self.input_mode == InputMode::Search;

        let search_text = if searching {
            self.search.as_str().to_string()
        } else if view.search().is_empty() {
            String::from("(none)")
        } else {
            view.search().to_string()
        };
        let search_style = if searching {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let label_style = Style::default().fg(Color::DarkGray);

        let line = Line::from(vec![
            Span::styled("Search: ", label_style),
            Span::styled(search_text, search_style),
            Span::styled("   Sort: ", label_style),
            Span::raw(format!(
                "{} {}",
                view.sort_field().label(),
                match view.direction() {
                    SortDirection::Ascending => "↑",
                    SortDirection::Descending => "↓",
                }
            )),
            Span::styled("   Per page: ", label_style),
            Span::raw(view.page_size().to_string()),
            Span::raw("   "),
            Span::raw(format!(
                "Page {} of {} ({} matching)",
                page.page, page.total_pages, page.total_matches
            )),
        ]);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(accent_title("View"))
            .border_style(Style::default().fg(if searching {
                Color::Yellow
            } else {
                Color::DarkGray
            }))
            .style(Style::default().bg(BG_PANEL));
        let inner = block.inner(area);
        f.render_widget(block, area);
        f.render_widget(Paragraph::new(line), inner);

        if searching {
            let prefix = "Search: ".chars().count() as u16;
            let column = self.search.cursor_column() as u16;
            let x = inner.x.saturating_add(prefix).saturating_add(column);
            if x < inner.x + inner.width {
                f.set_cursor(x, inner.y);
            }
        }
    }

    fn draw_tasks(&mut self, f: &mut Frame<'_>, area: Rect) {
        let page = self.board.view();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(accent_title("Tasks"))
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(BG_PANEL));

        if page.items.is_empty() {
            let inner = block.inner(area);
            f.render_widget(block, area);
            if inner.width == 0 || inner.height == 0 {
                return;
            }
            let lines = self.empty_state_lines();
            let height = (lines.len() as u16).saturating_add(2).min(inner.height);
            let content_area = centered_rect(inner.width.min(80), height, inner);
            let paragraph = Paragraph::new(lines)
                .wrap(Wrap { trim: true })
                .alignment(Alignment::Center)
                .style(Style::default().bg(BG_PANEL));
            f.render_widget(paragraph, content_area);
            return;
        }

        let header = Row::new(vec![
            Cell::from("Title"),
            Cell::from("Description"),
            Cell::from("Status"),
            Cell::from("Due"),
            Cell::from("Priority"),
            Cell::from("Assignee"),
        ])
        .style(Style::default().add_modifier(Modifier::BOLD));

        let rows: Vec<Row> = page
            .items
            .iter()
            .map(|task| {
                let assignee = task
                    .assignee
                    .as_ref()
                    .map(|a| a.display_name().to_string())
                    .unwrap_or_default();
                Row::new(vec![
                    Cell::from(task.title.clone()),
                    Cell::from(task.description.clone()),
                    Cell::from(Span::styled(task.status.as_str(), status_style(task.status))),
                    Cell::from(format_due(task.due_date)),
                    Cell::from(Span::styled(
                        task.priority.as_str(),
                        priority_style(task.priority),
                    )),
                    Cell::from(assignee),
                ])
            })
            .collect();

        let widths = [
            Constraint::Percentage(28),
            Constraint::Percentage(32),
            Constraint::Length(12),
            Constraint::Length(11),
            Constraint::Length(9),
            Constraint::Percentage(16),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .bg(BG_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");

        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn empty_state_lines(&self) -> Vec<Line<'static>> {
        let heading_style = Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD);
        let hint_style = Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::BOLD);

        let (heading, hints): (String, Vec<&'static str>) = match self.board.load_state() {
            LoadState::Idle | LoadState::Loading => (String::from("Loading tasks…"), Vec::new()),
            LoadState::Failed(message) => (
                format!("Could not reach the task server: {message}"),
                vec!["Press 'r' to try again."],
            ),
            LoadState::Ready if !self.board.view_state().search().is_empty() => (
                format!("No tasks match \"{}\"", self.board.view_state().search()),
                vec!["Press '/' to change the search or 'R' to reset the view."],
            ),
            LoadState::Ready => (
                String::from("No tasks yet"),
                vec!["Press 'a' to create one.", "Press 'h' for every shortcut."],
            ),
        };

        let mut lines = vec![Line::from(Span::styled(heading, heading_style))];
        if !hints.is_empty() {
            lines.push(Line::default());
        }
        for hint in hints {
            lines.push(Line::from(Span::styled(hint, hint_style)));
        }
        lines
    }

    fn draw_footer(&self, f: &mut Frame<'_>, area: Rect) {
        let lines = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.style())])
        } else {
            Line::from(vec![Span::raw("Ready")])
        };
        f.render_widget(Paragraph::new(status_line), lines[0]);

        let help = match self.input_mode {
            InputMode::Normal => {
                "j/k move | [/] page | / search | s sort | o order | p page size | R reset | a add | e edit | x delete | r reload | h help | q quit"
            }
            InputMode::Search => "type to filter | Enter keep | Esc clear",
            InputMode::Form => "Tab/↑/↓ field | ←/→ change choice | Enter save | Esc cancel",
            InputMode::ConfirmDelete => "←/→ choose | y/n | Enter confirm | Esc cancel",
            InputMode::Help => "Enter/Esc to close",
        };
        let help_line = Line::from(vec![Span::styled(
            help,
            Style::default().fg(Color::DarkGray),
        )]);
        f.render_widget(Paragraph::new(help_line), lines[1]);
    }

    fn draw_form_overlay(&self, f: &mut Frame<'_>, area: Rect) {
        let Some(form) = &self.form else {
            return;
        };
        let width = min(area.width.saturating_sub(10), 72);
        let height = FormField::ALL.len() as u16 + 4;
        let popup = centered_rect(width, height, area);
        f.render_widget(Clear, popup);

        let title = match form.mode() {
            FormMode::Create => String::from("New Task"),
            FormMode::Edit(id) => format!("Edit Task {}", short_id(id.as_str(), 8)),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(accent_title(&title))
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(BG_PANEL));
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        let required = self.board.required_fields();
        let label_width = 18usize;
        let mut lines = Vec::new();
        for field in FormField::ALL {
            let focused = field == form.focus();
            let marker = if is_required(field, required) { "*" } else { " " };
            let label = format!(
                "{:<width$}",
                format!("{}{}", field.label(), marker),
                width = label_width
            );
            let value = if field.is_choice() {
                format!("◀ {} ▶", form.value(field))
            } else {
                form.value(field)
            };
            let label_style = if focused {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let value_style = if focused {
                Style::default().bg(BG_ACCENT).fg(Color::White)
            } else {
                Style::default().fg(Color::White)
            };
            lines.push(Line::from(vec![
                Span::styled(label, label_style),
                Span::styled(value, value_style),
            ]));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "* required",
            Style::default().fg(Color::DarkGray),
        )));
        f.render_widget(Paragraph::new(lines), inner);

        if let Some(column) = form.cursor_column() {
            let row = FormField::ALL
                .iter()
                .position(|field| *field == form.focus())
                .unwrap_or(0) as u16;
            let x = inner
                .x
                .saturating_add(label_width as u16)
                .saturating_add(column as u16);
            if x < inner.x + inner.width && row < inner.height {
                f.set_cursor(x, inner.y + row);
            }
        }
    }

    fn draw_help_overlay(&self, f: &mut Frame<'_>, area: Rect) {
        let entries = build_help_lines();
        let width = min(area.width.saturating_sub(10), 64);
        let popup = centered_rect(width, entries.len() as u16 + 2, area);
        f.render_widget(Clear, popup);

        let lines: Vec<Line> = entries
            .into_iter()
            .map(|(keys, description)| {
                Line::from(vec![
                    Span::styled(
                        format!("{:<18}", keys),
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(description),
                ])
            })
            .collect();

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(accent_title("Keyboard"))
                .border_style(Style::default().fg(Color::DarkGray))
                .style(Style::default().bg(BG_PANEL)),
        );
        f.render_widget(paragraph, popup);
    }

    fn draw_confirm_overlay(&self, f: &mut Frame<'_>, area: Rect) {
        let Some(task) = &self.delete_target else {
            return;
        };
        let width = min(area.width.saturating_sub(10), 60);
        let popup = centered_rect(width, 7, area);
        f.render_widget(Clear, popup);

        let choice_style = |choice: ConfirmChoice| {
            if self.confirm_choice == choice {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            }
        };

        let lines = vec![
            Line::from(vec![
                Span::raw("Delete "),
                Span::styled(
                    format!("\"{}\"", task.title),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("?"),
            ]),
            Line::from(Span::styled(
                "It is removed once the server confirms.",
                Style::default().fg(Color::DarkGray),
            )),
            Line::default(),
            Line::from(vec![
                Span::styled("  Yes  ", choice_style(ConfirmChoice::Yes)),
                Span::raw("   "),
                Span::styled("  No  ", choice_style(ConfirmChoice::No)),
            ]),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(accent_title("Confirm"))
                    .border_style(Style::default().fg(Color::Red))
                    .style(Style::default().bg(BG_PANEL)),
            );
        f.render_widget(paragraph, popup);
    }
}

fn is_required(field: FormField, required: &RequiredFields) -> bool {
    match field {
        FormField::Title => required.title,
        FormField::Description => required.description,
        FormField::DueDate => required.due_date,
        FormField::Assignee => required.assignee,
        FormField::Status | FormField::Priority => false,
    }
}
