use std::sync::Arc;

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pretty_assertions::assert_eq;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use tempfile::TempDir;

use super::{App, InputMode, StatusKind};
use crate::core::error::RequestError;
use crate::core::mutation::RemoteAck;
use crate::core::services::TaskBoard;
use crate::core::view::{PageSize, SortField};
use crate::model::{RequiredFields, Task, TaskId};
use crate::testing::{signed_in, task, MemorySource};
use crate::tui::constants::{STATUS_BUSY, STATUS_SIGNED_OUT};
use crate::tui::helpers::{centered_rect, format_due, short_id};
use crate::tui::message::{Effect, Message};

#[test]
fn centered_rect_keeps_within_bounds() {
    let area = Rect {
        x: 0,
        y: 0,
        width: 80,
        height: 24,
    };
    let rect = centered_rect(40, 10, area);
    assert_eq!(rect, Rect::new(20, 7, 40, 10));

    let clipped = centered_rect(200, 50, area);
    assert_eq!(clipped, area);
}

#[test]
fn short_id_truncates_long_ids() {
    assert_eq!(short_id("abc", 8), "abc");
    assert_eq!(short_id("65f1a2b3c4d5e6f7", 8), "65f1a2b3");
}

#[test]
fn due_dates_render_iso_or_dash() {
    assert_eq!(format_due(NaiveDate::from_ymd_opt(2025, 1, 9)), "2025-01-09");
    assert_eq!(format_due(None), "-");
}

struct Harness {
    app: App,
    source: Arc<MemorySource>,
    dir: TempDir,
}

fn harness(tasks: Vec<Task>) -> Harness {
    let dir = TempDir::new().unwrap();
    let (auth, session) = signed_in(dir.path(), 4, "eve.holt@reqres.in");
    let source = Arc::new(MemorySource::new(tasks));
    let board = TaskBoard::new(source.clone(), RequiredFields::default());
    Harness {
        app: App::new(board, auth, session),
        source,
        dir,
    }
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn press(app: &mut App, code: KeyCode) {
    app.on_key(key(code)).unwrap();
}

fn type_text(app: &mut App, text: &str) {
    for ch in text.chars() {
        press(app, KeyCode::Char(ch));
    }
}

fn numbered(count: usize) -> Vec<Task> {
    (1..=count)
        .map(|n| task(&n.to_string(), &format!("Task {n:02}")))
        .collect()
}

fn three_tasks() -> Vec<Task> {
    vec![task("1", "Alpha"), task("2", "Beta"), task("3", "Gamma")]
}

/// Start the app and answer its first fetch with whatever the source holds.
fn loaded(harness: &mut Harness) {
    harness.app.start();
    let effects = harness.app.drain_effects();
    let [Effect::Fetch(ticket)] = effects.as_slice() else {
        panic!("expected a single fetch, got {effects:?}");
    };
    let tasks = harness.source.tasks();
    harness
        .app
        .on_message(Message::Fetched(*ticket, Ok(tasks)))
        .unwrap();
}

fn single_send(app: &mut App) -> crate::core::mutation::PendingMutation {
    let mut effects = app.drain_effects();
    assert_eq!(effects.len(), 1);
    match effects.remove(0) {
        Effect::Send(pending) => pending,
        other => panic!("expected a send, got {other:?}"),
    }
}

fn status_text(app: &App) -> String {
    app.status
        .as_ref()
        .map(|status| status.text.clone())
        .unwrap_or_default()
}

#[test]
fn start_queues_a_fetch_and_applies_the_result() {
    let mut h = harness(three_tasks());
    loaded(&mut h);

    assert_eq!(h.app.board.tasks().len(), 3);
    assert_eq!(status_text(&h.app), "Loaded 3 tasks");
    assert_eq!(h.app.table_state.selected(), Some(0));
    assert_eq!(h.app.selected_task().unwrap().title, "Alpha");
}

#[test]
fn stale_fetch_results_are_ignored() {
    let mut h = harness(three_tasks());
    h.app.start();
    let first = h.app.drain_effects();
    press(&mut h.app, KeyCode::Char('r'));
    let second = h.app.drain_effects();

    let (Effect::Fetch(old), Effect::Fetch(new)) = (&first[0], &second[0]) else {
        panic!("expected two fetches");
    };
    h.app
        .on_message(Message::Fetched(*old, Ok(vec![task("9", "Old")])))
        .unwrap();
    assert!(h.app.board.tasks().is_empty());

    h.app
        .on_message(Message::Fetched(*new, Ok(h.source.tasks())))
        .unwrap();
    assert_eq!(h.app.board.tasks().len(), 3);
}

#[test]
fn paging_keys_move_and_view_changes_reset_to_first_page() {
    let mut h = harness(numbered(30));
    loaded(&mut h);

    press(&mut h.app, KeyCode::Char(']'));
    assert_eq!(h.app.board.view().page, 2);
    assert_eq!(h.app.selected_task().unwrap().title, "Task 11");

    press(&mut h.app, KeyCode::Char(']'));
    press(&mut h.app, KeyCode::Char(']'));
    assert_eq!(h.app.board.view().page, 3);

    press(&mut h.app, KeyCode::Char('p'));
    assert_eq!(h.app.board.view_state().page_size(), PageSize::TwentyFive);
    assert_eq!(h.app.board.view().page, 1);

    press(&mut h.app, KeyCode::Char(']'));
    press(&mut h.app, KeyCode::Char('s'));
    assert_eq!(h.app.board.view_state().sort_field(), SortField::Priority);
    assert_eq!(h.app.board.view().page, 1);
}

#[test]
fn search_filters_live_and_escape_clears() {
    let mut h = harness(numbered(12));
    loaded(&mut h);
    press(&mut h.app, KeyCode::Char(']'));

    press(&mut h.app, KeyCode::Char('/'));
    assert_eq!(h.app.input_mode, InputMode::Search);
    type_text(&mut h.app, "task 1");

    let view = h.app.board.view();
    assert_eq!(view.page, 1);
    assert_eq!(view.total_matches, 3);

    press(&mut h.app, KeyCode::Esc);
    assert_eq!(h.app.input_mode, InputMode::Normal);
    assert_eq!(h.app.board.view_state().search(), "");
    assert_eq!(h.app.board.view().total_matches, 12);
}

#[test]
fn search_term_is_matched_with_its_spaces() {
    let mut h = harness(vec![task("1", "Alpha"), task("2", "Beta release")]);
    loaded(&mut h);

    press(&mut h.app, KeyCode::Char('/'));
    type_text(&mut h.app, " ");

    assert_eq!(h.app.board.view_state().search(), " ");
    let view = h.app.board.view();
    assert_eq!(view.total_matches, 1);
    assert_eq!(view.items[0].title, "Beta release");
}

#[test]
fn failed_edit_is_rolled_back_with_an_error() {
    let mut h = harness(three_tasks());
    loaded(&mut h);

    press(&mut h.app, KeyCode::Char('e'));
    assert_eq!(h.app.input_mode, InputMode::Form);
    press(&mut h.app, KeyCode::End);
    type_text(&mut h.app, " v2");
    press(&mut h.app, KeyCode::Enter);

    let id = TaskId::from("1");
    assert_eq!(h.app.board.find(&id).unwrap().title, "Alpha v2");
    let pending = single_send(&mut h.app);

    h.app
        .on_message(Message::Settled(
            pending,
            Err(RequestError::Network("connection reset".into())),
        ))
        .unwrap();

    assert_eq!(h.app.board.find(&id).unwrap().title, "Alpha");
    let status = h.app.status.as_ref().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.text.starts_with("Update failed, changes reverted"));
    assert!(!h.app.board.is_busy());
}

#[test]
fn create_with_blank_title_never_reaches_the_server() {
    let mut h = harness(three_tasks());
    loaded(&mut h);

    press(&mut h.app, KeyCode::Char('a'));
    press(&mut h.app, KeyCode::Tab);
    type_text(&mut h.app, "body only");
    press(&mut h.app, KeyCode::Enter);

    assert!(h.app.drain_effects().is_empty());
    assert_eq!(h.app.input_mode, InputMode::Form);
    assert_eq!(status_text(&h.app), "title is required");
}

#[test]
fn delete_waits_for_the_server() {
    let mut h = harness(three_tasks());
    loaded(&mut h);

    press(&mut h.app, KeyCode::Char('x'));
    assert_eq!(h.app.input_mode, InputMode::ConfirmDelete);
    press(&mut h.app, KeyCode::Char('y'));

    let pending = single_send(&mut h.app);
    assert_eq!(h.app.board.tasks().len(), 3);

    h.app
        .on_message(Message::Settled(pending, Ok(RemoteAck::Deleted)))
        .unwrap();
    assert_eq!(h.app.board.tasks().len(), 2);
    assert!(h.app.board.find(&TaskId::from("1")).is_none());
    assert_eq!(status_text(&h.app), "Deleted task 1");
}

#[test]
fn enter_on_default_choice_cancels_delete() {
    let mut h = harness(three_tasks());
    loaded(&mut h);

    press(&mut h.app, KeyCode::Char('x'));
    press(&mut h.app, KeyCode::Enter);

    assert!(h.app.drain_effects().is_empty());
    assert_eq!(h.app.input_mode, InputMode::Normal);
    assert_eq!(h.app.board.tasks().len(), 3);
}

#[test]
fn no_second_mutation_while_one_is_pending() {
    let mut h = harness(three_tasks());
    loaded(&mut h);

    press(&mut h.app, KeyCode::Char('e'));
    press(&mut h.app, KeyCode::Enter);
    let _pending = single_send(&mut h.app);

    press(&mut h.app, KeyCode::Char('a'));
    assert!(h.app.form.is_none());
    assert_eq!(status_text(&h.app), STATUS_BUSY);

    press(&mut h.app, KeyCode::Char('x'));
    assert_eq!(h.app.input_mode, InputMode::Normal);
    assert!(h.app.drain_effects().is_empty());
}

#[test]
fn unauthorized_fetch_signs_the_user_out() {
    let mut h = harness(three_tasks());
    h.app.start();
    let effects = h.app.drain_effects();
    let Effect::Fetch(ticket) = effects[0] else {
        panic!("expected a fetch");
    };

    h.app
        .on_message(Message::Fetched(ticket, Err(RequestError::Unauthorized)))
        .unwrap();

    assert!(h.app.signed_out);
    assert!(!h.dir.path().join("session.json").exists());
    assert_eq!(status_text(&h.app), STATUS_SIGNED_OUT);

    press(&mut h.app, KeyCode::Char('r'));
    assert!(h.app.drain_effects().is_empty());
}

#[test]
fn quit_keys_stop_the_loop() {
    let mut h = harness(Vec::new());
    h.app
        .on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
        .unwrap();
    assert!(h.app.should_quit());
}

fn rendered(app: &mut App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(110, 24)).unwrap();
    terminal.draw(|f| app.draw(f)).unwrap();
    let buffer = terminal.backend().buffer();
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer.get(x, y).symbol());
        }
        text.push('\n');
    }
    text
}

#[test]
fn table_shows_tasks_and_paging_summary() {
    let mut h = harness(three_tasks());
    loaded(&mut h);

    let screen = rendered(&mut h.app);
    assert!(screen.contains("eve.holt@reqres.in"));
    assert!(screen.contains("Alpha"));
    assert!(screen.contains("Gamma"));
    assert!(screen.contains("Page 1 of 1 (3 matching)"));
}

#[test]
fn empty_search_explains_itself() {
    let mut h = harness(three_tasks());
    loaded(&mut h);
    press(&mut h.app, KeyCode::Char('/'));
    type_text(&mut h.app, "zzz");
    press(&mut h.app, KeyCode::Enter);

    let screen = rendered(&mut h.app);
    assert!(screen.contains("No tasks match \"zzz\""));
}
