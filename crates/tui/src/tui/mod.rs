use std::io::{self, Stdout};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::runtime::Handle;

use crate::commands::NOT_LOGGED_IN;
use crate::config::AppConfig;
use crate::core::directory::DirectoryClient;
use crate::core::remote::{HttpTaskSource, TaskSource};
use crate::core::services::{AuthService, TaskBoard};
use crate::core::session::{SessionContext, SessionStore};
use crate::model::RequiredFields;

mod app;
mod buffer;
mod constants;
mod form;
mod helpers;
mod message;

use app::App;
use constants::TICK_RATE;
use message::{Effect, Message};

type Backend = CrosstermBackend<Stdout>;

pub fn run(config: AppConfig) -> Result<()> {
    let context = SessionContext::anonymous();
    let directory = DirectoryClient::new(&config)?;
    let auth = AuthService::new(
        Arc::new(directory),
        SessionStore::for_config(&config),
        context.clone(),
    );
    let Some(session) = auth.restore()? else {
        bail!(NOT_LOGGED_IN);
    };

    // Everything that can fail happens before the terminal is touched.
    let source: Arc<dyn TaskSource> = Arc::new(HttpTaskSource::new(&config, context)?);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let board = TaskBoard::new(source, RequiredFields::default());
    tracing::info!(email = %session.email, role = %session.role, "starting terminal UI");

    let mut stdout = io::stdout();
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to initialize terminal")?;
    terminal.hide_cursor().context("failed to hide cursor")?;

    let mut app = App::new(board, auth, session);
    app.start();
    let result = run_app(&mut terminal, &mut app, runtime.handle());

    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    // In-flight requests are abandoned; their results have nowhere to go.
    runtime.shutdown_background();
    tracing::info!("terminal UI closed");

    result
}

fn run_app(terminal: &mut Terminal<Backend>, app: &mut App, handle: &Handle) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| app.draw(f))?;
        if app.should_quit() {
            break;
        }

        for effect in app.drain_effects() {
            dispatch(handle, app.source(), effect, tx.clone());
        }
        drain_messages(app, &rx)?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_secs(0));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key)?,
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.on_tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

fn dispatch(handle: &Handle, source: Arc<dyn TaskSource>, effect: Effect, tx: Sender<Message>) {
    handle.spawn(async move {
        let message = match effect {
            Effect::Fetch(ticket) => Message::Fetched(ticket, source.list().await),
            Effect::Send(pending) => {
                let result = pending.request().send(source.as_ref()).await;
                Message::Settled(pending, result)
            }
        };
        if tx.send(message).is_err() {
            tracing::debug!("UI closed before a request finished");
        }
    });
}

fn drain_messages(app: &mut App, rx: &Receiver<Message>) -> Result<()> {
    while let Ok(message) = rx.try_recv() {
        app.on_message(message)?;
    }
    Ok(())
}
