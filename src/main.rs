mod ui;

use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crypto_guesser::config::Config;
use crypto_guesser::controller::{GameController, GameSession, Outcome};
use crypto_guesser::error::Result;
use crypto_guesser::service::HttpGameService;
use crypto_guesser::storage::FileStore;

use crate::ui::Action;

/// Redraw cadence while idle; also bounds key-press latency.
const FRAME_INTERVAL_MS: u64 = 100;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    // The terminal owns stdout, so logs go to a file.
    let log_file = match OpenOptions::new().create(true).append(true).open(&cfg.log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Cannot open log file {}: {e}", cfg.log_file);
            std::process::exit(1);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        eprintln!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let service = Arc::new(HttpGameService::from_config(&cfg)?);
    let store = Arc::new(FileStore::open(&cfg.store_path)?);
    info!(
        api_url = %cfg.api_url,
        store = %store.path().display(),
        poll_secs = cfg.poll_interval.as_secs(),
        "Starting Crypto Guesser",
    );

    let controller = GameController::new(service, store);

    // Initial fetch before rendering
    controller.initialize().await;
    let session = GameSession::start(controller, cfg.poll_interval);

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, session.controller()).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    session.shutdown().await;
    result.map_err(Into::into)
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &GameController,
) -> io::Result<()> {
    let frame_interval = Duration::from_millis(FRAME_INTERVAL_MS);

    loop {
        let state = controller.snapshot();
        terminal.draw(|f| ui::render(f, &state))?;

        if !event::poll(frame_interval)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match ui::action_for(key.code, state.started) {
            Some(Action::Quit) => return Ok(()),
            Some(Action::Start) if state.loading => {}
            Some(action) => dispatch(controller, action),
            None => {}
        }
    }
}

/// Runs network-bound actions on their own task so drawing never waits on them.
fn dispatch(controller: &GameController, action: Action) {
    let ctl = controller.clone();
    match action {
        Action::Start => {
            tokio::spawn(async move {
                // A reset clears the cached quote; reload it on (re)start.
                if ctl.create_player().await != Outcome::Failed {
                    ctl.tick().await;
                }
            });
        }
        Action::Guess(direction) => {
            tokio::spawn(async move {
                ctl.submit_guess(direction).await;
            });
        }
        Action::Refresh => {
            tokio::spawn(async move {
                ctl.tick().await;
            });
        }
        Action::Reset => ctl.reset_game(),
        Action::DismissError => ctl.dismiss_error(),
        Action::Quit => {}
    }
}
