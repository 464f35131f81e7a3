mod app;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::state::app_settings::{AppSettings, Command};
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use crate::state::refresher::PeriodicRefresher;
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use esports_api::{BoardApi, Normalizer};
use log::{LevelFilter, info};
use std::io::Stdout;
use std::sync::Arc;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc};
use tui::{Terminal, backend::CrosstermBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = match AppSettings::load() {
        Ok(Command::Run(settings)) => settings,
        Ok(Command::Help) => {
            println!("{}", usage_text());
            return Ok(());
        }
        Ok(Command::Version) => {
            println!("esports-board {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e:#}\n\n{}", usage_text());
            std::process::exit(2);
        }
    };

    better_panic::install();

    let level = settings.log_level.unwrap_or(LevelFilter::Info);
    tui_logger::init_logger(level)?;
    tui_logger::set_default_level(level);

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal()?;

    info!(
        "polling {} every {}s",
        settings.api_base,
        settings.refresh.as_secs()
    );

    let normalizer = Normalizer::default().with_live_predicate(settings.live_signal.predicate());
    let source = Arc::new(BoardApi::new(settings.api_base.clone()).with_normalizer(normalizer));
    let board_options = settings.board.clone();
    let upcoming_hours = settings.upcoming_hours;
    let refresh = settings.refresh;
    let app = Arc::new(Mutex::new(App::new(settings)));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Network thread
    let network_worker = NetworkWorker::new(
        source,
        board_options,
        upcoming_hours,
        network_req_rx,
        network_resp_tx,
    );
    let network_task = tokio::spawn(network_worker.run());

    // Periodic board refresh thread
    let periodic_updater = PeriodicRefresher::new(network_req_tx.clone(), refresh);
    let periodic_task = tokio::spawn(periodic_updater.run());

    // Initial cycle
    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    main_ui_loop(terminal, app, ui_event_rx, network_req_tx, network_resp_rx).await;

    input_handler.abort();
    network_task.abort();
    periodic_task.abort();
    cleanup_terminal();

    Ok(())
}

fn usage_text() -> &'static str {
    "esports-board - live and upcoming esports matches in the terminal

Usage:
  esports-board [options]

Options:
  --api <url>             Proxy base URL (default http://localhost:3000)
  --refresh <ms>          Poll interval in milliseconds (default 30000, min 8000)
  --team <name>           Pin live matches featuring this team to the top
  --limit-live <n>        Show at most n live matches (0 = all)
  --limit-upcoming <n>    Show at most n upcoming matches (0 = all)
  --hours <n>             Upcoming window in hours (default 24)
  --exclude <names>       Hide tournaments containing these names (comma separated)
  --game <title>          Only show this game, e.g. CS2 or \"Dota 2\" (default all)
  --live-signal <kind>    endpoint, status, streams or any (default endpoint)
  --log-level <level>     error, warn, info, debug or trace (default info)
  --full-screen           Start without the status bar
  -h, --help              Print this help
  -V, --version           Print the version

Environment:
  ESPORTS_BOARD_API, ESPORTS_BOARD_REFRESH, ESPORTS_BOARD_TEAM,
  ESPORTS_BOARD_LIMIT_LIVE, ESPORTS_BOARD_LIMIT_UPCOMING,
  ESPORTS_BOARD_HOURS, ESPORTS_BOARD_EXCLUDE, ESPORTS_BOARD_GAME,
  ESPORTS_BOARD_LIVE_SIGNAL
  Flags take precedence over the environment.

Keys:
  q quit  r refresh  tab/h/l switch list  j/k move  enter detail
  esc close  f full screen  \" logs"
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                handle_network_response(response, &app, &mut loading).await;
                let mut app_guard = app.lock().await;
                draw::draw(&mut terminal, &mut app_guard, loading);
            }

            else => break,
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) -> bool {
    match ui_event {
        UiEvent::AppStarted => {
            let _ = network_requests
                .send(NetworkRequest::Refresh { manual: false })
                .await;
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests).await;
            true
        }
        UiEvent::Resize => true,
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    loading: &mut LoadingState,
) {
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
        }
        NetworkResponse::BoardLoaded { board, at } => {
            app.lock().await.on_board_loaded(board, at);
        }
        NetworkResponse::CycleFailed { failure } => {
            app.lock().await.on_cycle_failed(failure);
        }
        NetworkResponse::CycleSkipped { remaining } => {
            app.lock().await.on_cycle_skipped(remaining);
        }
    }
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        if let Ok(event) = crossterm_event::read() {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide)?;
    execute!(stdout, terminal::EnterAlternateScreen)?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    terminal::enable_raw_mode()
}

pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
