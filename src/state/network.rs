use crate::state::messages::{CycleFailure, NetworkRequest, NetworkResponse};
use crate::state::scheduler::{CycleGate, CycleTicket, Settled};
use chrono::Local;
use esports_api::{ApiResult, Board, BoardOptions, BoardSource};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

type CycleDone = (CycleTicket, ApiResult<Board>);

/// Owns the poll cycles. Each cycle runs as its own task; a new request aborts
/// the one in flight and anything it still manages to report is dropped.
pub struct NetworkWorker {
    source: Arc<dyn BoardSource>,
    options: BoardOptions,
    upcoming_hours: u32,
    gate: CycleGate,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    is_loading: Arc<AtomicBool>,
}

impl NetworkWorker {
    pub fn new(
        source: Arc<dyn BoardSource>,
        options: BoardOptions,
        upcoming_hours: u32,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self {
            source,
            options,
            upcoming_hours,
            gate: CycleGate::new(),
            requests,
            responses,
            is_loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(mut self) {
        let (done_tx, mut done_rx) = mpsc::channel::<CycleDone>(8);

        loop {
            tokio::select! {
                request = self.requests.recv() => {
                    let Some(NetworkRequest::Refresh { manual }) = request else {
                        break;
                    };
                    if !self.start_cycle(manual, &done_tx).await {
                        break;
                    }
                }

                Some((ticket, outcome)) = done_rx.recv() => {
                    if !self.finish_cycle(ticket, outcome).await {
                        break;
                    }
                }
            }
        }

        if self.gate.is_fetching() {
            debug!("worker stopping with a cycle in flight");
        }
        self.gate.cancel_in_flight();
        self.is_loading.store(false, Ordering::Relaxed);
    }

    /// Returns false once the UI side has gone away.
    async fn start_cycle(&mut self, manual: bool, done: &mpsc::Sender<CycleDone>) -> bool {
        let ticket = match self.gate.begin(Instant::now()) {
            Ok(ticket) => ticket,
            Err(remaining) => {
                info!(
                    "rate-limit cooldown active, skipping {} refresh ({}s left)",
                    if manual { "manual" } else { "scheduled" },
                    remaining.as_secs()
                );
                return self
                    .responses
                    .send(NetworkResponse::CycleSkipped { remaining })
                    .await
                    .is_ok();
            }
        };

        debug!("starting {ticket:?} (manual: {manual})");
        self.start_loading_animation().await;

        let source = Arc::clone(&self.source);
        let options = self.options.clone();
        let hours = self.upcoming_hours;
        let done = done.clone();
        let handle = tokio::spawn(async move {
            let outcome = fetch_board(source.as_ref(), &options, hours).await;
            let _ = done.send((ticket, outcome)).await;
        });
        self.gate.track(ticket, handle.abort_handle());
        true
    }

    async fn finish_cycle(&mut self, ticket: CycleTicket, outcome: ApiResult<Board>) -> bool {
        let response = match self.gate.settle(ticket, outcome, Instant::now()) {
            Settled::Stale => {
                debug!("discarding stale result of {ticket:?}");
                return true;
            }
            Settled::Fresh(board) => {
                debug!(
                    "{ticket:?} loaded {} live / {} upcoming",
                    board.live.len(),
                    board.upcoming.len()
                );
                NetworkResponse::BoardLoaded { board, at: Local::now() }
            }
            Settled::RateLimited { until } => {
                warn!(
                    "upstream rate limited, pausing refreshes for {}s",
                    until.saturating_duration_since(Instant::now()).as_secs()
                );
                NetworkResponse::CycleFailed { failure: CycleFailure::RateLimited }
            }
            Settled::Failed(err) => {
                error!("refresh failed: {err}");
                NetworkResponse::CycleFailed { failure: CycleFailure::Error(err.to_string()) }
            }
        };

        let is_ok = matches!(response, NetworkResponse::BoardLoaded { .. });
        self.stop_loading_animation(is_ok).await;

        if let Err(e) = self.responses.send(response).await {
            error!("Failed to send network response: {e}");
            return false;
        }
        true
    }

    async fn start_loading_animation(&self) {
        // A superseding cycle keeps the spinner that is already running.
        if self.is_loading.swap(true, Ordering::Relaxed) {
            return;
        }

        let mut loading_state =
            LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                if responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}

/// One fetch pair. Both halves must succeed for the cycle to count. A rate
/// limit on either half wins over any other failure so the cooldown opens.
pub async fn fetch_board(
    source: &dyn BoardSource,
    options: &BoardOptions,
    upcoming_hours: u32,
) -> ApiResult<Board> {
    let (live, upcoming) = tokio::join!(source.fetch_live(), source.fetch_upcoming(upcoming_hours));
    match (live, upcoming) {
        (Ok(live), Ok(upcoming)) => Ok(Board::arrange(live, upcoming, options)),
        (Err(live), Err(upcoming)) if upcoming.is_rate_limited() && !live.is_rate_limited() => {
            debug!("live half also failed: {live}");
            Err(upcoming)
        }
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}
