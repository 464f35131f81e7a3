use crate::state::network::LoadingState;
use chrono::{DateTime, Local};
use crossterm::event::KeyEvent;
use esports_api::Board;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkRequest {
    /// Start a poll cycle, superseding any cycle still in flight.
    Refresh { manual: bool },
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    BoardLoaded { board: Board, at: DateTime<Local> },
    /// The previous board stays on screen; only the status line changes.
    CycleFailed { failure: CycleFailure },
    /// Skipped while the rate-limit cooldown is running.
    CycleSkipped { remaining: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleFailure {
    RateLimited,
    Error(String),
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
}
