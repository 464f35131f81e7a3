use crate::state::app_settings::AppSettings;
use crate::state::app_state::{AppState, StatusNote};
use crate::state::messages::CycleFailure;
use chrono::{DateTime, Local};
use esports_api::{Board, ListName, MatchRecord, Render};
use std::time::Duration;

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
}

impl Render for App {
    fn render(&mut self, list: ListName, records: &[MatchRecord], empty_message: &str) {
        self.state.pane_mut(list).replace(records, empty_message);
    }
}

impl App {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            state: AppState::new(),
            settings,
        }
    }

    // -----------------------------------------------------------------------
    // Network response handlers — called from main_ui_loop
    // -----------------------------------------------------------------------

    /// The only path that touches the rendered lists.
    pub fn on_board_loaded(&mut self, board: Board, at: DateTime<Local>) {
        for (list, records) in [(ListName::Live, &board.live), (ListName::Upcoming, &board.upcoming)] {
            self.render(list, records, list.empty_message());
        }
        self.state.status.last_updated = Some(at);
        self.state.status.note = None;
        self.state.status.cooldown = None;
        self.state.last_error = None;
    }

    /// Status only; whatever is on screen stays.
    pub fn on_cycle_failed(&mut self, failure: CycleFailure) {
        match failure {
            CycleFailure::RateLimited => {
                self.state.status.note = Some(StatusNote::RateLimited);
            }
            CycleFailure::Error(message) => {
                self.state.status.note = Some(StatusNote::Error);
                self.state.status.cooldown = None;
                self.state.last_error = Some(message);
            }
        }
    }

    pub fn on_cycle_skipped(&mut self, remaining: Duration) {
        self.state.status.note = Some(StatusNote::RateLimited);
        self.state.status.cooldown = Some(remaining);
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    pub fn focus(&mut self, list: ListName) {
        if self.state.focus != list {
            self.state.focus = list;
            self.state.show_detail = false;
        }
    }

    pub fn switch_focus(&mut self) {
        self.focus(self.state.focus.other());
    }

    pub fn select_next(&mut self) {
        self.state.focused_mut().select_next();
    }

    pub fn select_prev(&mut self) {
        self.state.focused_mut().select_prev();
    }

    pub fn selected_match(&self) -> Option<&MatchRecord> {
        self.state.focused().selected_record()
    }

    pub fn open_detail(&mut self) {
        self.state.show_detail = self.selected_match().is_some();
    }

    pub fn close_detail(&mut self) {
        self.state.show_detail = false;
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }
}
