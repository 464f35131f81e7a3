use chrono::{DateTime, Local};
use esports_api::{ListName, MatchRecord};
use std::time::Duration;

/// Shown in a pane that has never received a successful cycle.
pub const LOAD_FAILED: &str = "Couldn’t load matches.";

// ---------------------------------------------------------------------------
// One list on screen
// ---------------------------------------------------------------------------

/// Last-good contents of one list. Only a fresh cycle writes here.
#[derive(Debug, Default)]
pub struct Pane {
    pub records: Vec<MatchRecord>,
    pub empty_message: String,
    pub selected: usize,
    /// False until the first successful cycle.
    pub loaded: bool,
}

impl Pane {
    pub fn replace(&mut self, records: &[MatchRecord], empty_message: &str) {
        // Keep the cursor on the same match if it survived the refresh.
        // Synthetic ids are regenerated each cycle, so they can't be followed.
        let previous = self
            .selected_record()
            .filter(|r| !r.synthetic_id)
            .map(|r| r.id.clone());

        self.records = records.to_vec();
        self.empty_message = empty_message.to_string();
        self.loaded = true;

        self.selected = previous
            .and_then(|id| self.records.iter().position(|r| r.id == id))
            .unwrap_or(self.selected)
            .min(self.records.len().saturating_sub(1));
    }

    pub fn selected_record(&self) -> Option<&MatchRecord> {
        self.records.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.records.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// What to show instead of cards, if anything.
    pub fn placeholder(&self, failed: bool) -> Option<&str> {
        if !self.loaded {
            return Some(if failed { LOAD_FAILED } else { "Loading…" });
        }
        self.records
            .is_empty()
            .then_some(self.empty_message.as_str())
    }
}

// ---------------------------------------------------------------------------
// Status indicator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusNote {
    Error,
    RateLimited,
}

#[derive(Debug, Default)]
pub struct StatusLine {
    /// Time of the last successful cycle.
    pub last_updated: Option<DateTime<Local>>,
    /// Why the most recent cycle did not render, cleared by the next success.
    pub note: Option<StatusNote>,
    pub cooldown: Option<Duration>,
}

impl StatusLine {
    pub fn text(&self) -> String {
        let mut text = match self.last_updated {
            Some(at) => format!("updated {}", at.format("%H:%M:%S")),
            None => "not updated yet".to_string(),
        };
        match self.note {
            Some(StatusNote::Error) => text.push_str(" (error)"),
            Some(StatusNote::RateLimited) => text.push_str(" (rate-limited)"),
            None => {}
        }
        if let Some(remaining) = self.cooldown {
            text.push_str(&format!(" · retry in {}s", remaining.as_secs().max(1)));
        }
        text
    }

    pub fn is_degraded(&self) -> bool {
        self.note.is_some()
    }
}

// ---------------------------------------------------------------------------
// Root app state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AppState {
    pub focus: ListName,
    pub live: Pane,
    pub upcoming: Pane,
    pub status: StatusLine,
    pub show_logs: bool,
    pub show_detail: bool,
    pub last_error: Option<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pane(&self, list: ListName) -> &Pane {
        match list {
            ListName::Live => &self.live,
            ListName::Upcoming => &self.upcoming,
        }
    }

    pub fn pane_mut(&mut self, list: ListName) -> &mut Pane {
        match list {
            ListName::Live => &mut self.live,
            ListName::Upcoming => &mut self.upcoming,
        }
    }

    pub fn focused(&self) -> &Pane {
        self.pane(self.focus)
    }

    pub fn focused_mut(&mut self) -> &mut Pane {
        self.pane_mut(self.focus)
    }

    /// A failure before anything was ever loaded.
    pub fn never_loaded_and_failed(&self) -> bool {
        self.status.last_updated.is_none() && self.status.is_degraded()
    }
}
