pub mod board;
pub mod client;
pub mod normalize;

pub use board::{Board, BoardOptions, arrange_live, arrange_upcoming};
pub use client::{ApiError, ApiResult, BoardApi, BoardSource};
pub use normalize::{FieldMap, LivePredicate, LiveSignal, Normalizer};

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Domain types — clean model, independent of the upstream wire shape
// ---------------------------------------------------------------------------

/// Shown in place of a missing team name.
pub const TBD: &str = "TBD";

/// Shown in place of a missing tournament name.
pub const NO_EVENT: &str = "—";

/// One scheduled or in-progress series, rebuilt from upstream JSON on every poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub id: String,
    /// True when `id` was generated locally. Such ids change on every refresh
    /// and are only good as a render key for the current pass.
    pub synthetic_id: bool,
    pub tournament: Option<String>,
    /// Videogame title as sent upstream ("CS2", "Dota 2").
    pub game: Option<String>,
    pub format: String, // "BO3"
    pub start_time: Option<DateTime<Utc>>,
    pub live: bool,
    pub teams: [TeamRef; 2],
    pub scores: Option<ScorePair>,
}

impl MatchRecord {
    pub fn event_label(&self) -> &str {
        self.tournament.as_deref().unwrap_or(NO_EVENT)
    }

    pub fn home(&self) -> &TeamRef {
        &self.teams[0]
    }

    pub fn away(&self) -> &TeamRef {
        &self.teams[1]
    }

    /// Loose title comparison: case and punctuation are ignored, so "dota-2"
    /// matches "DOTA 2".
    pub fn is_game(&self, wanted: &str) -> bool {
        let wanted = game_key(wanted);
        !wanted.is_empty() && self.game.as_deref().is_some_and(|g| game_key(g) == wanted)
    }

    /// Case-insensitive substring match against either team name.
    pub fn features_team(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.teams
            .iter()
            .any(|t| t.name.to_lowercase().contains(&needle))
    }
}

fn game_key(title: &str) -> String {
    title
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRef {
    pub name: String,
    pub logo_url: Option<String>, // None = render layer draws a placeholder
    pub score: u32,
    pub winner: bool,
}

impl TeamRef {
    pub fn tbd() -> Self {
        Self {
            name: TBD.to_string(),
            logo_url: None,
            score: 0,
            winner: false,
        }
    }

    /// Scores of zero are not shown.
    pub fn display_score(&self) -> Option<u32> {
        (self.score > 0).then_some(self.score)
    }
}

impl Default for TeamRef {
    fn default() -> Self {
        Self::tbd()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScorePair {
    pub home: u32,
    pub away: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ListName {
    #[default]
    Live,
    Upcoming,
}

impl ListName {
    pub fn other(&self) -> Self {
        match self {
            ListName::Live => ListName::Upcoming,
            ListName::Upcoming => ListName::Live,
        }
    }

    pub fn empty_message(&self) -> &'static str {
        match self {
            ListName::Live => "No live matches right now.",
            ListName::Upcoming => "Nothing scheduled in this window.",
        }
    }
}

/// Consumer of arranged lists. Implemented by whatever draws the board.
pub trait Render {
    fn render(&mut self, list: ListName, records: &[MatchRecord], empty_message: &str);
}
