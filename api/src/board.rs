//! Turning a normalized batch into the two display lists.

use crate::MatchRecord;
use log::debug;
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardOptions {
    /// Team-name substring pinned to the top of the live list.
    pub pin: Option<String>,
    pub limit_live: Option<usize>,
    pub limit_upcoming: Option<usize>,
    /// Tournament-name substrings to hide (test brackets and the like).
    pub exclude: Vec<String>,
    /// Only this videogame; `None` shows every game.
    pub game: Option<String>,
}

impl BoardOptions {
    fn is_pinned(&self, record: &MatchRecord) -> bool {
        self.pin
            .as_deref()
            .is_some_and(|pin| record.features_team(pin))
    }

    fn is_excluded(&self, record: &MatchRecord) -> bool {
        if let Some(game) = self.game.as_deref()
            && !record.is_game(game)
        {
            return true;
        }
        let Some(tournament) = record.tournament.as_deref() else {
            return false;
        };
        let tournament = tournament.to_lowercase();
        self.exclude
            .iter()
            .map(|e| e.trim().to_lowercase())
            .any(|e| !e.is_empty() && tournament.contains(&e))
    }
}

/// Both display lists from one poll cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    pub live: Vec<MatchRecord>,
    pub upcoming: Vec<MatchRecord>,
}

impl Board {
    pub fn arrange(live: Vec<MatchRecord>, upcoming: Vec<MatchRecord>, options: &BoardOptions) -> Self {
        Self {
            live: arrange_live(live, options),
            upcoming: arrange_upcoming(upcoming, options),
        }
    }
}

/// Pinned matches first, then soonest start.
pub fn arrange_live(records: Vec<MatchRecord>, options: &BoardOptions) -> Vec<MatchRecord> {
    let mut records = prepare(records, options);
    records.sort_by(|a, b| {
        options
            .is_pinned(b)
            .cmp(&options.is_pinned(a))
            .then_with(|| by_start_time(a, b))
    });
    truncate(records, options.limit_live)
}

/// Soonest start first.
pub fn arrange_upcoming(records: Vec<MatchRecord>, options: &BoardOptions) -> Vec<MatchRecord> {
    let mut records = prepare(records, options);
    records.sort_by(by_start_time);
    truncate(records, options.limit_upcoming)
}

/// Drops other games, excluded tournaments and repeated ids; the first occurrence of an id wins.
fn prepare(records: Vec<MatchRecord>, options: &BoardOptions) -> Vec<MatchRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| !options.is_excluded(r))
        .filter(|r| {
            let fresh = seen.insert(r.id.clone());
            if !fresh {
                debug!("dropping duplicate match id {} in batch", r.id);
            }
            fresh
        })
        .collect()
}

/// Untimed records go last. `sort_by` is stable, so ties keep upstream order.
fn by_start_time(a: &MatchRecord, b: &MatchRecord) -> Ordering {
    match (a.start_time, b.start_time) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn truncate(mut records: Vec<MatchRecord>, limit: Option<usize>) -> Vec<MatchRecord> {
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    records
}
