//! Upstream match JSON → [`MatchRecord`].
//!
//! The proxy has served several shapes over time (GRID series, PandaScore
//! matches, ad hoc flattened objects). Each output field is resolved by walking
//! an ordered list of dotted paths and taking the first usable value. The lists
//! live in [`FieldMap`] so they can be tested and extended without touching the
//! resolution code.

use crate::{MatchRecord, ScorePair, TBD, TeamRef};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::debug;
use serde_json::Value;
use uuid::Uuid;

/// Best-of count assumed when the record carries no format information at all.
pub const DEFAULT_BEST_OF: u32 = 3;

const TEAMS_KEY: &str = "teams";
const OPPONENTS_KEY: &str = "opponents";
const OPPONENT_KEY: &str = "opponent";
const RESULTS_KEY: &str = "results";
const WINNER_ID_KEY: &str = "winner_id";

/// Decides whether a record is live. Receives the raw record and whether it
/// came from the live endpoint.
pub type LivePredicate = fn(&Value, bool) -> bool;

/// Trust the endpoint the record was fetched from.
pub fn live_from_endpoint(_raw: &Value, from_live_endpoint: bool) -> bool {
    from_live_endpoint
}

/// `live: true`, or a `status` of running / live / in progress.
pub fn live_from_status(raw: &Value, _from_live_endpoint: bool) -> bool {
    if raw.get("live").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    raw.get("status")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase().replace([' ', '-'], "_"))
        .is_some_and(|s| matches!(s.as_str(), "running" | "live" | "in_progress" | "started"))
}

/// A non-empty `streams` array.
pub fn live_from_streams(raw: &Value, _from_live_endpoint: bool) -> bool {
    raw.get("streams")
        .and_then(Value::as_array)
        .is_some_and(|s| !s.is_empty())
}

/// Any of the above.
pub fn live_any_signal(raw: &Value, from_live_endpoint: bool) -> bool {
    live_from_endpoint(raw, from_live_endpoint)
        || live_from_status(raw, from_live_endpoint)
        || live_from_streams(raw, from_live_endpoint)
}

/// The stock live predicates by name, for configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LiveSignal {
    #[default]
    Endpoint,
    Status,
    Streams,
    Any,
}

impl LiveSignal {
    pub const NAMES: [&'static str; 4] = ["endpoint", "status", "streams", "any"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "endpoint" => Some(LiveSignal::Endpoint),
            "status" => Some(LiveSignal::Status),
            "streams" => Some(LiveSignal::Streams),
            "any" => Some(LiveSignal::Any),
            _ => None,
        }
    }

    pub fn predicate(self) -> LivePredicate {
        match self {
            LiveSignal::Endpoint => live_from_endpoint,
            LiveSignal::Status => live_from_status,
            LiveSignal::Streams => live_from_streams,
            LiveSignal::Any => live_any_signal,
        }
    }
}

/// Ordered lookup paths per output field. Paths are dotted object keys,
/// resolved against the match object (or a team entry for the `team_*` lists).
#[derive(Debug, Clone)]
pub struct FieldMap {
    pub id: Vec<&'static str>,
    pub start_time: Vec<&'static str>,
    pub tournament: Vec<&'static str>,
    pub game: Vec<&'static str>,
    pub format_label: Vec<&'static str>,
    pub best_of: Vec<&'static str>,
    pub team_name: Vec<&'static str>,
    pub team_logo: Vec<&'static str>,
    pub team_score: Vec<&'static str>,
    pub team_winner: Vec<&'static str>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            id: vec!["id", "seriesId"],
            start_time: vec![
                "time",
                "startTimeScheduled",
                "startTime",
                "start",
                "scheduled_at",
                "begin_at",
            ],
            tournament: vec![
                "tournament.name",
                "tournament.nameShortened",
                "event.name",
                "tournamentName",
                "league.name",
                "serie.name",
            ],
            game: vec!["videogame.name", "game", "gameType", "videogame", "title.nameShortened", "title.name"],
            format_label: vec!["format.nameShortened", "format.name", "format", "formatShort"],
            best_of: vec!["format.id", "bestOf", "number_of_games"],
            team_name: vec!["name", "baseInfo.name"],
            team_logo: vec!["logoUrl", "baseInfo.logoUrl", "image_url"],
            team_score: vec!["score", "scoreAdvantage", "seriesScore"],
            team_winner: vec!["winner", "won"],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    fields: FieldMap,
    live: LivePredicate,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            fields: FieldMap::default(),
            live: live_from_endpoint,
        }
    }
}

impl Normalizer {
    pub fn new(fields: FieldMap, live: LivePredicate) -> Self {
        Self { fields, live }
    }

    pub fn with_live_predicate(mut self, live: LivePredicate) -> Self {
        self.live = live;
        self
    }

    /// Normalize every usable record in `items`, preserving upstream order.
    pub fn normalize_batch(&self, items: &[Value], from_live_endpoint: bool) -> Vec<MatchRecord> {
        let records: Vec<MatchRecord> = items
            .iter()
            .filter_map(|raw| self.normalize(raw, from_live_endpoint))
            .collect();
        if records.len() < items.len() {
            debug!(
                "dropped {} of {} upstream records without id or start time",
                items.len() - records.len(),
                items.len()
            );
        }
        records
    }

    /// Returns `None` for non-objects and for records with neither an id nor a
    /// start time, since those can be neither keyed nor sorted.
    pub fn normalize(&self, raw: &Value, from_live_endpoint: bool) -> Option<MatchRecord> {
        if !raw.is_object() {
            return None;
        }

        let id = first(raw, &self.fields.id, identifier);
        let start_time = first(raw, &self.fields.start_time, timestamp);
        if id.is_none() && start_time.is_none() {
            return None;
        }

        let (id, synthetic_id) = match id {
            Some(id) => (id, false),
            None => (Uuid::new_v4().to_string(), true),
        };

        let teams = self.teams(raw);
        let scores = teams
            .iter()
            .any(|t| t.score > 0)
            .then(|| ScorePair { home: teams[0].score, away: teams[1].score });

        Some(MatchRecord {
            id,
            synthetic_id,
            tournament: first(raw, &self.fields.tournament, label),
            game: first(raw, &self.fields.game, label),
            format: self.format_label(raw),
            start_time,
            live: (self.live)(raw, from_live_endpoint),
            teams,
            scores,
        })
    }

    fn format_label(&self, raw: &Value) -> String {
        if let Some(label) = first(raw, &self.fields.format_label, label) {
            return label;
        }
        let n = first(raw, &self.fields.best_of, count)
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_BEST_OF);
        format!("BO{n}")
    }

    fn teams(&self, raw: &Value) -> [TeamRef; 2] {
        let mut resolved: Vec<TeamRef> = Vec::with_capacity(2);

        if let Some(entries) = raw.get(TEAMS_KEY).and_then(Value::as_array) {
            resolved.extend(entries.iter().take(2).map(|e| self.team(e, None, None)));
        } else if let Some(opponents) = raw.get(OPPONENTS_KEY).and_then(Value::as_array) {
            // PandaScore: team under `opponent`, score in the parallel `results`
            // array, winner either there or as a match-level `winner_id`.
            let results = raw.get(RESULTS_KEY).and_then(Value::as_array);
            let winner_id = raw.get(WINNER_ID_KEY).and_then(identifier);
            resolved.extend(opponents.iter().take(2).enumerate().map(|(i, entry)| {
                let team = entry.get(OPPONENT_KEY).unwrap_or(entry);
                let result = results.and_then(|r| r.get(i));
                let score = result.and_then(|r| r.get("score")).and_then(count);
                let winner = result
                    .and_then(|r| r.get("winner"))
                    .and_then(Value::as_bool)
                    .or_else(|| {
                        let id = team.get("id").and_then(identifier)?;
                        Some(winner_id.as_deref() == Some(id.as_str()))
                    });
                self.team(team, score, winner)
            }));
        }

        let mut resolved = resolved.into_iter();
        [
            resolved.next().unwrap_or_default(),
            resolved.next().unwrap_or_default(),
        ]
    }

    fn team(&self, entry: &Value, score: Option<u32>, winner: Option<bool>) -> TeamRef {
        // Some endpoints send bare team names.
        if let Some(name) = entry.as_str() {
            let name = name.trim();
            return TeamRef {
                name: if name.is_empty() { TBD.to_string() } else { name.to_string() },
                ..TeamRef::tbd()
            };
        }

        TeamRef {
            name: first(entry, &self.fields.team_name, label).unwrap_or_else(|| TBD.to_string()),
            logo_url: first(entry, &self.fields.team_logo, label),
            score: score
                .or_else(|| first(entry, &self.fields.team_score, count))
                .unwrap_or(0),
            winner: winner
                .or_else(|| first(entry, &self.fields.team_winner, Value::as_bool))
                .unwrap_or(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Accessor strategies
// ---------------------------------------------------------------------------

fn lookup<'a>(raw: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(raw, |node, key| node.get(key))
}

/// First path whose value the strategy accepts.
fn first<T>(raw: &Value, paths: &[&str], strategy: fn(&Value) -> Option<T>) -> Option<T> {
    paths
        .iter()
        .filter_map(|path| lookup(raw, path))
        .find_map(strategy)
}

/// Non-blank string, trimmed.
fn label(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Non-blank string or integer.
fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => label(value),
    }
}

/// RFC 3339, an offset-less ISO timestamp (read as UTC) or epoch milliseconds.
fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// Any numeric value, clamped to a non-negative integer.
fn count(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n.is_nan() {
        return None;
    }
    Some(n.max(0.0).min(f64::from(u32::MAX)).floor() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(raw: Value) -> Option<MatchRecord> {
        Normalizer::default().normalize(&raw, false)
    }

    #[test]
    fn missing_teams_yield_two_tbd_entries() {
        let record = normalize(json!({ "id": "s-1", "time": "2024-05-01T10:00:00Z" })).unwrap();
        for team in &record.teams {
            assert_eq!(team.name, "TBD");
            assert_eq!(team.score, 0);
            assert_eq!(team.display_score(), None);
        }
        assert!(record.scores.is_none());
    }

    #[test]
    fn numeric_format_id_becomes_best_of_label() {
        for n in [1, 3, 5, 7] {
            let record = normalize(json!({ "id": "x", "format": { "id": n } })).unwrap();
            assert_eq!(record.format, format!("BO{n}"));
        }
    }

    #[test]
    fn format_falls_back_to_bo3() {
        let record = normalize(json!({ "id": "x" })).unwrap();
        assert_eq!(record.format, "BO3");

        let record = normalize(json!({ "id": "x", "format": { "id": 0 } })).unwrap();
        assert_eq!(record.format, "BO3");
    }

    #[test]
    fn shortened_format_name_wins_over_numeric_id() {
        let record = normalize(json!({
            "id": "x",
            "format": { "id": 5, "name": "best-of-5", "nameShortened": "Bo5" }
        }))
        .unwrap();
        assert_eq!(record.format, "Bo5");

        let record = normalize(json!({ "id": "x", "bestOf": 2 })).unwrap();
        assert_eq!(record.format, "BO2");
    }

    #[test]
    fn record_without_id_or_time_is_dropped() {
        assert!(normalize(json!({ "teams": [{ "name": "A" }, { "name": "B" }] })).is_none());
        assert!(normalize(json!({ "id": "", "time": "not a date" })).is_none());
        assert!(normalize(json!("just a string")).is_none());
    }

    #[test]
    fn record_without_id_gets_synthetic_key() {
        let raw = json!({ "startTime": "2024-05-01T10:00:00Z" });
        let a = normalize(raw.clone()).unwrap();
        let b = normalize(raw).unwrap();
        assert!(a.synthetic_id);
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id, "synthetic ids are not stable across passes");
    }

    #[test]
    fn id_resolution_order() {
        let record = normalize(json!({ "seriesId": 2817, "time": 0 })).unwrap();
        assert_eq!(record.id, "2817");
        assert!(!record.synthetic_id);

        let record = normalize(json!({ "id": "  ", "seriesId": "s-9" })).unwrap();
        assert_eq!(record.id, "s-9");
    }

    #[test]
    fn start_time_resolution_order() {
        let record = normalize(json!({
            "id": "x",
            "startTimeScheduled": "2024-05-01T10:00:00Z",
            "startTime": "2024-05-02T10:00:00Z",
        }))
        .unwrap();
        assert_eq!(
            record.start_time,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );

        // Unparseable values fall through to the next candidate.
        let record = normalize(json!({
            "id": "x",
            "time": "soon",
            "start": 1_714_557_600_000_i64,
        }))
        .unwrap();
        assert_eq!(
            record.start_time,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn tournament_resolution_order() {
        let record = normalize(json!({
            "id": "x",
            "tournament": { "nameShortened": "IEM" },
            "event": { "name": "Intel Extreme Masters" },
        }))
        .unwrap();
        assert_eq!(record.tournament.as_deref(), Some("IEM"));

        let record = normalize(json!({ "id": "x", "tournamentName": "BLAST" })).unwrap();
        assert_eq!(record.event_label(), "BLAST");

        let record = normalize(json!({ "id": "x" })).unwrap();
        assert_eq!(record.event_label(), "—");
    }

    #[test]
    fn team_fields_resolve_through_base_info() {
        let record = normalize(json!({
            "id": "x",
            "teams": [
                { "baseInfo": { "name": "Vitality", "logoUrl": "https://cdn/vit.png" }, "scoreAdvantage": 1 },
                { "name": "NAVI", "baseInfo": { "name": "Natus Vincere" }, "seriesScore": "2" },
            ]
        }))
        .unwrap();
        assert_eq!(record.home().name, "Vitality");
        assert_eq!(record.home().logo_url.as_deref(), Some("https://cdn/vit.png"));
        assert_eq!(record.home().score, 1);
        assert_eq!(record.away().name, "NAVI");
        assert_eq!(record.away().logo_url, None);
        assert_eq!(record.away().score, 2);
        assert_eq!(record.scores, Some(ScorePair { home: 1, away: 2 }));
    }

    #[test]
    fn scores_are_coerced_to_non_negative_integers() {
        let record = normalize(json!({
            "id": "x",
            "teams": [{ "name": "A", "score": -4 }, { "name": "B", "score": "n/a", "seriesScore": 1.7 }]
        }))
        .unwrap();
        assert_eq!(record.home().score, 0);
        assert_eq!(record.away().score, 1);
    }

    #[test]
    fn single_team_and_bare_names_are_padded() {
        let record = normalize(json!({ "id": "x", "teams": ["G2"] })).unwrap();
        assert_eq!(record.home().name, "G2");
        assert_eq!(record.away().name, "TBD");
    }

    #[test]
    fn pandascore_shape_is_understood() {
        let record = normalize(json!({
            "id": 991,
            "scheduled_at": "2024-06-01T18:00:00Z",
            "league": { "name": "ESL Pro League" },
            "videogame": { "id": 3, "name": "CS2", "slug": "cs-2" },
            "number_of_games": 3,
            "winner_id": 1,
            "opponents": [
                { "opponent": { "id": 1, "name": "FaZe", "image_url": "https://cdn/faze.png" } },
                { "opponent": { "id": 2, "name": "MOUZ" } }
            ],
            "results": [{ "score": 2, "team_id": 1 }, { "score": 0, "team_id": 2 }]
        }))
        .unwrap();
        assert_eq!(record.id, "991");
        assert_eq!(record.tournament.as_deref(), Some("ESL Pro League"));
        assert_eq!(record.format, "BO3");
        assert_eq!(record.home().name, "FaZe");
        assert_eq!(record.home().logo_url.as_deref(), Some("https://cdn/faze.png"));
        assert_eq!(record.home().display_score(), Some(2));
        assert_eq!(record.away().display_score(), None);
        assert_eq!(record.game.as_deref(), Some("CS2"));
        assert!(record.home().winner);
        assert!(!record.away().winner);
    }

    #[test]
    fn game_and_winner_resolution_order() {
        let record = normalize(json!({
            "id": "1",
            "game": "Dota 2",
            "gameType": "CS2",
            "teams": [{ "name": "A", "winner": true }, { "name": "B" }]
        }))
        .unwrap();
        assert_eq!(record.game.as_deref(), Some("Dota 2"));
        assert!(record.home().winner);
        assert!(!record.away().winner);

        let record = normalize(json!({ "id": "2", "gameType": "CS2" })).unwrap();
        assert_eq!(record.game.as_deref(), Some("CS2"));

        let record = normalize(json!({ "id": "3", "title": { "nameShortened": "LoL", "name": "League of Legends" } })).unwrap();
        assert_eq!(record.game.as_deref(), Some("LoL"));

        let record = normalize(json!({
            "id": "4",
            "opponents": [{ "opponent": { "id": 7, "name": "X" } }],
            "results": [{ "score": 1, "winner": true }]
        }))
        .unwrap();
        assert!(record.home().winner);
        assert!(normalize(json!({ "id": "5" })).unwrap().game.is_none());
    }

    #[test]
    fn live_signal_names_map_to_predicates() {
        let raw = json!({ "id": "1", "status": "running" });
        let live = |name: &str| {
            let signal = LiveSignal::from_name(name).unwrap();
            Normalizer::default()
                .with_live_predicate(signal.predicate())
                .normalize(&raw, false)
                .unwrap()
                .live
        };
        assert!(!live("endpoint"));
        assert!(live("Status"));
        assert!(!live("streams"));
        assert!(live(" any "));
        assert_eq!(LiveSignal::from_name("sometimes"), None);
        assert!(LiveSignal::NAMES.iter().all(|n| LiveSignal::from_name(n).is_some()));
        assert_eq!(LiveSignal::default(), LiveSignal::Endpoint);
    }

    #[test]
    fn normalizing_twice_is_idempotent() {
        let raw = json!({
            "seriesId": "2817",
            "startTimeScheduled": "2024-05-01T10:00:00Z",
            "tournament": { "name": "PGL Major" },
            "format": { "nameShortened": "Bo3" },
            "teams": [{ "name": "Spirit", "score": 1 }, { "name": "Liquid" }]
        });
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.normalize(&raw, true), normalizer.normalize(&raw, true));
    }

    #[test]
    fn live_predicates() {
        let running = json!({ "id": "x", "status": "running" });
        let streaming = json!({ "id": "x", "streams": [{ "url": "https://twitch.tv/x" }] });
        let plain = json!({ "id": "x" });

        let by_endpoint = Normalizer::default();
        assert!(by_endpoint.normalize(&plain, true).unwrap().live);
        assert!(!by_endpoint.normalize(&running, false).unwrap().live);

        let by_status = Normalizer::default().with_live_predicate(live_from_status);
        assert!(by_status.normalize(&running, false).unwrap().live);
        assert!(!by_status.normalize(&plain, true).unwrap().live);

        let by_streams = Normalizer::default().with_live_predicate(live_from_streams);
        assert!(by_streams.normalize(&streaming, false).unwrap().live);

        let any = Normalizer::default().with_live_predicate(live_any_signal);
        assert!(any.normalize(&streaming, false).unwrap().live);
        assert!(!any.normalize(&plain, false).unwrap().live);
    }

    #[test]
    fn custom_field_map_extends_resolution() {
        let mut fields = FieldMap::default();
        fields.id.push("matchKey");
        let normalizer = Normalizer::new(fields, live_from_endpoint);
        let record = normalizer.normalize(&json!({ "matchKey": "k-1" }), false).unwrap();
        assert_eq!(record.id, "k-1");
    }

    #[test]
    fn batch_skips_unusable_records() {
        let items = vec![json!({ "id": "1" }), json!({}), json!({ "time": "2024-01-01T00:00:00Z" })];
        let records = Normalizer::default().normalize_batch(&items, false);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "1");
    }
}
