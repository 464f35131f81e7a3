use anyhow::{Context, bail};
use esports_api::{BoardOptions, LiveSignal};
use log::LevelFilter;
use std::time::Duration;

pub const DEFAULT_API: &str = "http://localhost:3000";
pub const DEFAULT_REFRESH: Duration = Duration::from_secs(30);
pub const DEFAULT_UPCOMING_HOURS: u32 = 24;

const ENV_API: &str = "ESPORTS_BOARD_API";
const ENV_REFRESH: &str = "ESPORTS_BOARD_REFRESH";
const ENV_TEAM: &str = "ESPORTS_BOARD_TEAM";
const ENV_LIMIT_LIVE: &str = "ESPORTS_BOARD_LIMIT_LIVE";
const ENV_LIMIT_UPCOMING: &str = "ESPORTS_BOARD_LIMIT_UPCOMING";
const ENV_HOURS: &str = "ESPORTS_BOARD_HOURS";
const ENV_EXCLUDE: &str = "ESPORTS_BOARD_EXCLUDE";
const ENV_GAME: &str = "ESPORTS_BOARD_GAME";
const ENV_LIVE_SIGNAL: &str = "ESPORTS_BOARD_LIVE_SIGNAL";

#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub api_base: String,
    /// As configured. The refresher applies its own floor on top.
    pub refresh: Duration,
    pub upcoming_hours: u32,
    pub board: BoardOptions,
    /// Which upstream signal marks a record as live.
    pub live_signal: LiveSignal,
    pub full_screen: bool,
    pub log_level: Option<LevelFilter>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API.to_string(),
            refresh: DEFAULT_REFRESH,
            upcoming_hours: DEFAULT_UPCOMING_HOURS,
            board: BoardOptions::default(),
            live_signal: LiveSignal::default(),
            full_screen: false,
            log_level: None,
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(AppSettings),
    Help,
    Version,
}

impl AppSettings {
    pub fn load() -> anyhow::Result<Command> {
        Self::parse(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    /// Environment first, flags on top. Accepts both `--flag value` and `--flag=value`.
    pub fn parse<I, E>(args: I, env: E) -> anyhow::Result<Command>
    where
        I: IntoIterator<Item = String>,
        E: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        settings.apply_env(&env)?;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
                _ => (arg.clone(), None),
            };
            let mut value = || {
                inline
                    .clone()
                    .or_else(|| args.next())
                    .with_context(|| format!("{flag} needs a value"))
            };

            match flag.as_str() {
                "-h" | "--help" => return Ok(Command::Help),
                "-V" | "--version" => return Ok(Command::Version),
                "--full-screen" => settings.full_screen = true,
                "--api" => settings.api_base = value()?,
                "--refresh" => settings.refresh = parse_millis(&flag, &value()?)?,
                "--team" => settings.board.pin = non_blank(value()?),
                "--limit-live" => settings.board.limit_live = parse_limit(&flag, &value()?)?,
                "--limit-upcoming" => {
                    settings.board.limit_upcoming = parse_limit(&flag, &value()?)?
                }
                "--hours" => settings.upcoming_hours = parse_hours(&flag, &value()?)?,
                "--exclude" => settings.board.exclude.extend(split_list(&value()?)),
                "--game" => settings.board.game = parse_game(value()?),
                "--live-signal" => settings.live_signal = parse_live_signal(&flag, &value()?)?,
                "--log-level" => {
                    let level = value()?;
                    settings.log_level = Some(
                        level
                            .parse()
                            .ok()
                            .with_context(|| format!("--log-level: unknown level {level:?}"))?,
                    );
                }
                _ => bail!("unknown argument: {arg}"),
            }
        }

        Ok(Command::Run(settings))
    }

    fn apply_env<E>(&mut self, env: &E) -> anyhow::Result<()>
    where
        E: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(api) = var(ENV_API) {
            self.api_base = api;
        }
        if let Some(refresh) = var(ENV_REFRESH) {
            self.refresh = parse_millis(ENV_REFRESH, &refresh)?;
        }
        if let Some(team) = var(ENV_TEAM) {
            self.board.pin = non_blank(team);
        }
        if let Some(limit) = var(ENV_LIMIT_LIVE) {
            self.board.limit_live = parse_limit(ENV_LIMIT_LIVE, &limit)?;
        }
        if let Some(limit) = var(ENV_LIMIT_UPCOMING) {
            self.board.limit_upcoming = parse_limit(ENV_LIMIT_UPCOMING, &limit)?;
        }
        if let Some(hours) = var(ENV_HOURS) {
            self.upcoming_hours = parse_hours(ENV_HOURS, &hours)?;
        }
        if let Some(exclude) = var(ENV_EXCLUDE) {
            self.board.exclude = split_list(&exclude);
        }
        if let Some(game) = var(ENV_GAME) {
            self.board.game = parse_game(game);
        }
        if let Some(signal) = var(ENV_LIVE_SIGNAL) {
            self.live_signal = parse_live_signal(ENV_LIVE_SIGNAL, &signal)?;
        }
        Ok(())
    }
}

fn parse_millis(name: &str, raw: &str) -> anyhow::Result<Duration> {
    let ms: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{name}: expected milliseconds, got {raw:?}"))?;
    Ok(Duration::from_millis(ms))
}

/// Zero means no limit.
fn parse_limit(name: &str, raw: &str) -> anyhow::Result<Option<usize>> {
    let n: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("{name}: expected a count, got {raw:?}"))?;
    Ok((n > 0).then_some(n))
}

fn parse_hours(name: &str, raw: &str) -> anyhow::Result<u32> {
    let hours: u32 = raw
        .trim()
        .parse()
        .with_context(|| format!("{name}: expected hours, got {raw:?}"))?;
    if hours == 0 {
        bail!("{name}: the upcoming window must be at least one hour");
    }
    Ok(hours)
}

/// "all" clears the filter.
fn parse_game(raw: String) -> Option<String> {
    non_blank(raw).filter(|game| !game.eq_ignore_ascii_case("all"))
}

fn parse_live_signal(name: &str, raw: &str) -> anyhow::Result<LiveSignal> {
    LiveSignal::from_name(raw).with_context(|| {
        format!(
            "{name}: expected one of {}, got {raw:?}",
            LiveSignal::NAMES.join(", ")
        )
    })
}

fn non_blank(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
