use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle of a single game. Raw feed strings are canonicalised into this
/// enum once, at ingestion, via [`GameStatus::from_feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Final,
}

impl GameStatus {
    /// Accepts either the feed's type name (`STATUS_FINAL`) or its
    /// description (`"Final"`). Anything that is neither pre-game nor
    /// completed is treated as live play (halftime, end of period, ...).
    pub fn from_feed(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        let s = lower.strip_prefix("status_").unwrap_or(lower.as_str());
        match s {
            "" | "scheduled" | "pre" | "postponed" | "canceled" | "cancelled" => {
                GameStatus::Scheduled
            }
            _ if s.starts_with("final") || s == "post" => GameStatus::Final,
            _ => GameStatus::InProgress,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GameStatus::Scheduled => "Scheduled",
            GameStatus::InProgress => "In Progress",
            GameStatus::Final => "Final",
        }
    }

    /// Board ordering: live games first, then upcoming, then completed.
    pub fn display_tier(&self) -> u8 {
        match self {
            GameStatus::InProgress => 0,
            GameStatus::Scheduled => 1,
            GameStatus::Final => 2,
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Season calendar ───────────────────────────────────────────────────────────

/// One selectable week of the season. `start <= end` is enforced when the
/// feed is mapped; entries violating it never reach the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekEntry {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekEntry {
    /// Inclusive on both ends.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// e.g. `"Week 1: 09/05 - 09/10"`
    pub fn display_label(&self) -> String {
        format!(
            "{}: {} - {}",
            self.label,
            self.start.format("%m/%d"),
            self.end.format("%m/%d")
        )
    }
}

/// A season phase (preseason, regular season, postseason...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekPeriod {
    pub label: Option<String>,
    pub entries: Vec<WeekEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCalendar {
    pub periods: Vec<WeekPeriod>,
}

/// Everything the bulk schedule fetch returns for one season.
#[derive(Debug, Clone, Default)]
pub struct ScheduleFeed {
    pub calendar: SeasonCalendar,
    pub events: Vec<Event>,
}

// ── Events ────────────────────────────────────────────────────────────────────

pub const NOT_AVAILABLE: &str = "N/A";
pub const DEFAULT_TEAM_COLOR: &str = "#000000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub name: String,
    /// `#rrggbb`
    pub color: String,
    pub logo: Option<String>,
    /// Overall W-L summary, e.g. "3-1"
    pub record: String,
}

impl Default for Team {
    fn default() -> Self {
        Team {
            name: "TBD".to_string(),
            color: DEFAULT_TEAM_COLOR.to_string(),
            logo: None,
            record: NOT_AVAILABLE.to_string(),
        }
    }
}

/// A single game as carried by the schedule feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub home: Team,
    pub away: Team,
    pub status: GameStatus,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub quarter: Option<u8>,
    pub clock: Option<String>,
    pub venue: String,
    pub location: String,
    pub network: String,
}

// ── Odds ──────────────────────────────────────────────────────────────────────

/// A betting line, opaque display data. Persisted untagged: a JSON string
/// or a JSON number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OddsValue {
    Spread(f64),
    Text(String),
}

impl fmt::Display for OddsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OddsValue::Spread(v) => write!(f, "{}", v),
            OddsValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for OddsValue {
    fn from(s: &str) -> Self {
        OddsValue::Text(s.to_string())
    }
}

/// One provider's odds record for a game, as returned by the odds lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOdds {
    pub provider_id: String,
    pub provider_name: Option<String>,
    /// Display line, e.g. "KC -3.5"
    pub details: Option<String>,
    pub spread: Option<f64>,
}

impl ProviderOdds {
    /// Prefer the display line, then the numeric spread, else "N/A".
    pub fn to_value(&self) -> OddsValue {
        match (&self.details, self.spread) {
            (Some(details), _) => OddsValue::Text(details.clone()),
            (None, Some(spread)) => OddsValue::Spread(spread),
            (None, None) => OddsValue::Text(NOT_AVAILABLE.to_string()),
        }
    }
}

// ── Live state ────────────────────────────────────────────────────────────────

/// Live per-game fields tracked between poll cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveScore {
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub quarter: Option<u8>,
    pub clock: Option<String>,
    pub possession_team: Option<String>,
    pub down_distance: Option<String>,
}

/// Result of a per-game live detail lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveDetail {
    pub event_id: String,
    pub status: GameStatus,
    pub score: LiveScore,
}

/// event_id -> live score, rebuilt wholesale every poll cycle.
pub type ScoreSnapshot = HashMap<String, LiveScore>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringPlay {
    pub period: Option<u8>,
    pub clock: String,
    pub text: String,
    pub away_score: Option<u32>,
    pub home_score: Option<u32>,
    pub team_logo: Option<String>,
}
