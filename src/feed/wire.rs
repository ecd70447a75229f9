//! Raw wire shapes for the NFL data API and their mapping onto domain types.
//!
//! Every field is optional: the upstream omits sub-objects freely (no
//! broadcast, no venue address, no records before week 1). Defaults are
//! substituted here, once, so nothing downstream deals with missing data.
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::db::models::{
    Event, GameStatus, LiveDetail, LiveScore, ProviderOdds, ScheduleFeed, ScoringPlay,
    SeasonCalendar, Team, WeekEntry, WeekPeriod, DEFAULT_TEAM_COLOR, NOT_AVAILABLE,
};

// ---------------------------------------------------------------------------
// Season events  (nfl-events?year=)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EventsResponse {
    pub leagues: Option<Vec<WireLeague>>,
    pub events: Option<Vec<WireEvent>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireLeague {
    pub calendar: Option<Vec<WireCalendarPeriod>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireCalendarPeriod {
    pub label: Option<String>,
    pub entries: Option<Vec<WireWeek>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireWeek {
    pub label: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireEvent {
    pub id: Option<String>,
    pub name: Option<String>,
    pub date: Option<String>, // ISO 8601, often without seconds
    pub status: Option<WireStatus>,
    pub competitions: Option<Vec<WireCompetition>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireStatus {
    #[serde(rename = "type")]
    pub status_type: Option<WireStatusType>,
    pub period: Option<u8>,
    #[serde(rename = "displayClock")]
    pub display_clock: Option<String>,
    pub situation: Option<WireSituation>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireStatusType {
    pub name: Option<String>,        // "STATUS_SCHEDULED", "STATUS_IN_PROGRESS", "STATUS_FINAL"
    pub description: Option<String>, // "Scheduled", "In Progress", "Final"
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireSituation {
    #[serde(rename = "downDistanceText")]
    pub down_distance_text: Option<String>,
    /// Either `{ "displayName": ... }` or a bare team id.
    pub possession: Option<Value>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireCompetition {
    pub competitors: Option<Vec<WireCompetitor>>,
    pub venue: Option<WireVenue>,
    pub broadcast: Option<Value>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WireCompetitor {
    #[serde(rename = "homeAway")]
    pub home_away: Option<String>,
    pub team: Option<WireTeam>,
    /// String, number, or `{ "value": .., "displayValue": .. }` depending on endpoint
    pub score: Option<Value>,
    pub records: Option<Vec<WireRecord>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireTeam {
    pub id: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub color: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireRecord {
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireVenue {
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub address: Option<WireAddress>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireAddress {
    pub city: Option<String>,
    pub state: Option<String>,
}

// ---------------------------------------------------------------------------
// Single event live detail  (nfl-single-events?id=)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SingleEventResponse {
    pub event: Option<WireEvent>,
}

// ---------------------------------------------------------------------------
// Odds  (nfl-eventodds?id=)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct OddsResponse {
    pub items: Option<Vec<WireOddsItem>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireOddsItem {
    pub provider: Option<WireOddsProvider>,
    pub details: Option<String>,
    pub spread: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireOddsProvider {
    /// Usually a string, occasionally a bare number.
    pub id: Option<Value>,
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Scoring plays  (nfl-scoringplays?id=)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScoringPlaysResponse {
    #[serde(rename = "scoringPlays")]
    pub scoring_plays: Option<Vec<WireScoringPlay>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireScoringPlay {
    pub team: Option<WireTeam>,
    pub period: Option<WirePeriod>,
    pub clock: Option<WireClock>,
    pub text: Option<String>,
    #[serde(rename = "awayScore")]
    pub away_score: Option<Value>,
    #[serde(rename = "homeScore")]
    pub home_score: Option<Value>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WirePeriod {
    pub number: Option<u8>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireClock {
    #[serde(rename = "displayValue")]
    pub display_value: Option<String>,
}

// ---------------------------------------------------------------------------
// Mapping: wire types → domain types
// ---------------------------------------------------------------------------

/// Parse feed timestamps. The upstream emits `2024-09-05T07:00Z` (no
/// seconds) on most endpoints and full RFC 3339 on others.
pub fn parse_feed_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let trimmed = raw.trim().trim_end_matches('Z');
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Only the first league's calendar is used; the feed is single-league.
pub fn map_schedule(raw: EventsResponse) -> ScheduleFeed {
    let calendar = raw
        .leagues
        .unwrap_or_default()
        .into_iter()
        .next()
        .map(map_calendar)
        .unwrap_or_default();

    let events = raw
        .events
        .unwrap_or_default()
        .iter()
        .filter_map(map_event)
        .collect();

    ScheduleFeed { calendar, events }
}

fn map_calendar(league: WireLeague) -> SeasonCalendar {
    let periods = league
        .calendar
        .unwrap_or_default()
        .into_iter()
        .map(|period| WeekPeriod {
            label: period.label,
            entries: period
                .entries
                .unwrap_or_default()
                .iter()
                .filter_map(map_week)
                .collect(),
        })
        .collect();
    SeasonCalendar { periods }
}

fn map_week(week: &WireWeek) -> Option<WeekEntry> {
    let label = week.label.clone().unwrap_or_default();
    let start = week.start_date.as_deref().and_then(parse_feed_timestamp);
    let end = week.end_date.as_deref().and_then(parse_feed_timestamp);
    match (start, end) {
        (Some(start), Some(end)) if start <= end => Some(WeekEntry { label, start, end }),
        (Some(_), Some(_)) => {
            warn!("Dropping calendar week '{}': start after end", label);
            None
        }
        _ => {
            warn!("Dropping calendar week '{}': unparseable dates", label);
            None
        }
    }
}

pub fn map_event(event: &WireEvent) -> Option<Event> {
    let Some(id) = event.id.clone() else {
        debug!("Skipping event without id");
        return None;
    };
    let Some(start_time) = event.date.as_deref().and_then(parse_feed_timestamp) else {
        warn!("Skipping event {}: missing or unparseable start date", id);
        return None;
    };

    let competition = event
        .competitions
        .as_ref()
        .and_then(|c| c.first())
        .cloned()
        .unwrap_or_default();
    let competitors = competition.competitors.as_deref().unwrap_or_default();
    let (home, away) = split_competitors(competitors);

    let status = map_status(event.status.as_ref());
    let (quarter, clock) = event
        .status
        .as_ref()
        .map(|s| (s.period, s.display_clock.clone()))
        .unwrap_or((None, None));

    let venue = competition
        .venue
        .as_ref()
        .and_then(|v| v.full_name.clone())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let location = competition
        .venue
        .as_ref()
        .and_then(|v| v.address.as_ref())
        .map(format_location)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let network = competition
        .broadcast
        .as_ref()
        .and_then(broadcast_name)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    Some(Event {
        name: event.name.clone().unwrap_or_else(|| id.clone()),
        id,
        start_time,
        home: home.map(map_team).unwrap_or_default(),
        away: away.map(map_team).unwrap_or_default(),
        status,
        home_score: home.and_then(|c| c.score.as_ref()).and_then(parse_score),
        away_score: away.and_then(|c| c.score.as_ref()).and_then(parse_score),
        quarter,
        clock,
        venue,
        location,
        network,
    })
}

/// Live detail for one game. Falls back to `requested_id` when the payload
/// omits the event id.
pub fn map_live_detail(requested_id: &str, raw: SingleEventResponse) -> Option<LiveDetail> {
    let event = raw.event?;
    let competition = event
        .competitions
        .as_ref()
        .and_then(|c| c.first())
        .cloned()
        .unwrap_or_default();
    let competitors = competition.competitors.as_deref().unwrap_or_default();
    let (home, away) = split_competitors(competitors);

    let status = map_status(event.status.as_ref());
    let situation = event.status.as_ref().and_then(|s| s.situation.as_ref());

    let score = LiveScore {
        home_score: home.and_then(|c| c.score.as_ref()).and_then(parse_score),
        away_score: away.and_then(|c| c.score.as_ref()).and_then(parse_score),
        quarter: event.status.as_ref().and_then(|s| s.period),
        clock: event.status.as_ref().and_then(|s| s.display_clock.clone()),
        possession_team: situation
            .and_then(|s| s.possession.as_ref())
            .and_then(|p| possession_name(p, competitors)),
        down_distance: situation.and_then(|s| s.down_distance_text.clone()),
    };

    Some(LiveDetail {
        event_id: event.id.unwrap_or_else(|| requested_id.to_string()),
        status,
        score,
    })
}

pub fn map_odds(raw: OddsResponse) -> Vec<ProviderOdds> {
    raw.items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| {
            let provider = item.provider?;
            Some(ProviderOdds {
                provider_id: provider.id.as_ref().and_then(provider_id)?,
                provider_name: provider.name,
                details: item.details,
                spread: item.spread,
            })
        })
        .collect()
}

pub fn map_scoring_plays(raw: ScoringPlaysResponse) -> Vec<ScoringPlay> {
    raw.scoring_plays
        .unwrap_or_default()
        .into_iter()
        .map(|play| ScoringPlay {
            period: play.period.and_then(|p| p.number),
            clock: play
                .clock
                .and_then(|c| c.display_value)
                .unwrap_or_default(),
            text: play.text.unwrap_or_default(),
            away_score: play.away_score.as_ref().and_then(parse_score),
            home_score: play.home_score.as_ref().and_then(parse_score),
            team_logo: play.team.and_then(|t| t.logo),
        })
        .collect()
}

fn provider_id(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn map_status(status: Option<&WireStatus>) -> GameStatus {
    status
        .and_then(|s| s.status_type.as_ref())
        .and_then(|t| t.name.as_deref().or(t.description.as_deref()))
        .map(GameStatus::from_feed)
        .unwrap_or(GameStatus::Scheduled)
}

/// Prefer the explicit `homeAway` flag; otherwise the feed lists home first.
fn split_competitors(
    competitors: &[WireCompetitor],
) -> (Option<&WireCompetitor>, Option<&WireCompetitor>) {
    let home = competitors
        .iter()
        .find(|c| c.home_away.as_deref() == Some("home"))
        .or_else(|| competitors.first());
    let away = competitors
        .iter()
        .find(|c| c.home_away.as_deref() == Some("away"))
        .or_else(|| competitors.get(1));
    (home, away)
}

fn map_team(competitor: &WireCompetitor) -> Team {
    let defaults = Team::default();
    let team = competitor.team.as_ref();
    Team {
        name: team
            .and_then(|t| t.display_name.clone())
            .unwrap_or(defaults.name),
        color: team
            .and_then(|t| t.color.as_deref())
            .map(normalize_color)
            .unwrap_or_else(|| DEFAULT_TEAM_COLOR.to_string()),
        logo: team.and_then(|t| t.logo.clone()).filter(|l| !l.is_empty()),
        record: competitor
            .records
            .as_ref()
            .and_then(|r| r.first())
            .and_then(|r| r.summary.clone())
            .unwrap_or(defaults.record),
    }
}

fn normalize_color(raw: &str) -> String {
    let hex = raw.trim().trim_start_matches('#');
    if hex.is_empty() {
        DEFAULT_TEAM_COLOR.to_string()
    } else {
        format!("#{}", hex)
    }
}

fn format_location(address: &WireAddress) -> String {
    match (address.city.as_deref(), address.state.as_deref()) {
        (Some(city), Some(state)) if !state.is_empty() => format!("{}, {}", city, state),
        (Some(city), _) => city.to_string(),
        (None, _) => NOT_AVAILABLE.to_string(),
    }
}

fn broadcast_name(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("name")
            .or_else(|| obj.get("shortName"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn possession_name(raw: &Value, competitors: &[WireCompetitor]) -> Option<String> {
    match raw {
        Value::Object(obj) => obj
            .get("displayName")
            .and_then(Value::as_str)
            .map(str::to_string),
        // Bare team id: resolve against the competitors of this game
        Value::String(team_id) => competitors
            .iter()
            .filter_map(|c| c.team.as_ref())
            .find(|t| t.id.as_deref() == Some(team_id.as_str()))
            .and_then(|t| t.display_name.clone()),
        _ => None,
    }
}

fn parse_score(raw: &Value) -> Option<u32> {
    match raw {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::Object(obj) => obj
            .get("displayValue")
            .or_else(|| obj.get("value"))
            .and_then(parse_score),
        _ => None,
    }
}
