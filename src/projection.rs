//! Merges a schedule event, its odds and the latest live snapshot into one
//! display-ready record.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tracing::warn;

use crate::db::models::{Event, GameStatus, OddsValue, ScoreSnapshot, Team};
use crate::error::OddsError;
use crate::odds::OddsCache;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamLine {
    pub name: String,
    pub color: String,
    pub logo: Option<String>,
    pub record: String,
    pub score: Option<u32>,
}

impl TeamLine {
    fn new(team: &Team, score: Option<u32>) -> Self {
        TeamLine {
            name: team.name.clone(),
            color: team.color.clone(),
            logo: team.logo.clone(),
            record: team.record.clone(),
            score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRecord {
    pub event_id: String,
    pub name: String,
    pub status: GameStatus,
    /// "Final", "Upcoming", or "2 Qtr, 4:12 remaining"
    pub status_line: String,
    pub home: TeamLine,
    pub away: TeamLine,
    pub odds: Option<OddsValue>,
    pub quarter: Option<u8>,
    pub clock: Option<String>,
    pub possession_team: Option<String>,
    pub down_distance: Option<String>,
    pub venue: String,
    pub location: String,
    pub network: String,
    pub start_time: DateTime<Utc>,
    /// Kickoff in the board's display offset, e.g. "Sunday, Sep 8 @ 1:00PM"
    pub kickoff: String,
}

impl DisplayRecord {
    pub fn has_possession(&self, side: Side) -> bool {
        let team = match side {
            Side::Home => &self.home.name,
            Side::Away => &self.away.name,
        };
        self.possession_team.as_deref() == Some(team.as_str())
    }
}

/// A projected record plus the odds flush failure, if one happened while
/// resolving its odds.
#[derive(Debug)]
pub struct Projection {
    pub record: DisplayRecord,
    pub persist_error: Option<OddsError>,
}

/// Resolve odds through the cache, then merge.
pub async fn project(
    event: &Event,
    odds_cache: &mut OddsCache,
    snapshot: &ScoreSnapshot,
    display_offset: FixedOffset,
) -> Projection {
    let (odds, persist_error) = match odds_cache.get_odds(&event.id, event.status).await {
        Ok(odds) => (odds, None),
        Err(e) => {
            warn!("{}", e);
            (Some(e.odds().clone()), Some(e))
        }
    };

    Projection {
        record: merge(event, odds, snapshot, display_offset),
        persist_error,
    }
}

/// Snapshot fields win over the event's own (which go stale between
/// schedule refreshes); without a snapshot entry the event is used as-is.
pub fn merge(
    event: &Event,
    odds: Option<OddsValue>,
    snapshot: &ScoreSnapshot,
    display_offset: FixedOffset,
) -> DisplayRecord {
    let live = snapshot.get(&event.id);

    let (home_score, away_score, quarter, clock, possession_team, down_distance) = match live {
        Some(live) => (
            live.home_score,
            live.away_score,
            live.quarter,
            live.clock.clone(),
            live.possession_team.clone(),
            live.down_distance.clone(),
        ),
        None => (
            event.home_score,
            event.away_score,
            event.quarter,
            event.clock.clone(),
            None,
            None,
        ),
    };

    DisplayRecord {
        event_id: event.id.clone(),
        name: event.name.clone(),
        status: event.status,
        status_line: status_line(event.status, quarter, clock.as_deref()),
        home: TeamLine::new(&event.home, home_score),
        away: TeamLine::new(&event.away, away_score),
        odds,
        quarter,
        clock,
        possession_team,
        down_distance,
        venue: event.venue.clone(),
        location: event.location.clone(),
        network: event.network.clone(),
        start_time: event.start_time,
        kickoff: format_kickoff(event.start_time, display_offset),
    }
}

/// Stable tiering: in-progress, then scheduled, then final. Upstream order
/// is kept within a tier.
pub fn sort_for_display(records: &mut [DisplayRecord]) {
    records.sort_by_key(|r| r.status.display_tier());
}

pub fn status_line(status: GameStatus, quarter: Option<u8>, clock: Option<&str>) -> String {
    match status {
        GameStatus::Final => "Final".to_string(),
        GameStatus::Scheduled => "Upcoming".to_string(),
        GameStatus::InProgress => match (quarter, clock.filter(|c| !c.is_empty())) {
            (Some(q), Some(clock)) => format!("{} Qtr, {} remaining", q, clock),
            (Some(q), None) => format!("Q{}", q),
            (None, _) => GameStatus::InProgress.label().to_string(),
        },
    }
}

pub fn format_kickoff(start: DateTime<Utc>, offset: FixedOffset) -> String {
    start
        .with_timezone(&offset)
        .format("%A, %b %-d @ %-I:%M%p")
        .to_string()
}
