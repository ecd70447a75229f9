//! The facade the presentation layer talks to: it owns the season schedule,
//! the odds cache and the current score snapshot, and hands back
//! display-ready boards.

use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::models::{GameStatus, ScheduleFeed, ScoreSnapshot, ScoringPlay, WeekEntry};
use crate::db::OddsStore;
use crate::feed::{LiveDetailSource, OddsSource, ScheduleSource, ScoringPlaysSource};
use crate::live_scores::{PollOutcome, ScorePoller};
use crate::odds::OddsCache;
use crate::projection::{project, sort_for_display, DisplayRecord};
use crate::schedule;

/// External feeds the engine pulls from.
#[derive(Clone)]
pub struct Collaborators {
    pub schedule: Arc<dyn ScheduleSource>,
    pub odds: Arc<dyn OddsSource>,
    pub live: Arc<dyn LiveDetailSource>,
    pub plays: Arc<dyn ScoringPlaysSource>,
}

impl Collaborators {
    /// One client serving every feed.
    pub fn shared<C>(client: Arc<C>) -> Self
    where
        C: ScheduleSource + OddsSource + LiveDetailSource + ScoringPlaysSource + 'static,
    {
        Collaborators {
            schedule: client.clone(),
            odds: client.clone(),
            live: client.clone(),
            plays: client,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub season: u16,
    pub odds_provider_id: String,
    pub display_offset: FixedOffset,
}

/// One week, projected and sorted for display.
#[derive(Debug, Clone)]
pub struct WeekBoard {
    pub week_index: usize,
    pub label: String,
    pub records: Vec<DisplayRecord>,
    pub any_in_progress: bool,
    /// Games whose freshly fetched odds could not be flushed to the store.
    pub unsaved_odds: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub changed: bool,
    pub any_in_progress: bool,
}

pub struct GameDayEngine {
    season: u16,
    display_offset: FixedOffset,
    schedule_source: Arc<dyn ScheduleSource>,
    plays_source: Arc<dyn ScoringPlaysSource>,
    odds: OddsCache,
    poller: ScorePoller,
    schedule: ScheduleFeed,
    scores: ScoreSnapshot,
}

impl GameDayEngine {
    pub fn new(
        collaborators: Collaborators,
        store: Box<dyn OddsStore>,
        settings: EngineSettings,
    ) -> Self {
        GameDayEngine {
            season: settings.season,
            display_offset: settings.display_offset,
            schedule_source: collaborators.schedule,
            plays_source: collaborators.plays,
            odds: OddsCache::new(store, collaborators.odds, settings.odds_provider_id),
            poller: ScorePoller::new(collaborators.live),
            schedule: ScheduleFeed::default(),
            scores: ScoreSnapshot::new(),
        }
    }

    /// Re-fetch the season. Returns false (and keeps the previous schedule)
    /// when the upstream fails.
    pub async fn refresh_schedule(&mut self) -> bool {
        match self.schedule_source.fetch_schedule(self.season).await {
            Ok(feed) => {
                let weeks = schedule::resolve_weeks(&feed.calendar).len();
                if weeks == 0 {
                    warn!("Season {} calendar has no weeks", self.season);
                }
                info!(
                    "Schedule refreshed from {}: {} weeks, {} events",
                    self.schedule_source.name(),
                    weeks,
                    feed.events.len()
                );
                self.schedule = feed;
                true
            }
            Err(e) => {
                warn!(
                    "Schedule refresh from {} failed, keeping previous schedule: {}",
                    self.schedule_source.name(),
                    e
                );
                false
            }
        }
    }

    pub fn list_weeks(&self) -> Vec<(usize, &WeekEntry)> {
        schedule::resolve_weeks(&self.schedule.calendar)
    }

    pub fn current_week_index(&self, now: DateTime<Utc>) -> Option<usize> {
        schedule::current_week_index(&self.schedule.calendar, now)
    }

    /// Every game of week `week_index`, live games first. `None` when the
    /// index is outside the calendar.
    pub async fn get_projected_events(&mut self, week_index: usize) -> Option<WeekBoard> {
        let week = schedule::week_at(&self.schedule.calendar, week_index)?.clone();
        let events = schedule::events_in_week(&self.schedule.events, &week);
        debug!("Projecting {} events for {}", events.len(), week.label);

        let mut records = Vec::with_capacity(events.len());
        let mut unsaved_odds = Vec::new();
        for event in events {
            let projection = project(event, &mut self.odds, &self.scores, self.display_offset).await;
            if projection.persist_error.is_some() {
                unsaved_odds.push(event.id.clone());
            }
            records.push(projection.record);
        }
        sort_for_display(&mut records);

        let any_in_progress = records
            .iter()
            .any(|r| r.status == GameStatus::InProgress);

        Some(WeekBoard {
            week_index,
            label: week.display_label(),
            records,
            any_in_progress,
            unsaved_odds,
        })
    }

    /// One poll cycle over the season's in-progress games. The held
    /// snapshot is replaced only when something changed.
    pub async fn poll_scores(&mut self) -> PollSummary {
        let result = self.poller.poll(&self.scores, &self.schedule.events).await;
        let changed = match result.outcome {
            PollOutcome::Changed(snapshot) => {
                self.scores = snapshot;
                true
            }
            PollOutcome::Unchanged => false,
        };
        PollSummary {
            changed,
            any_in_progress: result.any_in_progress,
        }
    }

    pub async fn scoring_plays(&self, event_id: &str) -> Vec<ScoringPlay> {
        match self.plays_source.fetch_scoring_plays(event_id).await {
            Ok(plays) => plays,
            Err(e) => {
                warn!("Scoring plays for {} unavailable: {}", event_id, e);
                Vec::new()
            }
        }
    }

    pub fn scores(&self) -> &ScoreSnapshot {
        &self.scores
    }
}
