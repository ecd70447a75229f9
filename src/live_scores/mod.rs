use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::models::{Event, GameStatus, LiveScore, ScoreSnapshot};
use crate::feed::LiveDetailSource;

/// Either a fresh snapshot or "nothing changed, skip the re-render".
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Unchanged,
    Changed(ScoreSnapshot),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollResult {
    pub outcome: PollOutcome,
    /// True when at least one fetched game still reports live play.
    pub any_in_progress: bool,
}

impl PollResult {
    fn unchanged(any_in_progress: bool) -> Self {
        PollResult {
            outcome: PollOutcome::Unchanged,
            any_in_progress,
        }
    }
}

/// Polls live detail for in-progress games and diffs against the previous
/// snapshot. Holds no state between calls; the caller owns the snapshot.
#[derive(Clone)]
pub struct ScorePoller {
    source: Arc<dyn LiveDetailSource>,
}

impl ScorePoller {
    pub fn new(source: Arc<dyn LiveDetailSource>) -> Self {
        ScorePoller { source }
    }

    /// One poll cycle over `events`. Only games whose status is
    /// `InProgress` are fetched; a failed fetch drops that game from the new
    /// snapshot without aborting the cycle.
    ///
    /// Scope comes from the status carried on `events` (the last schedule
    /// refresh), not from a live lookup; `any_in_progress` comes from the
    /// fetched details.
    pub async fn poll(&self, previous: &ScoreSnapshot, events: &[Event]) -> PollResult {
        let live_ids: Vec<&str> = events
            .iter()
            .filter(|e| e.status == GameStatus::InProgress)
            .map(|e| e.id.as_str())
            .collect();

        if live_ids.is_empty() {
            debug!("No games in progress, skipping live detail fetch");
            return PollResult::unchanged(false);
        }

        debug!(
            "Fetching live detail from {} for {} game(s): {:?}",
            self.source.name(),
            live_ids.len(),
            live_ids
        );

        let fetches = live_ids.iter().map(|id| async move {
            (*id, self.source.fetch_live_detail(id).await)
        });
        let results = futures_util::future::join_all(fetches).await;

        let mut snapshot = ScoreSnapshot::with_capacity(results.len());
        let mut any_in_progress = false;
        for (event_id, result) in results {
            match result {
                Ok(Some(detail)) => {
                    if detail.status == GameStatus::InProgress {
                        any_in_progress = true;
                    }
                    snapshot.insert(event_id.to_string(), detail.score);
                }
                Ok(None) => warn!("No live detail returned for game {}", event_id),
                Err(e) => warn!("Live detail fetch failed for game {}: {}", event_id, e),
            }
        }

        if snapshot == *previous {
            debug!("No score changes across {} live game(s)", snapshot.len());
            return PollResult::unchanged(any_in_progress);
        }

        for event_id in changed_games(previous, &snapshot) {
            if let Some(score) = snapshot.get(&event_id) {
                info!("Live update {}: {}", event_id, describe(score));
            }
        }

        PollResult {
            outcome: PollOutcome::Changed(snapshot),
            any_in_progress,
        }
    }
}

/// Games whose live record differs from (or is absent in) `previous`.
pub fn changed_games(previous: &ScoreSnapshot, current: &ScoreSnapshot) -> Vec<String> {
    let mut ids: Vec<String> = current
        .iter()
        .filter(|(id, score)| previous.get(*id) != Some(*score))
        .map(|(id, _)| id.clone())
        .collect();
    ids.sort();
    ids
}

fn describe(score: &LiveScore) -> String {
    let fmt_score = |s: Option<u32>| s.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
    format!(
        "{}-{} Q{} {}",
        fmt_score(score.home_score),
        fmt_score(score.away_score),
        score.quarter.map(|q| q.to_string()).unwrap_or_else(|| "?".into()),
        score.clock.as_deref().unwrap_or("")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{LiveDetail, Team};
    use crate::error::FeedError;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeLive {
        calls: AtomicUsize,
        details: Mutex<HashMap<String, LiveDetail>>,
        failing: Mutex<HashSet<String>>,
    }

    impl FakeLive {
        fn set(&self, id: &str, status: GameStatus, home: u32, away: u32) {
            self.details.lock().unwrap().insert(
                id.to_string(),
                LiveDetail {
                    event_id: id.to_string(),
                    status,
                    score: score(home, away),
                },
            );
        }

        fn fail(&self, id: &str) {
            self.failing.lock().unwrap().insert(id.to_string());
        }
    }

    #[async_trait]
    impl LiveDetailSource for FakeLive {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch_live_detail(&self, event_id: &str) -> Result<Option<LiveDetail>, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.lock().unwrap().contains(event_id) {
                return Err(FeedError::Unavailable("timeout".into()));
            }
            Ok(self.details.lock().unwrap().get(event_id).cloned())
        }
    }

    fn score(home: u32, away: u32) -> LiveScore {
        LiveScore {
            home_score: Some(home),
            away_score: Some(away),
            quarter: Some(2),
            clock: Some("7:15".into()),
            possession_team: None,
            down_distance: None,
        }
    }

    fn event(id: &str, status: GameStatus) -> Event {
        Event {
            id: id.into(),
            name: id.into(),
            start_time: Utc.with_ymd_and_hms(2024, 9, 8, 17, 0, 0).unwrap(),
            home: Team::default(),
            away: Team::default(),
            status,
            home_score: None,
            away_score: None,
            quarter: None,
            clock: None,
            venue: "N/A".into(),
            location: "N/A".into(),
            network: "N/A".into(),
        }
    }

    #[tokio::test]
    async fn test_no_live_games_means_no_fetch() {
        let source = Arc::new(FakeLive::default());
        let poller = ScorePoller::new(source.clone());
        let events = vec![
            event("E1", GameStatus::Scheduled),
            event("E2", GameStatus::Final),
        ];

        let result = poller.poll(&ScoreSnapshot::new(), &events).await;
        assert_eq!(result, PollResult::unchanged(false));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_same_scores_are_unchanged() {
        let source = Arc::new(FakeLive::default());
        source.set("E1", GameStatus::InProgress, 7, 3);
        let poller = ScorePoller::new(source.clone());
        let events = vec![event("E1", GameStatus::InProgress)];

        let mut previous = ScoreSnapshot::new();
        previous.insert("E1".into(), score(7, 3));

        let result = poller.poll(&previous, &events).await;
        assert_eq!(result.outcome, PollOutcome::Unchanged);
        assert!(result.any_in_progress);
    }

    #[tokio::test]
    async fn test_score_change_returns_new_snapshot() {
        let source = Arc::new(FakeLive::default());
        source.set("E1", GameStatus::InProgress, 10, 3);
        let poller = ScorePoller::new(source);
        let events = vec![event("E1", GameStatus::InProgress)];

        let mut previous = ScoreSnapshot::new();
        previous.insert("E1".into(), score(7, 3));

        let result = poller.poll(&previous, &events).await;
        let PollOutcome::Changed(snapshot) = result.outcome else {
            panic!("expected a changed snapshot");
        };
        assert_eq!(snapshot["E1"].home_score, Some(10));
        assert_eq!(snapshot["E1"].away_score, Some(3));
    }

    #[tokio::test]
    async fn test_second_poll_without_change_is_unchanged() {
        let source = Arc::new(FakeLive::default());
        source.set("E1", GameStatus::InProgress, 14, 0);
        source.set("E2", GameStatus::InProgress, 3, 3);
        let poller = ScorePoller::new(source);
        let events = vec![
            event("E1", GameStatus::InProgress),
            event("E2", GameStatus::InProgress),
        ];

        let first = poller.poll(&ScoreSnapshot::new(), &events).await;
        let PollOutcome::Changed(snapshot) = first.outcome else {
            panic!("first poll should produce a snapshot");
        };
        let second = poller.poll(&snapshot, &events).await;
        assert_eq!(second.outcome, PollOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_games() {
        let source = Arc::new(FakeLive::default());
        source.set("E1", GameStatus::InProgress, 7, 0);
        source.set("E2", GameStatus::InProgress, 0, 3);
        source.set("E3", GameStatus::InProgress, 21, 17);
        source.fail("E2");
        let poller = ScorePoller::new(source.clone());
        let events = vec![
            event("E1", GameStatus::InProgress),
            event("E2", GameStatus::InProgress),
            event("E3", GameStatus::InProgress),
        ];

        let result = poller.poll(&ScoreSnapshot::new(), &events).await;
        let PollOutcome::Changed(snapshot) = result.outcome else {
            panic!("expected a changed snapshot");
        };
        let mut ids: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        ids.sort();
        assert_eq!(ids, vec!["E1", "E3"]);
        assert!(result.any_in_progress);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_any_in_progress_uses_fetched_status() {
        // Schedule still says in progress, but the live feed reports final.
        let source = Arc::new(FakeLive::default());
        source.set("E1", GameStatus::Final, 24, 20);
        source.fail("E2");
        let poller = ScorePoller::new(source);
        let events = vec![
            event("E1", GameStatus::InProgress),
            event("E2", GameStatus::InProgress),
        ];

        let result = poller.poll(&ScoreSnapshot::new(), &events).await;
        assert!(!result.any_in_progress);
        assert!(matches!(result.outcome, PollOutcome::Changed(ref s) if s.len() == 1));
    }

    #[test]
    fn test_changed_games_lists_new_and_modified() {
        let mut previous = ScoreSnapshot::new();
        previous.insert("E1".into(), score(7, 3));
        previous.insert("E2".into(), score(0, 0));

        let mut current = previous.clone();
        current.insert("E2".into(), score(0, 7));
        current.insert("E3".into(), score(3, 0));

        assert_eq!(changed_games(&previous, &current), vec!["E2", "E3"]);
    }
}
