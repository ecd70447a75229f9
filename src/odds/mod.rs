//! Last-known odds per game, with a fetch-or-reuse policy keyed on status.
//!
//! Odds only mean something before kickoff, so they are refreshed while a
//! game is `Scheduled` and frozen afterwards:
//!
//! ```text
//!  Scheduled                    → live fetch, overwrite + persist on match
//!  InProgress/Final, no entry   → live fetch (game discovered mid-flight)
//!  InProgress/Final, entry      → cached value, no network
//! ```
//!
//! Upstream calls are O(1) per game's scheduled phase instead of one per
//! poll cycle.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::models::{GameStatus, OddsValue};
use crate::db::{OddsMap, OddsStore};
use crate::error::OddsError;
use crate::feed::OddsSource;

/// ESPN BET, the only provider whose lines are displayed.
pub const DEFAULT_PROVIDER_ID: &str = "58";

/// Outcome of one live odds lookup.
#[derive(Debug, Clone, PartialEq)]
enum LiveOdds {
    /// The accepted provider had a line for this game.
    Found(OddsValue),
    /// The upstream answered but had no record from the accepted provider.
    NoMatch,
    /// The upstream could not be reached or answered garbage.
    Unavailable,
}

pub struct OddsCache {
    entries: OddsMap,
    store: Box<dyn OddsStore>,
    source: Arc<dyn OddsSource>,
    provider_id: String,
}

impl OddsCache {
    /// Loads the durable store once. A store that cannot be read is logged
    /// and the cache starts empty; it is rewritten on the next fetch.
    pub fn new(
        store: Box<dyn OddsStore>,
        source: Arc<dyn OddsSource>,
        provider_id: impl Into<String>,
    ) -> Self {
        let entries = match store.load() {
            Ok(entries) => {
                info!("Loaded {} cached odds from {}", entries.len(), store.describe());
                entries
            }
            Err(e) => {
                warn!(
                    "Failed to load cached odds from {} ({}); starting empty",
                    store.describe(),
                    e
                );
                OddsMap::new()
            }
        };

        OddsCache {
            entries,
            store,
            source,
            provider_id: provider_id.into(),
        }
    }

    /// Odds to display for `event_id` given its current status.
    ///
    /// `Err(OddsError::Persist)` means a fresh value was accepted in memory
    /// but the flush failed; the error carries that value.
    pub async fn get_odds(
        &mut self,
        event_id: &str,
        status: GameStatus,
    ) -> Result<Option<OddsValue>, OddsError> {
        if status != GameStatus::Scheduled {
            if let Some(cached) = self.entries.get(event_id) {
                debug!("Odds frozen for {} ({}): {}", event_id, status, cached);
                return Ok(Some(cached.clone()));
            }
        }

        match self.fetch_live_odds(event_id).await {
            LiveOdds::Found(odds) => self.overwrite(event_id, odds).map(Some),
            LiveOdds::NoMatch => Ok(None),
            // Scheduled game with a stale entry: the old line beats nothing.
            LiveOdds::Unavailable => Ok(self.entries.get(event_id).cloned()),
        }
    }

    /// Cached value without any policy or network access.
    pub fn cached(&self, event_id: &str) -> Option<&OddsValue> {
        self.entries.get(event_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn fetch_live_odds(&self, event_id: &str) -> LiveOdds {
        let records = match self.source.fetch_odds(event_id).await {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    "Odds fetch from {} failed for {}: {}",
                    self.source.name(),
                    event_id,
                    e
                );
                return LiveOdds::Unavailable;
            }
        };

        match records.iter().find(|r| r.provider_id == self.provider_id) {
            Some(record) => LiveOdds::Found(record.to_value()),
            None => {
                debug!(
                    "No odds from provider {} for {} ({} other records)",
                    self.provider_id,
                    event_id,
                    records.len()
                );
                LiveOdds::NoMatch
            }
        }
    }

    fn overwrite(&mut self, event_id: &str, odds: OddsValue) -> Result<OddsValue, OddsError> {
        let previous = self.entries.insert(event_id.to_string(), odds.clone());
        if previous.as_ref() != Some(&odds) {
            info!(
                "Odds for {}: {} -> {}",
                event_id,
                previous.map(|p| p.to_string()).unwrap_or_else(|| "none".into()),
                odds
            );
        }

        self.store
            .save(&self.entries)
            .map_err(|source| OddsError::Persist {
                event_id: event_id.to_string(),
                odds: odds.clone(),
                source,
            })?;
        Ok(odds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ProviderOdds;
    use crate::db::MemoryOddsStore;
    use crate::error::{FeedError, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeOdds {
        calls: AtomicUsize,
        records: Mutex<Vec<ProviderOdds>>,
        fail: AtomicBool,
    }

    impl FakeOdds {
        fn serving(provider_id: &str, details: &str) -> Arc<Self> {
            let fake = Arc::new(FakeOdds::default());
            fake.set_line(provider_id, details);
            fake
        }

        fn set_line(&self, provider_id: &str, details: &str) {
            *self.records.lock().unwrap() = vec![ProviderOdds {
                provider_id: provider_id.into(),
                provider_name: None,
                details: Some(details.into()),
                spread: None,
            }];
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OddsSource for FakeOdds {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch_odds(&self, _event_id: &str) -> Result<Vec<ProviderOdds>, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(FeedError::Unavailable("connection refused".into()));
            }
            Ok(self.records.lock().unwrap().clone())
        }
    }

    fn cache_with(store: &MemoryOddsStore, source: Arc<FakeOdds>) -> OddsCache {
        OddsCache::new(Box::new(store.clone()), source, DEFAULT_PROVIDER_ID)
    }

    #[tokio::test]
    async fn test_scheduled_fetch_is_cached_then_frozen() {
        let store = MemoryOddsStore::new();
        let source = FakeOdds::serving("58", "-3.5");
        let mut cache = cache_with(&store, source.clone());

        let odds = cache.get_odds("E1", GameStatus::Scheduled).await.unwrap();
        assert_eq!(odds, Some(OddsValue::from("-3.5")));
        assert_eq!(store.snapshot()["E1"], OddsValue::from("-3.5"));
        assert_eq!(store.save_count(), 1);

        // Kickoff: the upstream line moves, but the cache must not ask.
        source.set_line("58", "-7");
        let odds = cache.get_odds("E1", GameStatus::InProgress).await.unwrap();
        assert_eq!(odds, Some(OddsValue::from("-3.5")));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_final_with_entry_never_fetches() {
        let mut seeded = OddsMap::new();
        seeded.insert("E1".into(), OddsValue::from("KC -3.5"));
        let store = MemoryOddsStore::with_entries(seeded);
        let source = Arc::new(FakeOdds::default());
        let mut cache = cache_with(&store, source.clone());

        for _ in 0..5 {
            let odds = cache.get_odds("E1", GameStatus::Final).await.unwrap();
            assert_eq!(odds, Some(OddsValue::from("KC -3.5")));
        }
        assert_eq!(source.calls(), 0);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_scheduled_always_fetches_and_overwrites() {
        let store = MemoryOddsStore::new();
        let source = FakeOdds::serving("58", "KC -3.5");
        let mut cache = cache_with(&store, source.clone());

        cache.get_odds("E1", GameStatus::Scheduled).await.unwrap();
        source.set_line("58", "KC -4.5");
        let odds = cache.get_odds("E1", GameStatus::Scheduled).await.unwrap();

        assert_eq!(odds, Some(OddsValue::from("KC -4.5")));
        assert_eq!(source.calls(), 2);
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.snapshot()["E1"], OddsValue::from("KC -4.5"));
    }

    #[tokio::test]
    async fn test_missing_entry_fetches_regardless_of_status() {
        let store = MemoryOddsStore::new();
        let source = FakeOdds::serving("58", "BAL -1");
        let mut cache = cache_with(&store, source.clone());

        let odds = cache.get_odds("E2", GameStatus::InProgress).await.unwrap();
        assert_eq!(odds, Some(OddsValue::from("BAL -1")));
        assert_eq!(source.calls(), 1);

        // Now cached: a second in-progress lookup stays offline.
        cache.get_odds("E2", GameStatus::InProgress).await.unwrap();
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_other_providers_are_discarded() {
        let store = MemoryOddsStore::new();
        let source = FakeOdds::serving("40", "KC -3");
        let mut cache = cache_with(&store, source.clone());

        let odds = cache.get_odds("E1", GameStatus::Scheduled).await.unwrap();
        assert_eq!(odds, None);
        assert!(cache.is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_serves_previous_line() {
        let store = MemoryOddsStore::new();
        let source = FakeOdds::serving("58", "-3.5");
        let mut cache = cache_with(&store, source.clone());
        cache.get_odds("E1", GameStatus::Scheduled).await.unwrap();

        source.fail.store(true, Ordering::SeqCst);
        let odds = cache.get_odds("E1", GameStatus::Scheduled).await.unwrap();
        assert_eq!(odds, Some(OddsValue::from("-3.5")));

        let unknown = cache.get_odds("E9", GameStatus::Scheduled).await.unwrap();
        assert_eq!(unknown, None);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_persist_failure_is_distinct_and_keeps_memory() {
        let store = MemoryOddsStore::new();
        store.set_fail_writes(true);
        let source = FakeOdds::serving("58", "-3.5");
        let mut cache = cache_with(&store, source.clone());

        let err = cache.get_odds("E1", GameStatus::Scheduled).await.unwrap_err();
        assert!(matches!(&err, OddsError::Persist { event_id, .. } if event_id == "E1"));
        assert_eq!(err.into_odds(), OddsValue::from("-3.5"));

        // In-memory cache still serves the value once the game starts.
        assert_eq!(cache.cached("E1"), Some(&OddsValue::from("-3.5")));
        let odds = cache.get_odds("E1", GameStatus::Final).await.unwrap();
        assert_eq!(odds, Some(OddsValue::from("-3.5")));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_scheduled_no_match_keeps_cached_line() {
        let store = MemoryOddsStore::new();
        let source = FakeOdds::serving("58", "-3.5");
        let mut cache = cache_with(&store, source.clone());
        cache.get_odds("E1", GameStatus::Scheduled).await.unwrap();
        assert_eq!(store.save_count(), 1);

        // Accepted provider pulls its line; only another book answers.
        source.set_line("40", "KC -3");
        let odds = cache.get_odds("E1", GameStatus::Scheduled).await.unwrap();
        assert_eq!(odds, None);
        assert_eq!(store.save_count(), 1);
        assert_eq!(cache.cached("E1"), Some(&OddsValue::from("-3.5")));
        assert_eq!(store.snapshot()["E1"], OddsValue::from("-3.5"));

        let odds = cache.get_odds("E1", GameStatus::Final).await.unwrap();
        assert_eq!(odds, Some(OddsValue::from("-3.5")));
        assert_eq!(source.calls(), 2);
    }

    struct UnreadableStore {
        inner: MemoryOddsStore,
    }

    impl OddsStore for UnreadableStore {
        fn load(&self) -> Result<OddsMap, StoreError> {
            Err(StoreError::Unavailable("corrupt odds file".into()))
        }

        fn save(&self, odds: &OddsMap) -> Result<(), StoreError> {
            self.inner.save(odds)
        }

        fn describe(&self) -> String {
            "unreadable".to_string()
        }
    }

    #[tokio::test]
    async fn test_unreadable_store_starts_empty_and_recovers() {
        let inner = MemoryOddsStore::new();
        let source = FakeOdds::serving("58", "-3.5");
        let mut cache = OddsCache::new(
            Box::new(UnreadableStore {
                inner: inner.clone(),
            }),
            source.clone(),
            DEFAULT_PROVIDER_ID,
        );
        assert!(cache.is_empty());

        let odds = cache.get_odds("E1", GameStatus::Scheduled).await.unwrap();
        assert_eq!(odds, Some(OddsValue::from("-3.5")));
        assert_eq!(inner.save_count(), 1);
        assert_eq!(inner.snapshot()["E1"], OddsValue::from("-3.5"));
    }

    #[tokio::test]
    async fn test_restart_reloads_persisted_odds() {
        let store = MemoryOddsStore::new();
        let source = FakeOdds::serving("58", "-3.5");
        {
            let mut cache = cache_with(&store, source.clone());
            cache.get_odds("E1", GameStatus::Scheduled).await.unwrap();
        }

        let restarted = cache_with(&store, Arc::new(FakeOdds::default()));
        assert_eq!(restarted.len(), 1);
        assert_eq!(restarted.cached("E1"), Some(&OddsValue::from("-3.5")));
    }
}
