use async_trait::async_trait;

use crate::db::models::{LiveDetail, ProviderOdds, ScheduleFeed, ScoringPlay};
use crate::error::FeedError;

/// Bulk season schedule: calendar plus every event of the season.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_schedule(&self, season: u16) -> Result<ScheduleFeed, FeedError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Per-event odds lookup. Returns every provider-tagged record the upstream
/// knows about; choosing a provider is the caller's business.
#[async_trait]
pub trait OddsSource: Send + Sync {
    async fn fetch_odds(&self, event_id: &str) -> Result<Vec<ProviderOdds>, FeedError>;

    fn name(&self) -> &str;
}

/// Per-event live detail (score, clock, possession). `Ok(None)` means the
/// upstream answered but had nothing for this event.
#[async_trait]
pub trait LiveDetailSource: Send + Sync {
    async fn fetch_live_detail(&self, event_id: &str) -> Result<Option<LiveDetail>, FeedError>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait ScoringPlaysSource: Send + Sync {
    async fn fetch_scoring_plays(&self, event_id: &str) -> Result<Vec<ScoringPlay>, FeedError>;

    fn name(&self) -> &str;
}
