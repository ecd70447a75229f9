use thiserror::Error;

use crate::db::models::OddsValue;

/// Failures of the durable odds store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("odds store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("odds store JSON error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("odds store SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("odds store unavailable: {0}")]
    Unavailable(String),
}

/// Failures talking to an upstream collaborator. Never fatal: callers
/// degrade to cached values, "no data", or skip the game for this cycle.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream returned {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to parse response from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

/// Raised by the odds cache when a fresh value was accepted in memory but
/// could not be flushed to the durable store.
#[derive(Debug, Error)]
pub enum OddsError {
    #[error("odds for event {event_id} updated in memory but not persisted: {source}")]
    Persist {
        event_id: String,
        odds: OddsValue,
        #[source]
        source: StoreError,
    },
}

impl OddsError {
    pub fn odds(&self) -> &OddsValue {
        match self {
            OddsError::Persist { odds, .. } => odds,
        }
    }

    /// The odds value that was fetched and cached despite the failed flush.
    pub fn into_odds(self) -> OddsValue {
        match self {
            OddsError::Persist { odds, .. } => odds,
        }
    }
}
