use chrono::FixedOffset;
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Where last-known odds are persisted between runs.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OddsStoreKind {
    Json,
    Sqlite,
}

/// NFL schedule, odds and live-score sync
#[derive(Parser, Debug, Clone)]
#[command(name = "gameday-sync", version, about)]
pub struct Config {
    /// NFL data API base URL
    #[arg(
        long,
        env = "NFL_API_URL",
        default_value = "https://nfl-api-data.p.rapidapi.com"
    )]
    pub api_url: String,

    /// Value sent as the x-rapidapi-host header
    #[arg(long, env = "NFL_API_HOST", default_value = "nfl-api-data.p.rapidapi.com")]
    pub api_host: String,

    /// RapidAPI key
    #[arg(long, env = "NFL_API_KEY")]
    pub api_key: Option<String>,

    /// Season year to load
    #[arg(long, env = "SEASON", default_value = "2024")]
    pub season: u16,

    /// Odds provider whose lines are displayed (58 = ESPN BET)
    #[arg(long, env = "ODDS_PROVIDER_ID", default_value = "58")]
    pub odds_provider_id: String,

    /// Odds store backend
    #[arg(long, env = "ODDS_STORE", value_enum, default_value = "json")]
    pub odds_store: OddsStoreKind,

    /// Odds store location (JSON file or SQLite database)
    #[arg(long, env = "ODDS_PATH", default_value = "last_fetched_odds.json")]
    pub odds_path: String,

    /// Live score polling interval in seconds
    #[arg(long, env = "SCORE_POLL_SECS", default_value = "60")]
    pub score_poll_secs: u64,

    /// Full schedule refresh interval in seconds
    #[arg(long, env = "SCHEDULE_REFRESH_SECS", default_value = "3600")]
    pub schedule_refresh_secs: u64,

    /// UTC offset used for kickoff times, in minutes (-240 = US Eastern DST)
    #[arg(
        long,
        env = "DISPLAY_UTC_OFFSET_MINUTES",
        default_value = "-240",
        allow_hyphen_values = true
    )]
    pub display_utc_offset_minutes: i32,

    /// Per-request timeout for upstream calls, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,
}

const MAX_OFFSET_MINUTES: i32 = 14 * 60;

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.score_poll_secs == 0 {
            anyhow::bail!("score_poll_secs must be positive");
        }
        if self.schedule_refresh_secs == 0 {
            anyhow::bail!("schedule_refresh_secs must be positive");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }
        if self.odds_provider_id.trim().is_empty() {
            anyhow::bail!("odds_provider_id must not be empty");
        }
        if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&self.display_utc_offset_minutes) {
            anyhow::bail!("display_utc_offset_minutes must be between -840 and 840");
        }
        Ok(())
    }

    pub fn display_offset(&self) -> anyhow::Result<FixedOffset> {
        FixedOffset::east_opt(self.display_utc_offset_minutes * 60).ok_or_else(|| {
            anyhow::anyhow!(
                "invalid display offset: {} minutes",
                self.display_utc_offset_minutes
            )
        })
    }

    pub fn score_poll_interval(&self) -> Duration {
        Duration::from_secs(self.score_poll_secs)
    }

    pub fn schedule_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_refresh_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
