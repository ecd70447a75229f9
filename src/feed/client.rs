use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use super::provider::{LiveDetailSource, OddsSource, ScheduleSource, ScoringPlaysSource};
use super::wire::{
    map_live_detail, map_odds, map_schedule, map_scoring_plays, EventsResponse, OddsResponse,
    ScoringPlaysResponse, SingleEventResponse,
};
use crate::db::models::{LiveDetail, ProviderOdds, ScheduleFeed, ScoringPlay};
use crate::error::FeedError;

/// Client for the RapidAPI-hosted NFL data API (schedule, odds, live detail,
/// scoring plays). Implements every collaborator trait the engine consumes.
#[derive(Clone)]
pub struct NflApiClient {
    http: Client,
    base_url: String,
    api_host: String,
    api_key: Option<String>,
}

impl NflApiClient {
    pub fn new(
        base_url: &str,
        api_host: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(NflApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_host: api_host.to_string(),
            api_key,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FeedError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {} {:?}", url, query);

        let mut req = self
            .http
            .get(&url)
            .query(query)
            .header("x-rapidapi-host", &self.api_host);
        if let Some(key) = &self.api_key {
            req = req.header("x-rapidapi-key", key);
        }

        let resp = req.send().await.map_err(|source| FeedError::Network {
            url: url.clone(),
            source,
        })?;

        if !resp.status().is_success() {
            return Err(FeedError::Status {
                url,
                status: resp.status(),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|source| FeedError::Parse { url, source })
    }
}

#[async_trait]
impl ScheduleSource for NflApiClient {
    fn name(&self) -> &str {
        "nfl-api-data"
    }

    async fn fetch_schedule(&self, season: u16) -> Result<ScheduleFeed, FeedError> {
        let year = season.to_string();
        let raw: EventsResponse = self.get("nfl-events", &[("year", year.as_str())]).await?;
        let feed = map_schedule(raw);
        info!(
            "Fetched {} season: {} calendar periods, {} events",
            season,
            feed.calendar.periods.len(),
            feed.events.len()
        );
        Ok(feed)
    }
}

#[async_trait]
impl OddsSource for NflApiClient {
    fn name(&self) -> &str {
        "nfl-api-data"
    }

    async fn fetch_odds(&self, event_id: &str) -> Result<Vec<ProviderOdds>, FeedError> {
        let raw: OddsResponse = self.get("nfl-eventodds", &[("id", event_id)]).await?;
        Ok(map_odds(raw))
    }
}

#[async_trait]
impl LiveDetailSource for NflApiClient {
    fn name(&self) -> &str {
        "nfl-api-data"
    }

    async fn fetch_live_detail(&self, event_id: &str) -> Result<Option<LiveDetail>, FeedError> {
        let raw: SingleEventResponse = self.get("nfl-single-events", &[("id", event_id)]).await?;
        Ok(map_live_detail(event_id, raw))
    }
}

#[async_trait]
impl ScoringPlaysSource for NflApiClient {
    fn name(&self) -> &str {
        "nfl-api-data"
    }

    async fn fetch_scoring_plays(&self, event_id: &str) -> Result<Vec<ScoringPlay>, FeedError> {
        let raw: ScoringPlaysResponse = self.get("nfl-scoringplays", &[("id", event_id)]).await?;
        Ok(map_scoring_plays(raw))
    }
}
