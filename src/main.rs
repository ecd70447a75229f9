use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use gameday_sync::config::{Config, OddsStoreKind};
use gameday_sync::db::{JsonFileStore, OddsStore, SqliteOddsStore};
use gameday_sync::engine::{Collaborators, EngineSettings, GameDayEngine, WeekBoard};
use gameday_sync::feed::NflApiClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    if config.api_key.is_none() {
        warn!("NFL_API_KEY not set; upstream requests will likely be rejected");
    }

    let store: Box<dyn OddsStore> = match config.odds_store {
        OddsStoreKind::Json => Box::new(JsonFileStore::new(&config.odds_path)),
        OddsStoreKind::Sqlite => Box::new(
            SqliteOddsStore::open(&config.odds_path)
                .with_context(|| format!("Failed to open odds database {}", config.odds_path))?,
        ),
    };
    info!("Odds store: {}", store.describe());

    let client = Arc::new(NflApiClient::new(
        &config.api_url,
        &config.api_host,
        config.api_key.clone(),
        config.request_timeout(),
    )?);

    let mut engine = GameDayEngine::new(
        Collaborators::shared(client),
        store,
        EngineSettings {
            season: config.season,
            odds_provider_id: config.odds_provider_id.clone(),
            display_offset: config.display_offset()?,
        },
    );

    if !engine.refresh_schedule().await {
        warn!("Starting without a schedule; retrying on the next refresh");
    }
    engine.poll_scores().await;
    log_current_board(&mut engine).await;

    let mut score_tick = interval(config.score_poll_interval());
    score_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut schedule_tick = interval(config.schedule_refresh_interval());
    schedule_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Both fire immediately; the startup pass above already covered that.
    score_tick.tick().await;
    schedule_tick.tick().await;

    info!(
        "Polling scores every {}s, refreshing schedule every {}s",
        config.score_poll_secs, config.schedule_refresh_secs
    );

    loop {
        tokio::select! {
            _ = score_tick.tick() => {
                let summary = engine.poll_scores().await;
                if summary.changed {
                    log_current_board(&mut engine).await;
                } else if !summary.any_in_progress {
                    info!("No games in progress");
                }
            }
            _ = schedule_tick.tick() => {
                if engine.refresh_schedule().await {
                    log_current_board(&mut engine).await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn log_current_board(engine: &mut GameDayEngine) {
    let Some(week_index) = engine.current_week_index(Utc::now()) else {
        warn!("No weeks in the season calendar");
        return;
    };
    match engine.get_projected_events(week_index).await {
        Some(board) => log_board(&board),
        None => warn!("Week {} not found in calendar", week_index),
    }
}

fn log_board(board: &WeekBoard) {
    info!(
        "{} ({} games{})",
        board.label,
        board.records.len(),
        if board.any_in_progress { ", live" } else { "" }
    );
    for r in &board.records {
        let score = match (r.away.score, r.home.score) {
            (Some(away), Some(home)) => format!("{}-{}", away, home),
            _ => "-".to_string(),
        };
        info!(
            "  {} @ {} | {} | {} | odds {} | {} | {}",
            r.away.name,
            r.home.name,
            score,
            r.status_line,
            r.odds
                .as_ref()
                .map(|o| o.to_string())
                .unwrap_or_else(|| "N/A".into()),
            r.kickoff,
            r.network
        );
    }
    if !board.unsaved_odds.is_empty() {
        warn!(
            "Odds for {} game(s) not persisted: {:?}",
            board.unsaved_odds.len(),
            board.unsaved_odds
        );
    }
}
