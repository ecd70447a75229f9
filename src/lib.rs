pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod feed;
pub mod live_scores;
pub mod odds;
pub mod projection;
pub mod schedule;
