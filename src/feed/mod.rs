pub mod client;
pub mod provider;
pub mod wire;

pub use client::NflApiClient;
pub use provider::{LiveDetailSource, OddsSource, ScheduleSource, ScoringPlaysSource};
