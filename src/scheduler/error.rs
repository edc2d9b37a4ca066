use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::ConfigError;
use crate::predict::PredictError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("data unavailable: {0}")]
    DataUnavailable(#[from] PredictError),
    #[error("no visible candidates at tick {tick_index} ({timestamp})")]
    EmptyCandidateSet {
        timestamp: DateTime<Utc>,
        tick_index: u32,
    },
}
