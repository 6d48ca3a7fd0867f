// libs/checkin-cell/src/error.rs
use thiserror::Error;

use shared_models::error::{ApiError, AppError};

#[derive(Error, Debug)]
pub enum CheckinError {
    #[error("Upstream API error: {0}")]
    Api(#[from] ApiError),

    #[error("Version storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid service timezone: {0}")]
    InvalidTimezone(String),

    #[error("Escalation thresholds out of order: late after {late_minutes}m, missed after {missed_minutes}m")]
    InvalidThresholds { late_minutes: i64, missed_minutes: i64 },
}

impl From<CheckinError> for AppError {
    fn from(err: CheckinError) -> Self {
        match err {
            CheckinError::Api(api) => api.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}
