use crate::types::{CentreId, DirectionId, PositionId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkloadError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Centre {centre_id} not found")]
    CentreNotFound { centre_id: CentreId },

    #[error("Position {position_id} not found")]
    PositionNotFound { position_id: PositionId },

    #[error("Direction {direction_id} not found")]
    DirectionNotFound { direction_id: DirectionId },

    #[error("Invalid percent for '{field}': {value} is outside [0, 100]")]
    InvalidPercent { field: String, value: f64 },

    #[error("Invalid number for '{field}': {raw:?}")]
    InvalidNumber { field: String, raw: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkloadError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration { reason: reason.into() }
    }
}

pub type WorkloadResult<T> = Result<T, WorkloadError>;
