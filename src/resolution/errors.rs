use thiserror::Error;
use uuid::Uuid;

use crate::prediction::PredictionError;

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Repository error: {0}")]
    Repository(#[from] PredictionError),

    #[error("Store operation timed out: {operation}")]
    Timeout { operation: &'static str },

    #[error(
        "Prediction {prediction_id} belongs to at-bat {found_index}, not at-bat {at_bat_index} of game {game_pk}"
    )]
    ConsistencyViolation {
        game_pk: u64,
        at_bat_index: u32,
        prediction_id: Uuid,
        found_index: u32,
    },
}

impl ResolutionError {
    pub fn is_critical(&self) -> bool {
        matches!(self, ResolutionError::ConsistencyViolation { .. })
    }
}
