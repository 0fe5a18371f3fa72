use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Prediction not found: {0}")]
    NotFound(String),

    #[error("User {user_id} already has a prediction for at-bat {at_bat_index} of game {game_pk}")]
    Duplicate {
        user_id: String,
        game_pk: u64,
        at_bat_index: u32,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for PredictionError {
    fn from(err: sqlx::Error) -> Self {
        PredictionError::Repository(err.to_string())
    }
}
