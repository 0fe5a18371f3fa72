use serde::{Deserialize, Serialize};

use crate::outcome::{AtBatOutcome, OutcomeCategory};

/// Request payload for making a prediction
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePredictionRequest {
    pub user_id: String,
    pub game_pk: u64,
    pub at_bat_index: u32,
    pub predicted_outcome: AtBatOutcome,
    #[serde(default)]
    pub predicted_category: Option<OutcomeCategory>,
}

/// Query string for listing a game's predictions
#[derive(Debug, Default, Deserialize)]
pub struct PredictionFilter {
    pub user_id: Option<String>,
}
