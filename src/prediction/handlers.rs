use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use super::{
    types::{CreatePredictionRequest, PredictionFilter},
    Prediction,
};
use crate::shared::{AppError, AppState};

/// HTTP handler for making a prediction
///
/// POST /predictions
/// Returns the stored prediction
#[instrument(name = "create_prediction", skip(state))]
pub async fn create_prediction(
    State(state): State<AppState>,
    Json(request): Json<CreatePredictionRequest>,
) -> Result<(StatusCode, Json<Prediction>), AppError> {
    let prediction = state
        .prediction_service
        .create_prediction(
            &request.user_id,
            request.game_pk,
            request.at_bat_index,
            request.predicted_outcome,
            request.predicted_category,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(prediction)))
}

/// HTTP handler for listing a game's predictions
///
/// GET /games/:game_pk/predictions?user_id=...
#[instrument(name = "list_predictions", skip(state))]
pub async fn list_predictions(
    State(state): State<AppState>,
    Path(game_pk): Path<u64>,
    Query(filter): Query<PredictionFilter>,
) -> Result<Json<Vec<Prediction>>, AppError> {
    let predictions = state
        .prediction_service
        .predictions_for_game(game_pk, filter.user_id.as_deref())
        .await?;

    info!(game_pk, count = predictions.len(), "Predictions listed");
    Ok(Json(predictions))
}
