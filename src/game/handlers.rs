use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use super::{GameSnapshot, GameState};
use crate::resolution::GameResolutionReport;
use crate::shared::{AppError, AppState};

/// HTTP handler for pushing the current game into the feed
///
/// PUT /games/current
/// The next sync pass picks it up
#[instrument(name = "set_current_game", skip(state, snapshot), fields(game_pk = snapshot.game_pk))]
pub async fn set_current_game(
    State(state): State<AppState>,
    Json(snapshot): Json<GameSnapshot>,
) -> StatusCode {
    state.feed.set_current(snapshot).await;
    StatusCode::ACCEPTED
}

/// GET /games/:game_pk
#[instrument(name = "get_game_state", skip(state))]
pub async fn get_game_state(
    State(state): State<AppState>,
    Path(game_pk): Path<u64>,
) -> Result<Json<GameState>, AppError> {
    state
        .game_state
        .get(game_pk)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Game {game_pk} is not tracked")))
}

/// HTTP handler for dropping a finished game
///
/// DELETE /games/:game_pk
/// Stored predictions are untouched; only in-process state is released
#[instrument(name = "forget_game", skip(state))]
pub async fn forget_game(State(state): State<AppState>, Path(game_pk): Path<u64>) -> StatusCode {
    state.game_state.remove(game_pk).await;
    state.resolution_service.forget_game(game_pk).await;
    info!(game_pk, "Game no longer tracked");
    StatusCode::NO_CONTENT
}

/// HTTP handler for resolving a game on demand
///
/// POST /games/:game_pk/resolve
/// Resolves against the last synced snapshot; safe to call at any time
#[instrument(name = "resolve_game", skip(state))]
pub async fn resolve_game(
    State(state): State<AppState>,
    Path(game_pk): Path<u64>,
) -> Result<Json<GameResolutionReport>, AppError> {
    let game = state
        .game_state
        .get(game_pk)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Game {game_pk} is not tracked")))?;

    let report = state
        .resolution_service
        .resolve_all_completed(game_pk, &game.snapshot)
        .await;

    info!(
        game_pk,
        resolved = report.resolved(),
        pending = report.pending(),
        "On-demand resolution finished"
    );
    Ok(Json(report))
}
