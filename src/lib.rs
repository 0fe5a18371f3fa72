// Library crate for the at-bat prediction engine
// This file exposes the public API for the binary and integration tests

pub mod config;
pub mod event;
pub mod game;
pub mod outcome;
pub mod prediction;
pub mod resolution;
pub mod scoring;
pub mod shared;
pub mod sync;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Re-export commonly used types for easier access in tests
pub use config::AppConfig;
pub use event::{EventBus, GameEvent};
pub use outcome::{AtBatOutcome, OutcomeCategory};
pub use prediction::{InMemoryPredictionRepository, Prediction, PredictionRepository};
pub use resolution::{ResolutionCache, ResolutionService};
pub use shared::{AppError, AppState};
pub use sync::{SyncKind, SyncScheduler};

/// Builds the HTTP router over the shared state
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(sync::handlers::health))
        .route("/sync", post(sync::handlers::trigger_sync))
        .route("/sync/history", get(sync::handlers::sync_history))
        .route("/games/current", put(game::handlers::set_current_game))
        .route(
            "/games/:game_pk",
            get(game::handlers::get_game_state).delete(game::handlers::forget_game),
        )
        .route("/games/:game_pk/resolve", post(game::handlers::resolve_game))
        .route(
            "/games/:game_pk/predictions",
            get(prediction::handlers::list_predictions),
        )
        .route("/predictions", post(prediction::handlers::create_prediction))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
