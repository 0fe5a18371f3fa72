use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::config::AppConfig;
use crate::event::EventBus;
use crate::game::{GameStateCache, InMemoryGameFeed};
use crate::outcome::OutcomeClassifier;
use crate::prediction::{PredictionError, PredictionRepository, PredictionService};
use crate::resolution::{ResolutionError, ResolutionService};
use crate::sync::SyncScheduler;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub prediction_service: Arc<PredictionService>,
    pub resolution_service: Arc<ResolutionService>,
    pub scheduler: Arc<SyncScheduler>,
    pub game_state: Arc<GameStateCache>,
    pub feed: Arc<InMemoryGameFeed>,
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires every service around one prediction store
    pub fn new(repository: Arc<dyn PredictionRepository>, config: &AppConfig) -> Self {
        let event_bus = EventBus::new();
        let feed = Arc::new(InMemoryGameFeed::new());
        let game_state = Arc::new(GameStateCache::new());

        let resolution_service = Arc::new(
            ResolutionService::builder(repository.clone())
                .with_classifier(Arc::new(OutcomeClassifier::new()))
                .with_event_bus(event_bus.clone())
                .with_config(config.resolution.clone())
                .build(),
        );
        let prediction_service = Arc::new(
            PredictionService::new(repository, game_state.clone(), config.predictions.clone())
                .with_resolution_cache(resolution_service.cache().clone()),
        );
        let scheduler = Arc::new(SyncScheduler::new(
            feed.clone(),
            game_state.clone(),
            resolution_service.clone(),
            config.sync.clone(),
        ));

        Self {
            prediction_service,
            resolution_service,
            scheduler,
            game_state,
            feed,
            event_bus,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl From<PredictionError> for AppError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::Validation(msg) => AppError::Validation(msg),
            PredictionError::NotFound(msg) => AppError::NotFound(msg),
            PredictionError::Duplicate { .. } => AppError::Conflict(err.to_string()),
            PredictionError::Repository(msg) => AppError::DatabaseError(msg),
        }
    }
}

impl From<ResolutionError> for AppError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Repository(e) => e.into(),
            ResolutionError::Timeout { .. } => AppError::Unavailable(err.to_string()),
            ResolutionError::ConsistencyViolation { .. } => {
                error!(error = %err, "Refusing request after consistency violation");
                AppError::Internal
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_errors_map_to_statuses() {
        let cases = [
            (
                AppError::from(PredictionError::Validation("bad".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(PredictionError::NotFound("game".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(PredictionError::Duplicate {
                    user_id: "alice".into(),
                    game_pk: 1,
                    at_bat_index: 0,
                }),
                StatusCode::CONFLICT,
            ),
            (
                AppError::from(ResolutionError::Timeout {
                    operation: "resolve_batch",
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
