use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{SyncKind, SyncRunRecord};
use crate::shared::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub sync_in_flight: bool,
    pub last_sync: Option<SyncRunRecord>,
    pub unmapped_events: u64,
    pub unmapped_by_signal: HashMap<String, u64>,
}

#[derive(Debug, Serialize)]
pub struct SyncTriggerResponse {
    /// True when another pass was already running and this one did nothing
    pub skipped: bool,
    pub run: Option<SyncRunRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// GET /health
#[instrument(name = "health", skip(state))]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let unmapped = state.resolution_service.classifier().unmapped_events();

    Json(HealthResponse {
        status: "ok".to_string(),
        sync_in_flight: state.scheduler.is_running(),
        last_sync: state.scheduler.history().recent(1).into_iter().next(),
        unmapped_events: unmapped.total(),
        unmapped_by_signal: unmapped.snapshot(),
    })
}

/// HTTP handler for a manual sync pass
///
/// POST /sync
/// Runs the pass inline; reports a skip if one is already running
#[instrument(name = "trigger_sync", skip(state))]
pub async fn trigger_sync(State(state): State<AppState>) -> Json<SyncTriggerResponse> {
    let run = state.scheduler.run_once(SyncKind::Manual).await;
    info!(skipped = run.is_none(), "Manual sync requested");

    Json(SyncTriggerResponse {
        skipped: run.is_none(),
        run,
    })
}

/// GET /sync/history?limit=...
#[instrument(name = "sync_history", skip(state))]
pub async fn sync_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<SyncRunRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(state.scheduler.history().recent(limit))
}
