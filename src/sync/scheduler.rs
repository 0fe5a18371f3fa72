use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use super::history::{SyncHistory, SyncKind, SyncOutcome, SyncRunRecord};
use crate::config::SyncConfig;
use crate::game::{FeedError, GameFeed, GameStateCache};
use crate::resolution::ResolutionService;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Game feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Game feed did not answer within {0:?}")]
    FetchTimeout(Duration),

    #[error("Sync pass did not finish within {0:?}")]
    PassTimeout(Duration),
}

/// Clears the in-flight flag however the pass ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives sync passes: fetch the current game, cache its state and resolve
/// whatever has completed. At most one pass runs at a time.
pub struct SyncScheduler {
    feed: Arc<dyn GameFeed>,
    game_state: Arc<GameStateCache>,
    resolution: Arc<ResolutionService>,
    history: SyncHistory,
    config: SyncConfig,
    in_flight: AtomicBool,
}

impl SyncScheduler {
    pub fn new(
        feed: Arc<dyn GameFeed>,
        game_state: Arc<GameStateCache>,
        resolution: Arc<ResolutionService>,
        config: SyncConfig,
    ) -> Self {
        Self {
            feed,
            game_state,
            resolution,
            history: SyncHistory::new(config.history_capacity),
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn history(&self) -> &SyncHistory {
        &self.history
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs one pass now. Returns `None` without doing anything if another
    /// pass is still in flight.
    #[instrument(skip(self))]
    pub async fn run_once(&self, kind: SyncKind) -> Option<SyncRunRecord> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Sync pass already in flight, skipping");
            return None;
        }
        let _in_flight = InFlight(&self.in_flight);

        let started_at = Utc::now();
        let clock = Instant::now();

        let outcome = match timeout(self.config.pass_timeout, self.pass()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(error = %e, "Sync pass failed");
                SyncOutcome::Failed {
                    error: e.to_string(),
                }
            }
            Err(_) => {
                let e = SyncError::PassTimeout(self.config.pass_timeout);
                error!(error = %e, "Sync pass failed");
                SyncOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let record = SyncRunRecord {
            kind,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            outcome,
        };
        info!(
            kind = %record.kind,
            duration_ms = record.duration_ms,
            outcome = ?record.outcome,
            "Sync pass finished"
        );
        self.history.record(record.clone());
        Some(record)
    }

    async fn pass(&self) -> Result<SyncOutcome, SyncError> {
        let fetched = timeout(self.config.fetch_timeout, self.feed.fetch_current_game())
            .await
            .map_err(|_| SyncError::FetchTimeout(self.config.fetch_timeout))??;

        let Some(snapshot) = fetched else {
            debug!(feed = self.feed.name(), "No current game");
            return Ok(SyncOutcome::NoGame);
        };

        let game_pk = snapshot.game_pk;
        let state = self.game_state.refresh(snapshot).await;

        if !state.snapshot.is_live() {
            debug!(game_pk, status = ?state.snapshot.status, "Game not live, state refreshed only");
            return Ok(SyncOutcome::NotLive { game_pk });
        }

        let report = self
            .resolution
            .resolve_all_completed(game_pk, &state.snapshot)
            .await;
        if !report.is_clean() {
            warn!(
                game_pk,
                pending = report.pending(),
                failed_at_bats = report.failures.len(),
                "Resolution left work for the next pass"
            );
        }

        Ok(SyncOutcome::Resolved {
            game_pk,
            resolved: report.resolved(),
            pending: report.pending(),
            unmapped: report.unmapped,
            failed_at_bats: report.failures.len(),
        })
    }

    /// Starts the periodic loop. Each tick spawns its pass so a slow pass
    /// never delays the ticker; overlapping ticks are skipped by `run_once`.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            interval_secs = self.config.interval.as_secs(),
            pass_timeout_secs = self.config.pass_timeout.as_secs(),
            "Starting sync scheduler"
        );

        tokio::spawn(async move {
            let mut ticker = interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let scheduler = self.clone();
                tokio::spawn(async move {
                    scheduler.run_once(SyncKind::Scheduled).await;
                });
            }
        })
    }
}
