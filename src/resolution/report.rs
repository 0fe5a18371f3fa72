use serde::Serialize;
use uuid::Uuid;

use crate::outcome::AtBatOutcome;

/// What one `resolve_at_bat` call did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtBatResolution {
    pub game_pk: u64,
    pub at_bat_index: u32,
    pub outcome: AtBatOutcome,
    /// Resolutions this call actually wrote
    pub resolved: usize,
    /// Predictions found already resolved, by an earlier or concurrent pass
    pub already_resolved: usize,
    /// Predictions left pending for a later pass
    pub failed: Vec<Uuid>,
}

impl AtBatResolution {
    pub(crate) fn new(game_pk: u64, at_bat_index: u32, outcome: AtBatOutcome) -> Self {
        Self {
            game_pk,
            at_bat_index,
            outcome,
            resolved: 0,
            already_resolved: 0,
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// An at-bat whose resolution was aborted this pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtBatFailure {
    pub at_bat_index: u32,
    pub critical: bool,
    pub error: String,
}

/// Summary of a `resolve_all_completed` pass over one game
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameResolutionReport {
    pub game_pk: u64,
    /// At-bats processed this pass, in ascending index order
    pub at_bats: Vec<AtBatResolution>,
    /// Completed at-bats skipped because the cache already had them
    pub cached: usize,
    /// Plays classified through a fallback this pass
    pub unmapped: usize,
    pub failures: Vec<AtBatFailure>,
}

impl GameResolutionReport {
    pub(crate) fn new(game_pk: u64) -> Self {
        Self {
            game_pk,
            ..Self::default()
        }
    }

    pub fn resolved(&self) -> usize {
        self.at_bats.iter().map(|a| a.resolved).sum()
    }

    pub fn pending(&self) -> usize {
        self.at_bats.iter().map(|a| a.failed.len()).sum()
    }

    /// No failed writes and no aborted at-bats
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.pending() == 0
    }
}
