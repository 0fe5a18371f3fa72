use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncKind {
    Scheduled,
    Manual,
}

/// How a sync pass ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Upstream has no current game
    NoGame,
    /// Game state cached; nothing to resolve while the game is not live
    NotLive { game_pk: u64 },
    Resolved {
        game_pk: u64,
        resolved: usize,
        pending: usize,
        unmapped: usize,
        failed_at_bats: usize,
    },
    Failed { error: String },
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncRunRecord {
    pub kind: SyncKind,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: SyncOutcome,
}

/// Bounded log of recent sync passes, oldest dropped first
#[derive(Debug)]
pub struct SyncHistory {
    capacity: usize,
    runs: Mutex<VecDeque<SyncRunRecord>>,
}

impl SyncHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            runs: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, run: SyncRunRecord) {
        if self.capacity == 0 {
            return;
        }
        let mut runs = self.runs.lock().unwrap();
        while runs.len() >= self.capacity {
            runs.pop_front();
        }
        runs.push_back(run);
    }

    /// Up to `limit` runs, newest first
    pub fn recent(&self, limit: usize) -> Vec<SyncRunRecord> {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
