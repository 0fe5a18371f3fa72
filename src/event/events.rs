use serde::{Deserialize, Serialize};

use crate::outcome::AtBatOutcome;

/// Facts published after resolution state has changed.
///
/// Subscribers only ever see events for writes that were actually applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Predictions for an at-bat were resolved and persisted
    PredictionsResolved {
        game_pk: u64,
        at_bat_index: u32,
        outcome: AtBatOutcome,
        resolved: usize,
    },

    /// Some predictions for an at-bat could not be written and stay pending
    ResolutionIncomplete {
        game_pk: u64,
        at_bat_index: u32,
        pending: usize,
    },
}

impl GameEvent {
    pub fn game_pk(&self) -> u64 {
        match self {
            GameEvent::PredictionsResolved { game_pk, .. } => *game_pk,
            GameEvent::ResolutionIncomplete { game_pk, .. } => *game_pk,
        }
    }

    /// Event type name, for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            GameEvent::PredictionsResolved { .. } => "PredictionsResolved",
            GameEvent::ResolutionIncomplete { .. } => "ResolutionIncomplete",
        }
    }
}
