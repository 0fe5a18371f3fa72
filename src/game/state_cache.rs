use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::models::{Count, GameSnapshot, Matchup};

/// The at-bat in progress, as of the last sync
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentAtBat {
    pub at_bat_index: u32,
    pub count: Count,
    pub matchup: Matchup,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameState {
    pub snapshot: GameSnapshot,
    pub current_at_bat: Option<CurrentAtBat>,
    pub refreshed_at: DateTime<Utc>,
}

impl GameState {
    /// Whether the at-bat already has a result in the last snapshot
    pub fn is_at_bat_complete(&self, at_bat_index: u32) -> bool {
        self.snapshot
            .play(at_bat_index)
            .map(|play| play.is_completed())
            .unwrap_or(false)
    }
}

/// Latest known state per game, refreshed by the sync scheduler
#[derive(Debug, Default)]
pub struct GameStateCache {
    /// A mapping from game pk to its last snapshot
    games: Arc<RwLock<HashMap<u64, GameState>>>,
}

impl GameStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a full snapshot and derives the current at-bat from it
    pub async fn refresh(&self, snapshot: GameSnapshot) -> GameState {
        let current_at_bat = snapshot.current_play().map(|play| CurrentAtBat {
            at_bat_index: play.at_bat_index,
            count: play.count,
            matchup: play.matchup.clone(),
        });

        let state = GameState {
            snapshot,
            current_at_bat,
            refreshed_at: Utc::now(),
        };

        let mut games = self.games.write().await;
        games.insert(state.snapshot.game_pk, state.clone());
        state
    }

    pub async fn get(&self, game_pk: u64) -> Option<GameState> {
        let games = self.games.read().await;
        games.get(&game_pk).cloned()
    }

    pub async fn remove(&self, game_pk: u64) {
        let mut games = self.games.write().await;
        games.remove(&game_pk);
    }
}
