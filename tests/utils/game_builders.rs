use rand::seq::SliceRandom;

use pitchcall::game::{Count, GameSnapshot, GameStatus, Play, PlayResult};

use super::setup::GAME_PK;

// ============================================================================
// Game Setup Utilities
// ============================================================================

pub struct GameBuilder {
    game_pk: u64,
    status: GameStatus,
    plays: Vec<Play>,
}

impl GameBuilder {
    pub fn new() -> Self {
        Self {
            game_pk: GAME_PK,
            status: GameStatus::Live,
            plays: vec![],
        }
    }

    pub fn with_status(mut self, status: GameStatus) -> Self {
        self.status = status;
        self
    }

    /// A finished at-bat carrying `event_type`
    pub fn completed(self, at_bat_index: u32, event_type: &str) -> Self {
        self.with_result(
            at_bat_index,
            PlayResult {
                result_type: Some("atBat".to_string()),
                event_type: Some(event_type.to_string()),
                ..PlayResult::default()
            },
        )
    }

    pub fn with_result(mut self, at_bat_index: u32, result: PlayResult) -> Self {
        self.plays.push(Play {
            at_bat_index,
            result,
            ..Play::default()
        });
        self
    }

    /// The at-bat in progress at the given count
    pub fn in_progress(mut self, at_bat_index: u32, balls: u8, strikes: u8) -> Self {
        self.plays.push(Play {
            at_bat_index,
            result: PlayResult {
                event_type: Some("in_progress".to_string()),
                ..PlayResult::default()
            },
            count: Count {
                balls,
                strikes,
                outs: 0,
            },
            ..Play::default()
        });
        self
    }

    /// Upstream does not promise any play order
    pub fn shuffled(mut self) -> Self {
        self.plays.shuffle(&mut rand::rng());
        self
    }

    pub fn build(self) -> GameSnapshot {
        GameSnapshot {
            game_pk: self.game_pk,
            status: self.status,
            plays: self.plays,
        }
    }
}
