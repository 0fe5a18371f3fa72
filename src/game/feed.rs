use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use super::models::GameSnapshot;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Upstream request failed: {0}")]
    Upstream(String),
}

/// Source of current game state. The real implementation talks to the
/// stats provider; the engine only needs "the game that is on now".
#[async_trait]
pub trait GameFeed: Send + Sync {
    /// Returns the game currently being followed, or `None` when nothing is
    /// scheduled
    async fn fetch_current_game(&self) -> Result<Option<GameSnapshot>, FeedError>;

    fn name(&self) -> &'static str;
}

/// Feed backed by whatever snapshot was last pushed into it
#[derive(Debug, Default)]
pub struct InMemoryGameFeed {
    current: RwLock<Option<GameSnapshot>>,
}

impl InMemoryGameFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_game(game: GameSnapshot) -> Self {
        Self {
            current: RwLock::new(Some(game)),
        }
    }

    pub async fn set_current(&self, game: GameSnapshot) {
        debug!(game_pk = game.game_pk, plays = game.plays.len(), "Updating current game");
        *self.current.write().await = Some(game);
    }

    pub async fn clear(&self) {
        *self.current.write().await = None;
    }
}

#[async_trait]
impl GameFeed for InMemoryGameFeed {
    async fn fetch_current_game(&self) -> Result<Option<GameSnapshot>, FeedError> {
        Ok(self.current.read().await.clone())
    }

    fn name(&self) -> &'static str {
        "InMemoryGameFeed"
    }
}
