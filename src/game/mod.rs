// Public API
pub use feed::{FeedError, GameFeed, InMemoryGameFeed};
pub use models::{Count, GameSnapshot, GameStatus, Matchup, Play, PlayResult};
pub use state_cache::{CurrentAtBat, GameState, GameStateCache};

// Internal modules
mod feed;
pub mod handlers;
pub mod models;
mod state_cache;
