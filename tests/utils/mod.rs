pub mod assertions;
pub mod game_builders;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use assertions::{assert_pending, assert_resolved, score_of};
pub use game_builders::GameBuilder;
#[allow(unused_imports)]
pub use mocks::{
    CorruptPredictionRepository, FlakyPredictionRepository, GatedGameFeed, StalledGameFeed,
};
#[allow(unused_imports)]
pub use setup::{fast_retries, predict, predict_category, TestSetup, TestSetupBuilder, GAME_PK};
