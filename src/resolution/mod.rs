// Resolution orchestration: completed at-bats in, persisted scores out

pub use cache::ResolutionCache;
pub use errors::ResolutionError;
pub use report::{AtBatFailure, AtBatResolution, GameResolutionReport};
pub use service::{ResolutionService, ResolutionServiceBuilder};

mod cache;
mod errors;
mod report;
mod service;
