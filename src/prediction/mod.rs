pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

mod errors;

pub use errors::PredictionError;
pub use models::{Prediction, Resolution, ResolutionUpdate};
pub use repository::{
    InMemoryPredictionRepository, PostgresPredictionRepository, PredictionRepository,
};
pub use service::PredictionService;
