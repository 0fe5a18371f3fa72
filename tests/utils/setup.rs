use std::sync::Arc;
use std::time::Duration;

use pitchcall::{
    config::ResolutionConfig, AtBatOutcome, EventBus, OutcomeCategory, Prediction,
    PredictionRepository, ResolutionService,
};

use super::mocks::FlakyPredictionRepository;

pub const GAME_PK: u64 = 745_804;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub repository: Arc<FlakyPredictionRepository>,
    pub resolution: Arc<ResolutionService>,
    pub event_bus: EventBus,
}

impl TestSetup {
    /// A second, independent orchestrator over the same store, as another
    /// process would have
    pub fn second_orchestrator(&self) -> ResolutionService {
        ResolutionService::builder(self.repository.clone())
            .with_config(fast_retries())
            .build()
    }
}

pub struct TestSetupBuilder {
    predictions: Vec<Prediction>,
    config: ResolutionConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            predictions: vec![],
            config: fast_retries(),
        }
    }

    pub fn with_config(mut self, config: ResolutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_prediction(mut self, prediction: Prediction) -> Self {
        self.predictions.push(prediction);
        self
    }

    pub fn with_predictions(mut self, predictions: impl IntoIterator<Item = Prediction>) -> Self {
        self.predictions.extend(predictions);
        self
    }

    pub fn build(self) -> TestSetup {
        let repository = Arc::new(FlakyPredictionRepository::with_predictions(
            self.predictions,
        ));
        let event_bus = EventBus::new();
        let resolution = Arc::new(
            ResolutionService::builder(repository.clone() as Arc<dyn PredictionRepository>)
                .with_event_bus(event_bus.clone())
                .with_config(self.config)
                .build(),
        );

        TestSetup {
            repository,
            resolution,
            event_bus,
        }
    }
}

/// Default resolution settings with millisecond backoff
pub fn fast_retries() -> ResolutionConfig {
    ResolutionConfig {
        retry_base_delay: Duration::from_millis(1),
        ..ResolutionConfig::default()
    }
}

pub fn predict(user_id: &str, at_bat_index: u32, outcome: AtBatOutcome) -> Prediction {
    Prediction::new(user_id, GAME_PK, at_bat_index, outcome, None)
}

pub fn predict_category(
    user_id: &str,
    at_bat_index: u32,
    outcome: AtBatOutcome,
    category: OutcomeCategory,
) -> Prediction {
    Prediction::new(user_id, GAME_PK, at_bat_index, outcome, Some(category))
}
