use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::{Prediction, PredictionError, PredictionRepository};
use crate::config::PredictionRules;
use crate::game::GameStateCache;
use crate::outcome::{AtBatOutcome, OutcomeCategory};
use crate::resolution::ResolutionCache;

/// Intake side of predictions: validates lifecycle rules before storing
pub struct PredictionService {
    repository: Arc<dyn PredictionRepository>,
    game_state: Arc<GameStateCache>,
    rules: PredictionRules,
    resolution_cache: Option<ResolutionCache>,
}

impl PredictionService {
    pub fn new(
        repository: Arc<dyn PredictionRepository>,
        game_state: Arc<GameStateCache>,
        rules: PredictionRules,
    ) -> Self {
        Self {
            repository,
            game_state,
            rules,
            resolution_cache: None,
        }
    }

    /// Lets intake reopen an at-bat that a resolution pass closed while a
    /// prediction for it was being stored
    pub fn with_resolution_cache(mut self, cache: ResolutionCache) -> Self {
        self.resolution_cache = Some(cache);
        self
    }

    #[instrument(skip(self))]
    pub async fn create_prediction(
        &self,
        user_id: &str,
        game_pk: u64,
        at_bat_index: u32,
        predicted_outcome: AtBatOutcome,
        predicted_category: Option<OutcomeCategory>,
    ) -> Result<Prediction, PredictionError> {
        if user_id.trim().is_empty() {
            return Err(PredictionError::Validation("User ID cannot be empty".to_string()));
        }

        if !predicted_outcome.is_scorable() {
            return Err(PredictionError::Validation(format!(
                "{predicted_outcome} is not a plate appearance result"
            )));
        }

        if let Some(category) = predicted_category {
            if category != predicted_outcome.category() {
                return Err(PredictionError::Validation(format!(
                    "Category {category} does not contain outcome {predicted_outcome}"
                )));
            }
        }

        self.check_window(game_pk, at_bat_index).await?;

        let prediction = Prediction::new(
            user_id,
            game_pk,
            at_bat_index,
            predicted_outcome,
            predicted_category,
        );
        self.repository.insert_prediction(&prediction).await?;
        self.reopen_if_closed(game_pk, at_bat_index).await;

        info!(
            prediction_id = %prediction.id,
            user_id = %user_id,
            game_pk,
            at_bat_index,
            outcome = %predicted_outcome,
            "Prediction created"
        );
        Ok(prediction)
    }

    pub async fn predictions_for_game(
        &self,
        game_pk: u64,
        user_id: Option<&str>,
    ) -> Result<Vec<Prediction>, PredictionError> {
        let predictions = self.repository.predictions_for_game(game_pk).await?;
        Ok(match user_id {
            Some(user_id) => predictions
                .into_iter()
                .filter(|p| p.user_id == user_id)
                .collect(),
            None => predictions,
        })
    }

    /// The window check and the insert are not atomic. If the at-bat completed
    /// in between, a pass may already have cached it as resolved without this
    /// prediction, so the cache entry is dropped and the next pass picks it up.
    async fn reopen_if_closed(&self, game_pk: u64, at_bat_index: u32) {
        let Some(cache) = &self.resolution_cache else {
            return;
        };
        let closed = self
            .game_state
            .get(game_pk)
            .await
            .is_some_and(|state| state.is_at_bat_complete(at_bat_index));
        if closed {
            debug!(game_pk, at_bat_index, "At-bat completed during intake, reopening");
            cache.invalidate(game_pk, at_bat_index).await;
        }
    }

    /// Predictions close once the at-bat has a result, or once the count of
    /// the live at-bat reaches the risk threshold.
    async fn check_window(&self, game_pk: u64, at_bat_index: u32) -> Result<(), PredictionError> {
        let state = self
            .game_state
            .get(game_pk)
            .await
            .ok_or_else(|| PredictionError::NotFound(format!("Game {game_pk} is not tracked")))?;

        if !state.snapshot.is_live() {
            return Err(PredictionError::Validation(format!("Game {game_pk} is not live")));
        }

        if state.is_at_bat_complete(at_bat_index) {
            return Err(PredictionError::Validation(format!(
                "At-bat {at_bat_index} is already complete"
            )));
        }

        if let Some(current) = &state.current_at_bat {
            if at_bat_index < current.at_bat_index {
                return Err(PredictionError::Validation(format!(
                    "At-bat {at_bat_index} has already been played"
                )));
            }

            if at_bat_index == current.at_bat_index
                && (current.count.balls >= self.rules.risk_balls
                    || current.count.strikes >= self.rules.risk_strikes)
            {
                return Err(PredictionError::Validation(format!(
                    "Predictions for at-bat {at_bat_index} closed at a {}-{} count",
                    current.count.balls, current.count.strikes
                )));
            }
        }

        Ok(())
    }
}
