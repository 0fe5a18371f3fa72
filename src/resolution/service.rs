use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};

use super::{
    AtBatFailure, AtBatResolution, GameResolutionReport, ResolutionCache, ResolutionError,
};
use crate::config::ResolutionConfig;
use crate::event::{EventBus, GameEvent};
use crate::game::GameSnapshot;
use crate::outcome::{classify_result, AtBatOutcome, OutcomeClassifier};
use crate::prediction::{
    Prediction, PredictionError, PredictionRepository, Resolution, ResolutionUpdate,
};
use crate::scoring::{score, StreakTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOutcome {
    Applied,
    AlreadyResolved,
    Failed,
}

/// Resolves completed at-bats: classifies, scores and persists every pending
/// prediction exactly once.
///
/// Safe to call any number of times from any number of callers. Writes are
/// conditional on the prediction still being pending, so concurrent passes
/// converge on a single resolution per prediction.
pub struct ResolutionService {
    repository: Arc<dyn PredictionRepository>,
    streaks: StreakTracker,
    classifier: Arc<OutcomeClassifier>,
    cache: ResolutionCache,
    event_bus: EventBus,
    config: ResolutionConfig,
    game_mutexes: Arc<RwLock<HashMap<u64, Arc<AsyncMutex<()>>>>>,
}

impl ResolutionService {
    pub fn builder(repository: Arc<dyn PredictionRepository>) -> ResolutionServiceBuilder {
        ResolutionServiceBuilder::new(repository)
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn classifier(&self) -> &Arc<OutcomeClassifier> {
        &self.classifier
    }

    /// Resolves every pending prediction of one at-bat against `actual_outcome`
    #[instrument(skip(self))]
    pub async fn resolve_at_bat(
        &self,
        game_pk: u64,
        at_bat_index: u32,
        actual_outcome: AtBatOutcome,
    ) -> Result<AtBatResolution, ResolutionError> {
        let game_lock = self.game_lock(game_pk).await;
        let _guard = game_lock.lock().await;

        self.resolve_at_bat_locked(game_pk, at_bat_index, actual_outcome)
            .await
    }

    /// Resolves every completed play of `game` not known to be resolved yet,
    /// in ascending at-bat order. Failures are confined to their at-bat and
    /// reported; they never abort the pass.
    #[instrument(skip(self, game), fields(plays = game.plays.len()))]
    pub async fn resolve_all_completed(
        &self,
        game_pk: u64,
        game: &GameSnapshot,
    ) -> GameResolutionReport {
        let game_lock = self.game_lock(game_pk).await;
        let _guard = game_lock.lock().await;

        let mut report = GameResolutionReport::new(game_pk);
        self.warm_cache(game_pk).await;

        for play in game.completed_plays() {
            let at_bat_index = play.at_bat_index;
            if self.cache.contains(game_pk, at_bat_index).await {
                report.cached += 1;
                continue;
            }

            let classification = classify_result(&play.result);
            if classification.is_unmapped() {
                report.unmapped += 1;
                // at-bats left pending are classified again next pass
                if self.cache.flag_unmapped(game_pk, at_bat_index).await {
                    self.classifier.record_unmapped(&classification);
                }
            }

            match self
                .resolve_at_bat_locked(game_pk, at_bat_index, classification.outcome)
                .await
            {
                Ok(resolution) => report.at_bats.push(resolution),
                Err(e) => {
                    if !e.is_critical() {
                        warn!(game_pk, at_bat_index, error = %e, "At-bat resolution failed");
                    }
                    report.failures.push(AtBatFailure {
                        at_bat_index,
                        critical: e.is_critical(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            game_pk,
            resolved = report.resolved(),
            pending = report.pending(),
            cached = report.cached,
            unmapped = report.unmapped,
            failures = report.failures.len(),
            "Resolution pass completed"
        );
        report
    }

    async fn resolve_at_bat_locked(
        &self,
        game_pk: u64,
        at_bat_index: u32,
        actual_outcome: AtBatOutcome,
    ) -> Result<AtBatResolution, ResolutionError> {
        let generation = self.cache.generation(game_pk).await;
        let predictions = self
            .timed(
                "predictions_for_at_bat",
                self.repository.predictions_for_at_bat(game_pk, at_bat_index),
            )
            .await?;
        check_consistency(game_pk, at_bat_index, &predictions)?;

        let mut report = AtBatResolution::new(game_pk, at_bat_index, actual_outcome);
        let mut updates = Vec::new();

        for prediction in &predictions {
            if prediction.is_resolved() {
                report.already_resolved += 1;
                continue;
            }

            // each user has one prediction per at-bat, so streaks read here
            // cannot depend on another write in this batch
            match self
                .timed(
                    "current_streak",
                    self.streaks.current_streak(&prediction.user_id),
                )
                .await
            {
                Ok(streak) => updates.push(build_update(prediction, actual_outcome, streak)),
                Err(e) => {
                    warn!(
                        prediction_id = %prediction.id,
                        user_id = %prediction.user_id,
                        error = %e,
                        "Could not read streak; prediction left pending"
                    );
                    report.failed.push(prediction.id);
                }
            }
        }

        if !updates.is_empty() {
            self.write_updates(&updates, &mut report).await;
        }

        // an at-bat with no predictions yet may still receive a late one
        if report.is_complete() && !predictions.is_empty() {
            self.cache
                .mark_resolved(game_pk, at_bat_index, generation)
                .await;
        }

        if report.resolved > 0 {
            self.event_bus
                .emit(GameEvent::PredictionsResolved {
                    game_pk,
                    at_bat_index,
                    outcome: actual_outcome,
                    resolved: report.resolved,
                })
                .await;
        }
        if !report.is_complete() {
            self.event_bus
                .emit(GameEvent::ResolutionIncomplete {
                    game_pk,
                    at_bat_index,
                    pending: report.failed.len(),
                })
                .await;
        }

        debug!(
            game_pk,
            at_bat_index,
            outcome = %actual_outcome,
            resolved = report.resolved,
            already_resolved = report.already_resolved,
            failed = report.failed.len(),
            "At-bat resolved"
        );
        Ok(report)
    }

    /// One batch write first; per-prediction writes with retries if it fails
    async fn write_updates(&self, updates: &[ResolutionUpdate], report: &mut AtBatResolution) {
        match timeout(
            self.config.store_timeout,
            self.repository.resolve_batch(updates),
        )
        .await
        {
            Ok(Ok(applied)) => {
                report.resolved += applied;
                report.already_resolved += updates.len().saturating_sub(applied);
                return;
            }
            Ok(Err(e)) => {
                warn!(error = %e, count = updates.len(), "Batch resolution failed, writing individually");
            }
            Err(_) => {
                warn!(count = updates.len(), "Batch resolution timed out, writing individually");
            }
        }

        for update in updates {
            match self.write_with_retry(update).await {
                WriteOutcome::Applied => report.resolved += 1,
                WriteOutcome::AlreadyResolved => report.already_resolved += 1,
                WriteOutcome::Failed => report.failed.push(update.prediction_id),
            }
        }
    }

    async fn write_with_retry(&self, update: &ResolutionUpdate) -> WriteOutcome {
        let max_attempts = self.config.max_write_attempts.max(1);

        for attempt in 0..max_attempts {
            match self.write_if_pending(update).await {
                Ok(true) => {
                    if attempt > 0 {
                        info!(
                            prediction_id = %update.prediction_id,
                            attempt = attempt + 1,
                            "Resolution written after retry"
                        );
                    }
                    return WriteOutcome::Applied;
                }
                Ok(false) => return WriteOutcome::AlreadyResolved,
                Err(e) => {
                    warn!(
                        prediction_id = %update.prediction_id,
                        attempt = attempt + 1,
                        max_attempts,
                        error = %e,
                        "Resolution write failed"
                    );

                    if attempt + 1 < max_attempts {
                        let delay = self
                            .config
                            .retry_base_delay
                            .saturating_mul(2_u32.saturating_pow(attempt));
                        sleep(delay).await;
                    }
                }
            }
        }

        error!(
            prediction_id = %update.prediction_id,
            user_id = %update.user_id,
            attempts = max_attempts,
            "Resolution write failed permanently; prediction left pending"
        );
        WriteOutcome::Failed
    }

    /// Re-reads the prediction right before writing and skips it if another
    /// pass got there first
    async fn write_if_pending(&self, update: &ResolutionUpdate) -> Result<bool, ResolutionError> {
        let current = self
            .timed(
                "get_prediction",
                self.repository.get_prediction(update.prediction_id),
            )
            .await?;

        match current {
            Some(prediction) if !prediction.is_resolved() => {
                self.timed(
                    "resolve_prediction",
                    self.repository.resolve_prediction(update),
                )
                .await
            }
            Some(_) => Ok(false),
            None => {
                warn!(prediction_id = %update.prediction_id, "Prediction disappeared before resolution");
                Ok(false)
            }
        }
    }

    async fn warm_cache(&self, game_pk: u64) {
        if self.cache.is_loaded(game_pk).await {
            return;
        }
        let generation = self.cache.generation(game_pk).await;

        match self
            .timed(
                "resolved_at_bats",
                self.repository.resolved_at_bats(game_pk),
            )
            .await
        {
            Ok(resolved) => {
                let count = resolved.len();
                if self.cache.load(game_pk, resolved, generation).await {
                    debug!(game_pk, count, "Resolution cache loaded");
                }
            }
            Err(e) => {
                warn!(game_pk, error = %e, "Could not load resolution cache; checking at-bats against the store");
            }
        }
    }

    async fn timed<T, F>(&self, operation: &'static str, future: F) -> Result<T, ResolutionError>
    where
        F: Future<Output = Result<T, PredictionError>>,
    {
        match timeout(self.config.store_timeout, future).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ResolutionError::Timeout { operation }),
        }
    }

    async fn game_lock(&self, game_pk: u64) -> Arc<AsyncMutex<()>> {
        {
            let guard = self.game_mutexes.read().await;
            if let Some(lock) = guard.get(&game_pk) {
                return lock.clone();
            }
        }

        let mut guard = self.game_mutexes.write().await;
        guard
            .entry(game_pk)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drops per-game state once a game is over
    pub async fn forget_game(&self, game_pk: u64) {
        self.cache.clear(game_pk).await;
        self.game_mutexes.write().await.remove(&game_pk);
        self.event_bus.close(game_pk).await;
    }
}

/// Every prediction fetched for an at-bat must belong to it. Anything else
/// means the store or the query is corrupt, and nothing may be written.
fn check_consistency(
    game_pk: u64,
    at_bat_index: u32,
    predictions: &[Prediction],
) -> Result<(), ResolutionError> {
    let stray = predictions
        .iter()
        .find(|p| p.game_pk != game_pk || p.at_bat_index != at_bat_index);

    match stray {
        None => Ok(()),
        Some(prediction) => {
            error!(
                critical = true,
                game_pk,
                at_bat_index,
                prediction_id = %prediction.id,
                found_game_pk = prediction.game_pk,
                found_index = prediction.at_bat_index,
                "Consistency violation: prediction does not belong to the at-bat being resolved"
            );
            Err(ResolutionError::ConsistencyViolation {
                game_pk,
                at_bat_index,
                prediction_id: prediction.id,
                found_index: prediction.at_bat_index,
            })
        }
    }
}

fn build_update(
    prediction: &Prediction,
    actual_outcome: AtBatOutcome,
    current_streak: u32,
) -> ResolutionUpdate {
    let breakdown = score(
        prediction.predicted_outcome,
        prediction.effective_category(),
        actual_outcome,
        current_streak,
    );

    ResolutionUpdate {
        prediction_id: prediction.id,
        user_id: prediction.user_id.clone(),
        resolution: Resolution {
            actual_outcome,
            actual_category: actual_outcome.category(),
            is_exact: breakdown.is_exact,
            is_category_correct: breakdown.is_category_correct,
            points_earned: breakdown.total(),
            streak_count: breakdown.streak_count,
            streak_bonus: breakdown.streak_bonus,
            resolved_at: Utc::now(),
        },
    }
}

pub struct ResolutionServiceBuilder {
    repository: Arc<dyn PredictionRepository>,
    classifier: Option<Arc<OutcomeClassifier>>,
    event_bus: Option<EventBus>,
    cache: Option<ResolutionCache>,
    config: ResolutionConfig,
}

impl ResolutionServiceBuilder {
    fn new(repository: Arc<dyn PredictionRepository>) -> Self {
        Self {
            repository,
            classifier: None,
            event_bus: None,
            cache: None,
            config: ResolutionConfig::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<OutcomeClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_cache(mut self, cache: ResolutionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_config(mut self, config: ResolutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> ResolutionService {
        let streaks = StreakTracker::new(self.repository.clone(), self.config.streak_window);
        ResolutionService {
            repository: self.repository,
            streaks,
            classifier: self.classifier.unwrap_or_default(),
            cache: self.cache.unwrap_or_default(),
            event_bus: self.event_bus.unwrap_or_default(),
            config: self.config,
            game_mutexes: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameStatus, Play, PlayResult};
    use crate::outcome::OutcomeCategory;
    use crate::prediction::InMemoryPredictionRepository;
    use crate::scoring::exact_points;

    const GAME: u64 = 745_001;

    fn play(at_bat_index: u32, event_type: &str) -> Play {
        Play {
            at_bat_index,
            result: PlayResult {
                event_type: Some(event_type.to_string()),
                ..PlayResult::default()
            },
            ..Play::default()
        }
    }

    fn live_game(plays: Vec<Play>) -> GameSnapshot {
        GameSnapshot {
            game_pk: GAME,
            status: GameStatus::Live,
            plays,
        }
    }

    fn service_with(
        predictions: Vec<Prediction>,
    ) -> (ResolutionService, Arc<InMemoryPredictionRepository>) {
        let repo = Arc::new(InMemoryPredictionRepository::with_predictions(predictions));
        (ResolutionService::builder(repo.clone()).build(), repo)
    }

    async fn resolution_of(repo: &InMemoryPredictionRepository, id: uuid::Uuid) -> Resolution {
        repo.get_prediction(id)
            .await
            .unwrap()
            .unwrap()
            .resolution
            .expect("prediction should be resolved")
    }

    #[tokio::test]
    async fn exact_call_is_scored_and_persisted() {
        let prediction = Prediction::new("alice", GAME, 0, AtBatOutcome::HomeRun, None);
        let (service, repo) = service_with(vec![prediction.clone()]);

        let result = service
            .resolve_at_bat(GAME, 0, AtBatOutcome::HomeRun)
            .await
            .unwrap();

        assert_eq!(result.resolved, 1);
        assert!(result.is_complete());
        let resolution = resolution_of(&repo, prediction.id).await;
        assert!(resolution.is_exact);
        assert!(resolution.is_correct());
        assert_eq!(resolution.points_earned, exact_points(AtBatOutcome::HomeRun));
        assert_eq!(resolution.streak_bonus, 0);
        assert_eq!(resolution.streak_count, 1);
        assert!(service.cache().contains(GAME, 0).await);
    }

    #[tokio::test]
    async fn resolving_twice_changes_nothing() {
        let prediction = Prediction::new("alice", GAME, 0, AtBatOutcome::Single, None);
        let (service, repo) = service_with(vec![prediction.clone()]);

        service
            .resolve_at_bat(GAME, 0, AtBatOutcome::Double)
            .await
            .unwrap();
        let first = resolution_of(&repo, prediction.id).await;

        let again = service
            .resolve_at_bat(GAME, 0, AtBatOutcome::Double)
            .await
            .unwrap();
        assert_eq!(again.resolved, 0);
        assert_eq!(again.already_resolved, 1);
        assert_eq!(resolution_of(&repo, prediction.id).await, first);
    }

    #[tokio::test]
    async fn streak_builds_across_completed_at_bats() {
        let predictions: Vec<Prediction> = (0..3)
            .map(|i| Prediction::new("alice", GAME, i, AtBatOutcome::Single, None))
            .collect();
        let (service, repo) = service_with(predictions.clone());

        let game = live_game(vec![play(2, "single"), play(0, "single"), play(1, "double")]);
        let report = service.resolve_all_completed(GAME, &game).await;

        assert!(report.is_clean());
        let indices: Vec<u32> = report.at_bats.iter().map(|a| a.at_bat_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let streaks: Vec<(u32, u32)> = {
            let mut out = Vec::new();
            for prediction in &predictions {
                let r = resolution_of(&repo, prediction.id).await;
                out.push((r.streak_count, r.streak_bonus));
            }
            out
        };
        assert_eq!(streaks, vec![(1, 0), (2, 1), (3, 3)]);
    }

    #[tokio::test]
    async fn void_play_resolves_with_no_points_and_keeps_streak() {
        let earlier = Prediction::new("alice", GAME, 0, AtBatOutcome::Walk, None);
        let void = Prediction::new("alice", GAME, 1, AtBatOutcome::Walk, None);
        let later = Prediction::new("alice", GAME, 2, AtBatOutcome::Walk, None);
        let (service, repo) = service_with(vec![earlier, void.clone(), later.clone()]);

        let game = live_game(vec![
            play(0, "walk"),
            play(1, "pitching_substitution"),
            play(2, "walk"),
        ]);
        service.resolve_all_completed(GAME, &game).await;

        let void_resolution = resolution_of(&repo, void.id).await;
        assert_eq!(void_resolution.points_earned, 0);
        assert_eq!(void_resolution.actual_category, OutcomeCategory::Administrative);
        assert_eq!(resolution_of(&repo, later.id).await.streak_count, 2);
    }

    #[tokio::test]
    async fn unmapped_event_falls_back_and_is_counted() {
        let prediction = Prediction::new("alice", GAME, 0, AtBatOutcome::FieldOut, None);
        let (service, repo) = service_with(vec![prediction.clone()]);

        let game = live_game(vec![play(0, "robo_ump_overturn")]);
        let report = service.resolve_all_completed(GAME, &game).await;

        assert_eq!(report.unmapped, 1);
        assert_eq!(service.classifier().unmapped_events().total(), 1);
        let resolution = resolution_of(&repo, prediction.id).await;
        assert_eq!(resolution.actual_outcome, AtBatOutcome::FieldOut);
    }

    #[tokio::test]
    async fn cached_at_bats_are_skipped() {
        let prediction = Prediction::new("alice", GAME, 0, AtBatOutcome::Strikeout, None);
        let (service, _) = service_with(vec![prediction]);
        let game = live_game(vec![play(0, "strikeout"), play(1, "single")]);

        let first = service.resolve_all_completed(GAME, &game).await;
        assert_eq!(first.at_bats.len(), 2);

        // at-bat 1 had nobody predicting it, so it stays open to late writes
        let second = service.resolve_all_completed(GAME, &game).await;
        assert_eq!(second.cached, 1);
        let rechecked: Vec<u32> = second.at_bats.iter().map(|a| a.at_bat_index).collect();
        assert_eq!(rechecked, vec![1]);
        assert_eq!(second.resolved(), 0);
    }

    #[tokio::test]
    async fn prediction_stored_after_an_empty_pass_is_resolved_next_pass() {
        let (service, repo) = service_with(vec![]);
        let game = live_game(vec![play(5, "single")]);

        let first = service.resolve_all_completed(GAME, &game).await;
        assert_eq!(first.resolved(), 0);
        assert!(!service.cache().contains(GAME, 5).await);

        let late = Prediction::new("alice", GAME, 5, AtBatOutcome::Single, None);
        repo.insert_prediction(&late).await.unwrap();

        let second = service.resolve_all_completed(GAME, &game).await;
        assert_eq!(second.resolved(), 1);
        assert!(resolution_of(&repo, late.id).await.is_exact);
        assert!(service.cache().contains(GAME, 5).await);
    }

    #[tokio::test]
    async fn invalidated_at_bat_is_rechecked() {
        let early = Prediction::new("alice", GAME, 2, AtBatOutcome::Walk, None);
        let (service, repo) = service_with(vec![early]);
        let game = live_game(vec![play(2, "walk")]);

        service.resolve_all_completed(GAME, &game).await;
        assert!(service.cache().contains(GAME, 2).await);

        let late = Prediction::new("bob", GAME, 2, AtBatOutcome::Walk, None);
        repo.insert_prediction(&late).await.unwrap();
        service.cache().invalidate(GAME, 2).await;

        let report = service.resolve_all_completed(GAME, &game).await;
        assert_eq!(report.resolved(), 1);
        assert!(resolution_of(&repo, late.id).await.is_exact);
    }

    #[tokio::test]
    async fn unmapped_play_rechecked_each_pass_is_counted_once() {
        // nobody predicted the at-bat, so every pass classifies it again
        let (service, _) = service_with(vec![]);
        let game = live_game(vec![play(0, "robo_ump_overturn")]);

        for _ in 0..3 {
            let report = service.resolve_all_completed(GAME, &game).await;
            assert_eq!(report.unmapped, 1);
            assert_eq!(report.cached, 0);
        }
        assert_eq!(service.classifier().unmapped_events().total(), 1);
    }

    #[tokio::test]
    async fn emits_event_only_for_applied_writes() {
        let prediction = Prediction::new("alice", GAME, 3, AtBatOutcome::Walk, None);
        let repo = Arc::new(InMemoryPredictionRepository::with_predictions(vec![
            prediction,
        ]));
        let bus = EventBus::new();
        let mut events = bus.subscribe(GAME).await;
        let service = ResolutionService::builder(repo)
            .with_event_bus(bus)
            .build();

        service
            .resolve_at_bat(GAME, 3, AtBatOutcome::Walk)
            .await
            .unwrap();
        service
            .resolve_at_bat(GAME, 3, AtBatOutcome::Walk)
            .await
            .unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            GameEvent::PredictionsResolved {
                game_pk: GAME,
                at_bat_index: 3,
                outcome: AtBatOutcome::Walk,
                resolved: 1,
            }
        );
        assert!(events.try_recv().is_err());
    }
}
