use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use pitchcall::{
    game::{FeedError, GameFeed, GameSnapshot},
    prediction::{PredictionError, ResolutionUpdate},
    InMemoryPredictionRepository, Prediction, PredictionRepository,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// In-memory store whose resolution writes can be made to fail on demand
#[derive(Default)]
pub struct FlakyPredictionRepository {
    inner: InMemoryPredictionRepository,
    fail_batches: AtomicBool,
    /// Single writes left to fail before they start succeeding
    failing_writes: AtomicU32,
    fail_all_writes: AtomicBool,
    write_attempts: AtomicU32,
    batch_attempts: AtomicU32,
    /// When each single write was attempted
    write_times: Mutex<Vec<Instant>>,
    read_delay: Mutex<Option<Duration>>,
    batch_delay: Mutex<Option<Duration>>,
    gate_inserts: AtomicBool,
    insert_entered: Notify,
    insert_release: Notify,
}

impl FlakyPredictionRepository {
    pub fn with_predictions(predictions: Vec<Prediction>) -> Self {
        Self {
            inner: InMemoryPredictionRepository::with_predictions(predictions),
            ..Self::default()
        }
    }

    pub fn fail_batches(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn fail_all_writes(&self, fail: bool) {
        self.fail_all_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_attempts(&self) -> u32 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn batch_attempts(&self) -> u32 {
        self.batch_attempts.load(Ordering::SeqCst)
    }

    pub fn write_times(&self) -> Vec<Instant> {
        self.write_times.lock().unwrap().clone()
    }

    /// Stalls every at-bat read by `delay`
    pub fn slow_reads(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    /// Stalls every batch write by `delay`
    pub fn slow_batches(&self, delay: Duration) {
        *self.batch_delay.lock().unwrap() = Some(delay);
    }

    /// Parks every insert until [`release_insert`](Self::release_insert)
    pub fn gate_inserts(&self) {
        self.gate_inserts.store(true, Ordering::SeqCst);
    }

    pub async fn wait_for_insert(&self) {
        self.insert_entered.notified().await;
    }

    pub fn release_insert(&self) {
        self.insert_release.notify_one();
    }

    async fn stall(delay: &Mutex<Option<Duration>>) {
        let delay = *delay.lock().unwrap();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
    }

    fn injected_failure(&self) -> Option<PredictionError> {
        if self.fail_all_writes.load(Ordering::SeqCst) {
            return Some(PredictionError::Repository("write rejected".into()));
        }
        let consumed = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        consumed.then(|| PredictionError::Repository("transient write failure".into()))
    }
}

#[async_trait]
impl PredictionRepository for FlakyPredictionRepository {
    async fn insert_prediction(&self, prediction: &Prediction) -> Result<(), PredictionError> {
        if self.gate_inserts.load(Ordering::SeqCst) {
            self.insert_entered.notify_one();
            self.insert_release.notified().await;
        }
        self.inner.insert_prediction(prediction).await
    }

    async fn get_prediction(&self, id: Uuid) -> Result<Option<Prediction>, PredictionError> {
        self.inner.get_prediction(id).await
    }

    async fn predictions_for_at_bat(
        &self,
        game_pk: u64,
        at_bat_index: u32,
    ) -> Result<Vec<Prediction>, PredictionError> {
        Self::stall(&self.read_delay).await;
        self.inner.predictions_for_at_bat(game_pk, at_bat_index).await
    }

    async fn predictions_for_game(&self, game_pk: u64) -> Result<Vec<Prediction>, PredictionError> {
        self.inner.predictions_for_game(game_pk).await
    }

    async fn recent_resolved_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Prediction>, PredictionError> {
        self.inner.recent_resolved_for_user(user_id, limit).await
    }

    async fn resolved_at_bats(&self, game_pk: u64) -> Result<HashSet<u32>, PredictionError> {
        self.inner.resolved_at_bats(game_pk).await
    }

    async fn resolve_batch(&self, updates: &[ResolutionUpdate]) -> Result<usize, PredictionError> {
        self.batch_attempts.fetch_add(1, Ordering::SeqCst);
        Self::stall(&self.batch_delay).await;
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(PredictionError::Repository("batch rejected".into()));
        }
        self.inner.resolve_batch(updates).await
    }

    async fn resolve_prediction(&self, update: &ResolutionUpdate) -> Result<bool, PredictionError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        self.write_times.lock().unwrap().push(Instant::now());
        if let Some(error) = self.injected_failure() {
            return Err(error);
        }
        self.inner.resolve_prediction(update).await
    }
}

/// Store that slips a prediction from another at-bat into at-bat reads
pub struct CorruptPredictionRepository {
    inner: InMemoryPredictionRepository,
    stray: Mutex<Option<Prediction>>,
}

impl CorruptPredictionRepository {
    pub fn new(predictions: Vec<Prediction>, stray: Prediction) -> Self {
        Self {
            inner: InMemoryPredictionRepository::with_predictions(predictions),
            stray: Mutex::new(Some(stray)),
        }
    }

    pub fn heal(&self) {
        self.stray.lock().unwrap().take();
    }
}

#[async_trait]
impl PredictionRepository for CorruptPredictionRepository {
    async fn insert_prediction(&self, prediction: &Prediction) -> Result<(), PredictionError> {
        self.inner.insert_prediction(prediction).await
    }

    async fn get_prediction(&self, id: Uuid) -> Result<Option<Prediction>, PredictionError> {
        self.inner.get_prediction(id).await
    }

    async fn predictions_for_at_bat(
        &self,
        game_pk: u64,
        at_bat_index: u32,
    ) -> Result<Vec<Prediction>, PredictionError> {
        let mut predictions = self.inner.predictions_for_at_bat(game_pk, at_bat_index).await?;
        if let Some(stray) = self.stray.lock().unwrap().clone() {
            predictions.push(stray);
        }
        Ok(predictions)
    }

    async fn predictions_for_game(&self, game_pk: u64) -> Result<Vec<Prediction>, PredictionError> {
        self.inner.predictions_for_game(game_pk).await
    }

    async fn recent_resolved_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Prediction>, PredictionError> {
        self.inner.recent_resolved_for_user(user_id, limit).await
    }

    async fn resolved_at_bats(&self, game_pk: u64) -> Result<HashSet<u32>, PredictionError> {
        self.inner.resolved_at_bats(game_pk).await
    }

    async fn resolve_batch(&self, updates: &[ResolutionUpdate]) -> Result<usize, PredictionError> {
        self.inner.resolve_batch(updates).await
    }

    async fn resolve_prediction(&self, update: &ResolutionUpdate) -> Result<bool, PredictionError> {
        self.inner.resolve_prediction(update).await
    }
}

/// Feed that holds every fetch until released
pub struct GatedGameFeed {
    game: GameSnapshot,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl GatedGameFeed {
    pub fn new(game: GameSnapshot) -> Self {
        Self {
            game,
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    /// Waits until a fetch is parked on the gate
    pub async fn wait_for_fetch(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl GameFeed for GatedGameFeed {
    async fn fetch_current_game(&self) -> Result<Option<GameSnapshot>, FeedError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Some(self.game.clone()))
    }

    fn name(&self) -> &'static str {
        "GatedGameFeed"
    }
}

/// Feed that answers after `delay`, or never when no delay is set
pub struct StalledGameFeed {
    game: GameSnapshot,
    delay: Option<Duration>,
}

impl StalledGameFeed {
    pub fn after(game: GameSnapshot, delay: Duration) -> Self {
        Self {
            game,
            delay: Some(delay),
        }
    }

    pub fn hanging(game: GameSnapshot) -> Self {
        Self { game, delay: None }
    }
}

#[async_trait]
impl GameFeed for StalledGameFeed {
    async fn fetch_current_game(&self) -> Result<Option<GameSnapshot>, FeedError> {
        match self.delay {
            Some(delay) => sleep(delay).await,
            None => std::future::pending::<()>().await,
        }
        Ok(Some(self.game.clone()))
    }

    fn name(&self) -> &'static str {
        "StalledGameFeed"
    }
}
