use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::errors::PredictionError;
use super::models::{Prediction, Resolution, ResolutionUpdate};

/// Trait for prediction storage.
///
/// Resolution writes are conditional: a prediction that already carries a
/// resolution is never overwritten. This is what keeps concurrent resolution
/// passes from double-scoring an at-bat.
#[async_trait]
pub trait PredictionRepository: Send + Sync {
    async fn insert_prediction(&self, prediction: &Prediction) -> Result<(), PredictionError>;

    async fn get_prediction(&self, id: Uuid) -> Result<Option<Prediction>, PredictionError>;

    async fn predictions_for_at_bat(
        &self,
        game_pk: u64,
        at_bat_index: u32,
    ) -> Result<Vec<Prediction>, PredictionError>;

    async fn predictions_for_game(&self, game_pk: u64) -> Result<Vec<Prediction>, PredictionError>;

    /// Most recently resolved predictions of a user, newest first
    async fn recent_resolved_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Prediction>, PredictionError>;

    /// At-bats of a game that have predictions and none left pending
    async fn resolved_at_bats(&self, game_pk: u64) -> Result<HashSet<u32>, PredictionError>;

    /// Applies every update whose prediction is still unresolved, atomically.
    /// Returns how many were applied.
    async fn resolve_batch(&self, updates: &[ResolutionUpdate]) -> Result<usize, PredictionError>;

    /// Applies one update if the prediction is still unresolved. Returns
    /// whether it was applied.
    async fn resolve_prediction(&self, update: &ResolutionUpdate) -> Result<bool, PredictionError>;
}

#[derive(Debug, Default)]
struct InMemoryState {
    predictions: HashMap<Uuid, Prediction>,
    /// Prediction ids in the order they were resolved
    resolution_log: Vec<Uuid>,
}

impl InMemoryState {
    fn apply(&mut self, update: &ResolutionUpdate) -> bool {
        let Some(prediction) = self.predictions.get_mut(&update.prediction_id) else {
            return false;
        };
        if prediction.resolution.is_some() {
            return false;
        }
        prediction.resolution = Some(update.resolution.clone());
        self.resolution_log.push(update.prediction_id);
        true
    }
}

/// In-memory implementation of PredictionRepository for development and testing
#[derive(Debug, Default)]
pub struct InMemoryPredictionRepository {
    state: Mutex<InMemoryState>,
}

impl InMemoryPredictionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with predictions
    pub fn with_predictions(predictions: Vec<Prediction>) -> Self {
        let mut state = InMemoryState::default();
        let mut resolved: Vec<(DateTime<Utc>, Uuid)> = predictions
            .iter()
            .filter_map(|p| p.resolved_at().map(|at| (at, p.id)))
            .collect();
        resolved.sort();
        state.resolution_log = resolved.into_iter().map(|(_, id)| id).collect();

        for prediction in predictions {
            state.predictions.insert(prediction.id, prediction);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn prediction_count(&self) -> usize {
        self.state.lock().unwrap().predictions.len()
    }
}

#[async_trait]
impl PredictionRepository for InMemoryPredictionRepository {
    #[instrument(skip(self, prediction), fields(prediction_id = %prediction.id))]
    async fn insert_prediction(&self, prediction: &Prediction) -> Result<(), PredictionError> {
        let mut state = self.state.lock().unwrap();

        let duplicate = state.predictions.values().any(|existing| {
            existing.user_id == prediction.user_id
                && existing.game_pk == prediction.game_pk
                && existing.at_bat_index == prediction.at_bat_index
        });
        if duplicate {
            warn!(user_id = %prediction.user_id, "Prediction already exists in memory");
            return Err(PredictionError::Duplicate {
                user_id: prediction.user_id.clone(),
                game_pk: prediction.game_pk,
                at_bat_index: prediction.at_bat_index,
            });
        }

        state.predictions.insert(prediction.id, prediction.clone());
        debug!("Prediction stored in memory");
        Ok(())
    }

    async fn get_prediction(&self, id: Uuid) -> Result<Option<Prediction>, PredictionError> {
        let state = self.state.lock().unwrap();
        Ok(state.predictions.get(&id).cloned())
    }

    async fn predictions_for_at_bat(
        &self,
        game_pk: u64,
        at_bat_index: u32,
    ) -> Result<Vec<Prediction>, PredictionError> {
        let state = self.state.lock().unwrap();
        let mut predictions: Vec<Prediction> = state
            .predictions
            .values()
            .filter(|p| p.game_pk == game_pk && p.at_bat_index == at_bat_index)
            .cloned()
            .collect();
        predictions.sort_by_key(|p| p.created_at);
        Ok(predictions)
    }

    async fn predictions_for_game(&self, game_pk: u64) -> Result<Vec<Prediction>, PredictionError> {
        let state = self.state.lock().unwrap();
        let mut predictions: Vec<Prediction> = state
            .predictions
            .values()
            .filter(|p| p.game_pk == game_pk)
            .cloned()
            .collect();
        predictions.sort_by_key(|p| (p.at_bat_index, p.created_at));
        Ok(predictions)
    }

    async fn recent_resolved_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Prediction>, PredictionError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .resolution_log
            .iter()
            .rev()
            .filter_map(|id| state.predictions.get(id))
            .filter(|p| p.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn resolved_at_bats(&self, game_pk: u64) -> Result<HashSet<u32>, PredictionError> {
        let state = self.state.lock().unwrap();
        let mut pending: HashMap<u32, bool> = HashMap::new();
        for prediction in state.predictions.values().filter(|p| p.game_pk == game_pk) {
            let has_pending = pending.entry(prediction.at_bat_index).or_insert(false);
            *has_pending |= !prediction.is_resolved();
        }
        Ok(pending
            .into_iter()
            .filter(|(_, has_pending)| !has_pending)
            .map(|(index, _)| index)
            .collect())
    }

    #[instrument(skip(self, updates), fields(count = updates.len()))]
    async fn resolve_batch(&self, updates: &[ResolutionUpdate]) -> Result<usize, PredictionError> {
        let mut state = self.state.lock().unwrap();
        let applied = updates.iter().filter(|update| state.apply(update)).count();
        debug!(applied, "Batch resolution applied in memory");
        Ok(applied)
    }

    async fn resolve_prediction(&self, update: &ResolutionUpdate) -> Result<bool, PredictionError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.apply(update))
    }
}

/// Database row for the predictions table
#[derive(Debug, FromRow)]
struct PredictionRow {
    id: Uuid,
    user_id: String,
    game_pk: i64,
    at_bat_index: i32,
    predicted_outcome: String,
    predicted_category: Option<String>,
    created_at: DateTime<Utc>,
    actual_outcome: Option<String>,
    actual_category: Option<String>,
    is_exact: Option<bool>,
    is_category_correct: Option<bool>,
    points_earned: Option<i32>,
    streak_count: Option<i32>,
    streak_bonus: Option<i32>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<PredictionRow> for Prediction {
    type Error = PredictionError;

    fn try_from(row: PredictionRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |e: crate::outcome::UnknownValue| {
            PredictionError::Repository(format!("corrupt prediction {id}: {e}"))
        };

        let resolution = match (row.resolved_at, &row.actual_outcome, &row.actual_category) {
            (Some(resolved_at), Some(outcome), Some(category)) => Some(Resolution {
                actual_outcome: outcome.parse().map_err(corrupt)?,
                actual_category: category.parse().map_err(corrupt)?,
                is_exact: row.is_exact.unwrap_or(false),
                is_category_correct: row.is_category_correct.unwrap_or(false),
                points_earned: row.points_earned.unwrap_or(0).max(0) as u32,
                streak_count: row.streak_count.unwrap_or(0).max(0) as u32,
                streak_bonus: row.streak_bonus.unwrap_or(0).max(0) as u32,
                resolved_at,
            }),
            _ => None,
        };

        Ok(Prediction {
            id,
            user_id: row.user_id.clone(),
            game_pk: row.game_pk as u64,
            at_bat_index: row.at_bat_index as u32,
            predicted_outcome: row.predicted_outcome.parse().map_err(corrupt)?,
            predicted_category: row
                .predicted_category
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(corrupt)?,
            created_at: row.created_at,
            resolution,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, user_id, game_pk, at_bat_index, predicted_outcome, \
     predicted_category, created_at, actual_outcome, actual_category, is_exact, \
     is_category_correct, points_earned, streak_count, streak_bonus, resolved_at \
     FROM predictions";

const RESOLVE_SQL: &str = "UPDATE predictions SET actual_outcome = $2, actual_category = $3, \
     is_exact = $4, is_category_correct = $5, is_correct = $6, points_earned = $7, \
     streak_count = $8, streak_bonus = $9, resolved_at = $10 \
     WHERE id = $1 AND resolved_at IS NULL";

/// PostgreSQL implementation of the prediction repository.
///
/// Expects a `predictions` table with a unique constraint on
/// `(user_id, game_pk, at_bat_index)`.
pub struct PostgresPredictionRepository {
    pool: PgPool,
}

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

impl PostgresPredictionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates or upgrades the predictions table
    pub async fn run_migrations(&self) -> Result<(), PredictionError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| PredictionError::Repository(format!("migration failed: {e}")))?;
        debug!("Prediction migrations applied");
        Ok(())
    }
}

fn into_predictions(rows: Vec<PredictionRow>) -> Result<Vec<Prediction>, PredictionError> {
    rows.into_iter().map(Prediction::try_from).collect()
}

fn bind_resolution<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    update: &'q ResolutionUpdate,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    let resolution = &update.resolution;
    query
        .bind(update.prediction_id)
        .bind(resolution.actual_outcome.as_str())
        .bind(resolution.actual_category.as_str())
        .bind(resolution.is_exact)
        .bind(resolution.is_category_correct)
        .bind(resolution.is_correct())
        .bind(resolution.points_earned as i32)
        .bind(resolution.streak_count as i32)
        .bind(resolution.streak_bonus as i32)
        .bind(resolution.resolved_at)
}

#[async_trait]
impl PredictionRepository for PostgresPredictionRepository {
    #[instrument(skip(self, prediction), fields(prediction_id = %prediction.id))]
    async fn insert_prediction(&self, prediction: &Prediction) -> Result<(), PredictionError> {
        let result = sqlx::query(
            "INSERT INTO predictions (id, user_id, game_pk, at_bat_index, predicted_outcome, predicted_category, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(prediction.id)
        .bind(&prediction.user_id)
        .bind(prediction.game_pk as i64)
        .bind(prediction.at_bat_index as i32)
        .bind(prediction.predicted_outcome.as_str())
        .bind(prediction.predicted_category.map(|c| c.as_str()))
        .bind(prediction.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(PredictionError::Duplicate {
                    user_id: prediction.user_id.clone(),
                    game_pk: prediction.game_pk,
                    at_bat_index: prediction.at_bat_index,
                })
            }
            Err(e) => {
                warn!(error = %e, "Failed to insert prediction into database");
                Err(e.into())
            }
        }
    }

    async fn get_prediction(&self, id: Uuid) -> Result<Option<Prediction>, PredictionError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
        let row = sqlx::query_as::<_, PredictionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, prediction_id = %id, "Failed to fetch prediction from database");
                PredictionError::from(e)
            })?;
        row.map(Prediction::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn predictions_for_at_bat(
        &self,
        game_pk: u64,
        at_bat_index: u32,
    ) -> Result<Vec<Prediction>, PredictionError> {
        let sql =
            format!("{SELECT_COLUMNS} WHERE game_pk = $1 AND at_bat_index = $2 ORDER BY created_at");
        let rows = sqlx::query_as::<_, PredictionRow>(&sql)
            .bind(game_pk as i64)
            .bind(at_bat_index as i32)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch at-bat predictions from database");
                PredictionError::from(e)
            })?;
        into_predictions(rows)
    }

    async fn predictions_for_game(&self, game_pk: u64) -> Result<Vec<Prediction>, PredictionError> {
        let sql = format!("{SELECT_COLUMNS} WHERE game_pk = $1 ORDER BY at_bat_index, created_at");
        let rows = sqlx::query_as::<_, PredictionRow>(&sql)
            .bind(game_pk as i64)
            .fetch_all(&self.pool)
            .await?;
        into_predictions(rows)
    }

    async fn recent_resolved_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Prediction>, PredictionError> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE user_id = $1 AND resolved_at IS NOT NULL \
             ORDER BY resolved_at DESC, game_pk DESC, at_bat_index DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, PredictionRow>(&sql)
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        into_predictions(rows)
    }

    async fn resolved_at_bats(&self, game_pk: u64) -> Result<HashSet<u32>, PredictionError> {
        let indices: Vec<i32> = sqlx::query_scalar(
            "SELECT at_bat_index FROM predictions WHERE game_pk = $1 GROUP BY at_bat_index HAVING COUNT(*) FILTER (WHERE resolved_at IS NULL) = 0",
        )
        .bind(game_pk as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(indices.into_iter().map(|i| i as u32).collect())
    }

    #[instrument(skip(self, updates), fields(count = updates.len()))]
    async fn resolve_batch(&self, updates: &[ResolutionUpdate]) -> Result<usize, PredictionError> {
        let mut tx = self.pool.begin().await?;
        let mut applied = 0;

        for update in updates {
            let result = bind_resolution(sqlx::query(RESOLVE_SQL), update)
                .execute(&mut *tx)
                .await?;
            applied += result.rows_affected() as usize;
        }

        tx.commit().await?;
        debug!(applied, "Batch resolution committed");
        Ok(applied)
    }

    async fn resolve_prediction(&self, update: &ResolutionUpdate) -> Result<bool, PredictionError> {
        let result = bind_resolution(sqlx::query(RESOLVE_SQL), update)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
