use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::outcome::{AtBatOutcome, OutcomeCategory};

/// A user's call on one at-bat. At most one per `(user, game, at-bat)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub user_id: String,
    pub game_pk: u64,
    pub at_bat_index: u32,
    pub predicted_outcome: AtBatOutcome,
    /// Optional coarser call; when absent the outcome's own category is used
    pub predicted_category: Option<OutcomeCategory>,
    pub created_at: DateTime<Utc>,
    /// Filled exactly once when the at-bat is resolved
    pub resolution: Option<Resolution>,
}

/// Resolution fields attached to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub actual_outcome: AtBatOutcome,
    pub actual_category: OutcomeCategory,
    pub is_exact: bool,
    pub is_category_correct: bool,
    /// Base or category points plus the streak bonus
    pub points_earned: u32,
    /// Streak length after this prediction was scored
    pub streak_count: u32,
    pub streak_bonus: u32,
    pub resolved_at: DateTime<Utc>,
}

impl Resolution {
    pub fn is_correct(&self) -> bool {
        self.is_exact || self.is_category_correct
    }

    /// Resolved against a play that was not a plate appearance result
    pub fn is_void(&self) -> bool {
        !self.actual_category.is_scorable()
    }
}

impl Prediction {
    pub fn new(
        user_id: impl Into<String>,
        game_pk: u64,
        at_bat_index: u32,
        predicted_outcome: AtBatOutcome,
        predicted_category: Option<OutcomeCategory>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            game_pk,
            at_bat_index,
            predicted_outcome,
            predicted_category,
            created_at: Utc::now(),
            resolution: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// The category this prediction is judged on for partial credit
    pub fn effective_category(&self) -> OutcomeCategory {
        self.predicted_category
            .unwrap_or_else(|| self.predicted_outcome.category())
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolution.as_ref().map(|r| r.resolved_at)
    }
}

/// A pending write: attach `resolution` to prediction `prediction_id` unless it
/// is already resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionUpdate {
    pub prediction_id: Uuid,
    pub user_id: String,
    pub resolution: Resolution,
}
