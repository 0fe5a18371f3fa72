use std::sync::Arc;

use tracing::{debug, instrument};

use crate::prediction::{Prediction, PredictionError, PredictionRepository};

/// Counts consecutive correct predictions from the most recent resolution
/// backwards. Void resolutions are neither correct nor a break.
pub fn count_streak(recent_newest_first: &[Prediction]) -> u32 {
    let mut streak = 0;
    for resolution in recent_newest_first
        .iter()
        .filter_map(|p| p.resolution.as_ref())
    {
        if resolution.is_void() {
            continue;
        }
        if !resolution.is_correct() {
            break;
        }
        streak += 1;
    }
    streak
}

/// Reads a user's current streak from their recent resolution history
pub struct StreakTracker {
    repository: Arc<dyn PredictionRepository>,
    window: usize,
}

impl StreakTracker {
    pub fn new(repository: Arc<dyn PredictionRepository>, window: usize) -> Self {
        Self { repository, window }
    }

    /// Streak before the next prediction is scored. Longer streaks than the
    /// window are capped, which is harmless since the bonus tops out at 10.
    #[instrument(skip(self))]
    pub async fn current_streak(&self, user_id: &str) -> Result<u32, PredictionError> {
        let recent = self
            .repository
            .recent_resolved_for_user(user_id, self.window)
            .await?;
        let streak = count_streak(&recent);
        debug!(streak, examined = recent.len(), "Streak computed");
        Ok(streak)
    }
}
