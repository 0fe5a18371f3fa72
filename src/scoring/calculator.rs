use serde::Serialize;

use super::tables::{category_points, exact_points};
use crate::outcome::{AtBatOutcome, OutcomeCategory};

/// Result of scoring one prediction against the actual outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub is_exact: bool,
    pub is_category_correct: bool,
    /// Exact or category points, before the streak bonus
    pub points: u32,
    pub streak_bonus: u32,
    /// Streak length after this prediction
    pub streak_count: u32,
}

impl ScoreBreakdown {
    pub fn is_correct(&self) -> bool {
        self.is_exact || self.is_category_correct
    }

    /// What gets persisted as points earned
    pub fn total(&self) -> u32 {
        self.points + self.streak_bonus
    }
}

/// Bonus for a streak of `streak` consecutive correct predictions,
/// including the one being scored
pub fn streak_bonus(streak: u32) -> u32 {
    match streak {
        0 | 1 => 0,
        2 => 1,
        3..=4 => 3,
        5..=6 => 5,
        7..=9 => 7,
        _ => 10,
    }
}

/// Scores a prediction. `current_streak` is the user's streak before this
/// prediction.
///
/// Predictions against a non-plate-appearance outcome never match: users
/// cannot call those, and their category earns nothing.
pub fn score(
    predicted_outcome: AtBatOutcome,
    predicted_category: OutcomeCategory,
    actual_outcome: AtBatOutcome,
    current_streak: u32,
) -> ScoreBreakdown {
    let actual_category = actual_outcome.category();
    let scorable = actual_category.is_scorable();

    let is_exact = scorable && predicted_outcome == actual_outcome;
    let is_category_correct = scorable && predicted_category == actual_category;

    let points = if is_exact {
        exact_points(actual_outcome)
    } else if is_category_correct {
        category_points(actual_category)
    } else {
        0
    };

    let (streak_count, streak_bonus) = if is_exact || is_category_correct {
        let streak = current_streak.saturating_add(1);
        (streak, streak_bonus(streak))
    } else if scorable {
        (0, 0)
    } else {
        // void plays leave the streak where it was
        (current_streak, 0)
    };

    ScoreBreakdown {
        is_exact,
        is_category_correct,
        points,
        streak_bonus,
        streak_count,
    }
}
