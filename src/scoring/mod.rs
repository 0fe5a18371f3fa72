mod calculator;
mod streak;
mod tables;

pub use calculator::{score, streak_bonus, ScoreBreakdown};
pub use streak::{count_streak, StreakTracker};
pub use tables::{base_points, category_points, exact_points, risk_multiplier};
