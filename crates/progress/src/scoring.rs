//! Weekly scoring rules.
//!
//! Pure functions over already-aggregated numbers; nothing here touches a
//! store. The composite score is three independently capped sub-scores:
//!
//! ```text
//! workouts  min(n, 4) * 10            0..=40
//! duration  min(minutes, 180) / 6     0..=30
//! nutrition floor(healthy/meals * 30) 0..=30
//! ```

use crate::report::{DashboardStats, FoodStatus, Level, ProgressReport};

/// Workouts per week that earn the full workout sub-score.
pub const WORKOUT_TARGET: u64 = 4;
/// Points per workout below the target.
pub const POINTS_PER_WORKOUT: u64 = 10;
/// Minutes per week that earn the full duration sub-score.
pub const MINUTES_TARGET: u64 = 180;
/// Minutes per duration point below the target.
pub const MINUTES_PER_POINT: u64 = 6;
/// Largest nutrition sub-score.
pub const NUTRITION_MAX: u32 = 30;
/// Healthy share a week must exceed to count as `Healthy`.
pub const HEALTHY_RATIO: f64 = 0.6;

/// Workout sub-score, 0..=40.
pub fn workout_points(total_workouts: u64) -> u32 {
    if total_workouts >= WORKOUT_TARGET {
        (WORKOUT_TARGET * POINTS_PER_WORKOUT) as u32
    } else {
        (total_workouts * POINTS_PER_WORKOUT) as u32
    }
}

/// Duration sub-score, 0..=30.
pub fn duration_points(total_minutes: u64) -> u32 {
    if total_minutes >= MINUTES_TARGET {
        (MINUTES_TARGET / MINUTES_PER_POINT) as u32
    } else {
        (total_minutes / MINUTES_PER_POINT) as u32
    }
}

/// Whether a meal mentions any healthy keyword, ignoring case.
pub fn is_healthy(meal: &str, keywords: &[String]) -> bool {
    let meal = meal.to_lowercase();
    keywords.iter().any(|k| meal.contains(&k.to_lowercase()))
}

/// Healthy-vs-total meal counts for the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MealBalance {
    /// Meals matching a healthy keyword
    pub healthy: usize,
    /// All meal entries in the window
    pub total: usize,
}

impl MealBalance {
    /// Classify every meal string.
    pub fn classify<S: AsRef<str>>(meals: &[S], keywords: &[String]) -> Self {
        Self {
            healthy: meals.iter().filter(|m| is_healthy(m.as_ref(), keywords)).count(),
            total: meals.len(),
        }
    }

    /// Healthy share, or `None` without any meals.
    pub fn ratio(&self) -> Option<f64> {
        (self.total > 0).then(|| self.healthy as f64 / self.total as f64)
    }

    /// Nutrition sub-score, 0..=30.
    pub fn points(&self) -> u32 {
        self.ratio()
            .map(|ratio| (ratio * f64::from(NUTRITION_MAX)).floor() as u32)
            .unwrap_or(0)
    }

    /// Verdict; a week without meals is never `Healthy`.
    pub fn status(&self) -> FoodStatus {
        match self.ratio() {
            Some(ratio) if ratio > HEALTHY_RATIO => FoodStatus::Healthy,
            _ => FoodStatus::Unbalanced,
        }
    }
}

/// Band for a composite score. 40 and 80 are both `Active`.
pub fn level_for(score: u32) -> Level {
    if score > 80 {
        Level::Elite
    } else if score < 40 {
        Level::Beginner
    } else {
        Level::Active
    }
}

/// Workout frequency scaled so the weekly target maps to 100. Not capped.
pub fn consistency(total_workouts: u64) -> u64 {
    total_workouts * 100 / WORKOUT_TARGET
}

/// Combine window totals and meal balance into a report.
pub fn score_week(stats: &DashboardStats, meals: &MealBalance) -> ProgressReport {
    let score = workout_points(stats.total_workouts)
        + duration_points(stats.total_minutes)
        + meals.points();

    ProgressReport {
        score,
        level: level_for(score),
        food_status: meals.status(),
        consistency: consistency(stats.total_workouts),
    }
}
