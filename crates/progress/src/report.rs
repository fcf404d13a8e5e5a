//! Derived weekly views. Never persisted; recomputed on every read.

use serde::{Deserialize, Serialize};

/// Label used for `most_trained` when the window holds no records.
pub const NO_CATEGORY: &str = "None";

/// Totals over the trailing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Records in the window
    pub total_workouts: u64,
    /// Minutes trained in the window
    pub total_minutes: u64,
    /// Most logged category, or [`NO_CATEGORY`]
    pub most_trained: String,
}

impl Default for DashboardStats {
    fn default() -> Self {
        Self {
            total_workouts: 0,
            total_minutes: 0,
            most_trained: NO_CATEGORY.to_string(),
        }
    }
}

/// Qualitative band for the weekly score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    /// Score below 40
    Beginner,
    /// Score 40 to 80
    Active,
    /// Score above 80
    Elite,
}

impl Level {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Active => "Active",
            Level::Elite => "Elite",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nutrition verdict for the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodStatus {
    /// More than 60% of meals matched a healthy keyword
    Healthy,
    /// Anything else, including a week with no meals
    Unbalanced,
}

impl FoodStatus {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FoodStatus::Healthy => "Healthy",
            FoodStatus::Unbalanced => "Unbalanced",
        }
    }
}

impl std::fmt::Display for FoodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite weekly score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    /// Sum of the workout, duration and nutrition sub-scores (0-100)
    pub score: u32,
    /// Band derived from `score`
    pub level: Level,
    /// Nutrition verdict
    pub food_status: FoodStatus,
    /// `total_workouts * 100 / 4`; not capped, so busy weeks exceed 100
    pub consistency: u64,
}
