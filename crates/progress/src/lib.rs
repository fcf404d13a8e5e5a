//! Progress Scoring Engine
//!
//! Weekly dashboard statistics and the composite progress report, derived
//! on demand from a record store.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod report;
pub mod scoring;
pub mod tracker;

pub use config::ProgressConfig;
pub use error::{ProgressError, Result};
pub use report::{DashboardStats, ProgressReport, Level, FoodStatus, NO_CATEGORY};
pub use scoring::{score_week, MealBalance};
pub use tracker::{ProgressTracker, WeeklyProgressTracker};
