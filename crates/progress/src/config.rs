//! Scoring engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the weekly progress tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Length of the trailing window in days, today included
    pub window_days: u64,
    /// Lowercase substrings that mark a meal as healthy
    pub healthy_keywords: Vec<String>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            healthy_keywords: vec!["rice".to_string(), "apple".to_string(), "chicken".to_string()],
        }
    }
}
