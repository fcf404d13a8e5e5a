//! Weekly progress tracking service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use fittrack_core::DateWindow;
use fittrack_storage::RecordStore;
use tracing::debug;

use crate::config::ProgressConfig;
use crate::error::{ProgressError, Result};
use crate::report::{DashboardStats, ProgressReport, NO_CATEGORY};
use crate::scoring::{score_week, MealBalance};

/// Progress tracking service.
#[async_trait]
pub trait ProgressTracker: Send + Sync {
    /// Totals for the window ending on `today`.
    async fn dashboard_stats(&self, today: NaiveDate) -> Result<DashboardStats>;

    /// Composite score for the window ending on `today`.
    async fn progress_report(&self, today: NaiveDate) -> Result<ProgressReport>;
}

/// Tracker that reads a trailing window from a record store on every call.
///
/// Nothing is cached. Each statistic is its own store query, issued
/// concurrently without a shared transaction, so a concurrent writer can make
/// the counts, minutes and meals reflect slightly different snapshots.
pub struct WeeklyProgressTracker<S: RecordStore + ?Sized> {
    store: Arc<S>,
    config: ProgressConfig,
}

impl<S: RecordStore + ?Sized> WeeklyProgressTracker<S> {
    /// Create a new progress tracker.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            config: ProgressConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ProgressConfig) -> Self {
        self.config = config;
        self
    }

    /// The window the tracker aggregates for a given day.
    pub fn window(&self, today: NaiveDate) -> DateWindow {
        DateWindow::trailing(today, self.config.window_days)
    }

    async fn stats_for(&self, window: &DateWindow) -> Result<DashboardStats> {
        let (total_workouts, total_minutes, most_trained) = tokio::try_join!(
            self.store.count_records_in_window(window),
            self.store.sum_duration_in_window(window),
            self.store.most_frequent_category_in_window(window),
        )?;

        Ok(DashboardStats {
            total_workouts,
            total_minutes,
            most_trained: most_trained
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| NO_CATEGORY.to_string()),
        })
    }
}

#[async_trait]
impl<S: RecordStore + ?Sized + 'static> ProgressTracker for WeeklyProgressTracker<S> {
    async fn dashboard_stats(&self, today: NaiveDate) -> Result<DashboardStats> {
        let window = self.window(today);
        let stats = self.stats_for(&window).await?;
        debug!(
            "Stats for {}: {} workouts, {} minutes, most trained {}",
            window, stats.total_workouts, stats.total_minutes, stats.most_trained
        );
        Ok(stats)
    }

    async fn progress_report(&self, today: NaiveDate) -> Result<ProgressReport> {
        let window = self.window(today);
        let (stats, meals) = tokio::try_join!(
            self.stats_for(&window),
            async { Ok::<_, ProgressError>(self.store.list_meals_in_window(&window).await?) },
        )?;

        let balance = MealBalance::classify(&meals, &self.config.healthy_keywords);
        let report = score_week(&stats, &balance);
        debug!(
            "Report for {}: score {} ({}), {}/{} healthy meals, consistency {}",
            window, report.score, report.level, balance.healthy, balance.total, report.consistency
        );
        Ok(report)
    }
}
