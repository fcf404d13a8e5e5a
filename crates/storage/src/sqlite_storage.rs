//! SQLite storage backend for FitTrack.
//!
//! Keeps records in a `daily_routine` table and categories in a
//! `workout_category` table. Window aggregates run in SQL; rows whose date or
//! duration would fail `RecordRow` validation are excluded by
//! [`WELL_FORMED`].

use async_trait::async_trait;
use fittrack_core::{
    CategoryId, DateWindow, MalformedRecord, RecordId, RecordRow, RoutineDraft, RoutineRecord,
    WorkoutCategory, DATE_FORMAT,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, warn};

use super::tally;
use super::trait_::{normalize_category_name, RecordStore, Result, StorageError};

/// SQL predicate matching rows that validate as `RoutineRecord`.
///
/// `date()` normalizes or rejects its input, so comparing it to the raw text
/// accepts only canonical `YYYY-MM-DD` calendar dates. Durations must fit
/// in a `u32`.
pub const WELL_FORMED: &str = "date(workout_date) IS NOT NULL \
     AND date(workout_date) = workout_date \
     AND typeof(duration) = 'integer' \
     AND duration >= 0 \
     AND duration <= 4294967295";

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStore {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub async fn new_from_path(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = sqlx::SqlitePool::connect_with(options).await.map_err(db_err)?;

        let store = Self { pool };
        store.init_schema().await?;
        debug!("Opened SQLite store at {}", path.display());

        Ok(store)
    }

    /// Create an in-memory SQLite store for testing.
    pub async fn in_memory() -> Result<Self> {
        // every pooled connection would otherwise get its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS workout_category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS daily_routine (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout_date TEXT,
                category TEXT,
                duration INTEGER,
                meal TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_routine_date ON daily_routine(workout_date)")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    /// Check if the database is healthy.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Decode a `daily_routine` row, keeping bad values for validation.
    fn decode_row(row: &SqliteRow) -> std::result::Result<RecordRow, MalformedRecord> {
        let id = RecordId::new(row.try_get("id").unwrap_or_default());
        let date: Option<String> = row.try_get("workout_date").unwrap_or_default();
        let duration = match row.try_get::<Option<i64>, _>("duration") {
            Ok(Some(minutes)) => minutes,
            Ok(None) => {
                return Err(MalformedRecord::InvalidDuration {
                    id,
                    value: "NULL".to_string(),
                })
            }
            Err(_) => {
                let raw: Option<String> = row.try_get("duration").ok().flatten();
                return Err(MalformedRecord::InvalidDuration {
                    id,
                    value: raw.unwrap_or_default(),
                });
            }
        };

        Ok(RecordRow {
            id,
            date: date.unwrap_or_default(),
            category: Self::get_string(row, "category"),
            duration,
            meal: Self::get_string(row, "meal"),
        })
    }

    /// Helper to extract string from row.
    fn get_string(row: &SqliteRow, column: &str) -> String {
        row.try_get::<Option<String>, _>(column)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    async fn all_rows(&self, order: &str) -> Result<Vec<SqliteRow>> {
        let sql = format!(
            "SELECT id, workout_date, category, duration, meal FROM daily_routine ORDER BY {}",
            order
        );
        sqlx::query(&sql).fetch_all(&self.pool).await.map_err(db_err)
    }
}

fn db_err(e: sqlx::Error) -> StorageError {
    StorageError::Database(e.to_string())
}

fn bind_date(window: &DateWindow) -> (String, String) {
    (
        window.start.format(DATE_FORMAT).to_string(),
        window.end.format(DATE_FORMAT).to_string(),
    )
}

/// Map a UNIQUE violation to `Conflict`, anything else to `Database`.
fn category_err(e: sqlx::Error, name: &str) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict(format!("category '{}' already exists", name));
        }
    }
    db_err(e)
}

#[async_trait]
impl RecordStore for SqliteStore {
    // === Record operations ===

    async fn insert_record(&mut self, draft: &RoutineDraft) -> Result<RecordId> {
        let result = sqlx::query(
            "INSERT INTO daily_routine (workout_date, category, duration, meal) VALUES (?, ?, ?, ?)",
        )
        .bind(draft.date.format(DATE_FORMAT).to_string())
        .bind(&draft.category)
        .bind(i64::from(draft.duration))
        .bind(&draft.meal)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(RecordId::new(result.last_insert_rowid()))
    }

    async fn update_record(&mut self, id: RecordId, draft: &RoutineDraft) -> Result<()> {
        let result = sqlx::query(
            "UPDATE daily_routine SET workout_date = ?, category = ?, duration = ?, meal = ? WHERE id = ?",
        )
        .bind(draft.date.format(DATE_FORMAT).to_string())
        .bind(&draft.category)
        .bind(i64::from(draft.duration))
        .bind(&draft.meal)
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("record {}", id)));
        }
        Ok(())
    }

    async fn delete_record(&mut self, id: RecordId) -> Result<()> {
        sqlx::query("DELETE FROM daily_routine WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn load_record(&self, id: RecordId) -> Result<Option<RoutineRecord>> {
        let row = sqlx::query(
            "SELECT id, workout_date, category, duration, meal FROM daily_routine WHERE id = ?",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        match Self::decode_row(&row).and_then(RoutineRecord::try_from) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Skipping malformed record: {}", e);
                Ok(None)
            }
        }
    }

    async fn list_records(&self) -> Result<Vec<RoutineRecord>> {
        let rows = self.all_rows("workout_date DESC, id DESC").await?;

        let mut decoded = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::decode_row(row) {
                Ok(r) => decoded.push(r),
                Err(e) => warn!("Skipping malformed record: {}", e),
            }
        }
        Ok(tally::well_formed(decoded))
    }

    async fn malformed_records(&self) -> Result<Vec<MalformedRecord>> {
        let rows = self.all_rows("id").await?;

        let mut problems = Vec::new();
        for row in &rows {
            match Self::decode_row(row) {
                Ok(r) => problems.extend(RoutineRecord::try_from(r).err()),
                Err(e) => problems.push(e),
            }
        }
        Ok(problems)
    }

    // === Window queries ===

    async fn count_records_in_window(&self, window: &DateWindow) -> Result<u64> {
        let (start, end) = bind_date(window);
        let sql = format!(
            "SELECT COUNT(*) FROM daily_routine WHERE {} AND workout_date BETWEEN ? AND ?",
            WELL_FORMED
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(count as u64)
    }

    async fn sum_duration_in_window(&self, window: &DateWindow) -> Result<u64> {
        let (start, end) = bind_date(window);
        let sql = format!(
            "SELECT COALESCE(SUM(duration), 0) FROM daily_routine WHERE {} AND workout_date BETWEEN ? AND ?",
            WELL_FORMED
        );
        let total: i64 = sqlx::query_scalar(&sql)
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(total as u64)
    }

    async fn most_frequent_category_in_window(
        &self,
        window: &DateWindow,
    ) -> Result<Option<String>> {
        let (start, end) = bind_date(window);
        let sql = format!(
            "SELECT category FROM daily_routine WHERE {} AND workout_date BETWEEN ? AND ?
             GROUP BY category ORDER BY COUNT(*) DESC, MIN(id) ASC LIMIT 1",
            WELL_FORMED
        );
        let category: Option<Option<String>> = sqlx::query_scalar(&sql)
            .bind(start)
            .bind(end)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(category.map(Option::unwrap_or_default))
    }

    async fn list_meals_in_window(&self, window: &DateWindow) -> Result<Vec<String>> {
        let (start, end) = bind_date(window);
        let sql = format!(
            "SELECT meal FROM daily_routine WHERE {} AND workout_date BETWEEN ? AND ? ORDER BY id",
            WELL_FORMED
        );
        let meals: Vec<Option<String>> = sqlx::query_scalar(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(meals.into_iter().map(Option::unwrap_or_default).collect())
    }

    // === Category operations ===

    async fn insert_category(&mut self, name: &str) -> Result<CategoryId> {
        let name = normalize_category_name(name)?;
        let result = sqlx::query("INSERT INTO workout_category (name) VALUES (?)")
            .bind(&name)
            .execute(&self.pool)
            .await
            .map_err(|e| category_err(e, &name))?;

        Ok(CategoryId::new(result.last_insert_rowid()))
    }

    async fn rename_category(&mut self, id: CategoryId, name: &str) -> Result<()> {
        let name = normalize_category_name(name)?;
        let result = sqlx::query("UPDATE workout_category SET name = ? WHERE id = ?")
            .bind(&name)
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| category_err(e, &name))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("category {}", id)));
        }
        Ok(())
    }

    async fn delete_category(&mut self, id: CategoryId) -> Result<()> {
        sqlx::query("DELETE FROM workout_category WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<WorkoutCategory>> {
        let rows = sqlx::query("SELECT id, name FROM workout_category ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows
            .iter()
            .map(|row| WorkoutCategory {
                id: CategoryId::new(row.try_get("id").unwrap_or_default()),
                name: Self::get_string(row, "name"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn week() -> DateWindow {
        DateWindow::trailing(day(16), 7)
    }

    async fn raw_insert(store: &SqliteStore, date: &str, duration: &str, meal: &str) {
        // bypasses the typed API, as a hand-edited database would
        sqlx::query("INSERT INTO daily_routine (workout_date, category, duration, meal) VALUES (?, 'Legs', ?, ?)")
            .bind(date)
            .bind(duration)
            .bind(meal)
            .execute(&store.pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_health_check() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn test_record_operations() {
        let mut store = SqliteStore::in_memory().await.unwrap();

        let id = store
            .insert_record(&RoutineDraft::new(day(14), "Cardio", 30, "apple"))
            .await
            .unwrap();
        assert_eq!(store.load_record(id).await.unwrap().unwrap().meal, "apple");

        store
            .update_record(id, &RoutineDraft::new(day(15), "Cardio", 60, "rice"))
            .await
            .unwrap();
        assert_eq!(store.load_record(id).await.unwrap().unwrap().duration, 60);

        let missing = store
            .update_record(RecordId::new(999), &RoutineDraft::new(day(15), "Cardio", 60, ""))
            .await;
        assert!(matches!(missing, Err(StorageError::NotFound(_))));

        store.delete_record(id).await.unwrap();
        assert!(store.load_record(id).await.unwrap().is_none());
        assert!(store.list_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_window_aggregates() {
        let mut store = SqliteStore::in_memory().await.unwrap();

        store.insert_record(&RoutineDraft::new(day(11), "Cardio", 20, "rice bowl")).await.unwrap();
        store.insert_record(&RoutineDraft::new(day(12), "Legs", 30, "burger")).await.unwrap();
        store.insert_record(&RoutineDraft::new(day(13), "Legs", 40, "chicken")).await.unwrap();
        store.insert_record(&RoutineDraft::new(day(14), "Cardio", 50, "apple")).await.unwrap();
        store.insert_record(&RoutineDraft::new(day(2), "Arms", 90, "cake")).await.unwrap();

        let window = week();
        assert_eq!(store.count_records_in_window(&window).await.unwrap(), 4);
        assert_eq!(store.sum_duration_in_window(&window).await.unwrap(), 140);
        // Cardio and Legs tie at two; Cardio was logged first
        assert_eq!(
            store.most_frequent_category_in_window(&window).await.unwrap().as_deref(),
            Some("Cardio")
        );
        assert_eq!(
            store.list_meals_in_window(&window).await.unwrap(),
            vec!["rice bowl", "burger", "chicken", "apple"]
        );
    }

    #[tokio::test]
    async fn test_empty_window_sums_to_zero() {
        let store = SqliteStore::in_memory().await.unwrap();
        let window = week();

        assert_eq!(store.count_records_in_window(&window).await.unwrap(), 0);
        assert_eq!(store.sum_duration_in_window(&window).await.unwrap(), 0);
        assert!(store.most_frequent_category_in_window(&window).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_rows_are_excluded_and_reported() {
        let mut store = SqliteStore::in_memory().await.unwrap();
        store.insert_record(&RoutineDraft::new(day(15), "Cardio", 30, "rice")).await.unwrap();

        raw_insert(&store, "2026-10-15 07:30", "20", "chicken").await;
        raw_insert(&store, "2026-10-14", "-15", "chicken").await;
        raw_insert(&store, "2026-10-13", "half an hour", "apple").await;
        raw_insert(&store, "2026-02-30", "10", "apple").await;
        raw_insert(&store, "2026-10-15", "5000000000", "rice").await;

        let window = week();
        assert_eq!(store.count_records_in_window(&window).await.unwrap(), 1);
        assert_eq!(store.sum_duration_in_window(&window).await.unwrap(), 30);
        assert_eq!(store.list_meals_in_window(&window).await.unwrap(), vec!["rice"]);
        assert_eq!(store.list_records().await.unwrap().len(), 1);

        let problems = store.malformed_records().await.unwrap();
        assert_eq!(problems.len(), 5);
        assert!(matches!(problems[0], MalformedRecord::InvalidDate { .. }));
        assert!(matches!(problems[1], MalformedRecord::NegativeDuration { minutes: -15, .. }));
        assert!(matches!(problems[2], MalformedRecord::InvalidDuration { .. }));
        assert!(matches!(problems[3], MalformedRecord::InvalidDate { .. }));
        assert_eq!(
            problems[4],
            MalformedRecord::InvalidDuration {
                id: RecordId::new(6),
                value: "5000000000".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_category_uniqueness() {
        let mut store = SqliteStore::in_memory().await.unwrap();

        let cardio = store.insert_category("Cardio").await.unwrap();
        assert!(matches!(store.insert_category("Cardio").await, Err(StorageError::Conflict(_))));
        assert!(matches!(store.insert_category("").await, Err(StorageError::Invalid(_))));

        store.rename_category(cardio, "Running").await.unwrap();
        store.delete_category(cardio).await.unwrap();
        assert!(matches!(
            store.rename_category(cardio, "Rowing").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(store.list_categories().await.unwrap().is_empty());
    }
}
