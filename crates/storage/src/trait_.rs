//! Record store trait abstraction.

use async_trait::async_trait;
use fittrack_core::{
    CategoryId, DateWindow, MalformedRecord, RecordId, RoutineDraft, RoutineRecord,
    WorkoutCategory,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database driver error
    #[error("Database error: {0}")]
    Database(String),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness rule would be broken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input rejected by the store
    #[error("Invalid: {0}")]
    Invalid(String),
}

/// Storage abstraction for workout records and categories.
///
/// Rows that fail validation are skipped by every read below except
/// [`RecordStore::malformed_records`], which reports them.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // === Record operations ===

    /// Insert a record and return its store-assigned id.
    async fn insert_record(&mut self, draft: &RoutineDraft) -> Result<RecordId>;

    /// Replace the fields of an existing record.
    async fn update_record(&mut self, id: RecordId, draft: &RoutineDraft) -> Result<()>;

    /// Delete a record. Deleting a missing id is not an error.
    async fn delete_record(&mut self, id: RecordId) -> Result<()>;

    /// Load a record by ID.
    async fn load_record(&self, id: RecordId) -> Result<Option<RoutineRecord>>;

    /// List all well-formed records, newest date first.
    async fn list_records(&self) -> Result<Vec<RoutineRecord>>;

    /// List every stored row that fails validation.
    async fn malformed_records(&self) -> Result<Vec<MalformedRecord>>;

    // === Window queries ===

    /// Number of records dated inside the window.
    async fn count_records_in_window(&self, window: &DateWindow) -> Result<u64>;

    /// Total minutes of records dated inside the window, 0 when empty.
    async fn sum_duration_in_window(&self, window: &DateWindow) -> Result<u64>;

    /// Category with the most records inside the window.
    ///
    /// Ties go to the category whose first record has the lowest id.
    async fn most_frequent_category_in_window(&self, window: &DateWindow)
        -> Result<Option<String>>;

    /// Meal text of every record inside the window, in id order.
    async fn list_meals_in_window(&self, window: &DateWindow) -> Result<Vec<String>>;

    // === Category operations ===

    /// Add a category; names must be non-empty and unique.
    async fn insert_category(&mut self, name: &str) -> Result<CategoryId>;

    /// Rename a category.
    async fn rename_category(&mut self, id: CategoryId, name: &str) -> Result<()>;

    /// Delete a category. Records that use its name are left as they are.
    async fn delete_category(&mut self, id: CategoryId) -> Result<()>;

    /// List all categories in id order.
    async fn list_categories(&self) -> Result<Vec<WorkoutCategory>>;
}

/// Trim a category name and reject empty ones.
pub(crate) fn normalize_category_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StorageError::Invalid("category name must not be empty".to_string()));
    }
    Ok(name.to_string())
}
