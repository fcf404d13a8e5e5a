//! JSON file storage implementation.
//!
//! Stores one JSON file per record under `records/` and per category under
//! `categories/`. A `manifest.json` at the root holds the next ids to hand
//! out, so ids are never reused after a delete.
//!
//! Record files are decoded field by field, so a hand-edited file with a
//! text duration or broken JSON is reported as malformed instead of lost.

use std::path::{Path, PathBuf};

use fittrack_core::{
    CategoryId, DateWindow, MalformedRecord, RecordId, RecordRow, RoutineDraft, RoutineRecord,
    WorkoutCategory,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use super::tally;
use super::trait_::normalize_category_name;
use super::{RecordStore, Result, StorageError};

/// Id counters persisted next to the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    /// The next ID to be assigned to a record.
    next_record_id: i64,
    /// The next ID to be assigned to a category.
    next_category_id: i64,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            next_record_id: 1,
            next_category_id: 1,
        }
    }
}

/// A record file decoded as far as its content allows.
type Decoded = std::result::Result<RecordRow, MalformedRecord>;

/// File-based JSON storage backend.
pub struct JsonStore {
    root: PathBuf,
    manifest: Manifest,
}

impl JsonStore {
    /// Open (or create) a store rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("records")).await?;
        fs::create_dir_all(root.join("categories")).await?;

        let manifest = read_json(&root.join("manifest.json")).await?.unwrap_or_default();
        debug!("Opened JSON store at {}", root.display());

        Ok(Self { root, manifest })
    }

    fn record_path(&self, id: RecordId) -> PathBuf {
        self.root.join("records").join(format!("{}.json", id))
    }

    fn category_path(&self, id: CategoryId) -> PathBuf {
        self.root.join("categories").join(format!("{}.json", id))
    }

    async fn save_manifest(&self) -> Result<()> {
        write_json(&self.root.join("manifest.json"), &self.manifest).await
    }

    /// Every record file, in directory order.
    async fn decoded_rows(&self) -> Result<Vec<Decoded>> {
        let mut decoded = Vec::new();
        let mut rd = fs::read_dir(self.root.join("records")).await?;
        while let Some(entry) = rd.next_entry().await? {
            let path = entry.path();
            let Some(id) = record_file_id(&path) else {
                debug!("Ignoring {}", path.display());
                continue;
            };
            decoded.extend(read_record(&path, id).await?);
        }
        Ok(decoded)
    }

    async fn rows(&self) -> Result<Vec<RecordRow>> {
        let mut rows = Vec::new();
        for decoded in self.decoded_rows().await? {
            match decoded {
                Ok(row) => rows.push(row),
                Err(problem) => warn!("Skipping malformed record: {}", problem),
            }
        }
        Ok(rows)
    }

    /// Well-formed records inside the window, in id order.
    async fn window_records(&self, window: &DateWindow) -> Result<Vec<RoutineRecord>> {
        let records = tally::well_formed(self.rows().await?);
        Ok(tally::in_window(&records, window).into_iter().cloned().collect())
    }

    async fn ensure_unique_name(&self, name: &str, except: Option<CategoryId>) -> Result<()> {
        let taken = self
            .list_categories()
            .await?
            .into_iter()
            .any(|c| c.name == name && Some(c.id) != except);
        if taken {
            return Err(StorageError::Conflict(format!("category '{}' already exists", name)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for JsonStore {
    async fn insert_record(&mut self, draft: &RoutineDraft) -> Result<RecordId> {
        let id = RecordId::new(self.manifest.next_record_id);
        self.manifest.next_record_id += 1;
        self.save_manifest().await?;

        let record = draft.clone().into_record(id);
        write_json(&self.record_path(id), &RecordRow::from(&record)).await?;
        Ok(id)
    }

    async fn update_record(&mut self, id: RecordId, draft: &RoutineDraft) -> Result<()> {
        let path = self.record_path(id);
        if !fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(format!("record {}", id)));
        }
        let record = draft.clone().into_record(id);
        write_json(&path, &RecordRow::from(&record)).await
    }

    async fn delete_record(&mut self, id: RecordId) -> Result<()> {
        remove_if_exists(&self.record_path(id)).await
    }

    async fn load_record(&self, id: RecordId) -> Result<Option<RoutineRecord>> {
        let Some(decoded) = read_record(&self.record_path(id), id).await? else {
            return Ok(None);
        };
        match decoded.and_then(RoutineRecord::try_from) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Skipping malformed record: {}", e);
                Ok(None)
            }
        }
    }

    async fn list_records(&self) -> Result<Vec<RoutineRecord>> {
        let mut records = tally::well_formed(self.rows().await?);
        records.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn malformed_records(&self) -> Result<Vec<MalformedRecord>> {
        let mut problems = Vec::new();
        let mut rows = Vec::new();
        for decoded in self.decoded_rows().await? {
            match decoded {
                Ok(row) => rows.push(row),
                Err(problem) => problems.push(problem),
            }
        }
        problems.extend(tally::malformed(rows));
        problems.sort_by_key(|p| p.record_id());
        Ok(problems)
    }

    async fn count_records_in_window(&self, window: &DateWindow) -> Result<u64> {
        Ok(self.window_records(window).await?.len() as u64)
    }

    async fn sum_duration_in_window(&self, window: &DateWindow) -> Result<u64> {
        let records = self.window_records(window).await?;
        Ok(tally::total_minutes(&records.iter().collect::<Vec<_>>()))
    }

    async fn most_frequent_category_in_window(
        &self,
        window: &DateWindow,
    ) -> Result<Option<String>> {
        let records = self.window_records(window).await?;
        Ok(tally::most_frequent_category(&records.iter().collect::<Vec<_>>()))
    }

    async fn list_meals_in_window(&self, window: &DateWindow) -> Result<Vec<String>> {
        let records = self.window_records(window).await?;
        Ok(records.into_iter().map(|r| r.meal).collect())
    }

    async fn insert_category(&mut self, name: &str) -> Result<CategoryId> {
        let name = normalize_category_name(name)?;
        self.ensure_unique_name(&name, None).await?;

        let id = CategoryId::new(self.manifest.next_category_id);
        self.manifest.next_category_id += 1;
        self.save_manifest().await?;

        write_json(&self.category_path(id), &WorkoutCategory { id, name }).await?;
        Ok(id)
    }

    async fn rename_category(&mut self, id: CategoryId, name: &str) -> Result<()> {
        let name = normalize_category_name(name)?;
        let path = self.category_path(id);
        if read_json::<WorkoutCategory>(&path).await?.is_none() {
            return Err(StorageError::NotFound(format!("category {}", id)));
        }
        self.ensure_unique_name(&name, Some(id)).await?;
        write_json(&path, &WorkoutCategory { id, name }).await
    }

    async fn delete_category(&mut self, id: CategoryId) -> Result<()> {
        remove_if_exists(&self.category_path(id)).await
    }

    async fn list_categories(&self) -> Result<Vec<WorkoutCategory>> {
        let mut categories: Vec<WorkoutCategory> = list_dir(&self.root.join("categories")).await?;
        categories.sort_by_key(|c| c.id);
        Ok(categories)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json.as_bytes()).await?;
    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    fs::remove_file(path).await.or_else(|e| {
        if e.kind() == std::io::ErrorKind::NotFound { Ok(()) } else { Err(e) }
    })?;
    Ok(())
}

/// Record id encoded in a `records/<id>.json` file name.
fn record_file_id(path: &Path) -> Option<RecordId> {
    if path.extension().and_then(|s| s.to_str()) != Some("json") {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Read one record file. `None` when the file does not exist.
async fn read_record(path: &Path, id: RecordId) -> Result<Option<Decoded>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let decoded = match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => decode_row(id, &value),
        Err(e) => Err(MalformedRecord::Unreadable {
            id,
            reason: e.to_string(),
        }),
    };
    Ok(Some(decoded))
}

/// Build a row from loosely typed JSON. The file name decides the id.
fn decode_row(id: RecordId, value: &Value) -> Decoded {
    let Some(fields) = value.as_object() else {
        return Err(MalformedRecord::Unreadable {
            id,
            reason: "expected a JSON object".to_string(),
        });
    };

    let date = match fields.get("date") {
        Some(Value::String(date)) => date.clone(),
        other => {
            return Err(MalformedRecord::InvalidDate {
                id,
                value: raw_text(other),
            })
        }
    };
    let duration = fields
        .get("duration")
        .and_then(Value::as_i64)
        .ok_or_else(|| MalformedRecord::InvalidDuration {
            id,
            value: raw_text(fields.get("duration")),
        })?;
    let text = |key: &str| fields.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

    Ok(RecordRow {
        id,
        date,
        category: text("category"),
        duration,
        meal: text("meal"),
    })
}

fn raw_text(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&path).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(StorageError::Json(e)) => warn!("Skipping unreadable file {}: {}", path.display(), e),
            Err(e) => return Err(e),
        }
    }
    Ok(items)
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

    #[tokio::test]
    async fn test_record_crud() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();

        let id = store
            .insert_record(&RoutineDraft::new(day(14), "Cardio", 30, "apple"))
            .await
            .unwrap();
        let loaded = store.load_record(id).await.unwrap().unwrap();
        assert_eq!(loaded.category, "Cardio");

        store
            .update_record(id, &RoutineDraft::new(day(15), "Legs", 45, "rice"))
            .await
            .unwrap();
        let loaded = store.load_record(id).await.unwrap().unwrap();
        assert_eq!(loaded.duration, 45);
        assert_eq!(loaded.date, day(15));

        store.delete_record(id).await.unwrap();
        assert!(store.load_record(id).await.unwrap().is_none());
        // second delete is a no-op
        store.delete_record(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();

        let err = store
            .update_record(RecordId::new(99), &RoutineDraft::new(day(1), "Cardio", 10, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ids_survive_reopen_and_are_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let first = {
            let mut store = JsonStore::new(dir.path()).await.unwrap();
            let id = store.insert_record(&RoutineDraft::new(day(1), "A", 1, "")).await.unwrap();
            store.delete_record(id).await.unwrap();
            id
        };

        let mut store = JsonStore::new(dir.path()).await.unwrap();
        let second = store.insert_record(&RoutineDraft::new(day(2), "B", 1, "")).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();
        for d in [3, 9, 5] {
            store.insert_record(&RoutineDraft::new(day(d), "Cardio", 10, "")).await.unwrap();
        }

        let dates: Vec<NaiveDate> = store.list_records().await.unwrap().iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(9), day(5), day(3)]);
    }

    #[tokio::test]
    async fn test_window_queries() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();

        store.insert_record(&RoutineDraft::new(day(16), "Cardio", 30, "Apple pie")).await.unwrap();
        store.insert_record(&RoutineDraft::new(day(12), "Legs", 40, "pizza")).await.unwrap();
        store.insert_record(&RoutineDraft::new(day(10), "Legs", 50, "rice")).await.unwrap();
        // outside the window on both sides
        store.insert_record(&RoutineDraft::new(day(9), "Legs", 100, "x")).await.unwrap();
        store.insert_record(&RoutineDraft::new(day(17), "Legs", 100, "y")).await.unwrap();

        let window = week();
        assert_eq!(store.count_records_in_window(&window).await.unwrap(), 3);
        assert_eq!(store.sum_duration_in_window(&window).await.unwrap(), 120);
        assert_eq!(
            store.most_frequent_category_in_window(&window).await.unwrap().as_deref(),
            Some("Legs")
        );
        assert_eq!(
            store.list_meals_in_window(&window).await.unwrap(),
            vec!["Apple pie", "pizza", "rice"]
        );
    }

    #[tokio::test]
    async fn test_empty_window() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();

        let window = week();
        assert_eq!(store.count_records_in_window(&window).await.unwrap(), 0);
        assert_eq!(store.sum_duration_in_window(&window).await.unwrap(), 0);
        assert!(store.most_frequent_category_in_window(&window).await.unwrap().is_none());
        assert!(store.list_meals_in_window(&window).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();
        store.insert_record(&RoutineDraft::new(day(15), "Cardio", 30, "rice")).await.unwrap();

        // hand-edited rows
        let bad_date = RecordRow {
            id: RecordId::new(50),
            date: "15-10-2026".to_string(),
            category: "Legs".to_string(),
            duration: 20,
            meal: "chicken".to_string(),
        };
        let bad_minutes = RecordRow {
            id: RecordId::new(51),
            date: "2026-10-15".to_string(),
            category: "Legs".to_string(),
            duration: -20,
            meal: "chicken".to_string(),
        };
        write_json(&store.record_path(bad_date.id), &bad_date).await.unwrap();
        write_json(&store.record_path(bad_minutes.id), &bad_minutes).await.unwrap();
        fs::write(dir.path().join("records").join("52.json"), b"{not json").await.unwrap();

        let window = week();
        assert_eq!(store.count_records_in_window(&window).await.unwrap(), 1);
        assert_eq!(store.sum_duration_in_window(&window).await.unwrap(), 30);
        assert_eq!(store.list_meals_in_window(&window).await.unwrap(), vec!["rice"]);
        assert_eq!(store.list_records().await.unwrap().len(), 1);
        assert!(store.load_record(RecordId::new(50)).await.unwrap().is_none());

        let problems = store.malformed_records().await.unwrap();
        let ids: Vec<i64> = problems.iter().map(|p| p.record_id().get()).collect();
        assert_eq!(ids, vec![50, 51, 52]);
        assert!(matches!(problems[1], MalformedRecord::NegativeDuration { minutes: -20, .. }));
        assert!(matches!(problems[2], MalformedRecord::Unreadable { .. }));
    }

    #[tokio::test]
    async fn test_loosely_typed_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();
        store.insert_record(&RoutineDraft::new(day(15), "Cardio", 30, "rice")).await.unwrap();

        let records = dir.path().join("records");
        fs::write(
            records.join("53.json"),
            br#"{"id":53,"date":"2026-10-15","category":"Legs","duration":"thirty","meal":"rice"}"#,
        )
        .await
        .unwrap();
        fs::write(
            records.join("54.json"),
            br#"{"id":54,"date":"2026-10-14","category":"Legs","duration":12.5,"meal":"apple"}"#,
        )
        .await
        .unwrap();
        fs::write(
            records.join("55.json"),
            br#"{"id":55,"date":20261014,"category":"Legs","duration":10,"meal":"apple"}"#,
        )
        .await
        .unwrap();
        fs::write(records.join("56.json"), b"[1, 2]").await.unwrap();
        // not a record file
        fs::write(records.join("notes.json"), b"{}").await.unwrap();

        let window = week();
        assert_eq!(store.count_records_in_window(&window).await.unwrap(), 1);
        assert_eq!(store.sum_duration_in_window(&window).await.unwrap(), 30);
        assert_eq!(store.list_records().await.unwrap().len(), 1);
        assert!(store.load_record(RecordId::new(53)).await.unwrap().is_none());

        let problems = store.malformed_records().await.unwrap();
        assert_eq!(
            problems,
            vec![
                MalformedRecord::InvalidDuration {
                    id: RecordId::new(53),
                    value: "thirty".to_string(),
                },
                MalformedRecord::InvalidDuration {
                    id: RecordId::new(54),
                    value: "12.5".to_string(),
                },
                MalformedRecord::InvalidDate {
                    id: RecordId::new(55),
                    value: "20261014".to_string(),
                },
                MalformedRecord::Unreadable {
                    id: RecordId::new(56),
                    reason: "expected a JSON object".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_category_rules() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();

        let cardio = store.insert_category(" Cardio ").await.unwrap();
        let legs = store.insert_category("Legs").await.unwrap();

        assert!(matches!(store.insert_category("Cardio").await, Err(StorageError::Conflict(_))));
        assert!(matches!(store.insert_category("   ").await, Err(StorageError::Invalid(_))));
        assert!(matches!(store.rename_category(legs, "Cardio").await, Err(StorageError::Conflict(_))));
        assert!(matches!(
            store.rename_category(CategoryId::new(99), "Arms").await,
            Err(StorageError::NotFound(_))
        ));

        // renaming to its own name is fine
        store.rename_category(cardio, "Cardio").await.unwrap();
        store.rename_category(legs, "Leg Day").await.unwrap();

        let names: Vec<String> = store.list_categories().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Cardio", "Leg Day"]);
    }

    #[tokio::test]
    async fn test_deleting_category_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();

        let cardio = store.insert_category("Cardio").await.unwrap();
        store.insert_record(&RoutineDraft::new(day(16), "Cardio", 30, "")).await.unwrap();
        store.delete_category(cardio).await.unwrap();

        assert!(store.list_categories().await.unwrap().is_empty());
        assert_eq!(
            store.most_frequent_category_in_window(&week()).await.unwrap().as_deref(),
            Some("Cardio")
        );
    }
}
