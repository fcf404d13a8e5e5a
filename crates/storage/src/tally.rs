//! In-process window aggregation over validated records.
//!
//! Backends that cannot push aggregation down to a query engine load their
//! rows, validate them, and reduce them here.

use std::collections::HashMap;

use fittrack_core::{DateWindow, MalformedRecord, RecordRow, RoutineRecord};
use tracing::warn;

/// Validate rows, logging and dropping the malformed ones.
pub fn well_formed(rows: impl IntoIterator<Item = RecordRow>) -> Vec<RoutineRecord> {
    rows.into_iter()
        .filter_map(|row| match RoutineRecord::try_from(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed record: {}", e);
                None
            }
        })
        .collect()
}

/// Validate rows, keeping only the failures.
pub fn malformed(rows: impl IntoIterator<Item = RecordRow>) -> Vec<MalformedRecord> {
    rows.into_iter()
        .filter_map(|row| RoutineRecord::try_from(row).err())
        .collect()
}

/// Records inside the window, sorted by id.
pub fn in_window<'a>(records: &'a [RoutineRecord], window: &DateWindow) -> Vec<&'a RoutineRecord> {
    let mut hits: Vec<&RoutineRecord> = records.iter().filter(|r| window.contains(r.date)).collect();
    hits.sort_by_key(|r| r.id);
    hits
}

/// Total minutes across the records.
pub fn total_minutes(records: &[&RoutineRecord]) -> u64 {
    records.iter().map(|r| u64::from(r.duration)).sum()
}

/// Category with the highest count; ties go to the one seen first.
///
/// Expects records in id order.
pub fn most_frequent_category(records: &[&RoutineRecord]) -> Option<String> {
    // (count, first position)
    let mut counts: HashMap<&str, (u64, usize)> = HashMap::new();
    for (pos, record) in records.iter().enumerate() {
        counts.entry(record.category.as_str()).or_insert((0, pos)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, pos_a)), (_, (count_b, pos_b))| {
            count_a.cmp(count_b).then_with(|| pos_b.cmp(pos_a))
        })
        .map(|(name, _)| name.to_string())
}
