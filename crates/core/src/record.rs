//! Routine record model - one day's workout and meal entry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::id::RecordId;

/// Canonical on-disk date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A validated workout/meal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineRecord {
    /// Unique identifier, assigned by the store
    pub id: RecordId,

    /// Day the workout happened
    pub date: NaiveDate,

    /// Workout category label (a copy of a category name, not a reference)
    pub category: String,

    /// Minutes trained
    pub duration: u32,

    /// What was eaten
    pub meal: String,
}

/// The caller-supplied part of a record, used for inserts and updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineDraft {
    /// Day the workout happened
    pub date: NaiveDate,

    /// Workout category label
    pub category: String,

    /// Minutes trained
    pub duration: u32,

    /// What was eaten
    pub meal: String,
}

impl RoutineDraft {
    /// Create a new draft.
    pub fn new(
        date: NaiveDate,
        category: impl Into<String>,
        duration: u32,
        meal: impl Into<String>,
    ) -> Self {
        Self {
            date,
            category: category.into(),
            duration,
            meal: meal.into(),
        }
    }

    /// Attach a store id, producing the full record.
    pub fn into_record(self, id: RecordId) -> RoutineRecord {
        RoutineRecord {
            id,
            date: self.date,
            category: self.category,
            duration: self.duration,
            meal: self.meal,
        }
    }
}

/// A record as persisted, before validation.
///
/// Stores keep dates as text and durations as signed integers, so hand-edited
/// or legacy rows can hold values that do not form a valid `RoutineRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRow {
    /// Unique identifier
    pub id: RecordId,

    /// Date text, expected in `YYYY-MM-DD` form
    pub date: String,

    /// Workout category label
    pub category: String,

    /// Minutes trained, may be negative in a corrupt row
    pub duration: i64,

    /// What was eaten
    pub meal: String,
}

/// Why a persisted row could not be turned into a `RoutineRecord`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    /// Date is not a canonical `YYYY-MM-DD` calendar date
    #[error("record {id}: unparsable date {value:?}")]
    InvalidDate {
        /// Offending record
        id: RecordId,
        /// Raw date text
        value: String,
    },

    /// Duration is stored as something other than an integer
    #[error("record {id}: non-integer duration {value:?}")]
    InvalidDuration {
        /// Offending record
        id: RecordId,
        /// Raw duration text
        value: String,
    },

    /// Duration is below zero
    #[error("record {id}: negative duration {minutes}")]
    NegativeDuration {
        /// Offending record
        id: RecordId,
        /// Stored minutes
        minutes: i64,
    },

    /// Stored entry could not be decoded at all
    #[error("record {id}: unreadable entry ({reason})")]
    Unreadable {
        /// Offending record
        id: RecordId,
        /// Decoder message
        reason: String,
    },
}

impl MalformedRecord {
    /// The record this problem belongs to.
    pub fn record_id(&self) -> RecordId {
        match self {
            MalformedRecord::InvalidDate { id, .. }
            | MalformedRecord::InvalidDuration { id, .. }
            | MalformedRecord::NegativeDuration { id, .. }
            | MalformedRecord::Unreadable { id, .. } => *id,
        }
    }
}

/// Parse a date, accepting only the canonical zero-padded form.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(value, DATE_FORMAT).ok()?;
    (date.format(DATE_FORMAT).to_string() == value).then_some(date)
}

impl TryFrom<RecordRow> for RoutineRecord {
    type Error = MalformedRecord;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let Some(date) = parse_date(&row.date) else {
            return Err(MalformedRecord::InvalidDate {
                id: row.id,
                value: row.date,
            });
        };

        let duration = u32::try_from(row.duration).map_err(|_| {
            if row.duration < 0 {
                MalformedRecord::NegativeDuration {
                    id: row.id,
                    minutes: row.duration,
                }
            } else {
                MalformedRecord::InvalidDuration {
                    id: row.id,
                    value: row.duration.to_string(),
                }
            }
        })?;

        Ok(RoutineRecord {
            id: row.id,
            date,
            category: row.category,
            duration,
            meal: row.meal,
        })
    }
}

impl From<&RoutineRecord> for RecordRow {
    fn from(record: &RoutineRecord) -> Self {
        Self {
            id: record.id,
            date: record.date.format(DATE_FORMAT).to_string(),
            category: record.category.clone(),
            duration: i64::from(record.duration),
            meal: record.meal.clone(),
        }
    }
}
