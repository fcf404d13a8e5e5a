//! FitTrack core data models.
//!
//! This crate defines the records, categories and date windows shared by the
//! store and the progress scoring engine.

#![warn(missing_docs)]

// Identities
mod id;

// Daily log
mod record;
mod category;

// Aggregation scope
mod window;

// Re-exports
pub use id::*;

pub use record::{
    RoutineRecord, RoutineDraft, RecordRow, MalformedRecord, parse_date, DATE_FORMAT,
};
pub use category::WorkoutCategory;
pub use window::DateWindow;
