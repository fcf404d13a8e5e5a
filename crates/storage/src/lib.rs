//! Storage abstraction and implementations for FitTrack.
//!
//! This crate provides the `RecordStore` trait with a JSON-file reference
//! implementation and an optional SQLite backend.

#![warn(missing_docs)]

pub mod trait_;
pub mod tally;
#[cfg(feature = "json")]
pub mod json_storage;
#[cfg(feature = "sqlite")]
pub mod sqlite_storage;

pub use trait_::{RecordStore, StorageError, Result};
#[cfg(feature = "json")]
pub use json_storage::JsonStore;
#[cfg(feature = "sqlite")]
pub use sqlite_storage::SqliteStore;
