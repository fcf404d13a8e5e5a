//! Workout category model.

use serde::{Deserialize, Serialize};

use crate::id::CategoryId;

/// A named kind of workout, e.g. "Cardio".
///
/// Records copy the name rather than referencing the id, so renaming or
/// deleting a category leaves existing records untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutCategory {
    /// Unique identifier
    pub id: CategoryId,

    /// Unique, non-empty display name
    pub name: String,
}
