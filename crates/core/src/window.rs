//! Calendar-date windows used to scope aggregation.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day included
    pub start: NaiveDate,
    /// Last day included
    pub end: NaiveDate,
}

impl DateWindow {
    /// The `days` calendar days ending on `today`, both ends included.
    ///
    /// A zero-day request is treated as one day. A window reaching further
    /// back than chrono can represent starts at [`NaiveDate::MIN`].
    pub fn trailing(today: NaiveDate, days: u64) -> Self {
        let back = days.saturating_sub(1);
        let start = today.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// Whether `date` falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
