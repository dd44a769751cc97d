//! Common types used across the platform

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive date range for queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        let date = at.date_naive();
        date >= self.start && date <= self.end
    }
}
