//! Period keys
//!
//! Outlines are stored one file per ISO week. A [`PeriodKey`] such as
//! `2026-W42` names that file and is recorded on trash entries so a restored
//! node can be traced back to the week it came from.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    /// Key of the ISO week containing `date`
    ///
    /// Uses the ISO week-numbering year, so the last days of December may
    /// belong to week 1 of the following year.
    pub fn week_of(date: NaiveDate) -> Self {
        let week = date.iso_week();
        Self(format!("{}-W{:02}", week.year(), week.week()))
    }

    /// Key of the current week (UTC)
    pub fn current() -> Self {
        Self::week_of(Utc::now().date_naive())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for this period with the given extension
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
