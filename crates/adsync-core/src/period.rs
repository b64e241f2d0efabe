//! Named reporting periods and their UTC windows.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "yesterday")]
    Yesterday,
    #[default]
    #[serde(rename = "last7d")]
    Last7d,
    #[serde(rename = "last30d")]
    Last30d,
    #[serde(rename = "this_month")]
    ThisMonth,
    #[serde(rename = "last_month")]
    LastMonth,
}

/// Half-open `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

impl Period {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::Yesterday => "yesterday",
            Period::Last7d => "last7d",
            Period::Last30d => "last30d",
            Period::ThisMonth => "this_month",
            Period::LastMonth => "last_month",
        }
    }

    /// The Graph insights `date_preset` equivalent.
    #[must_use]
    pub fn date_preset(self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::Yesterday => "yesterday",
            Period::Last7d => "last_7d",
            Period::Last30d => "last_30d",
            Period::ThisMonth => "this_month",
            Period::LastMonth => "last_month",
        }
    }

    #[must_use]
    pub fn window(self, now: DateTime<Utc>) -> TimeWindow {
        let today = now.date_naive();
        let (start, end) = match self {
            Period::Today => (midnight(today), now),
            Period::Yesterday => (midnight(today - Duration::days(1)), midnight(today)),
            Period::Last7d => (now - Duration::days(7), now),
            Period::Last30d => (now - Duration::days(30), now),
            Period::ThisMonth => (midnight(first_of_month(today)), now),
            Period::LastMonth => {
                let this_month = first_of_month(today);
                let previous = first_of_month(this_month - Duration::days(1));
                (midnight(previous), midnight(this_month))
            }
        };
        TimeWindow { start, end }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Period::Today),
            "yesterday" => Ok(Period::Yesterday),
            "last7d" => Ok(Period::Last7d),
            "last30d" => Ok(Period::Last30d),
            "this_month" => Ok(Period::ThisMonth),
            "last_month" => Ok(Period::LastMonth),
            other => Err(CoreError::InvalidPeriod(other.to_string())),
        }
    }
}
