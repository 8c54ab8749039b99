//! Daily free-use quota types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActionId, ActionType, UserId};

/// A calendar day in UTC, the unit the free-tier quota resets on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UsageDay(NaiveDate);

impl UsageDay {
    /// The UTC calendar day containing `instant`.
    #[must_use]
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self(instant.date_naive())
    }

    /// Wrap a calendar date.
    #[must_use]
    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The underlying date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.0
    }

    /// Compact `YYYYMMDD` form used in storage keys; sorts chronologically.
    #[must_use]
    pub fn key_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.0.format("%Y%m%d").to_string().as_bytes());
        out
    }
}

impl fmt::Display for UsageDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for UsageDay {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Self)
    }
}

impl TryFrom<String> for UsageDay {
    type Error = chrono::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UsageDay> for String {
    fn from(day: UsageDay) -> Self {
        day.to_string()
    }
}

/// One consumed free use. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsageRecord {
    /// The user who consumed the free use.
    pub user_id: UserId,

    /// Day the use counts against.
    pub day: UsageDay,

    /// Zero-based position of this use within the day.
    pub slot: u32,

    /// Kind of action that consumed the slot.
    pub action_type: ActionType,

    /// The action the slot was reserved for.
    pub action_id: ActionId,

    /// When the slot was consumed.
    pub created_at: DateTime<Utc>,
}
