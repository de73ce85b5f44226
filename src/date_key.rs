use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_KEY_LEN: usize = 10;

/// Calendar day identifier rendered as `YYYY-MM-DD`.
///
/// Ordering follows the calendar, which for four-digit years is the same as
/// lexicographic ordering of the rendered key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Parses a strict `YYYY-MM-DD` key. Anything that is not a real calendar
    /// date in exactly that shape yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() != DATE_KEY_LEN {
            return None;
        }
        let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()?;
        let key = Self(date);
        (key.to_string() == raw).then_some(key)
    }

    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn previous(&self) -> Self {
        Self(self.0.pred_opt().unwrap_or(self.0))
    }

    pub fn next(&self) -> Self {
        Self(self.0.succ_opt().unwrap_or(self.0))
    }

    pub fn add_days(&self, days: i64) -> Self {
        self.0
            .checked_add_signed(Duration::days(days))
            .map(Self)
            .unwrap_or(*self)
    }

    pub fn days_until(&self, other: DateKey) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// Every day from `start` to `end`, both included. Empty when `end` is
    /// before `start`.
    pub fn range_inclusive(start: DateKey, end: DateKey) -> Vec<DateKey> {
        let mut days = Vec::new();
        let mut cursor = start;
        while cursor <= end {
            days.push(cursor);
            let next = cursor.next();
            if next == cursor {
                break;
            }
            cursor = next;
        }
        days
    }

    pub fn window_ending(end: DateKey, days: u32) -> Vec<DateKey> {
        if days == 0 {
            return Vec::new();
        }
        let start = end.add_days(-(i64::from(days) - 1));
        Self::range_inclusive(start, end)
    }
}

impl Display for DateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw).ok_or_else(|| format!("invalid date key: {raw}"))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateKey::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date key: {raw}")))
    }
}
