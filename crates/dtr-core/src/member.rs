//! Member identity and registry snapshot types.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A registered member as seen by the engine.
///
/// The registry owns the full record; the core reads the identity number,
/// display name, and birthday. Committee and photo ride along for the
/// roster projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Identity number printed on the scanned card. Unique and immutable.
    pub member_id: String,
    /// Name shown in greetings and reports.
    pub display_name: String,
    /// Month-day of birth, no year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<Birthday>,
    /// Committee or group label.
    pub committee: String,
    /// Reference to a stored photo file. The core never reads the bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// A month-day of birth, stored and displayed as `MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Birthday {
    month: u32,
    day: u32,
}

impl Birthday {
    /// Validates a month-day combination. `02-29` is accepted.
    pub fn new(month: u32, day: u32) -> Result<Self, InvalidBirthday> {
        // 2000 is a leap year, so every representable month-day exists in it.
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(InvalidBirthday(format!("{month:02}-{day:02}")));
        }
        Ok(Self { month, day })
    }

    /// Whether `date` falls on this month-day.
    pub fn matches(self, date: NaiveDate) -> bool {
        date.month() == self.month && date.day() == self.day
    }
}

impl fmt::Display for Birthday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl FromStr for Birthday {
    type Err = InvalidBirthday;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (month, day) = s
            .split_once('-')
            .ok_or_else(|| InvalidBirthday(s.to_string()))?;
        let month: u32 = month.parse().map_err(|_| InvalidBirthday(s.to_string()))?;
        let day: u32 = day.parse().map_err(|_| InvalidBirthday(s.to_string()))?;
        Self::new(month, day).map_err(|_| InvalidBirthday(s.to_string()))
    }
}

impl Serialize for Birthday {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Birthday {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for malformed birthday strings.
#[derive(Debug, Clone)]
pub struct InvalidBirthday(String);

impl fmt::Display for InvalidBirthday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid birthday (expected MM-DD): {}", self.0)
    }
}

impl std::error::Error for InvalidBirthday {}

/// One member's row in the roster snapshot.
///
/// `present` is derived from the member's latest ledger event: an arrival
/// means they are in, anything else (or no events at all) means they are out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub member: Member,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_at: Option<DateTime<Utc>>,
}
