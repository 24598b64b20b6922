//! Event kinds as the single source of truth for ledger kind strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two kinds of scan event the ledger records.
///
/// A scan carries no explicit in/out selector; the resolver derives the kind
/// from the member's current state, so stored kinds strictly alternate per
/// member going forward. Historical data may still contain repeated kinds
/// (double scans, crashes) and consumers must tolerate that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Arrival,
    Departure,
}

impl EventKind {
    /// The kind a new scan produces when the latest recorded kind is `self`.
    pub const fn toggled(self) -> Self {
        match self {
            Self::Arrival => Self::Departure,
            Self::Departure => Self::Arrival,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Arrival => "arrival",
            Self::Departure => "departure",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arrival" | "time_in" => Ok(Self::Arrival),
            "departure" | "time_out" => Ok(Self::Departure),
            _ => Err(UnknownEventKind(s.to_string())),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown event kind strings.
#[derive(Debug, Clone)]
pub struct UnknownEventKind(String);

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event kind: {}", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}

/// A single scan recorded in the append-only ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEvent {
    /// Ledger-assigned id, monotonic in append order.
    pub event_id: i64,
    /// The member who scanned.
    pub member_id: String,
    /// When the scan was recorded.
    pub timestamp: DateTime<Utc>,
    /// Arrival or departure.
    pub kind: EventKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_both_kinds() {
        for kind in [EventKind::Arrival, EventKind::Departure] {
            let s = kind.to_string();
            let parsed: EventKind = s.parse().expect("should parse");
            assert_eq!(parsed, kind, "roundtrip failed for {kind:?}");
        }
    }

    #[test]
    fn legacy_aliases_parse() {
        let time_in: EventKind = "time_in".parse().expect("should parse");
        assert_eq!(time_in, EventKind::Arrival);

        let time_out: EventKind = "time_out".parse().expect("should parse");
        assert_eq!(time_out, EventKind::Departure);
    }

    #[test]
    fn unknown_kind_errors() {
        let result: Result<EventKind, _> = "lunch".parse();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "unknown event kind: lunch");
    }

    #[test]
    fn toggled_alternates() {
        assert_eq!(EventKind::Arrival.toggled(), EventKind::Departure);
        assert_eq!(EventKind::Departure.toggled(), EventKind::Arrival);
        assert_eq!(EventKind::Arrival.toggled().toggled(), EventKind::Arrival);
    }

    #[test]
    fn kind_serializes_as_string() {
        let json = serde_json::to_string(&EventKind::Arrival).unwrap();
        assert_eq!(json, "\"arrival\"");

        let parsed: EventKind = serde_json::from_str("\"time_out\"").unwrap();
        assert_eq!(parsed, EventKind::Departure);
    }
}
