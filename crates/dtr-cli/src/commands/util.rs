//! Shared helpers for command implementations.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};

use dtr_core::EventKind;

/// The boundary's default reporting range: first of the current month
/// through today, both inclusive.
pub fn default_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = today.with_day(1).unwrap_or(today);
    (first, today)
}

/// Resolves optional CLI bounds into the engine's half-open range.
///
/// The CLI's `end` is the last day to include; the engine takes an
/// exclusive bound, so one day is added here.
pub fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let (default_start, default_end) = default_range(today);
    let start = start.unwrap_or(default_start);
    let end_inclusive = end.unwrap_or(default_end);
    (start, end_inclusive + Duration::days(1))
}

/// Kiosk-facing label for an event kind.
pub fn kind_label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Arrival => "Time In",
        EventKind::Departure => "Time Out",
    }
}

/// Formats an instant as kiosk-local wall-clock time, e.g. `03:05 PM`.
pub fn local_clock(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%I:%M %p").to_string()
}
