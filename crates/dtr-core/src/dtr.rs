//! Daily Time Record aggregation.
//!
//! Collapses a date-bounded slice of the scan ledger into one row per
//! (member, calendar day).
//!
//! # Algorithm Summary
//!
//! 1. Group events by (member, calendar day), preserving ledger order
//! 2. Within each group, pair the first arrival with the first departure
//!    recorded after it; everything else in the group is ignored
//! 3. Hours rendered = paired interval in seconds / 3600, absent unless
//!    both sides of the pair exist
//!
//! Only one pair per day is tracked even when a member toggles more than
//! twice; repeated scans of the same kind are tolerated and ignored.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::event::EventKind;
use crate::member::Member;

/// A ledger event annotated with the calendar day it belongs to.
///
/// The caller decides what "calendar day" means (the kiosk runs on local
/// time); aggregation itself never consults a timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedEvent {
    pub member_id: String,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

/// One derived row per (member, day). Never persisted; recomputed on every
/// aggregation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DtrRow {
    pub member_id: String,
    pub display_name: String,
    pub committee: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_out: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_rendered: Option<f64>,
}

#[derive(Debug, Default)]
struct DayPairing {
    time_in: Option<DateTime<Utc>>,
    time_out: Option<DateTime<Utc>>,
}

impl DayPairing {
    fn observe(&mut self, kind: EventKind, timestamp: DateTime<Utc>) {
        match kind {
            EventKind::Arrival => {
                if self.time_in.is_none() {
                    self.time_in = Some(timestamp);
                }
            }
            EventKind::Departure => {
                if self.time_in.is_some() && self.time_out.is_none() {
                    self.time_out = Some(timestamp);
                }
            }
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "interval seconds are far below f64's exact integer range"
    )]
    fn hours_rendered(&self) -> Option<f64> {
        let time_in = self.time_in?;
        let time_out = self.time_out?;
        let seconds = time_out.signed_duration_since(time_in).num_seconds();
        Some(seconds as f64 / 3600.0)
    }
}

/// Builds DTR rows from dated events.
///
/// `events` must already be in ledger order (timestamp ascending, ties by
/// event id); the pairing rule depends on it. `members` supplies display
/// names and committees; events whose member is missing from the map are
/// skipped with a warning, since a row cannot be labeled without one.
///
/// Output is ordered by date ascending, then display name, then member id.
pub fn build_daily_rows(events: &[DatedEvent], members: &HashMap<String, Member>) -> Vec<DtrRow> {
    let mut pairings: HashMap<(String, NaiveDate), DayPairing> = HashMap::new();
    for event in events {
        if !members.contains_key(&event.member_id) {
            tracing::warn!(member_id = %event.member_id, "event for unknown member, skipping");
            continue;
        }
        pairings
            .entry((event.member_id.clone(), event.date))
            .or_default()
            .observe(event.kind, event.timestamp);
    }

    let mut rows: Vec<DtrRow> = pairings
        .into_iter()
        .filter_map(|((member_id, date), pairing)| {
            let member = members.get(&member_id)?;
            Some(DtrRow {
                member_id,
                display_name: member.display_name.clone(),
                committee: member.committee.clone(),
                date,
                time_in: pairing.time_in,
                time_out: pairing.time_out,
                hours_rendered: pairing.hours_rendered(),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        (a.date, &a.display_name, &a.member_id).cmp(&(b.date, &b.display_name, &b.member_id))
    });
    rows
}

/// Formats hours rendered for display: two decimal places.
pub fn format_hours(hours: f64) -> String {
    format!("{hours:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn member(id: &str, name: &str) -> Member {
        Member {
            member_id: id.to_string(),
            display_name: name.to_string(),
            birthday: None,
            committee: "Logistics".to_string(),
            photo: None,
        }
    }

    fn members(entries: &[(&str, &str)]) -> HashMap<String, Member> {
        entries
            .iter()
            .map(|(id, name)| ((*id).to_string(), member(id, name)))
            .collect()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, hour, minute, 0).unwrap()
    }

    fn dated(member_id: &str, hour: u32, minute: u32, kind: EventKind) -> DatedEvent {
        DatedEvent {
            member_id: member_id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            timestamp: at(hour, minute),
            kind,
        }
    }

    #[test]
    fn simple_pair_computes_hours() {
        let events = vec![
            dated("m1", 9, 0, EventKind::Arrival),
            dated("m1", 17, 0, EventKind::Departure),
        ];
        let rows = build_daily_rows(&events, &members(&[("m1", "Ana")]));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time_in, Some(at(9, 0)));
        assert_eq!(rows[0].time_out, Some(at(17, 0)));
        assert_eq!(rows[0].hours_rendered, Some(8.0));
    }

    #[test]
    fn duplicate_scans_are_tolerated() {
        // Arrival, arrival, departure, departure: first arrival and first
        // departure after it win.
        let events = vec![
            dated("m1", 9, 0, EventKind::Arrival),
            dated("m1", 9, 5, EventKind::Arrival),
            dated("m1", 17, 0, EventKind::Departure),
            dated("m1", 17, 10, EventKind::Departure),
        ];
        let rows = build_daily_rows(&events, &members(&[("m1", "Ana")]));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time_in, Some(at(9, 0)));
        assert_eq!(rows[0].time_out, Some(at(17, 0)));
        assert_eq!(rows[0].hours_rendered.map(format_hours).as_deref(), Some("8.00"));
    }

    #[test]
    fn unmatched_arrival_has_no_hours() {
        let events = vec![dated("m1", 9, 0, EventKind::Arrival)];
        let rows = build_daily_rows(&events, &members(&[("m1", "Ana")]));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time_in, Some(at(9, 0)));
        assert_eq!(rows[0].time_out, None);
        assert_eq!(rows[0].hours_rendered, None);
    }

    #[test]
    fn departure_before_any_arrival_never_pairs() {
        let events = vec![
            dated("m1", 8, 0, EventKind::Departure),
            dated("m1", 9, 0, EventKind::Arrival),
            dated("m1", 17, 0, EventKind::Departure),
        ];
        let rows = build_daily_rows(&events, &members(&[("m1", "Ana")]));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time_in, Some(at(9, 0)));
        assert_eq!(rows[0].time_out, Some(at(17, 0)));
    }

    #[test]
    fn departure_only_day_yields_empty_row() {
        let events = vec![dated("m1", 8, 0, EventKind::Departure)];
        let rows = build_daily_rows(&events, &members(&[("m1", "Ana")]));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time_in, None);
        assert_eq!(rows[0].time_out, None);
        assert_eq!(rows[0].hours_rendered, None);
    }

    #[test]
    fn only_first_pair_per_day_is_tracked() {
        // Morning pair, then an afternoon toggle: the second pair is ignored.
        let events = vec![
            dated("m1", 9, 0, EventKind::Arrival),
            dated("m1", 12, 0, EventKind::Departure),
            dated("m1", 13, 0, EventKind::Arrival),
            dated("m1", 17, 0, EventKind::Departure),
        ];
        let rows = build_daily_rows(&events, &members(&[("m1", "Ana")]));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time_in, Some(at(9, 0)));
        assert_eq!(rows[0].time_out, Some(at(12, 0)));
        assert_eq!(rows[0].hours_rendered, Some(3.0));
    }

    #[test]
    fn rows_sorted_by_date_then_name() {
        let day1 = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let mk = |member_id: &str, date: NaiveDate| DatedEvent {
            member_id: member_id.to_string(),
            date,
            timestamp: at(9, 0),
            kind: EventKind::Arrival,
        };
        let events = vec![mk("m2", day2), mk("m1", day1), mk("m2", day1)];
        let lookup = members(&[("m1", "Ana Reyes"), ("m2", "Ben Cruz")]);
        let rows = build_daily_rows(&events, &lookup);

        let order: Vec<(NaiveDate, &str)> = rows
            .iter()
            .map(|r| (r.date, r.display_name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(day1, "Ana Reyes"), (day1, "Ben Cruz"), (day2, "Ben Cruz")]
        );
    }

    #[test]
    fn members_do_not_share_rows() {
        let events = vec![
            dated("m1", 9, 0, EventKind::Arrival),
            dated("m2", 9, 30, EventKind::Arrival),
            dated("m1", 17, 0, EventKind::Departure),
        ];
        let rows = build_daily_rows(&events, &members(&[("m1", "Ana"), ("m2", "Ben")]));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hours_rendered, Some(8.0));
        assert_eq!(rows[1].time_in, Some(at(9, 30)));
        assert_eq!(rows[1].time_out, None);
    }

    #[test]
    fn unknown_member_events_are_skipped() {
        let events = vec![dated("ghost", 9, 0, EventKind::Arrival)];
        let rows = build_daily_rows(&events, &members(&[("m1", "Ana")]));
        assert!(rows.is_empty());
    }

    #[test]
    fn no_events_means_no_rows() {
        let rows = build_daily_rows(&[], &members(&[("m1", "Ana")]));
        assert!(rows.is_empty());
    }

    #[test]
    fn format_hours_two_decimals() {
        assert_eq!(format_hours(8.0), "8.00");
        assert_eq!(format_hours(7.505), "7.51");
        assert_eq!(format_hours(0.0), "0.00");
    }
}
