//! Core domain logic for the attendance kiosk.
//!
//! This crate contains the fundamental types and logic for:
//! - Presence events: the arrival/departure kinds the ledger records
//! - Members: identity numbers, birthday month-day handling
//! - Daily aggregation: pairing scans into one DTR row per member per day

mod dtr;
pub mod event;
pub mod member;

pub use dtr::{DatedEvent, DtrRow, build_daily_rows, format_hours};
pub use event::{EventKind, LedgerEvent, UnknownEventKind};
pub use member::{Birthday, InvalidBirthday, Member, RosterEntry};
