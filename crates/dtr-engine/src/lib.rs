//! Presence resolution and time-record aggregation engine.
//!
//! The [`Engine`] owns the storage handle and implements the kiosk's two
//! core operations:
//! - [`Engine::resolve`]: the "no-touch" toggle that turns a bare identity
//!   scan into an arrival or departure event
//! - [`Engine::aggregate`]: collapsing a date-bounded ledger slice into
//!   Daily Time Record rows
//!
//! It also surfaces the member registry and roster snapshot to the boundary,
//! so request handlers hold a single engine reference instead of raw
//! database handles.
//!
//! # Concurrency
//!
//! A single `Mutex<Database>` guards all storage access. Every resolve holds
//! the lock from the latest-event read through the append, so concurrent
//! scans of the same identity number are serialized and stored kinds
//! alternate strictly per member. Aggregation and roster reads take the same
//! lock for the duration of one snapshot, so a row can never be observed
//! half-written.
//!
//! # State policy
//!
//! The member's current state is derived from their latest ledger event
//! rather than cached on the member row. The ledger is the source of truth;
//! there is no second write that could fall out of step with it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

use dtr_core::{DatedEvent, DtrRow, EventKind, Member, RosterEntry, build_daily_rows};
use dtr_db::{Database, DbError, LedgerStats};

/// Engine errors. All are value-level results; none terminate the process.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The scanned identity number is not registered.
    #[error("member not found: {0}")]
    MemberNotFound(String),
    /// Aggregation was asked for a range whose start is after its end.
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    /// A ledger read or append failed. Never retried automatically; a retry
    /// of a failed append could record a duplicate toggle.
    #[error(transparent)]
    Storage(#[from] DbError),
}

/// The result of resolving one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    /// Snapshot of the member who scanned.
    pub member: Member,
    /// What this scan turned out to be.
    pub kind: EventKind,
    /// Ledger id of the event this scan appended.
    pub event_id: i64,
    /// When the scan was recorded.
    pub timestamp: DateTime<Utc>,
    /// True when an arrival falls on the member's birthday. Display only.
    pub is_birthday: bool,
}

/// The engine object. Constructed once at process start and passed by
/// reference to request handlers.
pub struct Engine {
    db: Mutex<Database>,
}

impl Engine {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Presence resolution =====

    /// Resolves a scan for `member_id`: decides arrival vs departure from
    /// the member's latest event and appends exactly one new event.
    pub fn resolve(&self, member_id: &str) -> Result<ScanOutcome, EngineError> {
        self.resolve_at(member_id, Utc::now())
    }

    /// [`Engine::resolve`] with an injected clock.
    pub fn resolve_at(
        &self,
        member_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, EngineError> {
        let mut db = self.db();
        let member = db
            .get_member(member_id)?
            .ok_or_else(|| EngineError::MemberNotFound(member_id.to_string()))?;

        let kind = match db.latest_event_for(member_id)? {
            Some(latest) => latest.kind.toggled(),
            None => EventKind::Arrival,
        };
        let event_id = db.append_event(member_id, kind, now)?;

        let today = now.with_timezone(&Local).date_naive();
        let is_birthday =
            kind == EventKind::Arrival && member.birthday.is_some_and(|b| b.matches(today));

        tracing::info!(member_id, %kind, event_id, "scan resolved");
        Ok(ScanOutcome {
            member,
            kind,
            event_id,
            timestamp: now,
            is_birthday,
        })
    }

    // ===== Aggregation =====

    /// Builds DTR rows for the half-open date range `[start, end)`, both
    /// bounds kiosk-local calendar days.
    ///
    /// An empty range yields an empty vec; `start > end` is an error.
    pub fn aggregate(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DtrRow>, EngineError> {
        if start > end {
            return Err(EngineError::InvalidRange { start, end });
        }
        let start_utc = local_midnight_to_utc(start);
        let end_utc = local_midnight_to_utc(end);

        // One lock acquisition for both reads keeps the snapshot consistent.
        let (events, members) = {
            let db = self.db();
            let events = db.events_in_range(start_utc, end_utc)?;
            let members = db.list_members(None)?;
            (events, members)
        };

        let members: HashMap<String, Member> = members
            .into_iter()
            .map(|member| (member.member_id.clone(), member))
            .collect();
        let dated: Vec<DatedEvent> = events
            .into_iter()
            .map(|event| DatedEvent {
                date: event.timestamp.with_timezone(&Local).date_naive(),
                member_id: event.member_id,
                timestamp: event.timestamp,
                kind: event.kind,
            })
            .collect();

        tracing::debug!(events = dated.len(), "aggregating ledger slice");
        Ok(build_daily_rows(&dated, &members))
    }

    // ===== Registry boundary =====

    pub fn add_member(&self, member: &Member) -> Result<(), EngineError> {
        Ok(self.db().add_member(member)?)
    }

    pub fn get_member(&self, member_id: &str) -> Result<Member, EngineError> {
        self.db()
            .get_member(member_id)?
            .ok_or_else(|| EngineError::MemberNotFound(member_id.to_string()))
    }

    pub fn list_members(&self, search: Option<&str>) -> Result<Vec<Member>, EngineError> {
        Ok(self.db().list_members(search)?)
    }

    pub fn update_member(&self, member: &Member) -> Result<(), EngineError> {
        if self.db().update_member(member)? {
            Ok(())
        } else {
            Err(EngineError::MemberNotFound(member.member_id.clone()))
        }
    }

    /// Removes a member and their entire scan history. Irreversible.
    pub fn remove_member(&self, member_id: &str) -> Result<(), EngineError> {
        if self.db().delete_member(member_id)? {
            Ok(())
        } else {
            Err(EngineError::MemberNotFound(member_id.to_string()))
        }
    }

    // ===== Snapshots =====

    /// The roster with derived presence, ordered by committee then name.
    pub fn roster(&self) -> Result<Vec<RosterEntry>, EngineError> {
        Ok(self.db().roster()?)
    }

    /// Counts and last scan time, for diagnostics.
    pub fn stats(&self) -> Result<LedgerStats, EngineError> {
        Ok(self.db().stats()?)
    }
}

/// Converts a kiosk-local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
fn local_midnight_to_utc(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    match Local.from_local_datetime(&midnight) {
        // Single or ambiguous (DST fall-back): use the earlier time
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // DST spring-forward gap at midnight is rare but possible
            // Use 1am local which is guaranteed to exist
            let one_am = date.and_time(NaiveTime::from_hms_opt(1, 0, 0).unwrap());
            Local
                .from_local_datetime(&one_am)
                .unwrap()
                .with_timezone(&Utc)
        }
    }
}
