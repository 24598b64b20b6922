//! Storage layer for the attendance kiosk.
//!
//! Provides persistence for the member registry and the append-only scan
//! ledger using `rusqlite`. This crate is pure storage: deciding whether a
//! scan is an arrival or a departure, and pairing events into daily rows,
//! happens above it.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization; the engine
//! wraps it in a `Mutex`, which also serializes resolve operations.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond
//! precision (e.g., `2024-01-15T10:30:00.000Z`). This format is used by
//! `chrono::DateTime<Utc>` serialization and ensures:
//! - Lexicographic ordering matches chronological ordering
//! - Human-readable values in the database
//! - Timezone-aware (always UTC)
//!
//! ## Ledger Immutability
//!
//! Rows in `events` are never updated. The only delete path is the cascade
//! from an explicit member delete; everything else is append and read.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use dtr_core::{Birthday, EventKind, LedgerEvent, Member, RosterEntry, UnknownEventKind};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A member with the same identity number is already registered.
    #[error("member already exists: {0}")]
    MemberExists(String),
    /// Failed to parse an event timestamp.
    #[error("invalid timestamp for event {event_id}: {timestamp}")]
    TimestampParse {
        event_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// Failed to parse an event kind string.
    #[error("invalid event kind for event {event_id}")]
    EventKindParse {
        event_id: i64,
        #[source]
        source: UnknownEventKind,
    },
    /// A member row holds data that no longer parses.
    #[error("invalid member data for {member_id}: {message}")]
    InvalidMemberData { member_id: String, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Counts and ledger bounds for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStats {
    pub member_count: i64,
    pub event_count: i64,
    pub last_event_at: Option<DateTime<Utc>>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS members (
                member_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                birthday TEXT,
                committee TEXT NOT NULL,
                photo TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_members_name ON members(display_name);

            -- Events table: the append-only scan ledger
            -- timestamp: RFC 3339 UTC (e.g., '2024-01-15T10:30:00.000Z')
            -- kind: 'arrival' or 'departure'
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                FOREIGN KEY (member_id) REFERENCES members(member_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_events_member ON events(member_id, timestamp);
            ",
        )?;
        Ok(())
    }

    // ===== Member registry =====

    /// Registers a new member. Fails if the identity number is taken.
    pub fn add_member(&mut self, member: &Member) -> Result<(), DbError> {
        let created_at = format_timestamp(Utc::now());
        let changed = self.conn.execute(
            "
            INSERT OR IGNORE INTO members (member_id, display_name, birthday, committee, photo, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![
                member.member_id,
                member.display_name,
                member.birthday.map(|b| b.to_string()),
                member.committee,
                member.photo,
                created_at,
            ],
        )?;
        if changed == 0 {
            return Err(DbError::MemberExists(member.member_id.clone()));
        }
        tracing::debug!(member_id = %member.member_id, "member registered");
        Ok(())
    }

    /// Fetches a member by identity number.
    pub fn get_member(&self, member_id: &str) -> Result<Option<Member>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT member_id, display_name, birthday, committee, photo
                FROM members
                WHERE member_id = ?
                ",
                params![member_id],
                map_member_row,
            )
            .optional()?;
        row.map(parse_member).transpose()
    }

    /// Lists members ordered by display name, optionally filtered by a
    /// substring match on the identity number or name.
    pub fn list_members(&self, search: Option<&str>) -> Result<Vec<Member>, DbError> {
        let pattern = search.map(|s| format!("%{s}%"));
        let mut stmt;
        let rows = match &pattern {
            Some(pattern) => {
                stmt = self.conn.prepare(
                    "
                    SELECT member_id, display_name, birthday, committee, photo
                    FROM members
                    WHERE member_id LIKE ?1 OR display_name LIKE ?1
                    ORDER BY display_name ASC, member_id ASC
                    ",
                )?;
                stmt.query_map(params![pattern], map_member_row)?
            }
            None => {
                stmt = self.conn.prepare(
                    "
                    SELECT member_id, display_name, birthday, committee, photo
                    FROM members
                    ORDER BY display_name ASC, member_id ASC
                    ",
                )?;
                stmt.query_map([], map_member_row)?
            }
        };
        let mut members = Vec::new();
        for row in rows {
            members.push(parse_member(row?)?);
        }
        Ok(members)
    }

    /// Overwrites a member's mutable fields. Returns `false` if no member
    /// with that identity number exists.
    pub fn update_member(&mut self, member: &Member) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "
            UPDATE members
            SET display_name = ?, birthday = ?, committee = ?, photo = ?
            WHERE member_id = ?
            ",
            params![
                member.display_name,
                member.birthday.map(|b| b.to_string()),
                member.committee,
                member.photo,
                member.member_id,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Deletes a member and, by cascade, every event they ever recorded.
    ///
    /// Irreversible. Returns `false` if no member with that identity number
    /// exists.
    pub fn delete_member(&mut self, member_id: &str) -> Result<bool, DbError> {
        let changed = self
            .conn
            .execute("DELETE FROM members WHERE member_id = ?", params![member_id])?;
        if changed > 0 {
            tracing::debug!(member_id, "member deleted with event cascade");
        }
        Ok(changed > 0)
    }

    // ===== Event ledger =====

    /// Appends one event to the ledger and returns its assigned id.
    ///
    /// Ids are monotonic in append order. The row is never modified again.
    pub fn append_event(
        &mut self,
        member_id: &str,
        kind: EventKind,
        timestamp: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO events (member_id, timestamp, kind) VALUES (?, ?, ?)",
            params![member_id, format_timestamp(timestamp), kind.to_string()],
        )?;
        let event_id = self.conn.last_insert_rowid();
        tracing::debug!(member_id, event_id, %kind, "event appended");
        Ok(event_id)
    }

    /// The most recent event for a member, ties broken by id (the later
    /// append wins). `None` for a member who has never scanned.
    pub fn latest_event_for(&self, member_id: &str) -> Result<Option<LedgerEvent>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, member_id, timestamp, kind
                FROM events
                WHERE member_id = ?
                ORDER BY timestamp DESC, id DESC
                LIMIT 1
                ",
                params![member_id],
                map_event_row,
            )
            .optional()?;
        row.map(parse_event).transpose()
    }

    /// Lists events within a time range, ordered by timestamp then id.
    ///
    /// The range is inclusive of `start` and exclusive of `end`.
    pub fn events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LedgerEvent>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let start = format_timestamp(start);
        let end = format_timestamp(end);
        let mut stmt = self.conn.prepare(
            "
            SELECT id, member_id, timestamp, kind
            FROM events
            WHERE timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([start, end], map_event_row)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(parse_event(row?)?);
        }
        Ok(events)
    }

    // ===== Snapshots =====

    /// The roster with derived presence: one entry per member, ordered by
    /// committee then display name. A member is present iff their latest
    /// event is an arrival.
    pub fn roster(&self) -> Result<Vec<RosterEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT m.member_id, m.display_name, m.birthday, m.committee, m.photo,
                   e.id, e.kind, e.timestamp
            FROM members m
            LEFT JOIN events e ON e.id = (
                SELECT id FROM events
                WHERE member_id = m.member_id
                ORDER BY timestamp DESC, id DESC
                LIMIT 1
            )
            ORDER BY m.committee ASC, m.display_name ASC, m.member_id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                MemberRow {
                    member_id: row.get(0)?,
                    display_name: row.get(1)?,
                    birthday: row.get(2)?,
                    committee: row.get(3)?,
                    photo: row.get(4)?,
                },
                row.get::<_, Option<i64>>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut roster = Vec::new();
        for row in rows {
            let (member_row, event_id, kind, timestamp) = row?;
            let member = parse_member(member_row)?;
            let (present, last_event_at) = match (event_id, kind, timestamp) {
                (Some(event_id), Some(kind), Some(timestamp)) => {
                    let kind = parse_kind(&kind, event_id)?;
                    let at = parse_timestamp(&timestamp, event_id)?;
                    (kind == EventKind::Arrival, Some(at))
                }
                _ => (false, None),
            };
            roster.push(RosterEntry {
                member,
                present,
                last_event_at,
            });
        }
        Ok(roster)
    }

    /// Counts and the last scan time, for diagnostics.
    pub fn stats(&self) -> Result<LedgerStats, DbError> {
        let member_count =
            self.conn
                .query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;
        let event_count =
            self.conn
                .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        let last = self
            .conn
            .query_row(
                "SELECT id, timestamp FROM events ORDER BY timestamp DESC, id DESC LIMIT 1",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let last_event_at = last
            .map(|(event_id, timestamp)| parse_timestamp(&timestamp, event_id))
            .transpose()?;
        Ok(LedgerStats {
            member_count,
            event_count,
            last_event_at,
        })
    }
}

#[derive(Debug)]
struct MemberRow {
    member_id: String,
    display_name: String,
    birthday: Option<String>,
    committee: String,
    photo: Option<String>,
}

fn map_member_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemberRow> {
    Ok(MemberRow {
        member_id: row.get(0)?,
        display_name: row.get(1)?,
        birthday: row.get(2)?,
        committee: row.get(3)?,
        photo: row.get(4)?,
    })
}

fn parse_member(row: MemberRow) -> Result<Member, DbError> {
    let birthday = row
        .birthday
        .as_deref()
        .map(str::parse::<Birthday>)
        .transpose()
        .map_err(|err| DbError::InvalidMemberData {
            member_id: row.member_id.clone(),
            message: err.to_string(),
        })?;
    Ok(Member {
        member_id: row.member_id,
        display_name: row.display_name,
        birthday,
        committee: row.committee,
        photo: row.photo,
    })
}

#[derive(Debug)]
struct EventRow {
    id: i64,
    member_id: String,
    timestamp: String,
    kind: String,
}

fn map_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        member_id: row.get(1)?,
        timestamp: row.get(2)?,
        kind: row.get(3)?,
    })
}

fn parse_event(row: EventRow) -> Result<LedgerEvent, DbError> {
    Ok(LedgerEvent {
        event_id: row.id,
        member_id: row.member_id,
        timestamp: parse_timestamp(&row.timestamp, row.id)?,
        kind: parse_kind(&row.kind, row.id)?,
    })
}

fn parse_kind(kind: &str, event_id: i64) -> Result<EventKind, DbError> {
    kind.parse()
        .map_err(|source| DbError::EventKindParse { event_id, source })
}

fn parse_timestamp(timestamp: &str, event_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            event_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
