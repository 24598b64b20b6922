//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use dtr_core::Birthday;

/// Attendance kiosk with no-touch presence toggling.
///
/// Scanning an identity number toggles the member between timed in and
/// timed out; reports reconstruct one Daily Time Record row per member
/// per day.
#[derive(Debug, Parser)]
#[command(name = "dtr", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record a scan; time in or time out is decided automatically.
    Scan {
        /// The identity number on the scanned card.
        member_id: String,

        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage the member registry.
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },

    /// Print Daily Time Record rows for a date range.
    Report {
        /// First day of the range (defaults to the first of this month).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day of the range, inclusive (defaults to today).
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Print rows as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List members currently timed in, grouped by committee.
    Active {
        /// Print the active roster as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write a spreadsheet report.
    Export {
        #[command(subcommand)]
        target: ExportTarget,
    },

    /// Show database location and ledger counts.
    Status,
}

/// Member registry operations.
#[derive(Debug, Subcommand)]
pub enum MemberAction {
    /// Register a new member.
    Add {
        /// Identity number. Unique and immutable.
        #[arg(long)]
        id: String,

        /// Display name.
        #[arg(long)]
        name: String,

        /// Birthday as MM-DD.
        #[arg(long)]
        birthday: Option<Birthday>,

        /// Committee or group label.
        #[arg(long)]
        committee: String,

        /// Stored photo filename, kept as an opaque reference.
        #[arg(long)]
        photo: Option<String>,
    },

    /// List members, optionally filtered.
    List {
        /// Substring match on identity number or name.
        #[arg(long)]
        search: Option<String>,

        /// Print members as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Change a member's details. Omitted fields are left unchanged.
    Update {
        /// Identity number of the member to change.
        id: String,

        /// New display name.
        #[arg(long)]
        name: Option<String>,

        /// New birthday as MM-DD.
        #[arg(long)]
        birthday: Option<Birthday>,

        /// New committee label.
        #[arg(long)]
        committee: Option<String>,

        /// New photo filename.
        #[arg(long)]
        photo: Option<String>,
    },

    /// Delete a member and their entire scan history.
    Remove {
        /// Identity number of the member to delete.
        id: String,
    },
}

/// Spreadsheet export targets.
#[derive(Debug, Subcommand)]
pub enum ExportTarget {
    /// Daily Time Record workbook for a date range.
    Dtr {
        /// First day of the range (defaults to the first of this month).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day of the range, inclusive (defaults to today).
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Output file (defaults to dtr_<start>_to_<end>.xlsx).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Roster workbook with current presence.
    Roster {
        /// Output file (defaults to roster_<date>.xlsx).
        #[arg(long)]
        output: Option<PathBuf>,
    },
}
