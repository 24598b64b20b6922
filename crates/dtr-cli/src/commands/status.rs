//! Status command: database location and ledger counts.

use std::io::Write;

use anyhow::Result;
use chrono::SecondsFormat;

use dtr_engine::Engine;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, engine: &Engine, config: &Config) -> Result<()> {
    let stats = engine.stats()?;

    writeln!(writer, "Attendance kiosk status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Members: {}", stats.member_count)?;
    writeln!(writer, "Events: {}", stats.event_count)?;
    match stats.last_event_at {
        Some(at) => writeln!(
            writer,
            "Last scan: {}",
            at.to_rfc3339_opts(SecondsFormat::Millis, true)
        )?,
        None => writeln!(writer, "Last scan: none")?,
    }
    Ok(())
}
