//! Scan command: the kiosk's no-touch toggle.

use std::io::Write;

use anyhow::Result;

use dtr_core::EventKind;
use dtr_engine::{Engine, ScanOutcome};

use super::util::{kind_label, local_clock};

pub fn run<W: Write>(writer: &mut W, engine: &Engine, member_id: &str, json: bool) -> Result<()> {
    let outcome = engine.resolve(member_id)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&outcome)?)?;
        return Ok(());
    }
    writeln!(writer, "{}", greeting(&outcome))?;
    writeln!(
        writer,
        "{} at {}",
        kind_label(outcome.kind),
        local_clock(outcome.timestamp)
    )?;
    Ok(())
}

fn greeting(outcome: &ScanOutcome) -> String {
    let name = &outcome.member.display_name;
    match outcome.kind {
        EventKind::Arrival if outcome.is_birthday => {
            format!("Happy Birthday, {name}! You are timed in.")
        }
        EventKind::Arrival => format!("Welcome, {name}!"),
        EventKind::Departure => format!("Goodbye, {name}!"),
    }
}
