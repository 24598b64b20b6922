//! Active command: who is currently timed in, grouped by committee.

use std::io::Write;

use anyhow::Result;

use dtr_core::RosterEntry;
use dtr_engine::Engine;

pub fn run<W: Write>(writer: &mut W, engine: &Engine, json: bool) -> Result<()> {
    let roster = engine.roster()?;
    let present: Vec<&RosterEntry> = roster.iter().filter(|entry| entry.present).collect();

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&present)?)?;
        return Ok(());
    }

    writeln!(writer, "Currently timed in: {}", present.len())?;
    // The roster is already ordered by committee, so grouping is a run scan.
    let mut current_committee: Option<&str> = None;
    for entry in present {
        let committee = entry.member.committee.as_str();
        if current_committee != Some(committee) {
            writeln!(writer, "{committee}:")?;
            current_committee = Some(committee);
        }
        writeln!(
            writer,
            "- {} ({})",
            entry.member.display_name, entry.member.member_id
        )?;
    }
    Ok(())
}
