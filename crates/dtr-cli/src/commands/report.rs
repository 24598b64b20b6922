//! Report command: Daily Time Record rows as a table or JSON.

use std::io::Write;

use anyhow::Result;
use chrono::{Local, NaiveDate};

use dtr_core::{DtrRow, format_hours};
use dtr_engine::Engine;

use super::util::{local_clock, resolve_range};

pub fn run<W: Write>(
    writer: &mut W,
    engine: &Engine,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let today = Local::now().date_naive();
    let (start, end) = resolve_range(start, end, today);
    let rows = engine.aggregate(start, end)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&rows)?)?;
        return Ok(());
    }
    if rows.is_empty() {
        writeln!(writer, "No attendance records in range.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<12} {:<22} {:<14} {:<9} {:<9} {:>6}",
        "Date", "Name", "Committee", "Time In", "Time Out", "Hours"
    )?;
    for row in &rows {
        writeln!(writer, "{}", format_row(row))?;
    }
    Ok(())
}

fn format_row(row: &DtrRow) -> String {
    // Chrono's Display ignores width specifiers, so the date is stringified
    // before padding.
    let date = row.date.to_string();
    let time_in = row.time_in.map(local_clock).unwrap_or_default();
    let time_out = row.time_out.map(local_clock).unwrap_or_default();
    let hours = row.hours_rendered.map(format_hours).unwrap_or_default();
    format!(
        "{:<12} {:<22} {:<14} {:<9} {:<9} {:>6}",
        date, row.display_name, row.committee, time_in, time_out, hours
    )
    .trim_end()
    .to_string()
}
