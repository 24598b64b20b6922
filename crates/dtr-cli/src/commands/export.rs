//! Spreadsheet projections: the DTR and roster workbooks.
//!
//! These are thin consumers of the engine's aggregation and roster output;
//! everything about presence semantics lives upstream.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use rust_xlsxwriter::{Format, Workbook};
use unicode_width::UnicodeWidthStr;

use dtr_core::{DtrRow, RosterEntry, format_hours};
use dtr_engine::Engine;

use super::util::{local_clock, resolve_range};

const DTR_SHEET: &str = "Daily Time Record";
const DTR_HEADERS: [&str; 7] = [
    "Date",
    "Member ID",
    "Name",
    "Committee",
    "Time In",
    "Time Out",
    "Hours Rendered",
];

const ROSTER_SHEET: &str = "Roster";
const ROSTER_HEADERS: [&str; 5] = ["Member ID", "Name", "Committee", "Birthday", "Current Status"];

pub fn run_dtr<W: Write>(
    writer: &mut W,
    engine: &Engine,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    output: Option<PathBuf>,
) -> Result<()> {
    let today = Local::now().date_naive();
    let (start, end) = resolve_range(start, end, today);
    let rows = engine.aggregate(start, end)?;

    let last_day = end - Duration::days(1);
    let path =
        output.unwrap_or_else(|| PathBuf::from(format!("dtr_{start}_to_{last_day}.xlsx")));
    let cells: Vec<Vec<String>> = rows.iter().map(dtr_cells).collect();
    write_workbook(&path, DTR_SHEET, &DTR_HEADERS, &cells)?;

    writeln!(writer, "Wrote {} DTR row(s) to {}", rows.len(), path.display())?;
    Ok(())
}

pub fn run_roster<W: Write>(
    writer: &mut W,
    engine: &Engine,
    output: Option<PathBuf>,
) -> Result<()> {
    let roster = engine.roster()?;

    let path = output.unwrap_or_else(|| {
        PathBuf::from(format!("roster_{}.xlsx", Local::now().format("%Y%m%d")))
    });
    let cells: Vec<Vec<String>> = roster.iter().map(roster_cells).collect();
    write_workbook(&path, ROSTER_SHEET, &ROSTER_HEADERS, &cells)?;

    writeln!(writer, "Wrote {} member(s) to {}", roster.len(), path.display())?;
    Ok(())
}

fn dtr_cells(row: &DtrRow) -> Vec<String> {
    vec![
        row.date.to_string(),
        row.member_id.clone(),
        row.display_name.clone(),
        row.committee.clone(),
        row.time_in.map(local_clock).unwrap_or_default(),
        row.time_out.map(local_clock).unwrap_or_default(),
        row.hours_rendered.map(format_hours).unwrap_or_default(),
    ]
}

fn roster_cells(entry: &RosterEntry) -> Vec<String> {
    vec![
        entry.member.member_id.clone(),
        entry.member.display_name.clone(),
        entry.member.committee.clone(),
        entry
            .member
            .birthday
            .map(|b| b.to_string())
            .unwrap_or_default(),
        if entry.present { "Present" } else { "Out" }.to_string(),
    ]
}

/// Writes one sheet: a bold, frozen header row, then the cell grid, with
/// column widths sized to the widest cell text.
fn write_workbook(
    path: &Path,
    sheet_name: &str,
    headers: &[&str],
    rows: &[Vec<String>],
) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    let header_format = Format::new().set_bold();
    let mut col_widths: Vec<usize> = headers.iter().map(|h| UnicodeWidthStr::width(*h)).collect();

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_with_format(0, col as u16, *header, &header_format)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (row_index, cells) in rows.iter().enumerate() {
        for (col, value) in cells.iter().enumerate() {
            worksheet.write((row_index + 1) as u32, col as u16, value.as_str())?;
            col_widths[col] = col_widths[col].max(UnicodeWidthStr::width(value.as_str()));
        }
    }
    for (col, width) in col_widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width as f64 + 2.0)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "workbook written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dtr_core::Member;
    use dtr_db::Database;

    fn engine() -> Engine {
        Engine::new(Database::open_in_memory().expect("open in-memory db"))
    }

    fn add_member(engine: &Engine, id: &str, name: &str) {
        engine
            .add_member(&Member {
                member_id: id.to_string(),
                display_name: name.to_string(),
                birthday: None,
                committee: "Logistics".to_string(),
                photo: None,
            })
            .unwrap();
    }

    fn local_time(hour: u32) -> chrono::DateTime<chrono::Utc> {
        Local
            .with_ymd_and_hms(2024, 6, 3, hour, 0, 0)
            .unwrap()
            .with_timezone(&chrono::Utc)
    }

    #[test]
    fn dtr_export_writes_a_workbook() {
        let engine = engine();
        add_member(&engine, "m1", "Ana Reyes");
        engine.resolve_at("m1", local_time(9)).unwrap();
        engine.resolve_at("m1", local_time(17)).unwrap();

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("dtr.xlsx");
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

        let mut output = Vec::new();
        run_dtr(
            &mut output,
            &engine,
            Some(day),
            Some(day),
            Some(path.clone()),
        )
        .unwrap();

        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Wrote 1 DTR row(s)"));
    }

    #[test]
    fn roster_export_includes_every_member() {
        let engine = engine();
        add_member(&engine, "m1", "Ana Reyes");
        add_member(&engine, "m2", "Ben Cruz");
        engine.resolve("m1").unwrap();

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("roster.xlsx");

        let mut output = Vec::new();
        run_roster(&mut output, &engine, Some(path.clone())).unwrap();

        assert!(path.exists());
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Wrote 2 member(s)"));
    }

    #[test]
    fn empty_export_still_writes_headers() {
        let engine = engine();
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("empty.xlsx");

        let mut output = Vec::new();
        run_roster(&mut output, &engine, Some(path.clone())).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn cell_rows_render_presence_and_blanks() {
        let entry = RosterEntry {
            member: Member {
                member_id: "m1".to_string(),
                display_name: "Ana Reyes".to_string(),
                birthday: None,
                committee: "Programs".to_string(),
                photo: None,
            },
            present: true,
            last_event_at: None,
        };
        let cells = roster_cells(&entry);
        assert_eq!(cells, vec!["m1", "Ana Reyes", "Programs", "", "Present"]);
    }
}
