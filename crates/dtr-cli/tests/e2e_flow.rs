//! End-to-end tests for the complete kiosk flow.
//!
//! Tests the full pipeline: register → scan → report → export against the
//! built binary, with the database redirected into a temp directory.

use std::process::{Command, Output};

use chrono::{Duration, Local};
use tempfile::TempDir;

fn dtr_binary() -> String {
    env!("CARGO_BIN_EXE_dtr").to_string()
}

fn dtr(temp: &TempDir, args: &[&str]) -> Output {
    Command::new(dtr_binary())
        .env("DTR_DATABASE_PATH", temp.path().join("dtr.db"))
        .args(args)
        .output()
        .expect("failed to run dtr")
}

fn assert_success(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A --start/--end pair that covers "now" even across a midnight race.
fn report_range() -> (String, String) {
    let today = Local::now().date_naive();
    let yesterday = today - Duration::days(1);
    (yesterday.to_string(), today.to_string())
}

fn register_ana(temp: &TempDir) {
    let output = dtr(
        temp,
        &[
            "member",
            "add",
            "--id",
            "2021-00123",
            "--name",
            "Ana Reyes",
            "--committee",
            "Logistics",
        ],
    );
    let stdout = assert_success(&output);
    assert!(stdout.contains("Member Ana Reyes (2021-00123) added."));
}

#[test]
fn test_full_kiosk_flow() {
    let temp = TempDir::new().unwrap();
    register_ana(&temp);

    // First scan is a time in.
    let stdout = assert_success(&dtr(&temp, &["scan", "2021-00123"]));
    assert!(stdout.contains("Welcome, Ana Reyes!"));
    assert!(stdout.contains("Time In at "));

    // She shows up on the active roster.
    let stdout = assert_success(&dtr(&temp, &["active"]));
    assert!(stdout.contains("Currently timed in: 1"));
    assert!(stdout.contains("Ana Reyes (2021-00123)"));

    // Second scan toggles to a time out.
    let stdout = assert_success(&dtr(&temp, &["scan", "2021-00123"]));
    assert!(stdout.contains("Goodbye, Ana Reyes!"));
    assert!(stdout.contains("Time Out at "));

    let stdout = assert_success(&dtr(&temp, &["active"]));
    assert!(stdout.contains("Currently timed in: 0"));

    // The day aggregates to one paired row.
    let (start, end) = report_range();
    let stdout = assert_success(&dtr(
        &temp,
        &["report", "--start", &start, "--end", &end, "--json"],
    ));
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["member_id"], "2021-00123");
    assert!(rows[0].get("time_in").is_some());
    assert!(rows[0].get("time_out").is_some());
    assert!(rows[0].get("hours_rendered").is_some());
}

#[test]
fn test_unknown_member_scan_fails() {
    let temp = TempDir::new().unwrap();
    let output = dtr(&temp, &["scan", "ghost"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("member not found: ghost"));
}

#[test]
fn test_duplicate_registration_fails() {
    let temp = TempDir::new().unwrap();
    register_ana(&temp);

    let output = dtr(
        &temp,
        &[
            "member",
            "add",
            "--id",
            "2021-00123",
            "--name",
            "Somebody Else",
            "--committee",
            "Programs",
        ],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("member already exists"));
}

#[test]
fn test_remove_cascades_to_report() {
    let temp = TempDir::new().unwrap();
    register_ana(&temp);
    assert_success(&dtr(&temp, &["scan", "2021-00123"]));

    let stdout = assert_success(&dtr(&temp, &["member", "remove", "2021-00123"]));
    assert!(stdout.contains("removed, along with their entire scan history"));

    let (start, end) = report_range();
    let stdout = assert_success(&dtr(
        &temp,
        &["report", "--start", &start, "--end", &end, "--json"],
    ));
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 0);

    let stdout = assert_success(&dtr(&temp, &["status"]));
    assert!(stdout.contains("Members: 0"));
    assert!(stdout.contains("Events: 0"));
}

#[test]
fn test_exports_write_workbooks() {
    let temp = TempDir::new().unwrap();
    register_ana(&temp);
    assert_success(&dtr(&temp, &["scan", "2021-00123"]));

    let dtr_path = temp.path().join("dtr.xlsx");
    let (start, end) = report_range();
    assert_success(&dtr(
        &temp,
        &[
            "export",
            "dtr",
            "--start",
            &start,
            "--end",
            &end,
            "--output",
            dtr_path.to_str().unwrap(),
        ],
    ));
    assert!(dtr_path.exists());

    let roster_path = temp.path().join("roster.xlsx");
    assert_success(&dtr(
        &temp,
        &["export", "roster", "--output", roster_path.to_str().unwrap()],
    ));
    assert!(roster_path.exists());
}

#[test]
fn test_invalid_range_is_rejected() {
    let temp = TempDir::new().unwrap();
    let output = dtr(
        &temp,
        &["report", "--start", "2024-06-04", "--end", "2024-06-02"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid date range"));
}
