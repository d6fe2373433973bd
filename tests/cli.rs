//! End-to-end tests driving the compiled binary over a sample trades file

use std::process::Command;

fn run(args: &[&str]) -> (bool, String) {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "--"])
        .args(args)
        .output()
        .expect("failed to execute command");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
    )
}

#[test]
fn import_reports_counts() {
    let (ok, stdout) = run(&["import", "-f", "tests/data/trades.csv"]);

    assert!(ok, "import failed: {}", stdout);
    assert!(stdout.contains("IMPORT"));
    assert!(stdout.contains("SELFWEALTH"));
    assert!(stdout.contains("sha256"));
    assert!(stdout.contains("Recorded"));
}

#[test]
fn match_shows_allocations() {
    let (ok, stdout) = run(&["match", "-f", "tests/data/trades.csv"]);

    assert!(ok, "match failed: {}", stdout);
    assert!(stdout.contains("PARCEL MATCHES (earliest-first)"));
    assert!(stdout.contains("BHP.AX"));
    assert!(stdout.contains("WES.AX"));
    // The 60-unit sell spans both BHP parcels.
    assert!(stdout.contains("2023-01-10"));
    assert!(stdout.contains("2024-02-10"));
}

#[test]
fn match_json_lists_every_allocation() {
    let (ok, stdout) = run(&["match", "-f", "tests/data/trades.csv", "--json"]);

    assert!(ok, "match --json failed: {}", stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let allocations = parsed["allocations"].as_array().unwrap();
    // WES sell consumes one parcel, BHP sell spans two.
    assert_eq!(allocations.len(), 3);
    assert!(parsed["unmatched"].as_array().unwrap().is_empty());
}

#[test]
fn report_summarises_financial_year() {
    let (ok, stdout) = run(&["report", "-f", "tests/data/trades.csv", "-y", "2025"]);

    assert!(ok, "report failed: {}", stdout);
    assert!(stdout.contains("CGT SUMMARY FY2024-25"));
    assert!(stdout.contains("WES.AX"));
    // The WES gain (held 458 days) earns the 50% discount.
    assert!(stdout.contains("Discounts"));
}

#[test]
fn report_all_years_covers_both_sells() {
    let (ok, stdout) = run(&["report", "-f", "tests/data/trades.csv"]);

    assert!(ok, "report failed: {}", stdout);
    assert!(stdout.contains("FY2024-25"));
}

#[test]
fn forecast_compares_three_strategies() {
    let (ok, stdout) = run(&[
        "forecast",
        "-f",
        "tests/data/trades.csv",
        "-t",
        "BHP.AX",
        "-q",
        "10",
        "-p",
        "60.00",
        "-d",
        "2025-07-01",
    ]);

    assert!(ok, "forecast failed: {}", stdout);
    assert!(stdout.contains("FORECAST BHP.AX"));
    assert!(stdout.contains("earliest-first"));
    assert!(stdout.contains("latest-first"));
    assert!(stdout.contains("highest-cost-first"));
}

#[test]
fn forecast_json_round_trips() {
    let (ok, stdout) = run(&[
        "forecast",
        "-f",
        "tests/data/trades.csv",
        "-t",
        "BHP.AX",
        "-q",
        "10",
        "-p",
        "60.00",
        "-d",
        "2025-07-01",
        "--json",
    ]);

    assert!(ok, "forecast --json failed: {}", stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(parsed["ticker"], "BHP.AX");
    // After the recorded sells settle, only the 2024 parcel has units left,
    // so all three strategies consume the same lot.
    let fifo_gain = &parsed["earliest_first"]["total_gain_loss"];
    let lifo_gain = &parsed["latest_first"]["total_gain_loss"];
    assert_eq!(fifo_gain, lifo_gain);
}
