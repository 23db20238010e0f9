//! End-to-end tests driving the `mlog` binary across process boundaries.
//!
//! Each command is its own process, so these exercise checkpoint restore
//! between every step.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn mlog_binary() -> String {
    env!("CARGO_BIN_EXE_mlog").to_string()
}

fn mlog(temp: &Path) -> Command {
    let mut command = Command::new(mlog_binary());
    command
        .env("HOME", temp)
        .env("XDG_CONFIG_HOME", temp.join(".config"))
        .env("XDG_DATA_HOME", temp.join(".local/share"))
        .env("MLOG_DATABASE_PATH", temp.join("mlog.db"))
        .env("MLOG_GEOCODING_ENABLED", "false");
    command
}

fn run_ok(temp: &Path, args: &[&str]) -> String {
    let output = mlog(temp).args(args).output().expect("failed to run mlog");
    assert_success(&output, args);
    String::from_utf8(output.stdout).unwrap()
}

fn assert_success(output: &Output, args: &[&str]) {
    assert!(
        output.status.success(),
        "mlog {args:?} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn saved_days(temp: &Path) -> serde_json::Value {
    serde_json::from_str(&run_ok(temp, &["days", "--json"])).unwrap()
}

/// Drive with three fixes about 5 km apart, work, end, save.
#[test]
fn test_drive_then_work_is_saved_as_one_day() {
    let temp = TempDir::new().unwrap();

    run_ok(temp.path(), &["start", "--kind", "drive"]);
    for lat in ["49.0", "49.045", "49.09"] {
        let out = run_ok(temp.path(), &["location", "--lat", lat, "--lon", "13.0"]);
        assert!(out.starts_with("Track point added"), "unexpected: {out}");
    }
    run_ok(temp.path(), &["switch"]);
    // work samples update the location but never become track points
    let out = run_ok(temp.path(), &["location", "--lat", "49.091", "--lon", "13.0"]);
    assert!(out.starts_with("Location noted"), "unexpected: {out}");
    run_ok(temp.path(), &["end"]);

    let status: serde_json::Value =
        serde_json::from_str(&run_ok(temp.path(), &["status", "--json"])).unwrap();
    assert_eq!(status["state"], "stopped");
    assert_eq!(status["closed_segments"], 2);

    let saved = run_ok(temp.path(), &["save"]);
    assert!(saved.starts_with("Saved "), "unexpected: {saved}");

    let days = saved_days(temp.path());
    let days = days.as_array().unwrap();
    assert_eq!(days.len(), 1);
    let day = &days[0];
    assert!((day["kilometers"].as_f64().unwrap() - 10.0).abs() < 0.05);
    assert!((day["driving_hours"].as_f64().unwrap() - 0.5).abs() < f64::EPSILON);
    assert!((day["working_hours"].as_f64().unwrap() - 0.5).abs() < f64::EPSILON);
    assert_eq!(day["city"], "Workplace");
    assert_eq!(day["completed"], false);
    assert_eq!(day["day_type"], "work");
    assert_eq!(day["track_points"].as_array().unwrap().len(), 4);

    let status = run_ok(temp.path(), &["status"]);
    assert!(status.contains("State: idle"));
}

#[test]
fn test_discard_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();

    run_ok(temp.path(), &["start", "--kind", "work"]);
    run_ok(temp.path(), &["end"]);
    assert_eq!(run_ok(temp.path(), &["discard"]), "Recording discarded.\n");
    assert_eq!(run_ok(temp.path(), &["save"]), "Nothing to save.\n");
    assert_eq!(saved_days(temp.path()), serde_json::json!([]));
}

#[test]
fn test_track_reads_samples_from_stdin() {
    let temp = TempDir::new().unwrap();
    run_ok(temp.path(), &["start"]);

    let mut child = mlog(temp.path())
        .arg("track")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn mlog track");
    {
        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, r#"{{"lat": 49.0, "lon": 13.0}}"#).unwrap();
        writeln!(stdin, r#"{{"lat": 49.00001, "lon": 13.0}}"#).unwrap();
        writeln!(stdin, r#"{{"latitude": 49.01, "longitude": 13.0}}"#).unwrap();
    }
    let output = child.wait_with_output().unwrap();
    assert_success(&output, &["track"]);
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "Received 3 sample(s): 2 track point(s), 0 invalid.\n"
    );

    let status: serde_json::Value =
        serde_json::from_str(&run_ok(temp.path(), &["status", "--json"])).unwrap();
    assert_eq!(status["current_track_points"], 2);
}

#[test]
fn test_second_start_is_rejected() {
    let temp = TempDir::new().unwrap();
    run_ok(temp.path(), &["start"]);

    let output = mlog(temp.path()).arg("start").output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already in progress"));
}

#[test]
fn test_start_with_unsaved_segments_is_rejected() {
    let temp = TempDir::new().unwrap();
    run_ok(temp.path(), &["start"]);
    run_ok(temp.path(), &["end"]);

    let output = mlog(temp.path()).args(["start", "--kind", "work"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsaved segment"));
}

#[test]
fn test_idle_commands_are_harmless() {
    let temp = TempDir::new().unwrap();
    assert_eq!(run_ok(temp.path(), &["end"]), "Not recording.\n");
    assert_eq!(run_ok(temp.path(), &["save"]), "Nothing to save.\n");
    assert_eq!(run_ok(temp.path(), &["days"]), "No work days recorded.\n");
}
