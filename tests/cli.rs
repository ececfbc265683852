//! End-to-end tests of the `parish` binary against a temporary database.

use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

/// A `parish` command isolated from the user's config and database.
fn parish(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("parish").unwrap();
    cmd.env("HOME", home)
        .env("PARISH_CONFIG", home.join("config.json"))
        .env("PARISH_DB", home.join("parish.db"))
        .env_remove("PARISH_API_URL")
        .env_remove("PARISH_ADMIN_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn version_reports_package_version() {
    let home = TempDir::new().unwrap();
    let output = parish(home.path()).args(["version", "--json"]).output().unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["name"], "parish");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn migrate_creates_database_and_reports_steps() {
    let home = TempDir::new().unwrap();
    let output = parish(home.path()).args(["migrate", "--json"]).output().unwrap();
    assert!(output.status.success());
    assert!(home.path().join("parish.db").exists());

    let json = stdout_json(&output);
    let steps = json["steps"].as_array().unwrap();
    assert!(steps.iter().any(|s| s["step"] == "weekly_intentions_to_monthly"));
    assert!(steps.iter().all(|s| s["outcome"] != "failed"));

    // Second run changes nothing.
    let again = parish(home.path()).args(["migrate", "--json"]).output().unwrap();
    let steps = stdout_json(&again)["steps"].as_array().unwrap().clone();
    assert!(steps.iter().all(|s| s["outcome"] == "skipped"));
}

#[test]
fn local_commands_need_an_existing_database() {
    let home = TempDir::new().unwrap();
    let output = parish(home.path())
        .args(["intentions", "list", "--local", "--json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("NOT_INITIALIZED"));
}

#[test]
fn edit_session_saves_through_local_database() {
    let home = TempDir::new().unwrap();
    parish(home.path()).arg("migrate").assert().success();

    parish(home.path())
        .args(["intentions", "edit", "--local", "--year", "2026", "--month", "3"])
        .write_stdin("add 08:00 For the parish\nsave\nquit\n")
        .assert()
        .success();

    let output = parish(home.path())
        .args(["intentions", "show", "2026", "3", "--local", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let month = stdout_json(&output);
    assert_eq!(month["year"], 2026);
    assert_eq!(month["month"], 3);
    let intentions = month["intentions"].as_array().unwrap();
    assert_eq!(intentions.len(), 1);
    assert_eq!(intentions[0]["time"], "08:00");
    assert_eq!(intentions[0]["intention"], "For the parish");
    assert!(intentions[0]["date"].as_str().unwrap().starts_with("2026-03-"));
}

#[test]
fn unsaved_rows_are_dropped_when_input_ends() {
    let home = TempDir::new().unwrap();
    parish(home.path()).arg("migrate").assert().success();

    parish(home.path())
        .args(["intentions", "edit", "--local", "--year", "2026", "--month", "4"])
        .write_stdin("add 09:00 Never saved\n")
        .assert()
        .success();

    let output = parish(home.path())
        .args(["intentions", "list", "--local", "--year", "2026", "--json"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output), serde_json::json!([]));
}

#[test]
fn unread_count_on_fresh_database() {
    let home = TempDir::new().unwrap();
    parish(home.path()).arg("migrate").assert().success();

    let output = parish(home.path())
        .args(["messages", "unread", "--local", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["unread"], 0);
}
