//! Smoke tests -- verify the binary runs and key subcommands work end to end.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("owlwatch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("security-posture digests"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("owlwatch")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("owlwatch"));
}

#[test]
fn test_run_subcommand_exists() {
    Command::cargo_bin("owlwatch")
        .unwrap()
        .args(["run", "--help"])
        .assert()
        .success();
}

#[test]
fn test_state_list_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("owlwatch")
        .unwrap()
        .env("OWLWATCH_STATE_DIR", dir.path())
        .args(["state", "list"])
        .assert()
        .success()
        .stdout(predicates::str::contains("No recorded runs."));
}

#[test]
fn test_render_writes_artifact() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("owlwatch")
        .unwrap()
        .env("OWLWATCH_OUTPUT_DIR", dir.path())
        .args(["render", "--date", "2026-01-30", "--slot", "am"])
        .assert()
        .success();

    let artifact = dir.path().join("2026-01-30").join("AM_owlwatch.md");
    let content = std::fs::read_to_string(artifact).unwrap();
    assert!(content.contains("**Run Slot:** AM"));
    assert!(content.contains("## Executive Summary"));
}

#[test]
fn test_render_rejects_bad_date() {
    Command::cargo_bin("owlwatch")
        .unwrap()
        .args(["render", "--date", "Jan 30"])
        .assert()
        .failure();
}

#[test]
fn test_dry_run_posts_nothing_and_records_nothing() {
    let out = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();

    Command::cargo_bin("owlwatch")
        .unwrap()
        .env("OWLWATCH_OUTPUT_DIR", out.path())
        .env("OWLWATCH_STATE_DIR", state.path())
        .env("OWLWATCH_RUN_SLOT", "PM")
        .args(["run", "--dry-run"])
        .assert()
        .success()
        .stdout(predicates::str::contains("not posted"));

    Command::cargo_bin("owlwatch")
        .unwrap()
        .env("OWLWATCH_STATE_DIR", state.path())
        .args(["state", "list"])
        .assert()
        .success()
        .stdout(predicates::str::contains("No recorded runs."));
}

#[test]
fn test_run_without_webhook_fails_cleanly() {
    let out = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();

    Command::cargo_bin("owlwatch")
        .unwrap()
        .env("OWLWATCH_OUTPUT_DIR", out.path())
        .env("OWLWATCH_STATE_DIR", state.path())
        .env_remove("OWLWATCH_WEBHOOK_URL")
        .env_remove("OWLWATCH_WEBHOOK_URLS")
        .arg("run")
        .assert()
        .failure()
        .stderr(predicates::str::contains("no webhook configured"));
}
