//! End-to-end dry-run flow with a controlled clock.

use chrono::{DateTime, TimeZone, Utc};
use owlwatch::config::Config;
use owlwatch::gate::{Clock, Slot};
use owlwatch::{run_digest, RunOptions};

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

fn test_config(out: &std::path::Path, state: &std::path::Path) -> Config {
    Config {
        tz: chrono_tz::America::Chicago,
        slot: Slot::Pm,
        output_dir: out.to_path_buf(),
        state_db: state.join("owlwatch.db"),
        webhooks: Vec::new(),
        title: "OWLWATCH Brief".to_string(),
        max_alerts: 8,
    }
}

#[tokio::test]
async fn test_dry_run_derives_key_in_configured_zone() {
    let out = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    let cfg = test_config(out.path(), state.path());

    // 03:30 UTC on the 31st is still the evening of the 30th in Chicago.
    let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 31, 3, 30, 0).unwrap());
    let opts = RunOptions {
        slot: None,
        dry_run: true,
        force: false,
    };

    let outcome = run_digest(&cfg, &opts, &clock).await.unwrap();
    assert_eq!(outcome.key.to_string(), "2026-01-30:PM");
    assert!(outcome.skipped);
    assert_eq!(outcome.delivered, 0);
    assert!(!outcome.state_recorded);

    let artifact = outcome.artifact.unwrap();
    assert!(artifact.ends_with("2026-01-30/PM_owlwatch.md"));
    let content = std::fs::read_to_string(artifact).unwrap();
    assert!(content.contains("**Run Slot:** PM"));
    assert!(content.contains("January 30, 2026"));
}

#[tokio::test]
async fn test_slot_override_beats_config() {
    let out = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    let cfg = test_config(out.path(), state.path());

    let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 30, 15, 0, 0).unwrap());
    let opts = RunOptions {
        slot: Some(Slot::Am),
        dry_run: true,
        force: false,
    };

    let outcome = run_digest(&cfg, &opts, &clock).await.unwrap();
    assert_eq!(outcome.key.to_string(), "2026-01-30:AM");
}

#[tokio::test]
async fn test_run_without_webhooks_marks_nothing() {
    let out = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    let cfg = test_config(out.path(), state.path());

    let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 30, 15, 0, 0).unwrap());
    let opts = RunOptions::default();

    // No webhooks configured: the run errors before any completion record
    // is written, so the key stays eligible.
    assert!(run_digest(&cfg, &opts, &clock).await.is_err());

    let pool = owlwatch::storage::open_pool(&cfg.state_db).unwrap();
    let store = owlwatch::gate::SqliteStore::new(pool);
    assert!(store.list().unwrap().is_empty());
}
