//! OWLWATCH -- scheduled security-posture digests with idempotent run gating.
//!
//! This crate renders a Markdown digest from a template, posts an embed
//! summary to one or more chat webhooks, and records per-(date, slot) run
//! state so overlapping triggers or manual re-runs never double-post.

pub mod config;
pub mod gate;
pub mod report;
pub mod storage;
pub mod webhook;

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDate;

use crate::config::Config;
use crate::gate::{Clock, RunGate, RunKey, Slot, StateStore};

/// Per-invocation knobs, layered over the environment config.
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Override the configured run slot.
    pub slot: Option<Slot>,
    /// Render the artifact but skip webhook delivery and state writes.
    pub dry_run: bool,
    /// Bypass the run gate and overwrite an existing artifact.
    pub force: bool,
}

/// What a gated run actually did.
#[derive(Debug)]
pub struct RunOutcome {
    pub key: RunKey,
    /// True when the gate (or a dry run) stopped before posting.
    pub skipped: bool,
    pub artifact: Option<PathBuf>,
    pub delivered: usize,
    /// False when the digest was posted but completion could not be
    /// persisted; the next trigger may post a duplicate.
    pub state_recorded: bool,
}

/// Execute one gated digest run: derive the run key, consult the gate,
/// render and write the artifact, deliver to webhooks, and record
/// completion.
pub async fn run_digest(cfg: &Config, opts: &RunOptions, clock: &dyn Clock) -> Result<RunOutcome> {
    let now_utc = clock.now_utc();
    let now_local = now_utc.with_timezone(&cfg.tz);
    let slot = opts.slot.unwrap_or(cfg.slot);
    let key = RunKey::new(now_local.date_naive(), slot);

    // An unreadable state store fails open: warn and run with a volatile
    // store rather than silently skipping a scheduled digest.
    let (store, persisted): (Box<dyn StateStore>, bool) = if opts.dry_run {
        (Box::new(gate::MemoryStore::new()), false)
    } else {
        match storage::open_pool(&cfg.state_db) {
            Ok(pool) => (Box::new(gate::SqliteStore::new(pool)), true),
            Err(e) => {
                tracing::warn!(
                    db = %cfg.state_db.display(),
                    error = %e,
                    "state store unavailable, proceeding without persisted gating"
                );
                (Box::new(gate::MemoryStore::new()), false)
            }
        }
    };
    let gate = RunGate::new(store);

    if !opts.force && !gate.should_run(&key) {
        tracing::info!(key = %key, "run already completed, skipping");
        return Ok(RunOutcome {
            key,
            skipped: true,
            artifact: None,
            delivered: 0,
            state_recorded: persisted,
        });
    }

    let report = build_for(cfg, slot, now_local.date_naive());
    let markdown = report::markdown::render(&report)?;
    let artifact = report::markdown::artifact_path(&cfg.output_dir, &report.date_iso, slot);
    report::markdown::write_artifact(&artifact, &markdown, opts.force)?;

    if opts.dry_run {
        tracing::info!(key = %key, artifact = %artifact.display(), "dry run, not posting");
        return Ok(RunOutcome {
            key,
            skipped: true,
            artifact: Some(artifact),
            delivered: 0,
            state_recorded: false,
        });
    }

    if cfg.webhooks.is_empty() {
        bail!("no webhook configured. Set OWLWATCH_WEBHOOK_URL or OWLWATCH_WEBHOOK_URLS");
    }

    let payload = report::payload::discord_payload(&report, cfg.max_alerts);
    let poster = webhook::WebhookPoster::default();
    let delivered = match poster.post_all(&cfg.webhooks, &payload).await {
        Ok(n) => n,
        Err(e) => {
            if let Err(mark_err) = gate.mark_failed(&key) {
                tracing::warn!(key = %key, error = %mark_err, "could not record failed attempt");
            }
            return Err(e);
        }
    };

    // The side effect cannot be undone, so a state write failure here is a
    // warning on an otherwise successful run, never an overall failure.
    let state_recorded = match gate.mark_completed(&key, now_utc) {
        Ok(()) => persisted,
        Err(e) => {
            tracing::warn!(
                key = %key,
                error = %e,
                "digest posted but completion was not recorded; next trigger may post a duplicate"
            );
            false
        }
    };

    tracing::info!(key = %key, delivered, "digest posted");
    Ok(RunOutcome {
        key,
        skipped: false,
        artifact: Some(artifact),
        delivered,
        state_recorded,
    })
}

/// Render-only mode: write the artifact for an explicit date and slot
/// without consulting the gate or posting anywhere.
pub fn render_digest(
    cfg: &Config,
    date: NaiveDate,
    slot: Slot,
    force: bool,
    output: Option<PathBuf>,
) -> Result<PathBuf> {
    let report = build_for(cfg, slot, date);
    let markdown = report::markdown::render(&report)?;
    let target = output
        .unwrap_or_else(|| report::markdown::artifact_path(&cfg.output_dir, &report.date_iso, slot));
    report::markdown::write_artifact(&target, &markdown, force)?;
    Ok(target)
}

fn build_for(cfg: &Config, slot: Slot, date: NaiveDate) -> report::DigestReport {
    report::build_report(&cfg.title, &cfg.tz.to_string(), slot, date)
}
