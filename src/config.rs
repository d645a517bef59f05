//! Environment-driven configuration.
//!
//! All knobs live under the `OWLWATCH_` prefix so a systemd timer or cron
//! entry can configure a run without flags. CLI flags override these where
//! both exist.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono_tz::Tz;

use crate::gate::Slot;

pub const DEFAULT_TZ: &str = "America/Chicago";
pub const DEFAULT_TITLE: &str = "KEYSGUARD OWLWATCH — Daily Cyber Intelligence Brief";
pub const DEFAULT_MAX_ALERTS: usize = 8;

#[derive(Debug, Clone)]
pub struct Config {
    /// Fixed local time zone used to derive run keys and date labels.
    pub tz: Tz,
    pub slot: Slot,
    pub output_dir: PathBuf,
    pub state_db: PathBuf,
    pub webhooks: Vec<String>,
    pub title: String,
    pub max_alerts: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let tz_name = env_or("OWLWATCH_TZ", DEFAULT_TZ);
        let tz: Tz = tz_name
            .parse()
            .map_err(|e| anyhow::anyhow!("OWLWATCH_TZ '{}' is not an IANA zone: {}", tz_name, e))?;

        let slot: Slot = env_or("OWLWATCH_RUN_SLOT", "AM")
            .parse()
            .context("parsing OWLWATCH_RUN_SLOT")?;

        let output_dir = PathBuf::from(env_or("OWLWATCH_OUTPUT_DIR", "output"));
        let state_dir = PathBuf::from(env_or("OWLWATCH_STATE_DIR", "state"));

        let max_alerts_raw = env_or("OWLWATCH_MAX_ALERTS", "");
        let max_alerts = if max_alerts_raw.is_empty() {
            DEFAULT_MAX_ALERTS
        } else {
            max_alerts_raw
                .parse()
                .context("parsing OWLWATCH_MAX_ALERTS")?
        };

        Ok(Self {
            tz,
            slot,
            output_dir,
            state_db: state_dir.join("owlwatch.db"),
            webhooks: split_webhooks(
                &env_or("OWLWATCH_WEBHOOK_URL", ""),
                &env_or("OWLWATCH_WEBHOOK_URLS", ""),
            ),
            title: env_or("OWLWATCH_TITLE", DEFAULT_TITLE),
            max_alerts,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Merge the single-URL and `;`-separated multi-URL variables, preserving
/// order and dropping duplicates.
pub fn split_webhooks(single: &str, many: &str) -> Vec<String> {
    let mut urls = Vec::new();
    if !single.trim().is_empty() {
        urls.push(single.trim().to_string());
    }
    for url in many.split(';') {
        let url = url.trim();
        if !url.is_empty() {
            urls.push(url.to_string());
        }
    }

    let mut out: Vec<String> = Vec::new();
    for url in urls {
        if !out.contains(&url) {
            out.push(url);
        }
    }
    out
}
