//! Markdown artifact rendering and output handling.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use askama::Template;

use super::payload::bullets;
use super::DigestReport;
use crate::gate::Slot;

#[derive(Template)]
#[template(path = "daily.md", escape = "none")]
struct DailyTemplate {
    title: String,
    date_label: String,
    tz_label: String,
    run_slot: String,
    executive_summary: String,
    critical_alerts: String,
    threat_landscape: String,
    technical_intel: String,
    iocs: String,
    industry_impact: String,
    defensive_actions: String,
    detections_hunts: String,
    trend_analysis: String,
    patch_priorities: String,
    attribution_scoring: String,
    playbook_updates: String,
    sources: String,
}

/// Render the full Markdown artifact for a digest.
pub fn render(report: &DigestReport) -> Result<String> {
    let all = usize::MAX;
    let template = DailyTemplate {
        title: report.title.clone(),
        date_label: report.date_label.clone(),
        tz_label: report.tz_label.clone(),
        run_slot: report.run_slot.to_string(),
        executive_summary: report.executive_summary.clone(),
        critical_alerts: bullets(&report.critical_alerts, all),
        threat_landscape: report.threat_landscape.clone(),
        technical_intel: bullets(&report.technical_intel, all),
        iocs: bullets(&report.iocs, all),
        industry_impact: bullets(&report.industry_impact, all),
        defensive_actions: bullets(&report.defensive_actions, all),
        detections_hunts: bullets(&report.detections_hunts, all),
        trend_analysis: report.trend_analysis.clone(),
        patch_priorities: bullets(&report.patch_priorities, all),
        attribution_scoring: report.attribution_scoring.clone(),
        playbook_updates: bullets(&report.playbook_updates, all),
        sources: bullets(&report.sources, all),
    };
    template.render().context("rendering daily digest template")
}

/// Where the artifact for a (date, slot) lands under the output directory.
pub fn artifact_path(output_dir: &Path, date_iso: &str, slot: Slot) -> PathBuf {
    output_dir.join(date_iso).join(format!("{}_owlwatch.md", slot))
}

/// Write rendered content to disk unless an existing file would be
/// overwritten. Returns false when the file was left untouched.
pub fn write_artifact(target: &Path, content: &str, force: bool) -> Result<bool> {
    if target.exists() && !force {
        tracing::info!(target = %target.display(), "artifact already exists (use --force to overwrite)");
        return Ok(false);
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    std::fs::write(target, content)
        .with_context(|| format!("writing artifact {}", target.display()))?;
    tracing::info!(target = %target.display(), "wrote artifact");
    Ok(true)
}
