//! Discord webhook payload construction.
//!
//! Discord enforces hard limits on embeds: 256 chars for titles, 4096 for
//! descriptions, 1024 per field value. Everything user-visible goes through
//! `clamp` so an oversized digest degrades to truncation instead of a 400.

use serde_json::{json, Value};

use super::DigestReport;

const TITLE_LIMIT: usize = 256;
const DESCRIPTION_LIMIT: usize = 4096;
const FIELD_LIMIT: usize = 1024;
const SUMMARY_LIMIT: usize = 900;

/// Truncate `s` to at most `n` characters, marking the cut with `...`.
pub fn clamp(s: &str, n: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= n {
        return s.to_string();
    }
    let keep = n.saturating_sub(3);
    let truncated: String = s.chars().take(keep).collect();
    format!("{}...", truncated)
}

/// Render items as a Markdown bullet list, capped at `max_items`.
pub fn bullets(items: &[String], max_items: usize) -> String {
    if items.is_empty() {
        return "- None".to_string();
    }
    items
        .iter()
        .take(max_items)
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the embed payload posted to each webhook.
pub fn discord_payload(report: &DigestReport, max_alerts: usize) -> Value {
    let description = format!(
        "Date: {} ({})\nRun: {}\n\n{}",
        report.date_label,
        report.tz_label,
        report.run_slot,
        clamp(&report.executive_summary, SUMMARY_LIMIT),
    );

    let fields = json!([
        {
            "name": "Critical Alerts",
            "value": clamp(&bullets(&report.critical_alerts, max_alerts), FIELD_LIMIT),
            "inline": false
        },
        {
            "name": "Defensive Actions",
            "value": clamp(&bullets(&report.defensive_actions, 8), FIELD_LIMIT),
            "inline": false
        },
        {
            "name": "Patch Priorities",
            "value": clamp(&bullets(&report.patch_priorities, 8), FIELD_LIMIT),
            "inline": false
        },
        {
            "name": "Detection & Hunts",
            "value": clamp(&bullets(&report.detections_hunts, 8), FIELD_LIMIT),
            "inline": false
        },
    ]);

    json!({
        "content": "",
        "embeds": [
            {
                "title": clamp(&report.title, TITLE_LIMIT),
                "description": clamp(&description, DESCRIPTION_LIMIT),
                "fields": fields,
                "footer": { "text": "KeysGuard OWLWATCH" },
            }
        ],
        "allowed_mentions": { "parse": [] },
    })
}
