//! Digest content model and builder.
//!
//! The builder ships a stable baseline structure so automation keeps working
//! before any intel feed is wired in; swap `build_report` internals to pull
//! from a real pipeline later.

pub mod markdown;
pub mod payload;

use chrono::NaiveDate;

use crate::gate::Slot;

/// One security-posture digest, ready for rendering and delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DigestReport {
    pub date_label: String,
    pub date_iso: String,
    pub run_slot: Slot,
    pub tz_label: String,
    pub title: String,
    pub executive_summary: String,
    pub critical_alerts: Vec<String>,
    pub threat_landscape: String,
    pub technical_intel: Vec<String>,
    pub iocs: Vec<String>,
    pub industry_impact: Vec<String>,
    pub defensive_actions: Vec<String>,
    pub detections_hunts: Vec<String>,
    pub trend_analysis: String,
    pub patch_priorities: Vec<String>,
    pub attribution_scoring: String,
    pub playbook_updates: Vec<String>,
    pub sources: Vec<String>,
}

/// Build the digest for one (date, slot). Pure: the same inputs always
/// produce the same report.
pub fn build_report(title: &str, tz_label: &str, slot: Slot, date: NaiveDate) -> DigestReport {
    let base_summary = "Operational risk remains elevated. Primary drivers include \
        trusted-infrastructure abuse for credential capture, KEV-prioritized exploitation \
        pressure, and identity hygiene gaps that enable rapid access and persistence.";

    // AM and PM runs lead with a different operational emphasis.
    let executive_summary = match slot {
        Slot::Am => format!(
            "Morning posture: prioritize patch validation, identity hygiene, and new \
             phishing infrastructure. {}",
            base_summary
        ),
        Slot::Pm => format!(
            "Evening posture: review detection outcomes, confirm remediation closure, and \
             assess overnight exploitation risk. {}",
            base_summary
        ),
    };

    DigestReport {
        date_label: date.format("%B %d, %Y").to_string(),
        date_iso: date.format("%Y-%m-%d").to_string(),
        run_slot: slot,
        tz_label: tz_label.to_string(),
        title: title.to_string(),
        executive_summary,
        critical_alerts: vec![
            "Trusted cloud and SaaS sender abuse increasing delivery success for credential capture".into(),
            "KEV-driven exploitation pressure persists against management and identity surfaces".into(),
            "Credential replay and token reuse remain top causes of secondary compromise".into(),
        ],
        threat_landscape: "Initial access is dominated by phishing and credential abuse, with \
            attackers optimizing trust signals and low-noise execution paths rather than relying \
            on novel malware families."
            .into(),
        technical_intel: vec![
            "HTML and archive-based delivery chains followed by script proxy execution".into(),
            "Living-off-the-land execution via native binaries and scripting engines".into(),
            "Cloud token and OAuth permission misuse enabling persistence".into(),
        ],
        iocs: vec![
            "Populate with campaign-specific senders/domains/URLs from your telemetry".into(),
            "Populate with prioritized CVEs and exposed surfaces from your environment".into(),
        ],
        industry_impact: vec![
            "SaaS-heavy organizations face elevated identity compromise risk without strict OAuth governance".into(),
            "Organizations with patch lag remain exposed to exploit-in-the-wild pressure".into(),
        ],
        defensive_actions: vec![
            "Audit OAuth app grants and revoke high-privilege permissions not explicitly required".into(),
            "Validate patch completion for prioritized surfaces; close exceptions with compensating controls".into(),
            "Increase monitoring for LOLBin execution and abnormal parent-child process chains".into(),
        ],
        detections_hunts: vec![
            "Hunt: first-seen OAuth apps and new high-privilege grants in last 14 days".into(),
            "Hunt: attachment open events followed by mshta/rundll32/script execution within 5 minutes".into(),
            "Detect: suspicious command-lines containing javascript/http/.hta launched by Office or browsers".into(),
        ],
        trend_analysis: "The dominant operational trend is attacker optimization of legitimacy. \
            Defensive advantage comes from identity hygiene, execution telemetry, and behavioral \
            correlation rather than signature dependence."
            .into(),
        patch_priorities: vec![
            "Identity providers, SSO, and authentication infrastructure".into(),
            "Edge devices (VPN/firewalls/remote access) and exposed management planes".into(),
            "Email security inspection engines and attachment detonation coverage".into(),
        ],
        attribution_scoring: "Confidence: high on trusted-infrastructure abuse and credential \
            replay patterns. Overall operational risk: elevated."
            .into(),
        playbook_updates: vec![
            "Trusted sender abuse triage: verify origin, redirect depth, destination integrity".into(),
            "Token invalidation and session purge workflow for suspected OAuth compromise".into(),
        ],
        sources: vec![
            "CISA KEV and relevant exploitation advisories".into(),
            "Vendor patch analysis and security response updates".into(),
            "Threat research on cloud workflow and identity abuse patterns".into(),
        ],
    }
}
