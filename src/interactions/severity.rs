//! Severity tiers and the keyword rule table that assigns them.
//!
//! Classification is an ordered list of `(all-of keywords, severity)`
//! rules over the lowercased description. First match wins. When no rule
//! matches, the upstream severity tag is consulted, then `Moderate`.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionSeverity {
    Minor,
    Moderate,
    Major,
    #[serde(alias = "contraindicated")]
    Critical,
}

impl InteractionSeverity {
    pub const ALL: [InteractionSeverity; 4] = [
        Self::Critical,
        Self::Major,
        Self::Moderate,
        Self::Minor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Major => "major",
            Self::Critical => "critical",
        }
    }

    /// Numeric rank, 1 (minor) to 4 (critical).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Minor => 1,
            Self::Moderate => 2,
            Self::Major => 3,
            Self::Critical => 4,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Minor => "Minimal clinical significance. Effects are usually mild and do not require a change in therapy.",
            Self::Moderate => "May worsen the patient's condition or require a change in therapy. Use with monitoring.",
            Self::Major => "Potentially serious or life-threatening. Avoid the combination unless benefits clearly outweigh risks.",
            Self::Critical => "Contraindicated. The combination should not be used.",
        }
    }
}

impl fmt::Display for InteractionSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classification rule: every keyword must appear in the description.
#[derive(Debug, Clone, Copy)]
pub struct SeverityRule {
    pub all_of: &'static [&'static str],
    pub severity: InteractionSeverity,
}

const fn rule(all_of: &'static [&'static str], severity: InteractionSeverity) -> SeverityRule {
    SeverityRule { all_of, severity }
}

/// Ordered severity rules. Most severe first.
pub const SEVERITY_RULES: &[SeverityRule] = &[
    rule(&["contraindicated"], InteractionSeverity::Critical),
    rule(&["life-threatening"], InteractionSeverity::Critical),
    rule(&["fatal"], InteractionSeverity::Critical),
    rule(&["should not be", "combined"], InteractionSeverity::Critical),
    rule(&["bleeding", "major"], InteractionSeverity::Major),
    rule(&["serotonin syndrome"], InteractionSeverity::Major),
    rule(&["qt", "prolong"], InteractionSeverity::Major),
    rule(&["hemorrhage"], InteractionSeverity::Major),
    rule(&["severe"], InteractionSeverity::Major),
    rule(&["major"], InteractionSeverity::Major),
    rule(&["moderate"], InteractionSeverity::Moderate),
    rule(&["minor"], InteractionSeverity::Minor),
    rule(&["minimal"], InteractionSeverity::Minor),
];

/// Classify an interaction description. Pure and deterministic.
pub fn determine_severity(description: &str, upstream: Option<&str>) -> InteractionSeverity {
    let lower = description.to_lowercase();

    if let Some(rule) = SEVERITY_RULES
        .iter()
        .find(|r| r.all_of.iter().all(|kw| lower.contains(kw)))
    {
        return rule.severity;
    }

    upstream
        .and_then(severity_from_upstream)
        .unwrap_or(InteractionSeverity::Moderate)
}

/// Map RxNorm/ONCHigh severity tags. "N/A" and unknown tags yield `None`.
fn severity_from_upstream(tag: &str) -> Option<InteractionSeverity> {
    match tag.trim().to_lowercase().as_str() {
        "contraindicated" | "critical" => Some(InteractionSeverity::Critical),
        "high" | "major" | "severe" => Some(InteractionSeverity::Major),
        "moderate" | "medium" => Some(InteractionSeverity::Moderate),
        "low" | "minor" => Some(InteractionSeverity::Minor),
        _ => None,
    }
}

/// Canned management guidance per severity tier.
pub fn management_recommendation(severity: InteractionSeverity) -> &'static str {
    match severity {
        InteractionSeverity::Critical => {
            "Avoid combination. Consider alternative therapy. If concurrent use is unavoidable, consult a specialist and monitor closely."
        }
        InteractionSeverity::Major => {
            "Use with extreme caution. Monitor closely for adverse effects. Consider dose adjustment or alternative therapy."
        }
        InteractionSeverity::Moderate => {
            "Monitor patient for changes in therapeutic effect or adverse reactions. Dose adjustment may be necessary."
        }
        InteractionSeverity::Minor => {
            "Minimal clinical significance. Monitor as clinically indicated."
        }
    }
}

/// Catalog entry served by the severity-levels endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityLevel {
    pub level: InteractionSeverity,
    pub rank: u8,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

/// All tiers, most severe first.
pub fn severity_catalog() -> Vec<SeverityLevel> {
    InteractionSeverity::ALL
        .iter()
        .map(|s| SeverityLevel {
            level: *s,
            rank: s.rank(),
            description: s.description(),
            recommended_action: management_recommendation(*s),
        })
        .collect()
}
