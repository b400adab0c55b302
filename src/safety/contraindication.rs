use serde::{Deserialize, Serialize};

use crate::models::ContraindicationSeverity;

/// Longest label excerpt carried into an alert description.
const MAX_EXCERPT_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContraindicationAlert {
    pub medication: String,
    pub condition: String,
    pub severity: ContraindicationSeverity,
    pub description: String,
    /// Not populated: no alternatives source is wired in.
    pub alternatives: Vec<String>,
}

/// Label sections for one medication.
#[derive(Debug, Clone, Copy)]
pub struct LabelSections<'a> {
    pub medication: &'a str,
    pub contraindications: &'a [String],
    /// Warnings, precautions and boxed warning text.
    pub warnings: &'a [String],
}

/// Alternate spellings labels commonly use for patient conditions.
const CONDITION_SYNONYMS: &[(&str, &[&str])] = &[
    ("kidney", &["renal"]),
    ("liver", &["hepatic"]),
    ("pregnan", &["pregnancy"]),
    ("heart failure", &["cardiac failure"]),
    ("bleeding", &["hemorrhag"]),
    ("stomach ulcer", &["peptic ulcer", "gastrointestinal ulcer"]),
    ("asthma", &["bronchospasm"]),
];

/// Check one medication's label against every patient condition.
///
/// A condition found in the contraindications section is `Absolute`;
/// one found only in warnings is `Relative`.
pub fn check_label_contraindications(
    label: LabelSections<'_>,
    conditions: &[String],
) -> Vec<ContraindicationAlert> {
    let mut alerts = Vec::new();

    for condition in conditions {
        let condition = condition.trim();
        if condition.is_empty() {
            continue;
        }
        let terms = search_terms(condition);

        if let Some(excerpt) = find_excerpt(label.contraindications, &terms) {
            alerts.push(ContraindicationAlert {
                medication: label.medication.to_string(),
                condition: condition.to_string(),
                severity: ContraindicationSeverity::Absolute,
                description: format!(
                    "{} is contraindicated in patients with {}: {}",
                    label.medication, condition, excerpt
                ),
                alternatives: Vec::new(),
            });
        } else if let Some(excerpt) = find_excerpt(label.warnings, &terms) {
            alerts.push(ContraindicationAlert {
                medication: label.medication.to_string(),
                condition: condition.to_string(),
                severity: ContraindicationSeverity::Relative,
                description: format!(
                    "Use {} with caution in patients with {}: {}",
                    label.medication, condition, excerpt
                ),
                alternatives: Vec::new(),
            });
        }
    }

    alerts
}

/// Check every label against every condition, label order preserved.
pub fn check_contraindications(
    labels: &[LabelSections<'_>],
    conditions: &[String],
) -> Vec<ContraindicationAlert> {
    labels
        .iter()
        .flat_map(|label| check_label_contraindications(*label, conditions))
        .collect()
}

fn search_terms(condition: &str) -> Vec<String> {
    let lower = condition.to_lowercase();
    let mut terms = vec![lower.clone()];
    for (key, synonyms) in CONDITION_SYNONYMS {
        if lower.contains(key) {
            terms.extend(synonyms.iter().map(|s| s.to_string()));
        }
    }
    terms
}

/// First sentence in `sections` containing any of `terms`, trimmed to length.
fn find_excerpt(sections: &[String], terms: &[String]) -> Option<String> {
    sections
        .iter()
        .flat_map(|text| text.split_inclusive(['.', ';']))
        .map(str::trim)
        .find(|sentence| {
            let lower = sentence.to_lowercase();
            terms.iter().any(|t| lower.contains(t.as_str()))
        })
        .map(truncate)
}

fn truncate(sentence: &str) -> String {
    if sentence.chars().count() <= MAX_EXCERPT_CHARS {
        return sentence.to_string();
    }
    let cut: String = sentence.chars().take(MAX_EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}
