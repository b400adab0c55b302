//! Report shaping for the interaction endpoints: per-pair entries, a
//! severity summary with an overall risk level, and rule-generated
//! priorities, action items and monitoring plan.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::clinical::InteractionCheckResult;
use crate::interactions::{InteractionSeverity, DEFAULT_CLINICAL_EFFECT};
use crate::models::{
    AllergyAlertType, ContraindicationSeverity, PatientContext, PriorityLevel, RenalImpairment,
    RiskLevel,
};
use crate::safety::{AllergyAlert, ContraindicationAlert, TherapeuticDuplication};

// ═══════════════════════════════════════════════════════════
// Report types
// ═══════════════════════════════════════════════════════════

/// One interacting pair, named as the caller named the drugs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEntry {
    pub drug1: String,
    pub drug2: String,
    pub severity: InteractionSeverity,
    pub description: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management: Option<String>,
    pub clinical_effects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_interactions: usize,
    pub critical_interactions: usize,
    pub major_interactions: usize,
    pub moderate_interactions: usize,
    pub minor_interactions: usize,
    pub contraindication_count: usize,
    pub duplication_count: usize,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionReport {
    pub interactions: Vec<InteractionEntry>,
    pub contraindications: Vec<ContraindicationAlert>,
    pub duplications: Vec<TherapeuticDuplication>,
    /// Requested names that could not be resolved to an RxCUI.
    pub unresolved: Vec<String>,
    pub summary: ReportSummary,
}

impl InteractionReport {
    pub fn build(
        check: &InteractionCheckResult,
        contraindications: Vec<ContraindicationAlert>,
        duplications: Vec<TherapeuticDuplication>,
    ) -> Self {
        let interactions = interaction_entries(check);
        let summary = summarize(&interactions, &contraindications, &duplications);
        Self {
            interactions,
            contraindications,
            duplications,
            unresolved: check.unresolved.clone(),
            summary,
        }
    }

    fn with_severity(
        &self,
        severity: InteractionSeverity,
    ) -> impl Iterator<Item = &InteractionEntry> + '_ {
        self.interactions
            .iter()
            .filter(move |i| i.severity == severity)
    }

    fn with_contraindication(
        &self,
        severity: ContraindicationSeverity,
    ) -> impl Iterator<Item = &ContraindicationAlert> + '_ {
        self.contraindications
            .iter()
            .filter(move |c| c.severity == severity)
    }
}

/// Flatten per-drug checks into pair entries. A pair reported from both
/// sides with the same description appears once.
pub fn interaction_entries(check: &InteractionCheckResult) -> Vec<InteractionEntry> {
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut entries = Vec::new();

    for drug in &check.interactions {
        let drug1 = check
            .requested_name(&drug.rxcui)
            .unwrap_or(&drug.drug_name)
            .to_string();

        for interaction in &drug.interactions {
            let drug2 = check
                .requested_name(&interaction.interacting_rxcui)
                .unwrap_or(&interaction.interacting_drug)
                .to_string();

            let (a, b) = if drug.rxcui <= interaction.interacting_rxcui {
                (drug.rxcui.clone(), interaction.interacting_rxcui.clone())
            } else {
                (interaction.interacting_rxcui.clone(), drug.rxcui.clone())
            };
            if !seen.insert((a, b, interaction.description.clone())) {
                continue;
            }

            let clinical_effects = if interaction.clinical_effects.is_empty() {
                vec![DEFAULT_CLINICAL_EFFECT.to_string()]
            } else {
                interaction.clinical_effects.clone()
            };

            entries.push(InteractionEntry {
                drug1: drug1.clone(),
                drug2,
                severity: interaction.severity,
                description: interaction.description.clone(),
                source: interaction.source.clone(),
                management: interaction.management.clone(),
                clinical_effects,
            });
        }
    }

    entries
}

pub fn summarize(
    interactions: &[InteractionEntry],
    contraindications: &[ContraindicationAlert],
    duplications: &[TherapeuticDuplication],
) -> ReportSummary {
    let count = |severity: InteractionSeverity| {
        interactions
            .iter()
            .filter(|i| i.severity == severity)
            .count()
    };
    ReportSummary {
        total_interactions: interactions.len(),
        critical_interactions: count(InteractionSeverity::Critical),
        major_interactions: count(InteractionSeverity::Major),
        moderate_interactions: count(InteractionSeverity::Moderate),
        minor_interactions: count(InteractionSeverity::Minor),
        contraindication_count: contraindications.len(),
        duplication_count: duplications.len(),
        risk_level: risk_level(interactions, contraindications, duplications),
    }
}

/// Overall risk: the highest tier whose condition holds.
pub fn risk_level(
    interactions: &[InteractionEntry],
    contraindications: &[ContraindicationAlert],
    duplications: &[TherapeuticDuplication],
) -> RiskLevel {
    let has = |severity: InteractionSeverity| interactions.iter().any(|i| i.severity == severity);
    let count_ci = |severity: ContraindicationSeverity| {
        contraindications
            .iter()
            .filter(|c| c.severity == severity)
            .count()
    };
    let absolute = count_ci(ContraindicationSeverity::Absolute);
    let relative = count_ci(ContraindicationSeverity::Relative);

    if has(InteractionSeverity::Critical) || absolute > 0 {
        RiskLevel::Critical
    } else if has(InteractionSeverity::Major) || relative >= 2 {
        RiskLevel::High
    } else if has(InteractionSeverity::Moderate) || relative > 0 || !duplications.is_empty() {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

// ═══════════════════════════════════════════════════════════
// Clinical review
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Priority {
    pub level: PriorityLevel,
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub priority: PriorityLevel,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringPlan {
    pub parameters: Vec<String>,
    pub frequency: String,
    pub follow_up: String,
}

/// Ranked problems for the pharmacist, most urgent first.
pub fn clinical_priorities(report: &InteractionReport, allergies: &[AllergyAlert]) -> Vec<Priority> {
    let mut priorities = Vec::new();

    for entry in report.with_severity(InteractionSeverity::Critical) {
        priorities.push(Priority {
            level: PriorityLevel::Urgent,
            title: format!("Critical interaction: {} + {}", entry.drug1, entry.drug2),
            detail: entry.description.clone(),
        });
    }
    for alert in report.with_contraindication(ContraindicationSeverity::Absolute) {
        priorities.push(Priority {
            level: PriorityLevel::Urgent,
            title: format!("{} contraindicated ({})", alert.medication, alert.condition),
            detail: alert.description.clone(),
        });
    }
    for alert in allergies
        .iter()
        .filter(|a| a.alert_type == AllergyAlertType::Allergy)
    {
        priorities.push(Priority {
            level: PriorityLevel::Urgent,
            title: format!("Documented allergy: {}", alert.medication),
            detail: alert.description.clone(),
        });
    }

    for entry in report.with_severity(InteractionSeverity::Major) {
        priorities.push(Priority {
            level: PriorityLevel::High,
            title: format!("Major interaction: {} + {}", entry.drug1, entry.drug2),
            detail: entry.description.clone(),
        });
    }
    for alert in allergies
        .iter()
        .filter(|a| a.alert_type == AllergyAlertType::CrossSensitivity)
    {
        priorities.push(Priority {
            level: PriorityLevel::High,
            title: format!("Possible cross-sensitivity: {}", alert.medication),
            detail: alert.description.clone(),
        });
    }
    for alert in report.with_contraindication(ContraindicationSeverity::Relative) {
        priorities.push(Priority {
            level: PriorityLevel::High,
            title: format!("Use {} with caution ({})", alert.medication, alert.condition),
            detail: alert.description.clone(),
        });
    }

    let moderate = report.summary.moderate_interactions;
    if moderate > 0 {
        priorities.push(Priority {
            level: PriorityLevel::Routine,
            title: format!("{moderate} moderate interaction(s)"),
            detail: "Monitor for clinical effects and adjust therapy if they appear.".into(),
        });
    }
    for dup in &report.duplications {
        priorities.push(Priority {
            level: PriorityLevel::Routine,
            title: format!("Therapeutic duplication: {}", dup.therapeutic_class),
            detail: dup.recommendation.clone(),
        });
    }

    priorities
}

/// Concrete follow-up actions, including patient-specific dosing checks.
pub fn action_items(
    report: &InteractionReport,
    allergies: &[AllergyAlert],
    patient: &PatientContext,
) -> Vec<ActionItem> {
    let mut items = Vec::new();
    let mut push = |priority: PriorityLevel, action: String| items.push(ActionItem { priority, action });

    for entry in report.with_severity(InteractionSeverity::Critical) {
        push(
            PriorityLevel::Urgent,
            format!(
                "Do not dispense {} with {}; contact the prescriber for an alternative",
                entry.drug1, entry.drug2
            ),
        );
    }
    for alert in report.with_contraindication(ContraindicationSeverity::Absolute) {
        push(
            PriorityLevel::Urgent,
            format!(
                "Hold {} and confirm the {} diagnosis with the prescriber",
                alert.medication, alert.condition
            ),
        );
    }
    for alert in allergies
        .iter()
        .filter(|a| a.alert_type == AllergyAlertType::Allergy)
    {
        push(
            PriorityLevel::Urgent,
            format!(
                "Remove {} from the regimen (documented {} allergy)",
                alert.medication, alert.allergy
            ),
        );
    }
    for entry in report.with_severity(InteractionSeverity::Major) {
        push(
            PriorityLevel::High,
            format!(
                "Review {} + {} with the prescriber; consider dose adjustment or an alternative",
                entry.drug1, entry.drug2
            ),
        );
    }
    for alert in allergies
        .iter()
        .filter(|a| a.alert_type == AllergyAlertType::CrossSensitivity)
    {
        push(
            PriorityLevel::High,
            format!(
                "Confirm the {} reaction history before dispensing {}",
                alert.allergy, alert.medication
            ),
        );
    }
    for dup in &report.duplications {
        push(
            PriorityLevel::High,
            format!(
                "Resolve {} duplication: {}",
                dup.therapeutic_class,
                dup.medications.join(", ")
            ),
        );
    }

    if patient.is_pediatric() {
        push(
            PriorityLevel::High,
            "Verify weight-based pediatric dosing for every medication".into(),
        );
    }
    match patient.renal_impairment() {
        Some(RenalImpairment::Severe) => push(
            PriorityLevel::High,
            "Adjust renally cleared medications for CrCl below 30 mL/min".into(),
        ),
        Some(RenalImpairment::Moderate) => push(
            PriorityLevel::Routine,
            "Check renal dose adjustments for CrCl below 60 mL/min".into(),
        ),
        None => {}
    }
    if patient.is_geriatric() {
        push(
            PriorityLevel::Routine,
            "Screen the regimen against Beers Criteria for older adults".into(),
        );
    }
    if patient.is_low_weight() {
        push(
            PriorityLevel::Routine,
            "Confirm doses are appropriate for body weight under 50 kg".into(),
        );
    }

    if items.is_empty() {
        items.push(ActionItem {
            priority: PriorityLevel::Routine,
            action: "No immediate action required; continue routine monitoring".into(),
        });
    }
    items
}

/// Clinical effect label → what to monitor for it.
const EFFECT_PARAMETERS: &[(&str, &str)] = &[
    ("Bleeding risk", "INR and signs of bleeding"),
    ("QT prolongation", "ECG (QTc interval)"),
    ("Serotonin syndrome", "Serotonin syndrome symptoms"),
    ("Hyperkalemia", "Serum potassium"),
    ("Hypoglycemia", "Blood glucose"),
    ("Hypotension", "Blood pressure"),
    ("CNS depression", "Sedation level"),
    ("Respiratory depression", "Respiratory rate"),
    ("Kidney effects", "Renal function (serum creatinine)"),
    ("Liver effects", "Liver function tests"),
    ("Muscle toxicity", "Muscle pain and CK"),
    ("Increased drug levels", "Drug levels or toxicity signs"),
    ("Reduced efficacy", "Therapeutic response"),
];

pub fn monitoring_plan(report: &InteractionReport, patient: &PatientContext) -> MonitoringPlan {
    let mut parameters: Vec<String> = Vec::new();
    let mut add = |p: &str| {
        if !parameters.iter().any(|existing| existing == p) {
            parameters.push(p.to_string());
        }
    };

    for entry in &report.interactions {
        for effect in &entry.clinical_effects {
            if let Some(entry) = EFFECT_PARAMETERS.iter().find(|p| p.0 == effect.as_str()) {
                add(entry.1);
            }
        }
    }
    if patient.renal_impairment().is_some() {
        add("Renal function (serum creatinine)");
    }
    if patient.is_geriatric() {
        add("Falls risk and cognitive status");
    }
    if patient.is_pediatric() || patient.is_low_weight() {
        add("Body weight");
    }
    if parameters.is_empty() {
        parameters.push("General clinical response and adverse effects".into());
    }

    let (frequency, follow_up) = match report.summary.risk_level {
        RiskLevel::Critical => ("Daily until the regimen is revised", "Prescriber review within 24 hours"),
        RiskLevel::High => ("Weekly", "Follow up within 1 week"),
        RiskLevel::Moderate => ("Every 2-4 weeks", "Follow up within 1 month"),
        RiskLevel::Low => ("At routine visits", "Next scheduled medication review"),
    };

    MonitoringPlan {
        parameters,
        frequency: frequency.into(),
        follow_up: follow_up.into(),
    }
}
