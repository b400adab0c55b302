use std::sync::LazyLock;

use regex::Regex;

/// Effect reported when no pattern matches.
pub const DEFAULT_CLINICAL_EFFECT: &str = "Potential drug interaction - monitor patient";

/// Ordered (pattern, effect) rules applied to lowercased descriptions (compiled once via LazyLock).
static CLINICAL_EFFECT_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"increased.*risk", "Increased risk"),
        (r"bleeding|hemorrhage", "Bleeding risk"),
        (r"serotonin syndrome", "Serotonin syndrome"),
        (r"qt (prolongation|interval)|prolong.*qt", "QT prolongation"),
        (r"(decrease|reduce).*(effect|efficacy|concentration)", "Reduced efficacy"),
        (r"(increase|elevate).*(concentration|level)", "Increased drug levels"),
        (r"hypotens", "Hypotension"),
        (r"hyperkalemia", "Hyperkalemia"),
        (r"hypoglycemi", "Hypoglycemia"),
        (r"(cns|central nervous system) depress|sedation", "CNS depression"),
        (r"respiratory depression", "Respiratory depression"),
        (r"nephrotox|renal|kidney", "Kidney effects"),
        (r"hepatotox|liver", "Liver effects"),
        (r"myopathy|rhabdomyolysis", "Muscle toxicity"),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).unwrap(), label))
    .collect()
});

/// Extract clinical effect labels from an interaction description.
/// Each label appears once, in rule order.
pub fn extract_clinical_effects(description: &str) -> Vec<String> {
    let lower = description.to_lowercase();
    let effects: Vec<String> = CLINICAL_EFFECT_RULES
        .iter()
        .filter(|(re, _)| re.is_match(&lower))
        .map(|(_, label)| label.to_string())
        .collect();

    if effects.is_empty() {
        vec![DEFAULT_CLINICAL_EFFECT.to_string()]
    } else {
        effects
    }
}
