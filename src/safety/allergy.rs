use serde::{Deserialize, Serialize};

use crate::models::{AllergyAlertType, AllergySeverity, Medication};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergyAlert {
    pub medication: String,
    pub allergy: String,
    pub alert_type: AllergyAlertType,
    pub severity: AllergySeverity,
    pub description: String,
}

/// A documented allergen class and the drugs that may cross-react with it.
struct CrossSensitivity {
    class: &'static str,
    allergens: &'static [&'static str],
    related: &'static [&'static str],
}

/// Static cross-reactivity table. Earlier entries win.
const CROSS_SENSITIVITIES: &[CrossSensitivity] = &[
    CrossSensitivity {
        class: "penicillin",
        allergens: &["penicillin"],
        related: &[
            "amoxicillin",
            "ampicillin",
            "piperacillin",
            "oxacillin",
            "nafcillin",
            "dicloxacillin",
            "flucloxacillin",
        ],
    },
    CrossSensitivity {
        class: "beta-lactam (penicillin/cephalosporin)",
        allergens: &["penicillin"],
        related: &["cephalexin", "cefazolin", "cefadroxil"],
    },
    CrossSensitivity {
        class: "cephalosporin",
        allergens: &["cephalosporin", "cephalexin", "ceftriaxone"],
        related: &[
            "cephalexin",
            "cefazolin",
            "ceftriaxone",
            "cefuroxime",
            "cefixime",
            "cefpodoxime",
            "ceftazidime",
        ],
    },
    CrossSensitivity {
        class: "sulfonamide",
        allergens: &["sulfa", "sulfonamide"],
        related: &[
            "sulfamethoxazole",
            "sulfasalazine",
            "sulfadiazine",
            "sulfisoxazole",
        ],
    },
    CrossSensitivity {
        class: "NSAID",
        allergens: &["aspirin", "nsaid", "ibuprofen", "naproxen"],
        related: &[
            "aspirin",
            "ibuprofen",
            "naproxen",
            "diclofenac",
            "indomethacin",
            "ketorolac",
            "meloxicam",
            "piroxicam",
            "celecoxib",
        ],
    },
    CrossSensitivity {
        class: "opioid",
        allergens: &["codeine", "morphine", "opioid", "opiate"],
        related: &[
            "codeine",
            "morphine",
            "hydrocodone",
            "oxycodone",
            "hydromorphone",
        ],
    },
    CrossSensitivity {
        class: "macrolide",
        allergens: &["macrolide", "erythromycin"],
        related: &["erythromycin", "azithromycin", "clarithromycin"],
    },
    CrossSensitivity {
        class: "fluoroquinolone",
        allergens: &["quinolone", "ciprofloxacin"],
        related: &["ciprofloxacin", "levofloxacin", "moxifloxacin", "ofloxacin"],
    },
];

/// Check every (medication, allergy) pair. Each pair yields at most one alert:
/// a direct name match, else the first matching cross-sensitivity entry.
pub fn check_drug_allergies(medications: &[String], allergies: &[String]) -> Vec<AllergyAlert> {
    let mut alerts = Vec::new();
    for medication in medications {
        let display = medication.trim();
        screen_medication(display, &[display], allergies, &mut alerts);
    }
    alerts
}

/// Like [`check_drug_allergies`], but each medication is screened on both its
/// drug name and its active ingredient. Alerts are reported under the drug name.
pub fn check_medication_allergies(
    medications: &[Medication],
    allergies: &[String],
) -> Vec<AllergyAlert> {
    let mut alerts = Vec::new();
    for medication in medications {
        let drug_name = medication.drug_name.trim();
        let display = if drug_name.is_empty() {
            medication.lookup_name()
        } else {
            drug_name
        };
        let names = [drug_name, medication.active_ingredient.trim()];
        screen_medication(display, &names, allergies, &mut alerts);
    }
    alerts
}

enum Finding {
    Direct,
    Cross(&'static CrossSensitivity),
}

fn screen_medication(
    display: &str,
    names: &[&str],
    allergies: &[String],
    alerts: &mut Vec<AllergyAlert>,
) {
    let names: Vec<String> = names
        .iter()
        .map(|n| n.to_lowercase())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return;
    }

    for allergy in allergies {
        let allergy = allergy.trim();
        let allergy_lower = allergy.to_lowercase();
        if allergy_lower.is_empty() {
            continue;
        }

        let alert = match screen(&names, &allergy_lower) {
            Some(Finding::Direct) => AllergyAlert {
                medication: display.to_string(),
                allergy: allergy.to_string(),
                alert_type: AllergyAlertType::Allergy,
                severity: AllergySeverity::Severe,
                description: format!(
                    "Patient has a documented allergy to {}. Do not administer {}.",
                    allergy, display
                ),
            },
            Some(Finding::Cross(entry)) => AllergyAlert {
                medication: display.to_string(),
                allergy: allergy.to_string(),
                alert_type: AllergyAlertType::CrossSensitivity,
                severity: AllergySeverity::Moderate,
                description: format!(
                    "Possible {} cross-sensitivity: {} may cross-react in patients allergic to {}.",
                    entry.class, display, allergy
                ),
            },
            None => continue,
        };
        alerts.push(alert);
    }
}

/// A direct match on any name beats a cross-sensitivity match on any name.
fn screen(names: &[String], allergy: &str) -> Option<Finding> {
    if names
        .iter()
        .any(|n| n.contains(allergy) || allergy.contains(n.as_str()))
    {
        return Some(Finding::Direct);
    }
    names
        .iter()
        .find_map(|n| cross_sensitivity(n, allergy))
        .map(Finding::Cross)
}

fn cross_sensitivity(medication: &str, allergy: &str) -> Option<&'static CrossSensitivity> {
    CROSS_SENSITIVITIES.iter().find(|entry| {
        entry.allergens.iter().any(|a| allergy.contains(a))
            && entry.related.iter().any(|r| medication.contains(r))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn penicillin_allergy_flags_amoxicillin_once() {
        let alerts = check_drug_allergies(&strings(&["amoxicillin"]), &strings(&["penicillin"]));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AllergyAlertType::CrossSensitivity);
        assert_eq!(alerts[0].severity, AllergySeverity::Moderate);
    }

    #[test]
    fn direct_match_is_severe_allergy() {
        let alerts = check_drug_allergies(&strings(&["Aspirin 81mg"]), &strings(&["aspirin"]));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AllergyAlertType::Allergy);
        assert_eq!(alerts[0].severity, AllergySeverity::Severe);
    }

    #[test]
    fn nsaid_family_cross_reacts() {
        let alerts = check_drug_allergies(&strings(&["naproxen"]), &strings(&["ibuprofen"]));
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].description.contains("NSAID"));
    }

    #[test]
    fn penicillin_to_first_generation_cephalosporin() {
        let alerts = check_drug_allergies(&strings(&["cephalexin"]), &strings(&["Penicillin"]));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AllergyAlertType::CrossSensitivity);
    }

    #[test]
    fn unrelated_pair_yields_nothing() {
        let alerts = check_drug_allergies(&strings(&["metformin"]), &strings(&["penicillin"]));
        assert!(alerts.is_empty());
    }

    #[test]
    fn every_pair_checked_independently() {
        let alerts = check_drug_allergies(
            &strings(&["amoxicillin", "sulfamethoxazole", "metformin"]),
            &strings(&["penicillin", "sulfa", ""]),
        );
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn brand_name_is_screened_on_active_ingredient() {
        let meds = vec![
            Medication::new("Advil", "ibuprofen"),
            Medication::new("Aleve", "naproxen"),
            Medication::new("Glucophage", "metformin"),
        ];
        let alerts = check_medication_allergies(&meds, &strings(&["Ibuprofen"]));
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].medication, "Advil");
        assert_eq!(alerts[0].alert_type, AllergyAlertType::Allergy);
        assert_eq!(alerts[1].medication, "Aleve");
        assert_eq!(alerts[1].alert_type, AllergyAlertType::CrossSensitivity);
    }

    #[test]
    fn direct_match_on_either_name_wins_over_cross_sensitivity() {
        // "amoxicillin" cross-reacts with penicillin, but the brand name is a direct hit.
        let meds = vec![Medication::new("Penicillin VK", "amoxicillin")];
        let alerts = check_medication_allergies(&meds, &strings(&["penicillin"]));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AllergyAlertType::Allergy);
    }
}
