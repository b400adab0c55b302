use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::Medication;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapeuticDuplication {
    pub therapeutic_class: String,
    pub medications: Vec<String>,
    pub recommendation: String,
}

struct TherapeuticClass {
    name: &'static str,
    members: &'static [&'static str],
}

const THERAPEUTIC_CLASSES: &[TherapeuticClass] = &[
    TherapeuticClass {
        name: "NSAIDs",
        members: &[
            "ibuprofen",
            "naproxen",
            "diclofenac",
            "indomethacin",
            "ketorolac",
            "meloxicam",
            "piroxicam",
            "celecoxib",
            "aspirin",
        ],
    },
    TherapeuticClass {
        name: "Statins",
        members: &[
            "atorvastatin",
            "simvastatin",
            "rosuvastatin",
            "pravastatin",
            "lovastatin",
            "fluvastatin",
            "pitavastatin",
        ],
    },
    TherapeuticClass {
        name: "ACE inhibitors",
        members: &[
            "lisinopril",
            "enalapril",
            "ramipril",
            "captopril",
            "benazepril",
            "quinapril",
            "perindopril",
        ],
    },
    TherapeuticClass {
        name: "ARBs",
        members: &[
            "losartan",
            "valsartan",
            "irbesartan",
            "candesartan",
            "olmesartan",
            "telmisartan",
        ],
    },
    TherapeuticClass {
        name: "SSRIs",
        members: &[
            "fluoxetine",
            "sertraline",
            "paroxetine",
            "citalopram",
            "escitalopram",
            "fluvoxamine",
        ],
    },
    TherapeuticClass {
        name: "Benzodiazepines",
        members: &[
            "diazepam",
            "lorazepam",
            "alprazolam",
            "clonazepam",
            "temazepam",
            "midazolam",
        ],
    },
    TherapeuticClass {
        name: "Proton pump inhibitors",
        members: &[
            "omeprazole",
            "esomeprazole",
            "lansoprazole",
            "pantoprazole",
            "rabeprazole",
        ],
    },
    TherapeuticClass {
        name: "Anticoagulants",
        members: &[
            "warfarin",
            "apixaban",
            "rivaroxaban",
            "dabigatran",
            "edoxaban",
            "heparin",
            "enoxaparin",
        ],
    },
    TherapeuticClass {
        name: "Opioids",
        members: &[
            "morphine",
            "oxycodone",
            "hydrocodone",
            "hydromorphone",
            "codeine",
            "tramadol",
            "fentanyl",
            "methadone",
        ],
    },
    TherapeuticClass {
        name: "Beta blockers",
        members: &[
            "metoprolol",
            "atenolol",
            "propranolol",
            "carvedilol",
            "bisoprolol",
            "nebivolol",
            "labetalol",
        ],
    },
];

/// Group medications by therapeutic class and by shared active ingredient.
///
/// A class with two or more distinct medications is reported once. A shared
/// ingredient outside every class table is reported as its own group.
pub fn find_therapeutic_duplications(medications: &[Medication]) -> Vec<TherapeuticDuplication> {
    // Distinct entries keyed by lowercase drug name, first spelling kept.
    let mut distinct: IndexMap<String, &Medication> = IndexMap::new();
    for med in medications {
        let key = med.drug_name.trim().to_lowercase();
        if !key.is_empty() {
            distinct.entry(key).or_insert(med);
        }
    }

    let mut duplications = Vec::new();
    let mut covered: HashSet<&str> = HashSet::new();

    for class in THERAPEUTIC_CLASSES {
        let members: Vec<&Medication> = distinct
            .values()
            .copied()
            .filter(|med| class_of(med) == Some(class.name))
            .collect();
        if members.len() < 2 {
            continue;
        }
        covered.extend(members.iter().map(|m| m.drug_name.as_str()));
        duplications.push(TherapeuticDuplication {
            therapeutic_class: class.name.to_string(),
            medications: members.iter().map(|m| m.drug_name.trim().to_string()).collect(),
            recommendation: format!(
                "Multiple {} prescribed. Review whether concurrent therapy is intended and consider consolidating to a single agent.",
                class.name
            ),
        });
    }

    let mut by_ingredient: IndexMap<String, Vec<&Medication>> = IndexMap::new();
    for med in distinct.values().copied() {
        let ingredient = med.lookup_name().to_lowercase();
        by_ingredient.entry(ingredient).or_default().push(med);
    }
    for (ingredient, meds) in by_ingredient {
        if meds.len() < 2 || meds.iter().any(|m| covered.contains(m.drug_name.as_str())) {
            continue;
        }
        duplications.push(TherapeuticDuplication {
            therapeutic_class: format!("Same active ingredient ({ingredient})"),
            medications: meds.iter().map(|m| m.drug_name.trim().to_string()).collect(),
            recommendation: format!(
                "{} is listed under more than one product name. Confirm the patient is not taking duplicate doses.",
                ingredient
            ),
        });
    }

    duplications
}

fn class_of(med: &Medication) -> Option<&'static str> {
    let ingredient = med.lookup_name().to_lowercase();
    let name = med.drug_name.to_lowercase();
    THERAPEUTIC_CLASSES
        .iter()
        .find(|class| {
            class
                .members
                .iter()
                .any(|m| ingredient.contains(m) || name.contains(m))
        })
        .map(|class| class.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_nsaids_are_a_duplication() {
        let meds = vec![
            Medication::new("Advil", "ibuprofen"),
            Medication::new("Aleve", "naproxen"),
            Medication::new("Lipitor", "atorvastatin"),
        ];
        let dups = find_therapeutic_duplications(&meds);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].therapeutic_class, "NSAIDs");
        assert_eq!(dups[0].medications, vec!["Advil", "Aleve"]);
    }

    #[test]
    fn shared_unclassified_ingredient_counts() {
        let meds = vec![
            Medication::new("Tylenol", "acetaminophen"),
            Medication::new("Panadol", "Acetaminophen"),
        ];
        let dups = find_therapeutic_duplications(&meds);
        assert_eq!(dups.len(), 1);
        assert!(dups[0].therapeutic_class.contains("acetaminophen"));
    }

    #[test]
    fn shared_classified_ingredient_reported_once() {
        let meds = vec![
            Medication::new("Coumadin", "warfarin"),
            Medication::new("Jantoven", "warfarin"),
        ];
        let dups = find_therapeutic_duplications(&meds);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].therapeutic_class, "Anticoagulants");
    }

    #[test]
    fn repeated_entry_is_not_a_duplication() {
        let meds = vec![
            Medication::new("Aspirin", "aspirin"),
            Medication::new("aspirin", "aspirin"),
        ];
        assert!(find_therapeutic_duplications(&meds).is_empty());
    }

    #[test]
    fn different_classes_do_not_group() {
        let meds = vec![
            Medication::new("Zoloft", "sertraline"),
            Medication::new("Xanax", "alprazolam"),
        ];
        assert!(find_therapeutic_duplications(&meds).is_empty());
    }
}
