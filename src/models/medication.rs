use serde::{Deserialize, Serialize};

use super::enums::RenalImpairment;

/// A medication on the patient's list, as submitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub drug_name: String,
    pub active_ingredient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

impl Medication {
    pub fn new(drug_name: &str, active_ingredient: &str) -> Self {
        Self {
            drug_name: drug_name.to_string(),
            active_ingredient: active_ingredient.to_string(),
            strength: None,
            dosage_form: None,
            route: None,
            frequency: None,
        }
    }

    /// Name used for upstream lookups: the active ingredient, else the drug name.
    pub fn lookup_name(&self) -> &str {
        let ingredient = self.active_ingredient.trim();
        if ingredient.is_empty() {
            self.drug_name.trim()
        } else {
            ingredient
        }
    }
}

/// Optional patient parameters that refine priorities and monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientContext {
    pub age: Option<f64>,
    pub weight_kg: Option<f64>,
    /// Creatinine clearance in mL/min.
    pub renal_function: Option<f64>,
}

impl PatientContext {
    pub fn is_geriatric(&self) -> bool {
        self.age.is_some_and(|a| a >= 65.0)
    }

    pub fn is_pediatric(&self) -> bool {
        self.age.is_some_and(|a| a < 18.0)
    }

    pub fn is_low_weight(&self) -> bool {
        self.weight_kg.is_some_and(|w| w < 50.0)
    }

    pub fn renal_impairment(&self) -> Option<RenalImpairment> {
        match self.renal_function {
            Some(crcl) if crcl < 30.0 => Some(RenalImpairment::Severe),
            Some(crcl) if crcl < 60.0 => Some(RenalImpairment::Moderate),
            _ => None,
        }
    }
}
