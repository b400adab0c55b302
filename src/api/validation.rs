//! Request bodies and their validation rules.
//!
//! Bodies deserialize with every field optional so a missing field is
//! reported as a field error instead of a serde rejection. All rules run
//! and every failure is collected before responding.

use serde::Deserialize;

use crate::api::error::{ApiError, FieldError};
use crate::models::{Medication, PatientContext};

pub const MAX_MEDICATIONS: usize = 50;

const AGE_RANGE: (f64, f64) = (0.0, 150.0);
const WEIGHT_RANGE_KG: (f64, f64) = (0.5, 500.0);
const RENAL_RANGE_ML_MIN: (f64, f64) = (0.0, 200.0);

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationInput {
    pub drug_name: Option<String>,
    pub active_ingredient: Option<String>,
    pub strength: Option<String>,
    pub dosage_form: Option<String>,
    pub route: Option<String>,
    pub frequency: Option<String>,
}

/// Body shared by the medication-list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub medications: Option<Vec<MedicationInput>>,
    pub patient_age: Option<f64>,
    pub patient_weight: Option<f64>,
    pub renal_function: Option<f64>,
    pub allergies: Option<Vec<String>>,
    pub conditions: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ValidCheck {
    pub medications: Vec<Medication>,
    pub patient: PatientContext,
    pub allergies: Vec<String>,
    pub conditions: Vec<String>,
}

impl ValidCheck {
    /// Names sent upstream, one per medication.
    pub fn lookup_names(&self) -> Vec<String> {
        self.medications
            .iter()
            .map(|m| m.lookup_name().to_string())
            .collect()
    }
}

impl CheckRequest {
    pub fn validate(self) -> Result<ValidCheck, ApiError> {
        self.validate_inner(false)
    }

    /// As [`validate`](Self::validate), also requiring at least one condition.
    pub fn validate_with_conditions(self) -> Result<ValidCheck, ApiError> {
        self.validate_inner(true)
    }

    fn validate_inner(self, require_conditions: bool) -> Result<ValidCheck, ApiError> {
        let mut errors = Vec::new();

        let inputs = self.medications.unwrap_or_default();
        if inputs.is_empty() {
            errors.push(FieldError::new(
                "medications",
                "At least one medication is required",
            ));
        } else if inputs.len() > MAX_MEDICATIONS {
            errors.push(FieldError::new(
                "medications",
                format!("A maximum of {MAX_MEDICATIONS} medications can be checked at once"),
            ));
        }

        let mut medications = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.into_iter().enumerate() {
            let drug_name = non_blank(input.drug_name);
            let active_ingredient = non_blank(input.active_ingredient);
            if drug_name.is_none() {
                errors.push(FieldError::new(
                    format!("medications[{i}].drugName"),
                    "Drug name is required",
                ));
            }
            if active_ingredient.is_none() {
                errors.push(FieldError::new(
                    format!("medications[{i}].activeIngredient"),
                    "Active ingredient is required",
                ));
            }
            if let (Some(drug_name), Some(active_ingredient)) = (drug_name, active_ingredient) {
                medications.push(Medication {
                    drug_name,
                    active_ingredient,
                    strength: input.strength,
                    dosage_form: input.dosage_form,
                    route: input.route,
                    frequency: input.frequency,
                });
            }
        }

        check_range(&mut errors, "patientAge", "Patient age", self.patient_age, AGE_RANGE);
        check_range(
            &mut errors,
            "patientWeight",
            "Patient weight (kg)",
            self.patient_weight,
            WEIGHT_RANGE_KG,
        );
        check_range(
            &mut errors,
            "renalFunction",
            "Creatinine clearance (mL/min)",
            self.renal_function,
            RENAL_RANGE_ML_MIN,
        );

        let allergies = string_list(&mut errors, "allergies", "Allergy", self.allergies);
        let conditions = string_list(&mut errors, "conditions", "Condition", self.conditions);
        let condition_errors = errors.iter().any(|e| e.field.starts_with("conditions"));
        if require_conditions && conditions.is_empty() && !condition_errors {
            errors.push(FieldError::new(
                "conditions",
                "At least one condition is required",
            ));
        }

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(ValidCheck {
            medications,
            patient: PatientContext {
                age: self.patient_age,
                weight_kg: self.patient_weight,
                renal_function: self.renal_function,
            },
            allergies,
            conditions,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairRequest {
    pub drug1: Option<String>,
    pub drug2: Option<String>,
}

impl PairRequest {
    pub fn validate(self) -> Result<(String, String), ApiError> {
        let drug1 = non_blank(self.drug1);
        let drug2 = non_blank(self.drug2);
        match (drug1, drug2) {
            (Some(a), Some(b)) => Ok((a, b)),
            (a, b) => {
                let mut errors = Vec::new();
                if a.is_none() {
                    errors.push(FieldError::new("drug1", "First drug name is required"));
                }
                if b.is_none() {
                    errors.push(FieldError::new("drug2", "Second drug name is required"));
                }
                Err(ApiError::Validation(errors))
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_range(
    errors: &mut Vec<FieldError>,
    field: &str,
    label: &str,
    value: Option<f64>,
    (min, max): (f64, f64),
) {
    if let Some(v) = value {
        if !(min..=max).contains(&v) {
            errors.push(FieldError::new(
                field,
                format!("{label} must be between {min} and {max}"),
            ));
        }
    }
}

fn string_list(
    errors: &mut Vec<FieldError>,
    field: &str,
    label: &str,
    values: Option<Vec<String>>,
) -> Vec<String> {
    let mut out = Vec::new();
    for (i, value) in values.unwrap_or_default().into_iter().enumerate() {
        match non_blank(Some(value)) {
            Some(v) => out.push(v),
            None => errors.push(FieldError::new(
                format!("{field}[{i}]"),
                format!("{label} must be a non-empty string"),
            )),
        }
    }
    out
}
