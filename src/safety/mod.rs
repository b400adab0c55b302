//! Rule-based safety checks that run without upstream calls.

pub mod allergy;
pub mod contraindication;
pub mod duplication;

pub use allergy::{check_drug_allergies, check_medication_allergies, AllergyAlert};
pub use contraindication::{
    check_contraindications, check_label_contraindications, ContraindicationAlert, LabelSections,
};
pub use duplication::{find_therapeutic_duplications, TherapeuticDuplication};
