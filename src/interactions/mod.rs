//! Drug interaction checking: RxNorm interaction lookup, severity
//! classification, management guidance and clinical effect extraction.

pub mod effects;
pub mod service;
pub mod severity;

pub use effects::{extract_clinical_effects, DEFAULT_CLINICAL_EFFECT};
pub use service::{DrugInteractionCheck, DrugInteractionService, Interaction};
pub use severity::{
    determine_severity, management_recommendation, severity_catalog, InteractionSeverity,
    SeverityLevel,
};
