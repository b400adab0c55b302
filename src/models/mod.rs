pub mod enums;
pub mod medication;

pub use enums::*;
pub use medication::{Medication, PatientContext};
