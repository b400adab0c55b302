use serde::{Deserialize, Serialize};

/// Unknown string for a string-backed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: {value}")]
pub struct InvalidEnumValue {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnumValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnumValue {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AllergyAlertType {
    Allergy => "allergy",
    CrossSensitivity => "cross_sensitivity",
});

str_enum!(AllergySeverity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
});

str_enum!(ContraindicationSeverity {
    Absolute => "absolute",
    Relative => "relative",
});

str_enum!(RiskLevel {
    Low => "low",
    Moderate => "moderate",
    High => "high",
    Critical => "critical",
});

str_enum!(PriorityLevel {
    Urgent => "urgent",
    High => "high",
    Routine => "routine",
});

str_enum!(RenalImpairment {
    Moderate => "moderate",
    Severe => "severe",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn allergy_alert_type_roundtrip() {
        for (variant, s) in [
            (AllergyAlertType::Allergy, "allergy"),
            (AllergyAlertType::CrossSensitivity, "cross_sensitivity"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(AllergyAlertType::from_str(s).unwrap(), variant);
            assert_eq!(serde_json::to_value(variant).unwrap(), s);
        }
    }

    #[test]
    fn risk_level_display() {
        assert_eq!(RiskLevel::Critical.to_string(), "critical");
    }

    #[test]
    fn invalid_enum_returns_error() {
        let err = ContraindicationSeverity::from_str("maybe").unwrap_err();
        assert_eq!(err.field, "ContraindicationSeverity");
        assert_eq!(err.value, "maybe");
    }
}
