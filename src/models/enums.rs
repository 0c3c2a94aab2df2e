use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AnalysisStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

str_enum!(BiomarkerStatus {
    Low => "low",
    Normal => "normal",
    High => "high",
    CriticalLow => "critical_low",
    CriticalHigh => "critical_high",
});

impl BiomarkerStatus {
    /// Whether the value falls outside its reference range.
    pub fn is_out_of_range(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

str_enum!(BiomarkerCategory {
    Hematology => "hematology",
    Biochemistry => "biochemistry",
    Hormones => "hormones",
    Thyroid => "thyroid",
    Vitamins => "vitamins",
    Minerals => "minerals",
    Lipids => "lipids",
    Liver => "liver",
    Kidney => "kidney",
    Inflammation => "inflammation",
    Other => "other",
});

str_enum!(Gender {
    Male => "male",
    Female => "female",
});

// Known laboratory providers, passed to the extractor as a parsing hint.
str_enum!(LabProvider {
    Invitro => "invitro",
    Kdl => "kdl",
    Gemotest => "gemotest",
    Helix => "helix",
    Cmd => "cmd",
    Other => "other",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_roundtrips_through_str() {
        for status in [
            BiomarkerStatus::Low,
            BiomarkerStatus::Normal,
            BiomarkerStatus::High,
            BiomarkerStatus::CriticalLow,
            BiomarkerStatus::CriticalHigh,
        ] {
            assert_eq!(BiomarkerStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn invalid_enum_value_rejected() {
        assert!(AnalysisStatus::from_str("exploded").is_err());
    }

    #[test]
    fn only_normal_is_in_range() {
        assert!(!BiomarkerStatus::Normal.is_out_of_range());
        assert!(BiomarkerStatus::Low.is_out_of_range());
        assert!(BiomarkerStatus::CriticalHigh.is_out_of_range());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&BiomarkerStatus::CriticalLow).unwrap();
        assert_eq!(json, "\"critical_low\"");
    }
}
