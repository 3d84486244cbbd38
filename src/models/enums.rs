use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parse failure for the closed enums below.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },
}

/// Macro to generate a closed, totally ordered enum with as_str + std::str::FromStr.
/// Variants are declared lowest first, so the derived `Ord` is the severity order.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

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

/// Severity scale shared by the checkers: a closed ordered set with a single
/// top tier (always escalated) and an issue floor (reported as an issue rather
/// than a warning in the legacy view).
pub trait TieredSeverity: Copy + Ord {
    const TOP: Self;
    const ISSUE_FLOOR: Self;

    fn is_top_tier(self) -> bool {
        self == Self::TOP
    }

    fn is_issue(self) -> bool {
        self >= Self::ISSUE_FLOOR
    }
}

// ---------------------------------------------------------------------------
// Patient
// ---------------------------------------------------------------------------

str_enum!(Sex {
    Unknown => "unknown",
    Female => "female",
    Male => "male",
    Other => "other",
});

str_enum!(AgeBand {
    Infant => "infant",
    Child => "child",
    Adolescent => "adolescent",
    Adult => "adult",
    Geriatric => "geriatric",
});

impl AgeBand {
    /// infant < 2, child 2–11, adolescent 12–17, adult 18–64, geriatric ≥ 65.
    pub fn from_age(years: u32) -> Self {
        match years {
            0..=1 => Self::Infant,
            2..=11 => Self::Child,
            12..=17 => Self::Adolescent,
            18..=64 => Self::Adult,
            _ => Self::Geriatric,
        }
    }

    pub fn is_pediatric(&self) -> bool {
        matches!(self, Self::Infant | Self::Child | Self::Adolescent)
    }
}

str_enum!(RouteFamily {
    Oral => "oral",
    Parenteral => "parenteral",
    Topical => "topical",
    Inhaled => "inhaled",
    Rectal => "rectal",
    Other => "other",
});

impl RouteFamily {
    /// Classify a free-text route. A missing route is treated as oral.
    pub fn from_route(route: Option<&str>) -> Self {
        let lower = match route {
            Some(r) if !r.trim().is_empty() => r.trim().to_lowercase(),
            _ => return Self::Oral,
        };
        match lower.as_str() {
            "oral" | "po" | "p.o." | "by mouth" | "sublingual" | "sl" | "buccal" | "enteral"
            | "tablet" | "capsule" => Self::Oral,
            "iv" | "i.v." | "intravenous" | "im" | "i.m." | "intramuscular" | "sc" | "sq"
            | "subcut" | "subcutaneous" | "injection" | "parenteral" | "infusion" => {
                Self::Parenteral
            }
            "topical" | "transdermal" | "cutaneous" | "patch" => Self::Topical,
            "inhaled" | "inhalation" | "nebulized" | "nasal" | "intranasal" => Self::Inhaled,
            "rectal" | "pr" | "suppository" => Self::Rectal,
            _ => Self::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// Checker severities
// ---------------------------------------------------------------------------

str_enum!(InteractionSeverity {
    Minor => "minor",
    Moderate => "moderate",
    Major => "major",
    Contraindicated => "contraindicated",
});

impl TieredSeverity for InteractionSeverity {
    const TOP: Self = Self::Contraindicated;
    const ISSUE_FLOOR: Self = Self::Major;
}

str_enum!(ContraindicationSeverity {
    Warning => "warning",
    Caution => "caution",
    Relative => "relative",
    Absolute => "absolute",
});

impl TieredSeverity for ContraindicationSeverity {
    const TOP: Self = Self::Absolute;
    const ISSUE_FLOOR: Self = Self::Relative;
}

str_enum!(DosageSeverity {
    Low => "low",
    Moderate => "moderate",
    High => "high",
    Critical => "critical",
});

impl TieredSeverity for DosageSeverity {
    const TOP: Self = Self::Critical;
    const ISSUE_FLOOR: Self = Self::High;
}

str_enum!(EvidenceLevel {
    Theoretical => "theoretical",
    Limited => "limited",
    Probable => "probable",
    Established => "established",
});

str_enum!(PregnancyCategory {
    CategoryA => "category_a",
    CategoryB => "category_b",
    CategoryC => "category_c",
    CategoryD => "category_d",
    CategoryX => "category_x",
});

impl PregnancyCategory {
    pub fn letter(&self) -> char {
        match self {
            Self::CategoryA => 'A',
            Self::CategoryB => 'B',
            Self::CategoryC => 'C',
            Self::CategoryD => 'D',
            Self::CategoryX => 'X',
        }
    }

    /// D maps to a relative contraindication, X to an absolute one.
    pub fn contraindication(&self) -> Option<ContraindicationSeverity> {
        match self {
            Self::CategoryD => Some(ContraindicationSeverity::Relative),
            Self::CategoryX => Some(ContraindicationSeverity::Absolute),
            _ => None,
        }
    }
}

str_enum!(DoseDirection {
    Underdose => "underdose",
    Overdose => "overdose",
});

// ---------------------------------------------------------------------------
// Scoring and alerting
// ---------------------------------------------------------------------------

str_enum!(RiskLevel {
    Minimal => "minimal",
    Low => "low",
    Moderate => "moderate",
    High => "high",
    Critical => "critical",
});

impl RiskLevel {
    /// Five contiguous bands: ≥81 critical, ≥61 high, ≥41 moderate, ≥21 low.
    /// Non-finite input is treated as zero.
    pub fn from_score(score: f64) -> Self {
        let score = if score.is_finite() { score } else { 0.0 };
        if score >= 81.0 {
            Self::Critical
        } else if score >= 61.0 {
            Self::High
        } else if score >= 41.0 {
            Self::Moderate
        } else if score >= 21.0 {
            Self::Low
        } else {
            Self::Minimal
        }
    }

    /// Inclusive lower bound of the band.
    pub fn floor(&self) -> f64 {
        match self {
            Self::Minimal => 0.0,
            Self::Low => 21.0,
            Self::Moderate => 41.0,
            Self::High => 61.0,
            Self::Critical => 81.0,
        }
    }

    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Minimal | Self::Low)
    }
}

str_enum!(RiskComponent {
    DrugInteractions => "drug_interactions",
    Contraindications => "contraindications",
    DosageConcerns => "dosage_concerns",
    PatientComplexity => "patient_complexity",
    MonitoringRequirements => "monitoring_requirements",
    MedicationBurden => "medication_burden",
});

str_enum!(AlertSeverity {
    Info => "info",
    Warning => "warning",
    Alert => "alert",
    Urgent => "urgent",
});

impl AlertSeverity {
    pub fn timeline(&self) -> &'static str {
        match self {
            Self::Urgent => "within 1 hour",
            Self::Alert => "within 24 hours",
            Self::Warning => "within 72 hours",
            Self::Info => "at next routine review",
        }
    }
}

// Declaration order is the emission order of alerts.
str_enum!(AlertCategory {
    InteractionContraindicated => "interaction_contraindicated",
    InteractionMajor => "interaction_major",
    ContraindicationAbsolute => "contraindication_absolute",
    DosageCritical => "dosage_critical",
    OverallRisk => "overall_risk",
});

str_enum!(RecommendationCategory {
    Monitoring => "monitoring",
    AlternativeTherapy => "alternative_therapy",
    Guideline => "guideline",
    MedicationReview => "medication_review",
});

str_enum!(RecommendationPriority {
    Routine => "routine",
    Important => "important",
    Urgent => "urgent",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn interaction_severity_round_trip() {
        for (variant, s) in [
            (InteractionSeverity::Minor, "minor"),
            (InteractionSeverity::Moderate, "moderate"),
            (InteractionSeverity::Major, "major"),
            (InteractionSeverity::Contraindicated, "contraindicated"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(InteractionSeverity::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn severity_total_order() {
        assert!(InteractionSeverity::Contraindicated > InteractionSeverity::Major);
        assert!(InteractionSeverity::Major > InteractionSeverity::Moderate);
        assert!(InteractionSeverity::Moderate > InteractionSeverity::Minor);
        assert!(ContraindicationSeverity::Absolute > ContraindicationSeverity::Relative);
        assert!(ContraindicationSeverity::Relative > ContraindicationSeverity::Caution);
        assert!(ContraindicationSeverity::Caution > ContraindicationSeverity::Warning);
        assert!(DosageSeverity::Critical > DosageSeverity::High);
        assert!(DosageSeverity::High > DosageSeverity::Moderate);
        assert!(DosageSeverity::Moderate > DosageSeverity::Low);
    }

    #[test]
    fn top_tier_and_issue_floor() {
        assert!(InteractionSeverity::Contraindicated.is_top_tier());
        assert!(!InteractionSeverity::Major.is_top_tier());
        assert!(InteractionSeverity::Major.is_issue());
        assert!(!InteractionSeverity::Moderate.is_issue());
        assert!(ContraindicationSeverity::Relative.is_issue());
        assert!(!ContraindicationSeverity::Caution.is_issue());
        assert!(DosageSeverity::High.is_issue());
        assert!(!DosageSeverity::Moderate.is_issue());
    }

    #[test]
    fn unknown_value_is_rejected() {
        let err = InteractionSeverity::from_str("severe").unwrap_err();
        assert_eq!(
            err,
            ModelError::InvalidEnum {
                field: "InteractionSeverity".into(),
                value: "severe".into(),
            }
        );
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&AlertCategory::InteractionContraindicated).unwrap();
        assert_eq!(json, "\"interaction_contraindicated\"");
        let parsed: PregnancyCategory = serde_json::from_str("\"category_x\"").unwrap();
        assert_eq!(parsed, PregnancyCategory::CategoryX);
    }

    #[test]
    fn age_band_boundaries() {
        assert_eq!(AgeBand::from_age(0), AgeBand::Infant);
        assert_eq!(AgeBand::from_age(1), AgeBand::Infant);
        assert_eq!(AgeBand::from_age(2), AgeBand::Child);
        assert_eq!(AgeBand::from_age(11), AgeBand::Child);
        assert_eq!(AgeBand::from_age(12), AgeBand::Adolescent);
        assert_eq!(AgeBand::from_age(18), AgeBand::Adult);
        assert_eq!(AgeBand::from_age(64), AgeBand::Adult);
        assert_eq!(AgeBand::from_age(65), AgeBand::Geriatric);
        assert!(AgeBand::Child.is_pediatric());
        assert!(!AgeBand::Geriatric.is_pediatric());
    }

    #[test]
    fn route_family_classification() {
        assert_eq!(RouteFamily::from_route(None), RouteFamily::Oral);
        assert_eq!(RouteFamily::from_route(Some("  ")), RouteFamily::Oral);
        assert_eq!(RouteFamily::from_route(Some("PO")), RouteFamily::Oral);
        assert_eq!(RouteFamily::from_route(Some("IV")), RouteFamily::Parenteral);
        assert_eq!(RouteFamily::from_route(Some("subcutaneous")), RouteFamily::Parenteral);
        assert_eq!(RouteFamily::from_route(Some("transdermal")), RouteFamily::Topical);
        assert_eq!(RouteFamily::from_route(Some("ophthalmic")), RouteFamily::Other);
    }

    #[test]
    fn risk_level_bands_are_contiguous() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Minimal);
        assert_eq!(RiskLevel::from_score(20.999), RiskLevel::Minimal);
        assert_eq!(RiskLevel::from_score(21.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40.999), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(41.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(60.999), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(61.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(80.999), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(81.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(100.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(f64::NAN), RiskLevel::Minimal);
        for level in RiskLevel::ALL {
            assert_eq!(RiskLevel::from_score(level.floor()), *level);
        }
    }

    #[test]
    fn pregnancy_category_mapping() {
        assert_eq!(
            PregnancyCategory::CategoryX.contraindication(),
            Some(ContraindicationSeverity::Absolute)
        );
        assert_eq!(
            PregnancyCategory::CategoryD.contraindication(),
            Some(ContraindicationSeverity::Relative)
        );
        assert_eq!(PregnancyCategory::CategoryC.contraindication(), None);
        assert_eq!(PregnancyCategory::CategoryX.letter(), 'X');
    }

    #[test]
    fn alert_category_order_is_declaration_order() {
        let mut sorted = AlertCategory::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, AlertCategory::ALL);
        assert_eq!(AlertSeverity::Urgent.timeline(), "within 1 hour");
        assert_eq!(AlertSeverity::Alert.timeline(), "within 24 hours");
    }
}
