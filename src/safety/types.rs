use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::enums::{
    AgeBand, AlertCategory, AlertSeverity, ContraindicationSeverity, DoseDirection,
    DosageSeverity, EvidenceLevel, InteractionSeverity, PregnancyCategory,
    RecommendationCategory, RecommendationPriority, RiskComponent, RiskLevel, RouteFamily,
    TieredSeverity,
};
use crate::models::ClinicalRecord;

// ---------------------------------------------------------------------------
// SeverityCounts
// ---------------------------------------------------------------------------

/// Per-severity tally of one checker's findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeverityCounts<S: Ord>(BTreeMap<S, usize>);

impl<S: TieredSeverity> SeverityCounts<S> {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn tally(severities: impl IntoIterator<Item = S>) -> Self {
        let mut counts = Self::new();
        for severity in severities {
            counts.record(severity);
        }
        counts
    }

    pub fn record(&mut self, severity: S) {
        *self.0.entry(severity).or_insert(0) += 1;
    }

    pub fn get(&self, severity: S) -> usize {
        self.0.get(&severity).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Number of findings at the checker's top tier.
    pub fn top_tier(&self) -> usize {
        self.get(S::TOP)
    }

    pub fn iter(&self) -> impl Iterator<Item = (S, usize)> + '_ {
        self.0.iter().map(|(s, n)| (*s, *n))
    }
}

impl<S: TieredSeverity> Default for SeverityCounts<S> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

/// One drug-drug interaction. Subjects are in canonical (normalized name) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionFinding {
    pub medication_ids: [Uuid; 2],
    pub subjects: [String; 2],
    pub normalized: [String; 2],
    pub severity: InteractionSeverity,
    pub mechanism: String,
    pub clinical_effect: String,
    pub management: String,
    pub rationale: String,
    pub alternatives: Vec<String>,
    pub monitoring: Vec<String>,
    pub evidence: EvidenceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionReport {
    pub findings: Vec<InteractionFinding>,
    pub counts: SeverityCounts<InteractionSeverity>,
}

impl InteractionReport {
    pub fn empty() -> Self {
        Self {
            findings: Vec::new(),
            counts: SeverityCounts::new(),
        }
    }

    pub fn from_findings(findings: Vec<InteractionFinding>) -> Self {
        let counts = SeverityCounts::tally(findings.iter().map(|f| f.severity));
        Self { findings, counts }
    }
}

/// What triggered a contraindication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContraindicationTrigger {
    Condition { condition_id: Uuid, condition: String },
    AgeBand { band: AgeBand },
    Pregnancy { category: PregnancyCategory },
    Lactation,
    Allergy { allergy_id: Uuid, allergen: String },
    CrossReaction {
        allergy_id: Uuid,
        allergen: String,
        drug_class: String,
    },
}

impl ContraindicationTrigger {
    /// Short label used as the second affected subject of an alert.
    pub fn label(&self) -> String {
        match self {
            Self::Condition { condition, .. } => condition.clone(),
            Self::AgeBand { band } => format!("{band} patient"),
            Self::Pregnancy { category } => format!("pregnancy (category {})", category.letter()),
            Self::Lactation => "breastfeeding".into(),
            Self::Allergy { allergen, .. } => format!("{allergen} allergy"),
            Self::CrossReaction { allergen, .. } => format!("{allergen} allergy (cross-reaction)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContraindicationFinding {
    pub medication_id: Uuid,
    pub medication: String,
    pub normalized: String,
    pub trigger: ContraindicationTrigger,
    pub severity: ContraindicationSeverity,
    pub rationale: String,
    pub alternatives: Vec<String>,
    pub monitoring: Vec<String>,
    pub evidence: EvidenceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContraindicationReport {
    pub findings: Vec<ContraindicationFinding>,
    pub counts: SeverityCounts<ContraindicationSeverity>,
}

impl ContraindicationReport {
    pub fn empty() -> Self {
        Self {
            findings: Vec::new(),
            counts: SeverityCounts::new(),
        }
    }

    pub fn from_findings(findings: Vec<ContraindicationFinding>) -> Self {
        let counts = SeverityCounts::tally(findings.iter().map(|f| f.severity));
        Self { findings, counts }
    }
}

/// A daily dose outside the safe range for the patient's age band and route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosageFinding {
    pub medication_id: Uuid,
    pub medication: String,
    pub normalized: String,
    pub direction: DoseDirection,
    pub severity: DosageSeverity,
    pub route: RouteFamily,
    pub age_band: AgeBand,
    pub unit: String,
    pub doses_per_day: f64,
    pub daily_dose: f64,
    /// Bounds actually compared (already multiplied by weight when weight-based).
    pub safe_min: f64,
    pub safe_max: f64,
    pub weight_based: bool,
    /// daily/max for overdoses, min/daily for underdoses.
    pub ratio: f64,
    pub target_daily_dose: f64,
    /// Corrective amount per administration at the current frequency.
    pub target_dose: f64,
    pub rationale: String,
    pub monitoring: Vec<String>,
    pub evidence: EvidenceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DosageReport {
    pub findings: Vec<DosageFinding>,
    pub counts: SeverityCounts<DosageSeverity>,
}

impl DosageReport {
    pub fn empty() -> Self {
        Self {
            findings: Vec::new(),
            counts: SeverityCounts::new(),
        }
    }

    pub fn from_findings(findings: Vec<DosageFinding>) -> Self {
        let counts = SeverityCounts::tally(findings.iter().map(|f| f.severity));
        Self { findings, counts }
    }
}

/// The three checker outputs of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyFindings {
    pub interactions: InteractionReport,
    pub contraindications: ContraindicationReport,
    pub dosage_violations: DosageReport,
}

impl SafetyFindings {
    pub fn empty() -> Self {
        Self {
            interactions: InteractionReport::empty(),
            contraindications: ContraindicationReport::empty(),
            dosage_violations: DosageReport::empty(),
        }
    }

    pub fn total(&self) -> usize {
        self.interactions.findings.len()
            + self.contraindications.findings.len()
            + self.dosage_violations.findings.len()
    }
}

// ---------------------------------------------------------------------------
// Recommendations, score, alerts
// ---------------------------------------------------------------------------

/// Advisory guidance; never scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalRecommendation {
    pub category: RecommendationCategory,
    pub priority: RecommendationPriority,
    pub subject: String,
    pub text: String,
    pub evidence: EvidenceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub overall_score: f64,
    pub risk_level: RiskLevel,
    pub components: BTreeMap<RiskComponent, f64>,
    pub recommendations: Vec<String>,
    pub monitoring_requirements: BTreeSet<String>,
    pub escalation_triggers: Vec<String>,
}

impl RiskScore {
    pub fn component(&self, component: RiskComponent) -> f64 {
        self.components.get(&component).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub severity: AlertSeverity,
    pub category: AlertCategory,
    pub title: String,
    pub description: String,
    pub affected: Vec<String>,
    pub required_actions: Vec<String>,
    pub timeline: String,
    pub escalation_criteria: Vec<String>,
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

/// Simplified boolean view kept for older callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyView {
    pub is_safe: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyAssessment {
    pub audit_id: Uuid,
    pub assessed_at: DateTime<Utc>,
    pub overall_risk: RiskScore,
    pub findings: SafetyFindings,
    pub alerts: Vec<Alert>,
    pub recommendations: Vec<ClinicalRecommendation>,
    pub legacy_view: LegacyView,
    pub summary: String,
    pub degraded: bool,
    pub error: Option<String>,
}

/// Per-checker toggles for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSelection {
    pub interactions: bool,
    pub contraindications: bool,
    pub dosage: bool,
    pub recommendations: bool,
    pub alerts: bool,
}

impl Default for FeatureSelection {
    fn default() -> Self {
        Self {
            interactions: true,
            contraindications: true,
            dosage: true,
            recommendations: true,
            alerts: true,
        }
    }
}

// ---------------------------------------------------------------------------
// SummaryEnhancer
// ---------------------------------------------------------------------------

/// Optional narrative enrichment. Receives the finished assessment read-only
/// and may only return replacement prose for `SafetyAssessment::summary`.
pub trait SummaryEnhancer: Send + Sync {
    fn enhance(&self, assessment: &SafetyAssessment) -> Option<String>;
}

// ---------------------------------------------------------------------------
// SafetyError
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Reference data load failed ({0}): {1}")]
    ReferenceDataLoad(String, String),

    #[error("Reference data parse failed ({0}): {1}")]
    ReferenceDataParse(String, String),

    #[error("Reference data inconsistent ({0}): {1}")]
    ReferenceDataInvalid(String, String),

    #[error("Invalid scoring policy: {0}")]
    InvalidPolicy(String),

    #[error("Non-finite {0} score")]
    NonFiniteScore(String),

    #[error("Internal lock failed")]
    LockFailed,
}

// ---------------------------------------------------------------------------
// SafetyAssessor trait
// ---------------------------------------------------------------------------

/// The clinical safety engine.
pub trait SafetyAssessor {
    /// Evaluate with every checker enabled. Never fails.
    fn evaluate(&self, record: &ClinicalRecord) -> SafetyAssessment;

    /// Evaluate with per-checker toggles. Never fails.
    fn evaluate_with(
        &self,
        record: &ClinicalRecord,
        features: &FeatureSelection,
    ) -> SafetyAssessment;
}
