use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::models::enums::{RiskComponent, RiskLevel, TieredSeverity};
use crate::models::{ClinicalRecord, RecordShape};

use super::alerts::AlertGenerator;
use super::audit::{AuditEntry, AuditLog};
use super::context::EvaluationContext;
use super::contraindications::ContraindicationChecker;
use super::dosage::DosageSafetyValidator;
use super::interactions::DrugInteractionChecker;
use super::messages::MessageTemplates;
use super::recommendations::ClinicalRecommendationEngine;
use super::reference::SafetyReferenceData;
use super::scoring::{RiskScorer, ScoringPolicy};
use super::types::{
    ContraindicationReport, DosageReport, FeatureSelection, InteractionReport, LegacyView,
    RiskScore, SafetyAssessment, SafetyAssessor, SafetyError, SafetyFindings, SummaryEnhancer,
};

/// Risk level used when the full evaluation fails, from the medication count alone.
pub fn fallback_level(medication_count: usize) -> RiskLevel {
    match medication_count {
        0 => RiskLevel::Minimal,
        1..=2 => RiskLevel::Low,
        3..=5 => RiskLevel::Moderate,
        6..=9 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}

/// Default implementation of the safety engine.
/// Runs every checker, scores, raises alerts and records one audit entry per call.
pub struct DefaultSafetyEngine {
    reference: SafetyReferenceData,
    policy: ScoringPolicy,
    audit: AuditLog,
    enhancer: Option<Box<dyn SummaryEnhancer>>,
}

impl DefaultSafetyEngine {
    pub fn new(reference: SafetyReferenceData) -> Self {
        Self {
            reference,
            policy: ScoringPolicy::default(),
            audit: AuditLog::new(),
            enhancer: None,
        }
    }

    /// Engine over the tables compiled into the binary.
    pub fn bundled() -> Result<Self, SafetyError> {
        Ok(Self::new(SafetyReferenceData::bundled()?))
    }

    /// Engine over the tables in `dir` when given, else the bundled tables.
    pub fn from_reference_dir(dir: Option<&Path>) -> Result<Self, SafetyError> {
        match dir {
            Some(dir) => Ok(Self::new(SafetyReferenceData::load(dir)?)),
            None => Self::bundled(),
        }
    }

    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_enhancer(mut self, enhancer: Box<dyn SummaryEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn with_audit_capacity(mut self, capacity: usize) -> Self {
        self.audit = AuditLog::with_capacity(capacity);
        self
    }

    pub fn reference(&self) -> &SafetyReferenceData {
        &self.reference
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Evaluate with age derived as of `as_of`. Never fails: an internal
    /// error yields a degraded assessment.
    pub fn evaluate_at(
        &self,
        record: &ClinicalRecord,
        features: &FeatureSelection,
        as_of: NaiveDate,
    ) -> SafetyAssessment {
        let request_id = Uuid::new_v4();
        let shape = record.shape();

        let mut assessment = match self.try_evaluate(record, features, as_of, request_id) {
            Ok(assessment) => assessment,
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    error = %e,
                    "Safety evaluation failed, returning degraded assessment"
                );
                self.fallback(record, features, request_id, &e)
            }
        };

        if let Some(enhancer) = &self.enhancer {
            if let Some(summary) = enhancer.enhance(&assessment) {
                assessment.summary = summary;
            }
        }

        self.record_audit(&assessment, shape);

        tracing::info!(
            request_id = %request_id,
            medications = shape.medications,
            findings = assessment.findings.total(),
            alerts = assessment.alerts.len(),
            score = assessment.overall_risk.overall_score,
            level = %assessment.overall_risk.risk_level,
            degraded = assessment.degraded,
            "Safety evaluation complete"
        );
        assessment
    }

    fn try_evaluate(
        &self,
        record: &ClinicalRecord,
        features: &FeatureSelection,
        as_of: NaiveDate,
        request_id: Uuid,
    ) -> Result<SafetyAssessment, SafetyError> {
        let ctx = EvaluationContext::prepare(record, &self.reference, as_of);

        let findings = SafetyFindings {
            interactions: if features.interactions {
                DrugInteractionChecker::new(&self.reference).check(&ctx)
            } else {
                InteractionReport::empty()
            },
            contraindications: if features.contraindications {
                ContraindicationChecker::new(&self.reference).check(&ctx)
            } else {
                ContraindicationReport::empty()
            },
            dosage_violations: if features.dosage {
                DosageSafetyValidator::new(&self.reference).check(&ctx)
            } else {
                DosageReport::empty()
            },
        };

        let overall_risk = RiskScorer::new(&self.reference, &self.policy).score(&ctx, &findings)?;

        let alerts = if features.alerts {
            AlertGenerator::generate(&overall_risk, &findings)
        } else {
            Vec::new()
        };
        let recommendations = if features.recommendations {
            ClinicalRecommendationEngine::new(&self.reference).recommend(&ctx)
        } else {
            Vec::new()
        };

        let legacy_view = legacy_view(&overall_risk, &findings);
        let summary = MessageTemplates::summary(&overall_risk, &findings, alerts.len());

        Ok(SafetyAssessment {
            audit_id: request_id,
            assessed_at: Utc::now(),
            overall_risk,
            findings,
            alerts,
            recommendations,
            legacy_view,
            summary,
            degraded: false,
            error: None,
        })
    }

    /// Structurally complete assessment built from the medication count only.
    fn fallback(
        &self,
        record: &ClinicalRecord,
        features: &FeatureSelection,
        request_id: Uuid,
        error: &SafetyError,
    ) -> SafetyAssessment {
        let medication_count = record.medications().count();
        let level = fallback_level(medication_count);

        let overall_risk = RiskScore {
            overall_score: level.floor(),
            risk_level: level,
            components: RiskComponent::ALL.iter().map(|c| (*c, 0.0)).collect::<BTreeMap<_, _>>(),
            recommendations: vec![MessageTemplates::degraded_recommendation().to_string()],
            monitoring_requirements: BTreeSet::new(),
            escalation_triggers: vec![MessageTemplates::degraded_escalation().to_string()],
        };
        let findings = SafetyFindings::empty();
        let alerts = if features.alerts {
            AlertGenerator::generate(&overall_risk, &findings)
        } else {
            Vec::new()
        };

        SafetyAssessment {
            audit_id: request_id,
            assessed_at: Utc::now(),
            legacy_view: LegacyView {
                is_safe: level.is_safe(),
                issues: Vec::new(),
                warnings: vec![MessageTemplates::degraded_warning().to_string()],
            },
            summary: MessageTemplates::degraded_summary(level, medication_count),
            overall_risk,
            findings,
            alerts,
            recommendations: Vec::new(),
            degraded: true,
            error: Some(error.to_string()),
        }
    }

    fn record_audit(&self, assessment: &SafetyAssessment, shape: RecordShape) {
        let entry = AuditEntry {
            request_id: assessment.audit_id,
            recorded_at: assessment.assessed_at,
            shape,
            overall_score: assessment.overall_risk.overall_score,
            risk_level: assessment.overall_risk.risk_level,
            degraded: assessment.degraded,
            error: assessment.error.clone(),
        };
        if let Err(e) = self.audit.append(entry) {
            tracing::error!(request_id = %assessment.audit_id, error = %e, "Audit append failed");
        }
    }

    /// The newest `n` audit entries, oldest first.
    pub fn recent_audit(&self, n: usize) -> Result<Vec<AuditEntry>, SafetyError> {
        self.audit.recent(n)
    }

    pub fn audit_len(&self) -> Result<usize, SafetyError> {
        self.audit.len()
    }
}

impl SafetyAssessor for DefaultSafetyEngine {
    fn evaluate(&self, record: &ClinicalRecord) -> SafetyAssessment {
        self.evaluate_with(record, &FeatureSelection::default())
    }

    fn evaluate_with(
        &self,
        record: &ClinicalRecord,
        features: &FeatureSelection,
    ) -> SafetyAssessment {
        self.evaluate_at(record, features, Utc::now().date_naive())
    }
}

/// `is_safe` follows the risk level; findings at or above each checker's
/// issue floor become issues, the rest warnings.
fn legacy_view(score: &RiskScore, findings: &SafetyFindings) -> LegacyView {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    for f in &findings.interactions.findings {
        let line = MessageTemplates::legacy_interaction(f);
        if f.severity.is_issue() {
            issues.push(line);
        } else {
            warnings.push(line);
        }
    }
    for f in &findings.contraindications.findings {
        let line = MessageTemplates::legacy_contraindication(f);
        if f.severity.is_issue() {
            issues.push(line);
        } else {
            warnings.push(line);
        }
    }
    for f in &findings.dosage_violations.findings {
        let line = MessageTemplates::legacy_dosage(f);
        if f.severity.is_issue() {
            issues.push(line);
        } else {
            warnings.push(line);
        }
    }

    LegacyView {
        is_safe: score.risk_level.is_safe(),
        issues,
        warnings,
    }
}
