use std::cmp::Reverse;

use crate::models::enums::{AgeBand, EvidenceLevel, RecommendationCategory, RecommendationPriority};

use super::context::EvaluationContext;
use super::messages::MessageTemplates;
use super::reference::SafetyReferenceData;
use super::types::ClinicalRecommendation;

/// Medication count at which a full medication review is advised.
pub const POLYPHARMACY_THRESHOLD: usize = 5;

/// Guideline-based advice. Reads the record only; never sees checker output
/// and never feeds the risk score.
pub struct ClinicalRecommendationEngine<'a> {
    reference: &'a SafetyReferenceData,
}

impl<'a> ClinicalRecommendationEngine<'a> {
    pub fn new(reference: &'a SafetyReferenceData) -> Self {
        Self { reference }
    }

    /// Recommendations ordered by priority (urgent first), then subject.
    pub fn recommend(&self, ctx: &EvaluationContext<'_>) -> Vec<ClinicalRecommendation> {
        let mut out: Vec<ClinicalRecommendation> = Vec::new();

        for med in &ctx.medications {
            for rule in &self.reference.guidelines.medications {
                if med.answers_to(&rule.subject) {
                    out.push(ClinicalRecommendation {
                        category: rule.category,
                        priority: rule.priority,
                        subject: med.normalized.clone(),
                        text: rule.recommendation.clone(),
                        evidence: rule.evidence,
                    });
                }
            }
        }

        for condition in &ctx.conditions {
            for rule in &self.reference.guidelines.conditions {
                if condition.normalized.contains(&rule.subject) {
                    out.push(ClinicalRecommendation {
                        category: rule.category,
                        priority: rule.priority,
                        subject: rule.subject.clone(),
                        text: rule.recommendation.clone(),
                        evidence: rule.evidence,
                    });
                }
            }
        }

        let med_count = ctx.medications.len();
        if med_count >= POLYPHARMACY_THRESHOLD {
            out.push(ClinicalRecommendation {
                category: RecommendationCategory::MedicationReview,
                priority: RecommendationPriority::Important,
                subject: "polypharmacy".into(),
                text: MessageTemplates::polypharmacy_review(med_count),
                evidence: EvidenceLevel::Established,
            });
        }

        if med_count > 0 {
            match ctx.patient.age_band {
                Some(AgeBand::Geriatric) => out.push(ClinicalRecommendation {
                    category: RecommendationCategory::MedicationReview,
                    priority: RecommendationPriority::Important,
                    subject: "geriatric review".into(),
                    text: MessageTemplates::geriatric_review(),
                    evidence: EvidenceLevel::Established,
                }),
                Some(band) if band.is_pediatric() => {
                    out.push(match ctx.patient.weight_kg {
                        Some(_) => ClinicalRecommendation {
                            category: RecommendationCategory::Guideline,
                            priority: RecommendationPriority::Important,
                            subject: "pediatric dosing".into(),
                            text: MessageTemplates::pediatric_dosing(band),
                            evidence: EvidenceLevel::Established,
                        },
                        None => ClinicalRecommendation {
                            category: RecommendationCategory::Monitoring,
                            priority: RecommendationPriority::Urgent,
                            subject: "pediatric weight".into(),
                            text: MessageTemplates::pediatric_weight_missing(band),
                            evidence: EvidenceLevel::Established,
                        },
                    });
                }
                _ => {}
            }
        }

        out.sort_by(|a, b| {
            Reverse(a.priority)
                .cmp(&Reverse(b.priority))
                .then_with(|| a.subject.cmp(&b.subject))
                .then_with(|| a.text.cmp(&b.text))
        });
        out.dedup_by(|a, b| a.subject == b.subject && a.text == b.text);
        out
    }
}
