use std::cmp::Reverse;

use crate::models::enums::{EvidenceLevel, InteractionSeverity};

use super::context::{EvaluationContext, PreparedMedication};
use super::helpers::PairKey;
use super::messages::MessageTemplates;
use super::reference::SafetyReferenceData;
use super::types::{InteractionFinding, InteractionReport};

/// Pairwise drug-drug interaction check over every unordered medication pair.
pub struct DrugInteractionChecker<'a> {
    reference: &'a SafetyReferenceData,
}

impl<'a> DrugInteractionChecker<'a> {
    pub fn new(reference: &'a SafetyReferenceData) -> Self {
        Self { reference }
    }

    /// Zero or one medication yields an empty report.
    pub fn check(&self, ctx: &EvaluationContext<'_>) -> InteractionReport {
        let meds = &ctx.medications;
        let mut findings = Vec::new();
        for (i, a) in meds.iter().enumerate() {
            for b in &meds[i + 1..] {
                if let Some(finding) = self.check_pair(a, b) {
                    findings.push(finding);
                }
            }
        }

        findings.sort_by(|x, y| {
            Reverse(x.severity)
                .cmp(&Reverse(y.severity))
                .then_with(|| x.normalized.cmp(&y.normalized))
                .then_with(|| x.subjects.cmp(&y.subjects))
        });

        tracing::debug!(
            medications = meds.len(),
            findings = findings.len(),
            "Interaction check complete"
        );
        InteractionReport::from_findings(findings)
    }

    /// Check one pair. The result does not depend on argument order.
    pub fn check_pair(
        &self,
        a: &PreparedMedication<'_>,
        b: &PreparedMedication<'_>,
    ) -> Option<InteractionFinding> {
        let (first, second) = canonical_order(a, b);

        if first.normalized == second.normalized {
            return Some(duplication(first, second));
        }

        for first_key in &first.keys {
            for second_key in &second.keys {
                let key = PairKey::new(first_key, second_key);
                if let Some(rule) = self.reference.interaction(&key) {
                    return Some(InteractionFinding {
                        medication_ids: [first.entry.id, second.entry.id],
                        subjects: [first.entry.name.clone(), second.entry.name.clone()],
                        normalized: [first.normalized.clone(), second.normalized.clone()],
                        severity: rule.severity,
                        mechanism: rule.mechanism.clone(),
                        clinical_effect: rule.clinical_effect.clone(),
                        management: rule.management.clone(),
                        rationale: MessageTemplates::interaction_rationale(
                            &first.normalized,
                            &second.normalized,
                            &rule.clinical_effect,
                        ),
                        alternatives: rule.alternatives.clone(),
                        monitoring: rule.monitoring.clone(),
                        evidence: rule.evidence,
                    });
                }
            }
        }
        None
    }
}

/// Sort by normalized name, then display name, then id so the pair has one
/// orientation whichever way it is passed in.
fn canonical_order<'p, 'r>(
    a: &'p PreparedMedication<'r>,
    b: &'p PreparedMedication<'r>,
) -> (&'p PreparedMedication<'r>, &'p PreparedMedication<'r>) {
    let key = |m: &PreparedMedication<'_>| (m.normalized.clone(), m.entry.name.clone(), m.entry.id);
    if key(a) <= key(b) {
        (a, b)
    } else {
        (b, a)
    }
}

fn duplication(
    first: &PreparedMedication<'_>,
    second: &PreparedMedication<'_>,
) -> InteractionFinding {
    InteractionFinding {
        medication_ids: [first.entry.id, second.entry.id],
        subjects: [first.entry.name.clone(), second.entry.name.clone()],
        normalized: [first.normalized.clone(), second.normalized.clone()],
        severity: InteractionSeverity::Moderate,
        mechanism: "Same active ingredient listed more than once".into(),
        clinical_effect: "Cumulative dose may exceed the intended amount".into(),
        management: "Confirm whether both entries are active and consolidate to one".into(),
        rationale: MessageTemplates::duplication_rationale(&first.normalized),
        alternatives: Vec::new(),
        monitoring: Vec::new(),
        evidence: EvidenceLevel::Established,
    }
}
