use std::cmp::Reverse;

use crate::models::enums::{AgeBand, ContraindicationSeverity, EvidenceLevel};

use super::context::{EvaluationContext, PreparedAllergy, PreparedMedication};
use super::messages::MessageTemplates;
use super::normalize::Normalizer;
use super::reference::{SafetyReferenceData, CLASS_PREFIX};
use super::types::{ContraindicationFinding, ContraindicationReport, ContraindicationTrigger};

/// Words that describe the reaction rather than the allergen.
const ALLERGY_FILLER: &[&str] = &[
    "allergy", "allergies", "allergic", "to", "intolerance", "sensitivity", "reaction",
    "hypersensitivity",
];

/// Shortest allergen accepted for substring matching.
const MIN_ALLERGEN_LEN: usize = 3;

/// Cross-checks medications against conditions, age band, pregnancy and
/// lactation, and documented allergies. The four sub-checks are independent.
pub struct ContraindicationChecker<'a> {
    reference: &'a SafetyReferenceData,
}

impl<'a> ContraindicationChecker<'a> {
    pub fn new(reference: &'a SafetyReferenceData) -> Self {
        Self { reference }
    }

    pub fn check(&self, ctx: &EvaluationContext<'_>) -> ContraindicationReport {
        let mut findings = self.check_conditions(ctx);
        findings.extend(self.check_age(ctx));
        findings.extend(self.check_reproductive(ctx));
        findings.extend(self.check_allergies(ctx));

        findings.sort_by(|x, y| {
            Reverse(x.severity)
                .cmp(&Reverse(y.severity))
                .then_with(|| x.normalized.cmp(&y.normalized))
                .then_with(|| x.trigger.label().cmp(&y.trigger.label()))
        });

        tracing::debug!(
            medications = ctx.medications.len(),
            findings = findings.len(),
            "Contraindication check complete"
        );
        ContraindicationReport::from_findings(findings)
    }

    // -----------------------------------------------------------------------
    // (a) medication x condition
    // -----------------------------------------------------------------------

    pub fn check_conditions(&self, ctx: &EvaluationContext<'_>) -> Vec<ContraindicationFinding> {
        let mut findings = Vec::new();
        for med in &ctx.medications {
            for condition in &ctx.conditions {
                let rule = strongest(
                    self.reference.condition_rules.iter().filter(|r| {
                        med.answers_to(&r.medication) && condition.normalized.contains(&r.condition)
                    }),
                    |r| r.severity,
                );
                if let Some(rule) = rule {
                    findings.push(finding(
                        med,
                        ContraindicationTrigger::Condition {
                            condition_id: condition.entry.id,
                            condition: condition.entry.name.clone(),
                        },
                        rule.severity,
                        rule.rationale.clone(),
                        rule.alternatives.clone(),
                        rule.monitoring.clone(),
                        rule.evidence,
                    ));
                }
            }
        }
        findings
    }

    // -----------------------------------------------------------------------
    // (b) age band
    // -----------------------------------------------------------------------

    pub fn check_age(&self, ctx: &EvaluationContext<'_>) -> Vec<ContraindicationFinding> {
        let Some(band) = ctx.patient.age_band else {
            tracing::debug!("Age band unknown, age contraindication check skipped");
            return Vec::new();
        };
        let rules: Vec<_> = match band {
            AgeBand::Geriatric => self.reference.age.geriatric.iter().collect(),
            b if b.is_pediatric() => self
                .reference
                .age
                .pediatric
                .iter()
                .filter(|r| r.bands.contains(&b))
                .collect(),
            _ => Vec::new(),
        };

        ctx.medications
            .iter()
            .filter_map(|med| {
                let rule = strongest(
                    rules.iter().copied().filter(|r| med.answers_to(&r.medication)),
                    |r| r.severity,
                )?;
                Some(finding(
                    med,
                    ContraindicationTrigger::AgeBand { band },
                    rule.severity,
                    rule.rationale.clone(),
                    rule.alternatives.clone(),
                    Vec::new(),
                    rule.evidence,
                ))
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // (c) pregnancy and lactation
    // -----------------------------------------------------------------------

    /// Runs only when the patient context signals pregnancy or breastfeeding.
    pub fn check_reproductive(&self, ctx: &EvaluationContext<'_>) -> Vec<ContraindicationFinding> {
        let mut findings = Vec::new();

        if ctx.patient.pregnant {
            for med in &ctx.medications {
                let rule = strongest(
                    self.reference
                        .reproductive
                        .pregnancy
                        .iter()
                        .filter(|r| med.answers_to(&r.medication)),
                    |r| r.category,
                );
                let Some(rule) = rule else { continue };
                if let Some(severity) = rule.category.contraindication() {
                    findings.push(finding(
                        med,
                        ContraindicationTrigger::Pregnancy {
                            category: rule.category,
                        },
                        severity,
                        rule.rationale.clone(),
                        rule.alternatives.clone(),
                        Vec::new(),
                        EvidenceLevel::Established,
                    ));
                }
            }
        }

        if ctx.patient.breastfeeding {
            for med in &ctx.medications {
                let rule = strongest(
                    self.reference
                        .reproductive
                        .lactation
                        .iter()
                        .filter(|r| med.answers_to(&r.medication)),
                    |r| r.severity,
                );
                if let Some(rule) = rule {
                    findings.push(finding(
                        med,
                        ContraindicationTrigger::Lactation,
                        rule.severity,
                        rule.rationale.clone(),
                        rule.alternatives.clone(),
                        Vec::new(),
                        EvidenceLevel::Probable,
                    ));
                }
            }
        }

        findings
    }

    // -----------------------------------------------------------------------
    // (d) allergies
    // -----------------------------------------------------------------------

    pub fn check_allergies(&self, ctx: &EvaluationContext<'_>) -> Vec<ContraindicationFinding> {
        let normalizer = Normalizer::new(self.reference);
        let mut findings = Vec::new();

        for allergy in &ctx.allergies {
            let allergens = allergen_terms(allergy, &normalizer);
            if allergens.is_empty() {
                tracing::debug!(
                    entry_id = %allergy.entry.id,
                    "Allergy entry without a usable substance, skipped"
                );
                continue;
            }
            let classes = self.allergen_classes(&allergens);

            for med in &ctx.medications {
                let direct = allergens.iter().any(|a| {
                    med.normalized.contains(a.as_str()) || a.contains(med.normalized.as_str())
                });
                if direct {
                    findings.push(finding(
                        med,
                        ContraindicationTrigger::Allergy {
                            allergy_id: allergy.entry.id,
                            allergen: allergy.entry.name.clone(),
                        },
                        ContraindicationSeverity::Absolute,
                        MessageTemplates::allergy_direct(&allergy.normalized, &med.normalized),
                        Vec::new(),
                        Vec::new(),
                        EvidenceLevel::Established,
                    ));
                    continue;
                }

                if let Some(class) = classes.iter().find(|c| med.answers_to(&class_key(c))) {
                    findings.push(finding(
                        med,
                        ContraindicationTrigger::CrossReaction {
                            allergy_id: allergy.entry.id,
                            allergen: allergy.entry.name.clone(),
                            drug_class: class.clone(),
                        },
                        ContraindicationSeverity::Relative,
                        MessageTemplates::allergy_same_class(
                            &allergy.normalized,
                            &med.normalized,
                            class,
                        ),
                        Vec::new(),
                        vec!["Observe for hypersensitivity after the first dose".into()],
                        EvidenceLevel::Probable,
                    ));
                    continue;
                }

                let cross = self.reference.allergy.cross_reactions.iter().find(|r| {
                    classes.contains(&r.allergen_class)
                        && med.answers_to(&class_key(&r.reactive_class))
                });
                if let Some(rule) = cross {
                    findings.push(finding(
                        med,
                        ContraindicationTrigger::CrossReaction {
                            allergy_id: allergy.entry.id,
                            allergen: allergy.entry.name.clone(),
                            drug_class: rule.reactive_class.clone(),
                        },
                        ContraindicationSeverity::Relative,
                        rule.rationale.clone(),
                        Vec::new(),
                        rule.monitoring.clone(),
                        EvidenceLevel::Probable,
                    ));
                }
            }
        }
        findings
    }

    /// Drug classes an allergen names: the class itself, a class alias
    /// ("sulfa"), or the classes of a named member.
    fn allergen_classes(&self, allergens: &[String]) -> Vec<String> {
        let mut classes: Vec<String> = Vec::new();
        let mut add = |class: &str| {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        };
        for allergen in allergens {
            if self.reference.class(allergen).is_some() {
                add(allergen);
            }
            for alias in &self.reference.allergy.class_aliases {
                if alias.allergen == *allergen {
                    add(&alias.class);
                }
            }
            for class in self.reference.classes_of(allergen) {
                add(class);
            }
        }
        classes
    }
}

/// Allergen spellings to match: the allergen without reaction words, plus its
/// generic name when it is a brand.
fn allergen_terms(allergy: &PreparedAllergy<'_>, normalizer: &Normalizer<'_>) -> Vec<String> {
    let core = allergy
        .normalized
        .split(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == ')')
        .filter(|t| !t.is_empty() && !ALLERGY_FILLER.contains(t))
        .collect::<Vec<_>>()
        .join(" ");
    let mut terms = Vec::new();
    if core.chars().count() >= MIN_ALLERGEN_LEN {
        terms.push(core.clone());
    }
    let generic = normalizer.normalize_medication(&core);
    if generic.chars().count() >= MIN_ALLERGEN_LEN && !terms.contains(&generic) {
        terms.push(generic);
    }
    terms
}

fn class_key(class: &str) -> String {
    format!("{CLASS_PREFIX}{class}")
}

/// Highest-ranked rule; the first one wins a tie.
fn strongest<'t, T, K: Ord>(
    rules: impl Iterator<Item = &'t T>,
    rank: impl Fn(&T) -> K,
) -> Option<&'t T>
where
    T: 't,
{
    rules.fold(None, |best: Option<&'t T>, rule| match best {
        Some(b) if rank(b) >= rank(rule) => Some(b),
        _ => Some(rule),
    })
}

#[allow(clippy::too_many_arguments)]
fn finding(
    med: &PreparedMedication<'_>,
    trigger: ContraindicationTrigger,
    severity: ContraindicationSeverity,
    rationale: String,
    alternatives: Vec<String>,
    monitoring: Vec<String>,
    evidence: EvidenceLevel,
) -> ContraindicationFinding {
    ContraindicationFinding {
        medication_id: med.entry.id,
        medication: med.entry.name.clone(),
        normalized: med.normalized.clone(),
        trigger,
        severity,
        rationale,
        alternatives,
        monitoring,
        evidence,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{Allergy, ClinicalRecord, Condition, Demographics, Medication};

    fn check(record: &ClinicalRecord) -> ContraindicationReport {
        let data = SafetyReferenceData::bundled().unwrap();
        let as_of = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let ctx = EvaluationContext::prepare(record, &data, as_of);
        ContraindicationChecker::new(&data).check(&ctx)
    }

    #[test]
    fn aspirin_in_child_is_absolute() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Aspirin"))
            .with(Condition::new("pediatric patient age 10"));
        let report = check(&record);
        let reye = report
            .findings
            .iter()
            .find(|f| {
                matches!(
                    f.trigger,
                    ContraindicationTrigger::AgeBand { band: AgeBand::Child }
                )
            })
            .unwrap();
        assert_eq!(reye.severity, ContraindicationSeverity::Absolute);
        assert!(reye.rationale.contains("Reye"));
        assert_eq!(report.counts.top_tier(), 1);
    }

    #[test]
    fn aspirin_in_adult_is_clear() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Aspirin"))
            .with(Demographics::new().with_age(40));
        assert!(check(&record).findings.is_empty());
    }

    #[test]
    fn condition_rule_through_class_and_synonym() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Ibuprofen 400mg"))
            .with(Condition::new("CKD"));
        let report = check(&record);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, ContraindicationSeverity::Relative);
    }

    #[test]
    fn specific_condition_rule_outranks_class_rule() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Propranolol"))
            .with(Condition::new("Asthma"));
        let report = check(&record);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, ContraindicationSeverity::Absolute);
    }

    #[test]
    fn geriatric_table_applies_from_65() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Diphenhydramine 25mg"))
            .with(Demographics::new().with_age(80));
        let report = check(&record);
        assert_eq!(report.findings.len(), 1);
        assert!(matches!(
            report.findings[0].trigger,
            ContraindicationTrigger::AgeBand { band: AgeBand::Geriatric }
        ));
    }

    #[test]
    fn pregnancy_categories_map_to_severity() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Warfarin"))
            .with(Medication::new("Lisinopril"))
            .with(Medication::new("Acetaminophen"))
            .with(Condition::new("Pregnant"));
        let report = check(&record);
        let by_med = |name: &str| {
            report
                .findings
                .iter()
                .find(|f| f.normalized == name)
                .map(|f| f.severity)
        };
        assert_eq!(by_med("warfarin"), Some(ContraindicationSeverity::Absolute));
        assert_eq!(by_med("lisinopril"), Some(ContraindicationSeverity::Relative));
        assert_eq!(by_med("acetaminophen"), None);
    }

    #[test]
    fn pregnancy_table_ignored_without_signal() {
        let record = ClinicalRecord::new().with(Medication::new("Warfarin"));
        assert!(check(&record).findings.is_empty());
    }

    #[test]
    fn pregnancy_with_unrelated_negation_is_still_checked() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Warfarin 5mg daily"))
            .with(Condition::new("Pregnancy, no complications"));
        let report = check(&record);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, ContraindicationSeverity::Absolute);
        assert!(matches!(
            report.findings[0].trigger,
            ContraindicationTrigger::Pregnancy { .. }
        ));
    }

    #[test]
    fn illness_duration_does_not_make_a_child() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Aspirin 81mg daily"))
            .with(Condition::new("Hypertension for 5 years"));
        let report = check(&record);
        assert!(report
            .findings
            .iter()
            .all(|f| f.severity != ContraindicationSeverity::Absolute));
        assert!(report
            .findings
            .iter()
            .all(|f| !matches!(f.trigger, ContraindicationTrigger::AgeBand { .. })));
    }

    #[test]
    fn childbirth_is_not_a_pediatric_signal() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Codeine 30mg"))
            .with(Condition::new("Postpartum after childbirth"));
        assert!(check(&record).findings.is_empty());
    }

    #[test]
    fn lactation_table_when_breastfeeding() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Codeine 30mg"))
            .with(Condition::new("Breastfeeding"))
            .with(Demographics::new().with_age(30));
        let report = check(&record);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].trigger, ContraindicationTrigger::Lactation);
        assert_eq!(report.findings[0].severity, ContraindicationSeverity::Absolute);
    }

    #[test]
    fn direct_allergy_match_is_absolute() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Penicillin V 500mg"))
            .with(Allergy::new("Penicillin allergy"));
        let report = check(&record);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, ContraindicationSeverity::Absolute);
    }

    #[test]
    fn brand_allergy_resolves_to_generic() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Sulfamethoxazole-trimethoprim"))
            .with(Allergy::new("Bactrim"));
        let report = check(&record);
        assert_eq!(report.findings[0].severity, ContraindicationSeverity::Absolute);
    }

    #[test]
    fn same_class_allergy_is_relative() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Amoxicillin 500mg"))
            .with(Allergy::new("Penicillin"));
        let report = check(&record);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, ContraindicationSeverity::Relative);
        assert!(matches!(
            &report.findings[0].trigger,
            ContraindicationTrigger::CrossReaction { drug_class, .. } if drug_class == "penicillin"
        ));
    }

    #[test]
    fn cross_class_reaction_is_relative() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Cephalexin 500mg"))
            .with(Allergy::new("Penicillin"));
        let report = check(&record);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, ContraindicationSeverity::Relative);
        assert!(matches!(
            &report.findings[0].trigger,
            ContraindicationTrigger::CrossReaction { drug_class, .. }
                if drug_class == "cephalosporin"
        ));
    }

    #[test]
    fn class_alias_allergy() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Sulfasalazine"))
            .with(Allergy::new("Sulfa drugs"));
        let report = check(&record);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, ContraindicationSeverity::Relative);
    }

    #[test]
    fn missing_everything_is_empty_not_error() {
        assert!(check(&ClinicalRecord::new()).findings.is_empty());
        let meds_only = ClinicalRecord::new().with(Medication::new("Metformin"));
        assert!(check(&meds_only).findings.is_empty());
    }

    #[test]
    fn findings_ordered_by_severity() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Metformin"))
            .with(Medication::new("Amoxicillin"))
            .with(Condition::new("Heart failure"))
            .with(Allergy::new("Amoxicillin"));
        let report = check(&record);
        let severities: Vec<_> = report.findings.iter().map(|f| f.severity).collect();
        assert_eq!(
            severities,
            vec![ContraindicationSeverity::Absolute, ContraindicationSeverity::Caution]
        );
    }
}
