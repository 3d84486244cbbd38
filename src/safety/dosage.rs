use std::cmp::Reverse;

use crate::models::enums::{AgeBand, DoseDirection, DosageSeverity, RouteFamily};

use super::context::{EvaluationContext, PatientContext, PreparedMedication};
use super::helpers::{canonical_unit, convert_dose, doses_per_day, parse_dose, Dose};
use super::messages::MessageTemplates;
use super::reference::{DoseRange, SafetyReferenceData};
use super::types::{DosageFinding, DosageReport};

/// Overdose severity from daily/max.
pub fn overdose_severity(ratio: f64) -> DosageSeverity {
    if ratio > 3.0 {
        DosageSeverity::Critical
    } else if ratio > 2.0 {
        DosageSeverity::High
    } else if ratio > 1.5 {
        DosageSeverity::Moderate
    } else {
        DosageSeverity::Low
    }
}

/// Underdose severity from min/daily. Never critical.
pub fn underdose_severity(ratio: f64) -> DosageSeverity {
    if ratio > 3.0 {
        DosageSeverity::High
    } else if ratio > 2.0 {
        DosageSeverity::Moderate
    } else {
        DosageSeverity::Low
    }
}

/// Compares each medication's daily dose with the safe range for the
/// patient's age band and the medication's route family.
pub struct DosageSafetyValidator<'a> {
    reference: &'a SafetyReferenceData,
}

impl<'a> DosageSafetyValidator<'a> {
    pub fn new(reference: &'a SafetyReferenceData) -> Self {
        Self { reference }
    }

    pub fn check(&self, ctx: &EvaluationContext<'_>) -> DosageReport {
        let mut findings: Vec<DosageFinding> = ctx
            .medications
            .iter()
            .filter_map(|med| self.check_medication(med, &ctx.patient))
            .collect();

        findings.sort_by(|x, y| {
            Reverse(x.severity)
                .cmp(&Reverse(y.severity))
                .then_with(|| x.normalized.cmp(&y.normalized))
                .then_with(|| x.medication_id.cmp(&y.medication_id))
        });

        tracing::debug!(
            medications = ctx.medications.len(),
            findings = findings.len(),
            "Dosage check complete"
        );
        DosageReport::from_findings(findings)
    }

    /// `None` when the dose is within range or the check cannot run
    /// (no dose, no schedule, no range for the route, unit mismatch, missing
    /// weight for a weight-based range).
    pub fn check_medication(
        &self,
        med: &PreparedMedication<'_>,
        patient: &PatientContext,
    ) -> Option<DosageFinding> {
        let entry_id = med.entry.id;

        let Some(dose) = resolve_dose(med) else {
            tracing::debug!(entry_id = %entry_id, "No resolvable dose, dosage check skipped");
            return None;
        };
        let Some(per_day) = resolve_frequency(med) else {
            tracing::debug!(entry_id = %entry_id, "No dosing schedule, dosage check skipped");
            return None;
        };

        let band = patient.dosing_band();
        let route = RouteFamily::from_route(med.entry.route.as_deref());
        let range = self.select_range(med, band, route)?;

        let Some(per_dose) = convert_dose(dose.value, dose.unit, &range.unit) else {
            tracing::debug!(
                entry_id = %entry_id,
                "Dose unit not convertible, dosage check skipped"
            );
            return None;
        };

        let (safe_min, safe_max) = if range.per_kg {
            let Some(weight) = patient.weight_kg else {
                tracing::debug!(
                    entry_id = %entry_id,
                    "Weight unknown, weight-based dosage check skipped"
                );
                return None;
            };
            (range.min_daily * weight, range.max_daily * weight)
        } else {
            (range.min_daily, range.max_daily)
        };

        let daily = per_dose * per_day;
        if !daily.is_finite() || daily <= 0.0 {
            return None;
        }

        let (direction, ratio, severity, target_daily) = if daily > safe_max {
            let ratio = daily / safe_max;
            (DoseDirection::Overdose, ratio, overdose_severity(ratio), safe_max)
        } else if daily < safe_min {
            let ratio = safe_min / daily;
            (DoseDirection::Underdose, ratio, underdose_severity(ratio), safe_min)
        } else {
            return None;
        };

        let target_dose = target_daily / per_day;
        let rationale = match direction {
            DoseDirection::Overdose => MessageTemplates::overdose_rationale(
                daily, &range.unit, safe_max, ratio, band, range.per_kg,
            ),
            DoseDirection::Underdose => MessageTemplates::underdose_rationale(
                daily, &range.unit, safe_min, ratio, band, range.per_kg,
            ),
        };

        Some(DosageFinding {
            medication_id: entry_id,
            medication: med.entry.name.clone(),
            normalized: med.normalized.clone(),
            direction,
            severity,
            route,
            age_band: band,
            unit: range.unit.clone(),
            doses_per_day: per_day,
            daily_dose: daily,
            safe_min,
            safe_max,
            weight_based: range.per_kg,
            ratio,
            target_daily_dose: target_daily,
            target_dose,
            rationale,
            monitoring: self.monitoring_for(med, direction),
            evidence: range.evidence,
        })
    }

    /// First range for the medication's own name, else for one of its classes,
    /// restricted to the age band and route family. Ranges of another route
    /// family are never compared.
    fn select_range(
        &self,
        med: &PreparedMedication<'_>,
        band: AgeBand,
        route: RouteFamily,
    ) -> Option<&'a DoseRange> {
        let reference: &'a SafetyReferenceData = self.reference;
        let mut other_route = false;
        for key in &med.keys {
            let candidates = reference
                .dose_ranges
                .iter()
                .filter(|r| r.medication == *key && r.age_bands.contains(&band));
            for range in candidates {
                if range.route == route {
                    return Some(range);
                }
                other_route = true;
            }
        }
        if other_route {
            tracing::debug!(
                entry_id = %med.entry.id,
                route = %route,
                "No range for this route family, dosage check skipped"
            );
        }
        None
    }

    fn monitoring_for(
        &self,
        med: &PreparedMedication<'_>,
        direction: DoseDirection,
    ) -> Vec<String> {
        let mut monitoring: Vec<String> = self
            .reference
            .monitoring
            .medications
            .iter()
            .filter(|r| med.answers_to(&r.medication))
            .flat_map(|r| r.requirements.iter().cloned())
            .collect();
        if direction == DoseDirection::Overdose {
            monitoring.push(MessageTemplates::toxicity_watch());
        }
        monitoring
    }
}

/// Structured dose fields first, else the dose written in the name.
fn resolve_dose(med: &PreparedMedication<'_>) -> Option<Dose> {
    let entry = med.entry;
    if let (Some(value), Some(unit)) = (entry.dose_value, entry.dose_unit.as_deref()) {
        if value.is_finite() && value > 0.0 {
            if let Some(unit) = canonical_unit(unit) {
                return Some(Dose { value, unit });
            }
        }
    }
    parse_dose(&entry.name).filter(|d| d.value > 0.0)
}

fn resolve_frequency(med: &PreparedMedication<'_>) -> Option<f64> {
    med.entry
        .frequency
        .as_deref()
        .and_then(doses_per_day)
        .or_else(|| doses_per_day(&med.entry.name))
        .filter(|n| n.is_finite() && *n > 0.0)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{ClinicalRecord, Condition, Demographics, Medication};

    fn check(record: &ClinicalRecord) -> DosageReport {
        let data = SafetyReferenceData::bundled().unwrap();
        let as_of = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let ctx = EvaluationContext::prepare(record, &data, as_of);
        DosageSafetyValidator::new(&data).check(&ctx)
    }

    #[test]
    fn lisinopril_overdose_is_critical() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Lisinopril 100mg").with_frequency("three times daily"));
        let report = check(&record);
        assert_eq!(report.findings.len(), 1);
        let f = &report.findings[0];
        assert_eq!(f.direction, DoseDirection::Overdose);
        assert_eq!(f.severity, DosageSeverity::Critical);
        assert!((f.daily_dose - 300.0).abs() < 1e-9);
        assert!((f.ratio - 7.5).abs() < 1e-9);
        assert!((f.target_daily_dose - 40.0).abs() < 1e-9);
        assert!((f.target_dose - 40.0 / 3.0).abs() < 1e-9);
        assert_eq!(f.age_band, AgeBand::Adult);
        assert_eq!(report.counts.top_tier(), 1);
    }

    #[test]
    fn in_range_dose_is_clear() {
        let record = ClinicalRecord::new().with(Medication::new("Warfarin 5mg daily"));
        assert!(check(&record).findings.is_empty());
    }

    #[test]
    fn structured_dose_converts_grams() {
        let at_max = ClinicalRecord::new().with(
            Medication::new("Amoxicillin")
                .with_dose(1.0, "g")
                .with_frequency("every 8 hours"),
        );
        assert!(check(&at_max).findings.is_empty());

        let double = ClinicalRecord::new().with(
            Medication::new("Amoxicillin")
                .with_dose(2.0, "g")
                .with_frequency("every 8 hours"),
        );
        let report = check(&double);
        assert!((report.findings[0].ratio - 2.0).abs() < 1e-9);
        assert_eq!(report.findings[0].severity, DosageSeverity::Moderate);
    }

    #[test]
    fn geriatric_range_in_micrograms() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Digoxin 0.5 mg daily"))
            .with(Demographics::new().with_age(80));
        let report = check(&record);
        let f = &report.findings[0];
        assert_eq!(f.unit, "mcg");
        assert!((f.ratio - 4.0).abs() < 1e-9);
        assert_eq!(f.severity, DosageSeverity::Critical);
    }

    #[test]
    fn unconvertible_unit_is_skipped() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Lisinopril").with_dose(10.0, "ml").with_frequency("daily"));
        assert!(check(&record).findings.is_empty());
    }

    #[test]
    fn other_route_family_is_never_compared() {
        let record = ClinicalRecord::new().with(
            Medication::new("Lisinopril 100mg")
                .with_frequency("tid")
                .with_route("IV"),
        );
        assert!(check(&record).findings.is_empty());
    }

    #[test]
    fn parenteral_range_applies_to_injections() {
        let record = ClinicalRecord::new().with(
            Medication::new("Furosemide 250mg")
                .with_frequency("daily")
                .with_route("intravenous"),
        );
        let report = check(&record);
        assert_eq!(report.findings[0].route, RouteFamily::Parenteral);
        assert!((report.findings[0].safe_max - 200.0).abs() < 1e-9);
    }

    #[test]
    fn weight_based_range_uses_weight() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Amoxicillin 1000mg").with_frequency("tid"))
            .with(Demographics::new().with_age(6).with_weight(20.0, "kg"));
        let report = check(&record);
        let f = &report.findings[0];
        assert!(f.weight_based);
        assert!((f.safe_max - 1800.0).abs() < 1e-9);
        assert_eq!(f.severity, DosageSeverity::Moderate);
    }

    #[test]
    fn weight_based_range_without_weight_is_skipped() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Amoxicillin 1000mg").with_frequency("tid"))
            .with(Condition::new("Pediatric patient age 6"));
        assert!(check(&record).findings.is_empty());
    }

    #[test]
    fn underdose_ratio_is_min_over_daily() {
        let record = ClinicalRecord::new().with(Medication::new("Atorvastatin 2.5mg daily"));
        let f = &check(&record).findings[0];
        assert_eq!(f.direction, DoseDirection::Underdose);
        assert!((f.ratio - 4.0).abs() < 1e-9);
        assert_eq!(f.severity, DosageSeverity::High);
        assert!((f.target_dose - 10.0).abs() < 1e-9);
    }

    #[test]
    fn missing_frequency_is_skipped() {
        let record = ClinicalRecord::new().with(Medication::new("Lisinopril 100mg"));
        assert!(check(&record).findings.is_empty());
    }

    #[test]
    fn zero_medications_is_empty() {
        let report = check(&ClinicalRecord::new());
        assert!(report.findings.is_empty());
        assert_eq!(report.counts.total(), 0);
    }

    #[test]
    fn severity_steps() {
        assert_eq!(overdose_severity(3.01), DosageSeverity::Critical);
        assert_eq!(overdose_severity(3.0), DosageSeverity::High);
        assert_eq!(overdose_severity(2.0), DosageSeverity::Moderate);
        assert_eq!(overdose_severity(1.5), DosageSeverity::Low);
        assert_eq!(underdose_severity(3.5), DosageSeverity::High);
        assert_eq!(underdose_severity(2.5), DosageSeverity::Moderate);
        assert_eq!(underdose_severity(1.2), DosageSeverity::Low);
    }
}
