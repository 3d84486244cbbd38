use crate::models::enums::{AgeBand, AlertCategory, RiskComponent, RiskLevel};

use super::helpers::format_quantity;
use super::types::{
    ContraindicationFinding, DosageFinding, InteractionFinding, RiskScore, SafetyFindings,
};

/// Message template builder for every sentence the engine emits.
/// Clinical register: direct, actionable, no speculation beyond the tables.
pub struct MessageTemplates;

impl MessageTemplates {
    // -----------------------------------------------------------------------
    // Findings
    // -----------------------------------------------------------------------

    pub fn interaction_rationale(first: &str, second: &str, clinical_effect: &str) -> String {
        format!("Combining {first} with {second}: {clinical_effect}.")
    }

    pub fn duplication_rationale(generic: &str) -> String {
        format!(
            "{generic} appears more than once in the medication list (therapeutic duplication)."
        )
    }

    pub fn allergy_direct(allergen: &str, medication: &str) -> String {
        format!("{medication} matches the documented allergy to {allergen}.")
    }

    pub fn allergy_same_class(allergen: &str, medication: &str, class: &str) -> String {
        format!(
            "{medication} belongs to the {} class named by the documented allergy to {allergen}.",
            class.replace('_', " "),
        )
    }

    pub fn overdose_rationale(
        daily: f64,
        unit: &str,
        max: f64,
        ratio: f64,
        band: AgeBand,
        weight_based: bool,
    ) -> String {
        format!(
            "Daily dose of {} {unit} exceeds the {band} maximum of {} {unit}{} ({}x the limit).",
            format_quantity(daily),
            format_quantity(max),
            if weight_based { " for this weight" } else { "" },
            format_quantity(ratio),
        )
    }

    pub fn underdose_rationale(
        daily: f64,
        unit: &str,
        min: f64,
        ratio: f64,
        band: AgeBand,
        weight_based: bool,
    ) -> String {
        format!(
            "Daily dose of {} {unit} is below the {band} minimum of {} {unit}{} ({}x short).",
            format_quantity(daily),
            format_quantity(min),
            if weight_based { " for this weight" } else { "" },
            format_quantity(ratio),
        )
    }

    pub fn toxicity_watch() -> String {
        "Signs of dose-related toxicity".to_string()
    }

    // -----------------------------------------------------------------------
    // Recommendations
    // -----------------------------------------------------------------------

    pub fn polypharmacy_review(count: usize) -> String {
        format!(
            "{count} concurrent medications: perform a structured medication review \
             and deprescribe where possible."
        )
    }

    pub fn geriatric_review() -> String {
        concat!(
            "Review the list against Beers criteria for potentially inappropriate ",
            "medications in older adults."
        )
        .to_string()
    }

    pub fn pediatric_dosing(band: AgeBand) -> String {
        format!("Confirm every dose is weight-based and appropriate for a {band} patient.")
    }

    pub fn pediatric_weight_missing(band: AgeBand) -> String {
        format!(
            "No body weight recorded for a {band} patient: record a current weight \
             so weight-based doses can be checked."
        )
    }

    // -----------------------------------------------------------------------
    // Risk score
    // -----------------------------------------------------------------------

    pub fn level_recommendation(level: RiskLevel) -> Option<&'static str> {
        match level {
            RiskLevel::Critical => Some(
                "Critical risk: immediate prescriber and pharmacist review before the next dose.",
            ),
            RiskLevel::High => Some("High risk: prescriber review of the regimen within 24 hours."),
            _ => None,
        }
    }

    pub fn component_recommendation(component: RiskComponent) -> &'static str {
        match component {
            RiskComponent::DrugInteractions => {
                "Review interacting medication pairs and put the required monitoring in place."
            }
            RiskComponent::Contraindications => {
                "Reassess contraindicated medications and switch to a listed alternative."
            }
            RiskComponent::DosageConcerns => {
                "Correct doses outside the safe range for this patient's age, weight and route."
            }
            RiskComponent::PatientComplexity => {
                "Account for age and comorbidities when choosing and titrating doses."
            }
            RiskComponent::MonitoringRequirements => {
                "Schedule the laboratory and clinical monitoring these medications need."
            }
            RiskComponent::MedicationBurden => {
                "Reduce medication burden: reconcile the list and stop what is no longer indicated."
            }
        }
    }

    pub fn component_monitoring(component: RiskComponent) -> &'static str {
        match component {
            RiskComponent::DrugInteractions => "Clinical review for interaction effects",
            RiskComponent::Contraindications => "Clinical review of contraindicated therapy",
            RiskComponent::DosageConcerns => "Dose review and response assessment",
            RiskComponent::PatientComplexity => "Renal and hepatic function",
            RiskComponent::MonitoringRequirements => "Therapeutic drug monitoring as scheduled",
            RiskComponent::MedicationBurden => "Medication adherence review",
        }
    }

    pub fn escalate_interaction(first: &str, second: &str) -> String {
        format!("Contraindicated combination {first} + {second} still active")
    }

    pub fn escalate_contraindication(medication: &str, trigger: &str) -> String {
        format!("{medication} given despite absolute contraindication ({trigger})")
    }

    pub fn escalate_dosage(medication: &str) -> String {
        format!("{medication} dose not corrected or signs of toxicity")
    }

    pub fn level_escalation(level: RiskLevel) -> Option<&'static str> {
        match level {
            RiskLevel::Critical => {
                Some("Any clinical deterioration while the critical-risk regimen is unchanged")
            }
            RiskLevel::High => Some("No prescriber review within 24 hours"),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Alerts
    // -----------------------------------------------------------------------

    pub fn alert_title(category: AlertCategory, count: usize) -> String {
        match category {
            AlertCategory::InteractionContraindicated => {
                format!("{count} contraindicated drug combination(s)")
            }
            AlertCategory::InteractionMajor => format!("{count} major drug interaction(s)"),
            AlertCategory::ContraindicationAbsolute => {
                format!("{count} absolute contraindication(s)")
            }
            AlertCategory::DosageCritical => format!("{count} critical dosing error(s)"),
            AlertCategory::OverallRisk => "Elevated overall medication risk".to_string(),
        }
    }

    pub fn alert_escalation(category: AlertCategory) -> &'static str {
        match category {
            AlertCategory::InteractionContraindicated => {
                "Escalate to the prescriber if the combination cannot be stopped"
            }
            AlertCategory::InteractionMajor => "Escalate if monitoring shows an adverse effect",
            AlertCategory::ContraindicationAbsolute => {
                "Escalate if no alternative is available and treatment is still required"
            }
            AlertCategory::DosageCritical => "Escalate if the dose has already been administered",
            AlertCategory::OverallRisk => {
                "Escalate if the regimen is not reviewed within the timeline"
            }
        }
    }

    pub fn overall_description(level: RiskLevel, score: f64) -> String {
        format!(
            "Overall medication risk is {level} (score {} of 100).",
            format_quantity(score)
        )
    }

    pub fn consider_alternatives(alternatives: &[String]) -> String {
        format!("Consider: {}", alternatives.join(", "))
    }

    pub fn monitoring_criterion(requirement: &str) -> String {
        format!("Abnormal finding on {requirement}")
    }

    pub fn withhold(medication: &str, trigger: &str) -> String {
        format!("Withhold {medication} ({trigger}) pending prescriber review")
    }

    pub fn adjust_dose(medication: &str, target: &str, target_daily: &str, unit: &str) -> String {
        format!("Adjust {medication} to {target} {unit} per dose ({target_daily} {unit} per day)")
    }

    // -----------------------------------------------------------------------
    // Assessment
    // -----------------------------------------------------------------------

    pub fn legacy_interaction(f: &InteractionFinding) -> String {
        format!(
            "{} interaction: {} + {}",
            f.severity, f.normalized[0], f.normalized[1]
        )
    }

    pub fn legacy_contraindication(f: &ContraindicationFinding) -> String {
        format!(
            "{} contraindication: {} ({})",
            f.severity,
            f.normalized,
            f.trigger.label()
        )
    }

    pub fn legacy_dosage(f: &DosageFinding) -> String {
        format!(
            "{} {}: {} {} {} per day",
            f.severity,
            f.direction,
            f.normalized,
            format_quantity(f.daily_dose),
            f.unit
        )
    }

    pub fn summary(score: &RiskScore, findings: &SafetyFindings, alerts: usize) -> String {
        let mut text = format!(
            concat!(
                "Overall medication risk is {} (score {} of 100). Found {} interaction(s), ",
                "{} contraindication(s) and {} dosage concern(s); {} alert(s) raised."
            ),
            score.risk_level,
            format_quantity(score.overall_score),
            findings.interactions.findings.len(),
            findings.contraindications.findings.len(),
            findings.dosage_violations.findings.len(),
            alerts,
        );
        let top = score
            .components
            .iter()
            .filter(|(_, s)| **s > 0.0)
            .max_by(|a, b| a.1.total_cmp(b.1));
        if let Some((component, value)) = top {
            text.push_str(&format!(
                " Largest contributor: {} ({}).",
                component.as_str().replace('_', " "),
                format_quantity(*value)
            ));
        }
        text
    }

    pub fn degraded_summary(level: RiskLevel, medication_count: usize) -> String {
        format!(
            "Automated assessment incomplete. Provisional risk {level} based on \
             {medication_count} medication(s) only; manual review required."
        )
    }

    pub fn degraded_recommendation() -> &'static str {
        "Automated checks did not complete: perform a manual medication safety review."
    }

    pub fn degraded_escalation() -> &'static str {
        "Manual review not completed within 24 hours"
    }

    pub fn degraded_warning() -> &'static str {
        "Safety checks incomplete; result based on medication count only"
    }
}
