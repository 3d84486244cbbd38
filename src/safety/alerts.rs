use uuid::Uuid;

use crate::models::enums::{
    AlertCategory, AlertSeverity, ContraindicationSeverity, DosageSeverity, InteractionSeverity,
    RiskLevel,
};

use super::helpers::format_quantity;
use super::messages::MessageTemplates;
use super::types::{Alert, RiskScore, SafetyFindings};

/// Namespace for name-based alert ids.
const ALERT_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_2a4e_93d1_4b7a_8e55_0c2d_b3f4_a917);

/// Turns a score and checker output into at most one alert per category,
/// in category order.
pub struct AlertGenerator;

impl AlertGenerator {
    pub fn generate(score: &RiskScore, findings: &SafetyFindings) -> Vec<Alert> {
        AlertCategory::ALL
            .iter()
            .filter_map(|category| match category {
                AlertCategory::InteractionContraindicated => {
                    interaction_alert(findings, InteractionSeverity::Contraindicated)
                }
                AlertCategory::InteractionMajor => {
                    interaction_alert(findings, InteractionSeverity::Major)
                }
                AlertCategory::ContraindicationAbsolute => contraindication_alert(findings),
                AlertCategory::DosageCritical => dosage_alert(findings),
                AlertCategory::OverallRisk => overall_alert(score),
            })
            .collect()
    }
}

fn interaction_alert(findings: &SafetyFindings, severity: InteractionSeverity) -> Option<Alert> {
    let matching: Vec<_> = findings
        .interactions
        .findings
        .iter()
        .filter(|f| f.severity == severity)
        .collect();
    if matching.is_empty() {
        return None;
    }

    let (category, alert_severity) = match severity {
        InteractionSeverity::Contraindicated => {
            (AlertCategory::InteractionContraindicated, AlertSeverity::Urgent)
        }
        _ => (AlertCategory::InteractionMajor, AlertSeverity::Alert),
    };

    let mut affected = Vec::new();
    let mut actions = Vec::new();
    let mut criteria = Vec::new();
    let mut descriptions = Vec::new();
    for f in &matching {
        for subject in &f.normalized {
            push_unique(&mut affected, subject.clone());
        }
        push_unique(&mut actions, f.management.clone());
        if !f.alternatives.is_empty() {
            push_unique(&mut actions, MessageTemplates::consider_alternatives(&f.alternatives));
        }
        for m in &f.monitoring {
            push_unique(&mut criteria, MessageTemplates::monitoring_criterion(m));
        }
        descriptions.push(f.rationale.clone());
    }
    push_unique(&mut criteria, MessageTemplates::alert_escalation(category).to_string());

    Some(build(
        category,
        alert_severity,
        MessageTemplates::alert_title(category, matching.len()),
        descriptions.join(" "),
        affected,
        actions,
        criteria,
    ))
}

fn contraindication_alert(findings: &SafetyFindings) -> Option<Alert> {
    let matching: Vec<_> = findings
        .contraindications
        .findings
        .iter()
        .filter(|f| f.severity == ContraindicationSeverity::Absolute)
        .collect();
    if matching.is_empty() {
        return None;
    }
    let category = AlertCategory::ContraindicationAbsolute;

    let mut affected = Vec::new();
    let mut actions = Vec::new();
    let mut descriptions = Vec::new();
    for f in &matching {
        push_unique(&mut affected, f.normalized.clone());
        push_unique(&mut actions, MessageTemplates::withhold(&f.normalized, &f.trigger.label()));
        if !f.alternatives.is_empty() {
            push_unique(&mut actions, MessageTemplates::consider_alternatives(&f.alternatives));
        }
        descriptions.push(f.rationale.clone());
    }

    Some(build(
        category,
        AlertSeverity::Urgent,
        MessageTemplates::alert_title(category, matching.len()),
        descriptions.join(" "),
        affected,
        actions,
        vec![MessageTemplates::alert_escalation(category).to_string()],
    ))
}

fn dosage_alert(findings: &SafetyFindings) -> Option<Alert> {
    let matching: Vec<_> = findings
        .dosage_violations
        .findings
        .iter()
        .filter(|f| f.severity == DosageSeverity::Critical)
        .collect();
    if matching.is_empty() {
        return None;
    }
    let category = AlertCategory::DosageCritical;

    let mut affected = Vec::new();
    let mut actions = Vec::new();
    let mut descriptions = Vec::new();
    for f in &matching {
        push_unique(&mut affected, f.normalized.clone());
        actions.push(MessageTemplates::adjust_dose(
            &f.normalized,
            &format_quantity(f.target_dose),
            &format_quantity(f.target_daily_dose),
            &f.unit,
        ));
        descriptions.push(f.rationale.clone());
    }

    Some(build(
        category,
        AlertSeverity::Urgent,
        MessageTemplates::alert_title(category, matching.len()),
        descriptions.join(" "),
        affected,
        actions,
        vec![MessageTemplates::alert_escalation(category).to_string()],
    ))
}

fn overall_alert(score: &RiskScore) -> Option<Alert> {
    let severity = match score.risk_level {
        RiskLevel::Critical => AlertSeverity::Urgent,
        RiskLevel::High => AlertSeverity::Alert,
        _ => return None,
    };
    let category = AlertCategory::OverallRisk;
    let affected = score
        .components
        .iter()
        .filter(|(_, s)| **s > super::scoring::RECOMMENDATION_THRESHOLD)
        .map(|(c, _)| c.to_string())
        .collect();

    Some(build(
        category,
        severity,
        MessageTemplates::alert_title(category, 1),
        MessageTemplates::overall_description(score.risk_level, score.overall_score),
        affected,
        score.recommendations.clone(),
        score.escalation_triggers.clone(),
    ))
}

fn build(
    category: AlertCategory,
    severity: AlertSeverity,
    title: String,
    description: String,
    affected: Vec<String>,
    required_actions: Vec<String>,
    escalation_criteria: Vec<String>,
) -> Alert {
    Alert {
        id: alert_id(category, &affected),
        severity,
        category,
        title,
        description,
        affected,
        required_actions,
        timeline: severity.timeline().to_string(),
        escalation_criteria,
    }
}

/// Same category and subjects always give the same id.
fn alert_id(category: AlertCategory, affected: &[String]) -> Uuid {
    let name = std::iter::once(category.as_str())
        .chain(affected.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join("|");
    Uuid::new_v5(&ALERT_NAMESPACE, name.as_bytes())
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}
