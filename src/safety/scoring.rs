use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::enums::{
    AgeBand, ContraindicationSeverity, DosageSeverity, InteractionSeverity, RiskComponent,
    RiskLevel, TieredSeverity,
};

use super::context::EvaluationContext;
use super::messages::MessageTemplates;
use super::reference::SafetyReferenceData;
use super::types::{RiskScore, SafetyError, SafetyFindings, SeverityCounts};

/// Component scores above this produce a recommendation sentence.
pub const RECOMMENDATION_THRESHOLD: f64 = 10.0;

// ---------------------------------------------------------------------------
// ScoringPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentWeights {
    pub drug_interactions: f64,
    pub contraindications: f64,
    pub dosage_concerns: f64,
    pub patient_complexity: f64,
    pub monitoring_requirements: f64,
    pub medication_burden: f64,
}

impl ComponentWeights {
    pub fn get(&self, component: RiskComponent) -> f64 {
        match component {
            RiskComponent::DrugInteractions => self.drug_interactions,
            RiskComponent::Contraindications => self.contraindications,
            RiskComponent::DosageConcerns => self.dosage_concerns,
            RiskComponent::PatientComplexity => self.patient_complexity,
            RiskComponent::MonitoringRequirements => self.monitoring_requirements,
            RiskComponent::MedicationBurden => self.medication_burden,
        }
    }

    pub fn sum(&self) -> f64 {
        RiskComponent::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

/// Points per finding for the four tiers of a checker's scale, top tier first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierPoints {
    pub top: f64,
    pub high: f64,
    pub moderate: f64,
    pub low: f64,
}

impl TierPoints {
    fn values(&self) -> [f64; 4] {
        [self.top, self.high, self.moderate, self.low]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgePoints {
    pub infant: f64,
    pub child: f64,
    pub adolescent: f64,
    pub adult: f64,
    pub geriatric: f64,
}

impl AgePoints {
    pub fn get(&self, band: AgeBand) -> f64 {
        match band {
            AgeBand::Infant => self.infant,
            AgeBand::Child => self.child,
            AgeBand::Adolescent => self.adolescent,
            AgeBand::Adult => self.adult,
            AgeBand::Geriatric => self.geriatric,
        }
    }
}

/// One step of the medication-burden function: `score` from `min_count`
/// medications upward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurdenStep {
    pub min_count: usize,
    pub score: f64,
}

/// Hand-tuned weights and points behind the risk score. These carry no
/// clinical validation and can be overridden per engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub weights: ComponentWeights,
    pub interaction_points: TierPoints,
    pub contraindication_points: TierPoints,
    pub dosage_points: TierPoints,
    /// Upper bound of every component score.
    pub component_cap: f64,
    pub age_points: AgePoints,
    pub points_per_condition: f64,
    pub condition_points_cap: f64,
    pub points_per_monitored_item: f64,
    /// Ascending by `min_count`; below the first step the burden is zero.
    pub burden_steps: Vec<BurdenStep>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: ComponentWeights {
                drug_interactions: 0.25,
                contraindications: 0.22,
                dosage_concerns: 0.20,
                patient_complexity: 0.15,
                monitoring_requirements: 0.10,
                medication_burden: 0.08,
            },
            interaction_points: TierPoints { top: 40.0, high: 25.0, moderate: 10.0, low: 3.0 },
            contraindication_points: TierPoints { top: 40.0, high: 20.0, moderate: 8.0, low: 3.0 },
            dosage_points: TierPoints { top: 40.0, high: 25.0, moderate: 12.0, low: 5.0 },
            component_cap: 100.0,
            age_points: AgePoints {
                infant: 25.0,
                child: 15.0,
                adolescent: 10.0,
                adult: 0.0,
                geriatric: 25.0,
            },
            points_per_condition: 10.0,
            condition_points_cap: 60.0,
            points_per_monitored_item: 15.0,
            burden_steps: vec![
                BurdenStep { min_count: 4, score: 8.0 },
                BurdenStep { min_count: 6, score: 15.0 },
                BurdenStep { min_count: 10, score: 20.0 },
            ],
        }
    }
}

impl ScoringPolicy {
    /// Reject non-finite or negative values and a zero weight sum.
    pub fn validate(&self) -> Result<(), SafetyError> {
        for component in RiskComponent::ALL {
            let w = self.weights.get(*component);
            if !w.is_finite() || w < 0.0 {
                return Err(SafetyError::InvalidPolicy(format!("weight for {component} is {w}")));
            }
        }
        if self.weights.sum() <= 0.0 {
            return Err(SafetyError::InvalidPolicy("component weights sum to zero".into()));
        }

        let mut values: Vec<(&str, f64)> = vec![
            ("component cap", self.component_cap),
            ("points per condition", self.points_per_condition),
            ("condition points cap", self.condition_points_cap),
            ("points per monitored item", self.points_per_monitored_item),
        ];
        for (name, points) in [
            ("interaction points", self.interaction_points),
            ("contraindication points", self.contraindication_points),
            ("dosage points", self.dosage_points),
        ] {
            values.extend(points.values().into_iter().map(|v| (name, v)));
        }
        values.extend(AgeBand::ALL.iter().map(|b| ("age points", self.age_points.get(*b))));
        values.extend(self.burden_steps.iter().map(|s| ("burden step", s.score)));

        if let Some((name, v)) = values.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(SafetyError::InvalidPolicy(format!("{name} is {v}")));
        }
        if self.burden_steps.windows(2).any(|w| w[0].min_count >= w[1].min_count) {
            return Err(SafetyError::InvalidPolicy("burden steps not ascending".into()));
        }
        Ok(())
    }

    /// Step function of the medication count.
    pub fn burden(&self, medication_count: usize) -> f64 {
        self.burden_steps
            .iter()
            .rev()
            .find(|s| medication_count >= s.min_count)
            .map(|s| s.score)
            .unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// RiskScorer
// ---------------------------------------------------------------------------

/// Folds checker output and patient factors into one weighted score.
pub struct RiskScorer<'a> {
    reference: &'a SafetyReferenceData,
    policy: &'a ScoringPolicy,
}

impl<'a> RiskScorer<'a> {
    pub fn new(reference: &'a SafetyReferenceData, policy: &'a ScoringPolicy) -> Self {
        Self { reference, policy }
    }

    pub fn score(
        &self,
        ctx: &EvaluationContext<'_>,
        findings: &SafetyFindings,
    ) -> Result<RiskScore, SafetyError> {
        self.policy.validate()?;

        let components = self.components(ctx, findings);
        let weight_sum = self.policy.weights.sum();
        let weighted: f64 = components
            .iter()
            .map(|(c, score)| self.policy.weights.get(*c) * score)
            .sum();
        let overall = weighted / weight_sum;
        if !overall.is_finite() {
            return Err(SafetyError::NonFiniteScore("overall".into()));
        }
        let overall_score = overall.clamp(0.0, 100.0);
        let risk_level = RiskLevel::from_score(overall_score);

        let score = RiskScore {
            overall_score,
            risk_level,
            recommendations: recommendations(&components, risk_level),
            monitoring_requirements: self.monitoring_requirements(ctx, findings, &components),
            escalation_triggers: self.escalation_triggers(ctx, findings, risk_level),
            components,
        };
        tracing::debug!(
            score = score.overall_score,
            level = %score.risk_level,
            triggers = score.escalation_triggers.len(),
            "Risk score computed"
        );
        Ok(score)
    }

    pub fn components(
        &self,
        ctx: &EvaluationContext<'_>,
        findings: &SafetyFindings,
    ) -> BTreeMap<RiskComponent, f64> {
        let p = self.policy;
        let cap = p.component_cap;

        let interactions = tier_score(&findings.interactions.counts, cap, |s| {
            let t = p.interaction_points;
            match s {
                InteractionSeverity::Contraindicated => t.top,
                InteractionSeverity::Major => t.high,
                InteractionSeverity::Moderate => t.moderate,
                InteractionSeverity::Minor => t.low,
            }
        });
        let contraindications = tier_score(&findings.contraindications.counts, cap, |s| {
            let t = p.contraindication_points;
            match s {
                ContraindicationSeverity::Absolute => t.top,
                ContraindicationSeverity::Relative => t.high,
                ContraindicationSeverity::Caution => t.moderate,
                ContraindicationSeverity::Warning => t.low,
            }
        });
        let dosage = tier_score(&findings.dosage_violations.counts, cap, |s| {
            let t = p.dosage_points;
            match s {
                DosageSeverity::Critical => t.top,
                DosageSeverity::High => t.high,
                DosageSeverity::Moderate => t.moderate,
                DosageSeverity::Low => t.low,
            }
        });

        let age = ctx.patient.age_band.map(|b| p.age_points.get(b)).unwrap_or(0.0);
        let comorbidity =
            (ctx.conditions.len() as f64 * p.points_per_condition).min(p.condition_points_cap);
        let complexity = (age + comorbidity).min(cap);

        let monitoring =
            (self.monitored_items(ctx) as f64 * p.points_per_monitored_item).min(cap);
        let burden = p.burden(ctx.medications.len()).min(cap);

        BTreeMap::from([
            (RiskComponent::DrugInteractions, interactions),
            (RiskComponent::Contraindications, contraindications),
            (RiskComponent::DosageConcerns, dosage),
            (RiskComponent::PatientComplexity, complexity),
            (RiskComponent::MonitoringRequirements, monitoring),
            (RiskComponent::MedicationBurden, burden),
        ])
    }

    /// Medications and conditions listed in the intensive-monitoring tables.
    fn monitored_items(&self, ctx: &EvaluationContext<'_>) -> usize {
        let tables = &self.reference.monitoring;
        let meds = ctx
            .medications
            .iter()
            .filter(|m| tables.medications.iter().any(|r| m.answers_to(&r.medication)))
            .count();
        let conditions = ctx
            .conditions
            .iter()
            .filter(|c| tables.conditions.iter().any(|r| c.normalized.contains(&r.condition)))
            .count();
        meds + conditions
    }

    fn monitoring_requirements(
        &self,
        ctx: &EvaluationContext<'_>,
        findings: &SafetyFindings,
        components: &BTreeMap<RiskComponent, f64>,
    ) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for f in &findings.interactions.findings {
            out.extend(f.monitoring.iter().cloned());
        }
        for f in &findings.contraindications.findings {
            out.extend(f.monitoring.iter().cloned());
        }
        for f in &findings.dosage_violations.findings {
            out.extend(f.monitoring.iter().cloned());
        }

        let tables = &self.reference.monitoring;
        for med in &ctx.medications {
            for rule in tables.medications.iter().filter(|r| med.answers_to(&r.medication)) {
                out.extend(rule.requirements.iter().cloned());
            }
        }
        for condition in &ctx.conditions {
            let matching = tables
                .conditions
                .iter()
                .filter(|r| condition.normalized.contains(&r.condition));
            for rule in matching {
                out.extend(rule.requirements.iter().cloned());
            }
        }

        for (component, score) in components {
            if *score > RECOMMENDATION_THRESHOLD {
                out.insert(MessageTemplates::component_monitoring(*component).to_string());
            }
        }
        out
    }

    /// One trigger per top-tier finding, then table escalations, then the
    /// level trigger. Duplicates are dropped, first occurrence kept.
    fn escalation_triggers(
        &self,
        ctx: &EvaluationContext<'_>,
        findings: &SafetyFindings,
        level: RiskLevel,
    ) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |text: String| {
            if !out.contains(&text) {
                out.push(text);
            }
        };

        for f in findings.interactions.findings.iter().filter(|f| f.severity.is_top_tier()) {
            push(MessageTemplates::escalate_interaction(&f.normalized[0], &f.normalized[1]));
        }
        for f in findings.contraindications.findings.iter().filter(|f| f.severity.is_top_tier()) {
            push(MessageTemplates::escalate_contraindication(&f.normalized, &f.trigger.label()));
        }
        for f in findings.dosage_violations.findings.iter().filter(|f| f.severity.is_top_tier()) {
            push(MessageTemplates::escalate_dosage(&f.normalized));
        }

        let tables = &self.reference.monitoring;
        for med in &ctx.medications {
            for rule in tables.medications.iter().filter(|r| med.answers_to(&r.medication)) {
                rule.escalation.iter().cloned().for_each(&mut push);
            }
        }
        for condition in &ctx.conditions {
            let matching = tables
                .conditions
                .iter()
                .filter(|r| condition.normalized.contains(&r.condition));
            for rule in matching {
                rule.escalation.iter().cloned().for_each(&mut push);
            }
        }

        if let Some(text) = MessageTemplates::level_escalation(level) {
            push(text.to_string());
        }
        out
    }
}

fn tier_score<S: TieredSeverity>(
    counts: &SeverityCounts<S>,
    cap: f64,
    points: impl Fn(S) -> f64,
) -> f64 {
    counts
        .iter()
        .map(|(s, n)| points(s) * n as f64)
        .sum::<f64>()
        .min(cap)
}

/// Level sentence for high/critical, then one sentence per component above
/// the threshold, highest component first (ties in component order).
fn recommendations(components: &BTreeMap<RiskComponent, f64>, level: RiskLevel) -> Vec<String> {
    let mut ranked: Vec<(RiskComponent, f64)> =
        components.iter().map(|(c, s)| (*c, *s)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut out = Vec::new();
    if let Some(sentence) = MessageTemplates::level_recommendation(level) {
        out.push(sentence.to_string());
    }
    out.extend(
        ranked
            .into_iter()
            .filter(|(_, score)| *score > RECOMMENDATION_THRESHOLD)
            .map(|(component, _)| {
                MessageTemplates::component_recommendation(component).to_string()
            }),
    );
    out
}
