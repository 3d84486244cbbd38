//! Clinical safety engine.
//!
//! A record flows one way: normalization and patient context, then the three
//! independent checkers (interactions, contraindications, dosage), then the
//! risk scorer and alert generator. The recommendation engine reads the record
//! on its own and is never scored. `DefaultSafetyEngine` runs the whole chain,
//! falls back to a degraded assessment on internal failure and keeps a bounded
//! audit log.

pub mod alerts;
pub mod audit;
pub mod context;
pub mod contraindications;
pub mod dosage;
pub mod engine;
pub mod helpers;
pub mod interactions;
pub mod messages;
pub mod normalize;
pub mod recommendations;
pub mod reference;
pub mod scoring;
pub mod types;

pub use alerts::AlertGenerator;
pub use audit::{AuditEntry, AuditLog};
pub use context::{EvaluationContext, PatientContext};
pub use contraindications::ContraindicationChecker;
pub use dosage::DosageSafetyValidator;
pub use engine::DefaultSafetyEngine;
pub use interactions::DrugInteractionChecker;
pub use normalize::Normalizer;
pub use recommendations::ClinicalRecommendationEngine;
pub use reference::SafetyReferenceData;
pub use scoring::{RiskScorer, ScoringPolicy};
pub use types::{
    Alert, ClinicalRecommendation, ContraindicationFinding, DosageFinding, FeatureSelection,
    InteractionFinding, LegacyView, RiskScore, SafetyAssessment, SafetyAssessor, SafetyError,
    SafetyFindings, SummaryEnhancer,
};
