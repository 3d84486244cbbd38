use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::enums::{
    AgeBand, ContraindicationSeverity, EvidenceLevel, InteractionSeverity, PregnancyCategory,
    RecommendationCategory, RecommendationPriority, RouteFamily,
};

use super::helpers::PairKey;
use super::types::SafetyError;

/// Prefix that turns a table key into a drug-class reference (`class:nsaid`).
pub const CLASS_PREFIX: &str = "class:";

// ---------------------------------------------------------------------------
// Table rows (one JSON document each under resources/)
// ---------------------------------------------------------------------------

/// Brand-to-generic medication mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationAlias {
    pub generic_name: String,
    pub brand_name: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionSynonym {
    pub synonym: String,
    pub canonical: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugClass {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRule {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: InteractionSeverity,
    pub mechanism: String,
    pub clinical_effect: String,
    pub management: String,
    #[serde(default)]
    pub monitoring: Vec<String>,
    #[serde(default)]
    pub alternatives: Vec<String>,
    pub evidence: EvidenceLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionRule {
    pub medication: String,
    pub condition: String,
    pub severity: ContraindicationSeverity,
    pub rationale: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub monitoring: Vec<String>,
    pub evidence: EvidenceLevel,
}

/// Pediatric rules name their bands; geriatric rules leave `bands` empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeRule {
    pub medication: String,
    #[serde(default)]
    pub bands: Vec<AgeBand>,
    pub severity: ContraindicationSeverity,
    pub rationale: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    pub evidence: EvidenceLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeTables {
    pub pediatric: Vec<AgeRule>,
    pub geriatric: Vec<AgeRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PregnancyRule {
    pub medication: String,
    pub category: PregnancyCategory,
    pub rationale: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LactationRule {
    pub medication: String,
    pub severity: ContraindicationSeverity,
    pub rationale: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproductiveTables {
    pub pregnancy: Vec<PregnancyRule>,
    pub lactation: Vec<LactationRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllergyClassAlias {
    pub allergen: String,
    pub class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossReactionRule {
    pub allergen_class: String,
    pub reactive_class: String,
    pub rationale: String,
    #[serde(default)]
    pub monitoring: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllergyTables {
    pub class_aliases: Vec<AllergyClassAlias>,
    pub cross_reactions: Vec<CrossReactionRule>,
}

/// Safe daily range for a medication, route family and set of age bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseRange {
    pub medication: String,
    pub route: RouteFamily,
    pub unit: String,
    pub age_bands: Vec<AgeBand>,
    pub min_daily: f64,
    pub max_daily: f64,
    /// Bounds are per kilogram of body weight per day.
    #[serde(default)]
    pub per_kg: bool,
    pub evidence: EvidenceLevel,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringRule {
    pub medication: String,
    pub requirements: Vec<String>,
    #[serde(default)]
    pub escalation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionMonitoringRule {
    pub condition: String,
    pub requirements: Vec<String>,
    #[serde(default)]
    pub escalation: Vec<String>,
}

/// Medications and conditions that need intensive monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringTables {
    pub medications: Vec<MonitoringRule>,
    pub conditions: Vec<ConditionMonitoringRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidelineRule {
    pub subject: String,
    pub category: RecommendationCategory,
    pub priority: RecommendationPriority,
    pub recommendation: String,
    pub evidence: EvidenceLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidelineTables {
    pub medications: Vec<GuidelineRule>,
    pub conditions: Vec<GuidelineRule>,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

const MEDICATION_ALIASES: &str = "medication_aliases.json";
const CONDITION_SYNONYMS: &str = "condition_synonyms.json";
const DRUG_CLASSES: &str = "drug_classes.json";
const INTERACTIONS: &str = "interactions.json";
const CONDITION_CONTRAINDICATIONS: &str = "condition_contraindications.json";
const AGE_CONTRAINDICATIONS: &str = "age_contraindications.json";
const PREGNANCY_LACTATION: &str = "pregnancy_lactation.json";
const ALLERGY_CROSS_REACTIONS: &str = "allergy_cross_reactions.json";
const DOSE_RANGES: &str = "dose_ranges.json";
const MONITORING: &str = "monitoring.json";
const GUIDELINES: &str = "guidelines.json";

/// File names of every reference table, in load order.
pub const REFERENCE_FILES: [&str; 11] = [
    MEDICATION_ALIASES,
    CONDITION_SYNONYMS,
    DRUG_CLASSES,
    INTERACTIONS,
    CONDITION_CONTRAINDICATIONS,
    AGE_CONTRAINDICATIONS,
    PREGNANCY_LACTATION,
    ALLERGY_CROSS_REACTIONS,
    DOSE_RANGES,
    MONITORING,
    GUIDELINES,
];

fn bundled_source(file: &str) -> &'static str {
    match file {
        MEDICATION_ALIASES => include_str!("../../resources/medication_aliases.json"),
        CONDITION_SYNONYMS => include_str!("../../resources/condition_synonyms.json"),
        DRUG_CLASSES => include_str!("../../resources/drug_classes.json"),
        INTERACTIONS => include_str!("../../resources/interactions.json"),
        CONDITION_CONTRAINDICATIONS => {
            include_str!("../../resources/condition_contraindications.json")
        }
        AGE_CONTRAINDICATIONS => include_str!("../../resources/age_contraindications.json"),
        PREGNANCY_LACTATION => include_str!("../../resources/pregnancy_lactation.json"),
        ALLERGY_CROSS_REACTIONS => include_str!("../../resources/allergy_cross_reactions.json"),
        DOSE_RANGES => include_str!("../../resources/dose_ranges.json"),
        MONITORING => include_str!("../../resources/monitoring.json"),
        GUIDELINES => include_str!("../../resources/guidelines.json"),
        _ => "",
    }
}

fn parse<T: DeserializeOwned>(file: &str, json: &str) -> Result<T, SafetyError> {
    serde_json::from_str(json)
        .map_err(|e| SafetyError::ReferenceDataParse(file.into(), e.to_string()))
}

fn normalize_key(key: &mut String) {
    *key = key.trim().to_lowercase();
}

fn invalid(file: &str, detail: impl Into<String>) -> SafetyError {
    SafetyError::ReferenceDataInvalid(file.into(), detail.into())
}

// ---------------------------------------------------------------------------
// SafetyReferenceData
// ---------------------------------------------------------------------------

/// Immutable rule tables, parsed and validated once before any evaluation.
#[derive(Debug, Clone)]
pub struct SafetyReferenceData {
    /// Lowercased brand name -> generic name.
    aliases: HashMap<String, String>,
    /// Lowercased synonym -> canonical condition.
    condition_synonyms: HashMap<String, String>,
    classes: Vec<DrugClass>,
    /// Generic name -> class names, in table order.
    class_index: HashMap<String, Vec<String>>,
    interactions: HashMap<PairKey, InteractionRule>,
    pub condition_rules: Vec<ConditionRule>,
    pub age: AgeTables,
    pub reproductive: ReproductiveTables,
    pub allergy: AllergyTables,
    pub dose_ranges: Vec<DoseRange>,
    pub monitoring: MonitoringTables,
    pub guidelines: GuidelineTables,
}

impl SafetyReferenceData {
    /// Tables compiled into the binary.
    pub fn bundled() -> Result<Self, SafetyError> {
        Self::from_sources(|file| Ok(bundled_source(file).to_string()))
    }

    /// Load every table from `resources_dir`; all files must be present.
    pub fn load(resources_dir: &Path) -> Result<Self, SafetyError> {
        let data = Self::from_sources(|file| {
            let path = resources_dir.join(file);
            std::fs::read_to_string(&path).map_err(|e| {
                SafetyError::ReferenceDataLoad(path.display().to_string(), e.to_string())
            })
        })?;
        tracing::info!(
            interactions = data.interactions.len(),
            dose_ranges = data.dose_ranges.len(),
            "Reference data loaded from directory"
        );
        Ok(data)
    }

    fn from_sources(
        mut read: impl FnMut(&str) -> Result<String, SafetyError>,
    ) -> Result<Self, SafetyError> {
        let aliases: Vec<MedicationAlias> = parse(MEDICATION_ALIASES, &read(MEDICATION_ALIASES)?)?;
        let synonyms: Vec<ConditionSynonym> =
            parse(CONDITION_SYNONYMS, &read(CONDITION_SYNONYMS)?)?;
        let mut classes: Vec<DrugClass> = parse(DRUG_CLASSES, &read(DRUG_CLASSES)?)?;
        let mut interaction_rows: Vec<InteractionRule> =
            parse(INTERACTIONS, &read(INTERACTIONS)?)?;
        let mut condition_rules: Vec<ConditionRule> =
            parse(CONDITION_CONTRAINDICATIONS, &read(CONDITION_CONTRAINDICATIONS)?)?;
        let mut age: AgeTables = parse(AGE_CONTRAINDICATIONS, &read(AGE_CONTRAINDICATIONS)?)?;
        let mut reproductive: ReproductiveTables =
            parse(PREGNANCY_LACTATION, &read(PREGNANCY_LACTATION)?)?;
        let mut allergy: AllergyTables =
            parse(ALLERGY_CROSS_REACTIONS, &read(ALLERGY_CROSS_REACTIONS)?)?;
        let mut dose_ranges: Vec<DoseRange> = parse(DOSE_RANGES, &read(DOSE_RANGES)?)?;
        let mut monitoring: MonitoringTables = parse(MONITORING, &read(MONITORING)?)?;
        let mut guidelines: GuidelineTables = parse(GUIDELINES, &read(GUIDELINES)?)?;

        // Keys are compared against normalized (trimmed, lowercased) names.
        for class in &mut classes {
            normalize_key(&mut class.name);
            class.members.iter_mut().for_each(normalize_key);
        }
        for rule in &mut interaction_rows {
            normalize_key(&mut rule.drug_a);
            normalize_key(&mut rule.drug_b);
        }
        for rule in &mut condition_rules {
            normalize_key(&mut rule.medication);
            normalize_key(&mut rule.condition);
        }
        for rule in age.pediatric.iter_mut().chain(age.geriatric.iter_mut()) {
            normalize_key(&mut rule.medication);
        }
        for rule in &mut reproductive.pregnancy {
            normalize_key(&mut rule.medication);
        }
        for rule in &mut reproductive.lactation {
            normalize_key(&mut rule.medication);
        }
        for alias in &mut allergy.class_aliases {
            normalize_key(&mut alias.allergen);
            normalize_key(&mut alias.class);
        }
        for rule in &mut allergy.cross_reactions {
            normalize_key(&mut rule.allergen_class);
            normalize_key(&mut rule.reactive_class);
        }
        for range in &mut dose_ranges {
            normalize_key(&mut range.medication);
        }
        for rule in &mut monitoring.medications {
            normalize_key(&mut rule.medication);
        }
        for rule in &mut monitoring.conditions {
            normalize_key(&mut rule.condition);
        }
        for rule in guidelines.medications.iter_mut().chain(guidelines.conditions.iter_mut()) {
            normalize_key(&mut rule.subject);
        }

        let mut alias_map = HashMap::new();
        for alias in &aliases {
            let brand = alias.brand_name.trim().to_lowercase();
            let generic = alias.generic_name.trim().to_lowercase();
            if brand.is_empty() || generic.is_empty() {
                return Err(invalid(MEDICATION_ALIASES, "empty brand or generic name"));
            }
            alias_map.insert(brand, generic);
        }

        let mut synonym_map = HashMap::new();
        for s in &synonyms {
            let synonym = s.synonym.trim().to_lowercase();
            let canonical = s.canonical.trim().to_lowercase();
            if synonym.is_empty() || canonical.is_empty() {
                return Err(invalid(CONDITION_SYNONYMS, "empty synonym or canonical name"));
            }
            synonym_map.insert(synonym, canonical);
        }

        if let Some(chained) = synonym_map.values().find(|c| synonym_map.contains_key(*c)) {
            return Err(invalid(
                CONDITION_SYNONYMS,
                format!("canonical name {chained} is itself a synonym"),
            ));
        }

        let mut class_index: HashMap<String, Vec<String>> = HashMap::new();
        let mut class_names = HashSet::new();
        for class in &classes {
            if class.name.trim().is_empty() || class.members.is_empty() {
                return Err(invalid(DRUG_CLASSES, "class without a name or members"));
            }
            if !class_names.insert(class.name.clone()) {
                return Err(invalid(DRUG_CLASSES, format!("duplicate class {}", class.name)));
            }
            for member in &class.members {
                class_index
                    .entry(member.clone())
                    .or_default()
                    .push(class.name.clone());
            }
        }

        let check_key = |file: &str, key: &str| -> Result<(), SafetyError> {
            if key.trim().is_empty() {
                return Err(invalid(file, "empty medication key"));
            }
            if let Some(class) = key.strip_prefix(CLASS_PREFIX) {
                if !class_names.contains(class) {
                    return Err(invalid(file, format!("unknown drug class {class}")));
                }
            }
            Ok(())
        };

        let mut interactions = HashMap::new();
        for rule in interaction_rows {
            check_key(INTERACTIONS, &rule.drug_a)?;
            check_key(INTERACTIONS, &rule.drug_b)?;
            let key = PairKey::new(&rule.drug_a, &rule.drug_b);
            if interactions.contains_key(&key) {
                return Err(invalid(
                    INTERACTIONS,
                    format!("duplicate pair {} / {}", rule.drug_a, rule.drug_b),
                ));
            }
            interactions.insert(key, rule);
        }

        for rule in &condition_rules {
            check_key(CONDITION_CONTRAINDICATIONS, &rule.medication)?;
            if rule.condition.trim().is_empty() {
                return Err(invalid(CONDITION_CONTRAINDICATIONS, "empty condition"));
            }
        }
        for rule in age.pediatric.iter().chain(&age.geriatric) {
            check_key(AGE_CONTRAINDICATIONS, &rule.medication)?;
        }
        if age.pediatric.iter().any(|r| r.bands.is_empty()) {
            return Err(invalid(AGE_CONTRAINDICATIONS, "pediatric rule without age bands"));
        }
        for rule in &reproductive.pregnancy {
            check_key(PREGNANCY_LACTATION, &rule.medication)?;
        }
        for rule in &reproductive.lactation {
            check_key(PREGNANCY_LACTATION, &rule.medication)?;
        }
        for alias in &allergy.class_aliases {
            if !class_names.contains(&alias.class) {
                return Err(invalid(
                    ALLERGY_CROSS_REACTIONS,
                    format!("unknown drug class {}", alias.class),
                ));
            }
        }
        for rule in &allergy.cross_reactions {
            for class in [&rule.allergen_class, &rule.reactive_class] {
                if !class_names.contains(class) {
                    return Err(invalid(
                        ALLERGY_CROSS_REACTIONS,
                        format!("unknown drug class {class}"),
                    ));
                }
            }
        }
        for range in &dose_ranges {
            check_key(DOSE_RANGES, &range.medication)?;
            let bounds_ok = range.min_daily.is_finite()
                && range.max_daily.is_finite()
                && range.min_daily > 0.0
                && range.min_daily <= range.max_daily;
            if !bounds_ok {
                return Err(invalid(
                    DOSE_RANGES,
                    format!("bad bounds for {}", range.medication),
                ));
            }
            if range.age_bands.is_empty() || range.unit.trim().is_empty() {
                return Err(invalid(
                    DOSE_RANGES,
                    format!("missing unit or age bands for {}", range.medication),
                ));
            }
        }
        for rule in &monitoring.medications {
            check_key(MONITORING, &rule.medication)?;
        }
        for rule in &guidelines.medications {
            check_key(GUIDELINES, &rule.subject)?;
        }

        Ok(Self {
            aliases: alias_map,
            condition_synonyms: synonym_map,
            classes,
            class_index,
            interactions,
            condition_rules,
            age,
            reproductive,
            allergy,
            dose_ranges,
            monitoring,
            guidelines,
        })
    }

    /// Look up the generic name for a (lowercased) brand name.
    pub fn resolve_generic(&self, brand_name: &str) -> Option<&str> {
        self.aliases.get(brand_name).map(String::as_str)
    }

    /// Iterate every alias as (brand, generic).
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(b, g)| (b.as_str(), g.as_str()))
    }

    pub fn canonical_condition(&self, condition: &str) -> Option<&str> {
        self.condition_synonyms.get(condition).map(String::as_str)
    }

    pub fn condition_synonyms(&self) -> impl Iterator<Item = (&str, &str)> {
        self.condition_synonyms
            .iter()
            .map(|(s, c)| (s.as_str(), c.as_str()))
    }

    /// Classes a generic medication belongs to, in table order.
    pub fn classes_of(&self, generic: &str) -> &[String] {
        self.class_index
            .get(generic)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn class(&self, name: &str) -> Option<&DrugClass> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Keys a medication answers to in every table: its generic name first,
    /// then `class:<name>` for each class it belongs to.
    pub fn medication_keys(&self, generic: &str) -> Vec<String> {
        std::iter::once(generic.to_string())
            .chain(
                self.classes_of(generic)
                    .iter()
                    .map(|c| format!("{CLASS_PREFIX}{c}")),
            )
            .collect()
    }

    pub fn interaction(&self, key: &PairKey) -> Option<&InteractionRule> {
        self.interactions.get(key)
    }

    pub fn interaction_count(&self) -> usize {
        self.interactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_tables_load_and_validate() {
        let data = SafetyReferenceData::bundled().unwrap();
        assert!(data.interaction_count() > 20);
        assert!(!data.dose_ranges.is_empty());
        assert!(!data.age.pediatric.is_empty());
    }

    #[test]
    fn resolve_generic_brand() {
        let data = SafetyReferenceData::bundled().unwrap();
        assert_eq!(data.resolve_generic("coumadin"), Some("warfarin"));
        assert_eq!(data.resolve_generic("glucophage"), Some("metformin"));
        assert_eq!(data.resolve_generic("unknownbrand"), None);
    }

    #[test]
    fn interaction_key_is_order_free() {
        let data = SafetyReferenceData::bundled().unwrap();
        let ab = data.interaction(&PairKey::new("warfarin", "aspirin"));
        let ba = data.interaction(&PairKey::new("aspirin", "warfarin"));
        assert!(ab.is_some());
        assert_eq!(ab.map(|r| r.severity), ba.map(|r| r.severity));
    }

    #[test]
    fn medication_keys_list_generic_then_classes() {
        let data = SafetyReferenceData::bundled().unwrap();
        let keys = data.medication_keys("ibuprofen");
        assert_eq!(keys, vec!["ibuprofen".to_string(), "class:nsaid".to_string()]);
        assert_eq!(data.medication_keys("unknown"), vec!["unknown".to_string()]);
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        for file in REFERENCE_FILES {
            std::fs::write(dir.path().join(file), bundled_source(file)).unwrap();
        }
        let data = SafetyReferenceData::load(dir.path()).unwrap();
        assert_eq!(
            data.interaction_count(),
            SafetyReferenceData::bundled().unwrap().interaction_count()
        );
    }

    #[test]
    fn load_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SafetyReferenceData::load(dir.path()).unwrap_err();
        assert!(matches!(err, SafetyError::ReferenceDataLoad(_, _)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        for file in REFERENCE_FILES {
            std::fs::write(dir.path().join(file), bundled_source(file)).unwrap();
        }
        std::fs::write(dir.path().join(INTERACTIONS), "[{\"drug_a\": ").unwrap();
        let err = SafetyReferenceData::load(dir.path()).unwrap_err();
        assert!(matches!(err, SafetyError::ReferenceDataParse(f, _) if f == INTERACTIONS));
    }

    #[test]
    fn unknown_severity_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        for file in REFERENCE_FILES {
            std::fs::write(dir.path().join(file), bundled_source(file)).unwrap();
        }
        let bad = r#"[{"drug_a": "a", "drug_b": "b", "severity": "catastrophic",
            "mechanism": "", "clinical_effect": "", "management": "", "evidence": "limited"}]"#;
        std::fs::write(dir.path().join(INTERACTIONS), bad).unwrap();
        assert!(matches!(
            SafetyReferenceData::load(dir.path()),
            Err(SafetyError::ReferenceDataParse(_, _))
        ));
    }

    #[test]
    fn inverted_dose_bounds_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for file in REFERENCE_FILES {
            std::fs::write(dir.path().join(file), bundled_source(file)).unwrap();
        }
        let bad = r#"[{"medication": "warfarin", "route": "oral", "unit": "mg",
            "age_bands": ["adult"], "min_daily": 10.0, "max_daily": 1.0,
            "evidence": "established"}]"#;
        std::fs::write(dir.path().join(DOSE_RANGES), bad).unwrap();
        assert!(matches!(
            SafetyReferenceData::load(dir.path()),
            Err(SafetyError::ReferenceDataInvalid(f, _)) if f == DOSE_RANGES
        ));
    }

    #[test]
    fn override_keys_are_normalized_at_load() {
        let dir = tempfile::tempdir().unwrap();
        for file in REFERENCE_FILES {
            std::fs::write(dir.path().join(file), bundled_source(file)).unwrap();
        }
        let interactions = r#"[{"drug_a": " Warfarin", "drug_b": "CLASS:NSAID ",
            "severity": "major", "mechanism": "", "clinical_effect": "", "management": "",
            "evidence": "limited"}]"#;
        std::fs::write(dir.path().join(INTERACTIONS), interactions).unwrap();
        let ranges = r#"[{"medication": "Lisinopril", "route": "oral", "unit": "mg",
            "age_bands": ["adult"], "min_daily": 2.5, "max_daily": 40.0,
            "evidence": "established"}]"#;
        std::fs::write(dir.path().join(DOSE_RANGES), ranges).unwrap();

        let data = SafetyReferenceData::load(dir.path()).unwrap();
        assert!(data.interaction(&PairKey::new("class:nsaid", "warfarin")).is_some());
        assert_eq!(data.dose_ranges[0].medication, "lisinopril");
    }

    #[test]
    fn unknown_class_reference_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for file in REFERENCE_FILES {
            std::fs::write(dir.path().join(file), bundled_source(file)).unwrap();
        }
        let bad = r#"[{"drug_a": "warfarin", "drug_b": "class:imaginary", "severity": "major",
            "mechanism": "", "clinical_effect": "", "management": "", "evidence": "limited"}]"#;
        std::fs::write(dir.path().join(INTERACTIONS), bad).unwrap();
        assert!(matches!(
            SafetyReferenceData::load(dir.path()),
            Err(SafetyError::ReferenceDataInvalid(_, _))
        ));
    }
}
