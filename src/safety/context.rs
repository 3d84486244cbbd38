use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::demographics::weight_to_kg;
use crate::models::enums::{AgeBand, Sex};
use crate::models::{Allergy, ClinicalRecord, Condition, Medication};

use super::normalize::Normalizer;
use super::reference::SafetyReferenceData;

/// Phrases that state an age: "age 10", "aged 15", "72 year old", "5 y/o", "5yo".
/// A bare duration ("for 5 years") is not an age.
static RE_AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:aged?\s+(\d{1,3})",
        r"|(\d{1,3})\s*-?\s*(?:years?|yrs?|y)\s*-?\s*old",
        r"|(\d{1,3})\s*-?\s*(?:yo|y\s*/?\s*o))\b",
    ))
    .unwrap()
});

const INFANT_WORDS: &[&str] = &[
    "infant", "infants", "neonate", "neonates", "neonatal", "newborn", "newborns",
];
const ADOLESCENT_WORDS: &[&str] = &[
    "adolescent", "adolescents", "teen", "teens", "teenager", "teenagers",
];
const CHILD_WORDS: &[&str] = &["pediatric", "paediatric", "child", "children"];
const GERIATRIC_WORDS: &[&str] = &["geriatric", "elderly"];

const PREGNANCY_WORDS: &[&str] = &["pregnancy", "pregnant", "gestation", "gravid"];
const LACTATION_WORDS: &[&str] = &[
    "breastfeeding",
    "breast feeding",
    "lactation",
    "lactating",
    "nursing mother",
];
/// Words that cancel a signal when they come right before it.
const NEGATIONS: &[&str] = &["not", "no", "non", "negative", "denies", "without"];
const POSITIVE_RESULTS: &[&str] = &["positive", "pos", "yes", "detected", "true", "confirmed"];

// ---------------------------------------------------------------------------
// PatientContext
// ---------------------------------------------------------------------------

/// Patient facts derived once per evaluation for a fixed `as_of` date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientContext {
    pub as_of: NaiveDate,
    pub age_years: Option<u32>,
    pub age_band: Option<AgeBand>,
    pub sex: Sex,
    pub weight_kg: Option<f64>,
    pub pregnant: bool,
    pub breastfeeding: bool,
}

impl PatientContext {
    pub fn derive(record: &ClinicalRecord, normalizer: &Normalizer<'_>, as_of: NaiveDate) -> Self {
        let demographics = record.demographics();
        let conditions: Vec<String> = record
            .conditions()
            .map(|c| normalizer.normalize_condition(&c.name))
            .collect();

        let age_years = demographics
            .and_then(|d| d.age_on(as_of))
            .or_else(|| conditions.iter().find_map(|c| age_in_text(c)));
        let age_band = age_years
            .map(AgeBand::from_age)
            .or_else(|| conditions.iter().find_map(|c| band_keyword(c)));

        let weight_kg = demographics
            .and_then(|d| d.weight_kg())
            .or_else(|| weight_from_observations(record));

        let pregnant = conditions.iter().any(|c| signals(c, PREGNANCY_WORDS))
            || record.observations().any(|o| {
                let name = o.name.to_lowercase();
                name.contains("pregnan")
                    && o.value_text
                        .as_deref()
                        .map(|v| POSITIVE_RESULTS.contains(&v.trim().to_lowercase().as_str()))
                        .unwrap_or(false)
            });
        let breastfeeding = conditions.iter().any(|c| signals(c, LACTATION_WORDS));

        Self {
            as_of,
            age_years,
            age_band,
            sex: demographics.and_then(|d| d.sex).unwrap_or(Sex::Unknown),
            weight_kg,
            pregnant,
            breastfeeding,
        }
    }

    /// Band used to pick dose ranges; adult when age is unknown.
    pub fn dosing_band(&self) -> AgeBand {
        self.age_band.unwrap_or(AgeBand::Adult)
    }
}

/// Age in years stated in free text ("pediatric patient age 10", "72 year old").
fn age_in_text(text: &str) -> Option<u32> {
    let caps = RE_AGE.captures(text)?;
    let digits = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
    digits.as_str().parse::<u32>().ok().filter(|age| *age <= 130)
}

/// Words on letter/digit boundaries; hyphens and punctuation separate.
fn tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Band named by a whole word ("child", not "childbirth").
fn band_keyword(text: &str) -> Option<AgeBand> {
    let words = tokens(text);
    let has = |keywords: &[&str]| words.iter().any(|w| keywords.contains(w));
    if has(INFANT_WORDS) {
        Some(AgeBand::Infant)
    } else if has(ADOLESCENT_WORDS) {
        Some(AgeBand::Adolescent)
    } else if has(CHILD_WORDS) {
        Some(AgeBand::Child)
    } else if has(GERIATRIC_WORDS) {
        Some(AgeBand::Geriatric)
    } else {
        None
    }
}

/// True when any phrase occurs as whole words without a negation right
/// before it. "Pregnancy, no complications" signals; "not pregnant" does not.
fn signals(condition: &str, phrases: &[&str]) -> bool {
    let words = tokens(condition);
    phrases.iter().any(|phrase| {
        let phrase: Vec<&str> = phrase.split_whitespace().collect();
        words
            .windows(phrase.len())
            .enumerate()
            .any(|(i, window)| {
                window == phrase.as_slice() && !(i > 0 && NEGATIONS.contains(&words[i - 1]))
            })
    })
}

fn weight_from_observations(record: &ClinicalRecord) -> Option<f64> {
    record
        .observations()
        .filter(|o| {
            let name = o.name.to_lowercase();
            name.contains("weight") && !name.contains("birth")
        })
        .find_map(|o| {
            let value = o.value.filter(|v| v.is_finite() && *v > 0.0)?;
            weight_to_kg(value, o.unit.as_deref())
        })
}

// ---------------------------------------------------------------------------
// Prepared record
// ---------------------------------------------------------------------------

/// A medication with its normalized name and table keys.
#[derive(Debug, Clone)]
pub struct PreparedMedication<'r> {
    pub entry: &'r Medication,
    pub normalized: String,
    /// Generic name first, then `class:<name>` keys.
    pub keys: Vec<String>,
}

impl PreparedMedication<'_> {
    pub fn answers_to(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

#[derive(Debug, Clone)]
pub struct PreparedCondition<'r> {
    pub entry: &'r Condition,
    pub normalized: String,
}

#[derive(Debug, Clone)]
pub struct PreparedAllergy<'r> {
    pub entry: &'r Allergy,
    pub normalized: String,
}

/// Everything a checker reads for one evaluation. Entries whose name
/// normalizes to nothing are dropped here, so no checker sees them.
#[derive(Debug, Clone)]
pub struct EvaluationContext<'r> {
    pub patient: PatientContext,
    pub medications: Vec<PreparedMedication<'r>>,
    pub conditions: Vec<PreparedCondition<'r>>,
    pub allergies: Vec<PreparedAllergy<'r>>,
}

impl<'r> EvaluationContext<'r> {
    pub fn prepare(
        record: &'r ClinicalRecord,
        reference: &SafetyReferenceData,
        as_of: NaiveDate,
    ) -> Self {
        let normalizer = Normalizer::new(reference);
        let patient = PatientContext::derive(record, &normalizer, as_of);

        let mut skipped = 0usize;
        let medications = record
            .medications()
            .filter_map(|entry| {
                let normalized = normalizer.normalize_medication(&entry.name);
                if normalized.is_empty() {
                    skipped += 1;
                    tracing::debug!(
                        entry_id = %entry.id,
                        "Medication without a usable name, skipped"
                    );
                    return None;
                }
                let keys = reference.medication_keys(&normalized);
                Some(PreparedMedication { entry, normalized, keys })
            })
            .collect();
        let conditions = record
            .conditions()
            .filter_map(|entry| {
                let normalized = normalizer.normalize_condition(&entry.name);
                (!normalized.is_empty()).then_some(PreparedCondition { entry, normalized })
            })
            .collect();
        let allergies = record
            .allergies()
            .filter_map(|entry| {
                let normalized = normalizer.normalize_allergy(&entry.name);
                (!normalized.is_empty()).then_some(PreparedAllergy { entry, normalized })
            })
            .collect();

        if skipped > 0 {
            tracing::debug!(skipped, "Malformed medication entries excluded");
        }

        Self {
            patient,
            medications,
            conditions,
            allergies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Demographics, Observation};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn derive(record: &ClinicalRecord) -> PatientContext {
        let data = SafetyReferenceData::bundled().unwrap();
        let normalizer = Normalizer::new(&data);
        PatientContext::derive(record, &normalizer, as_of())
    }

    #[test]
    fn age_from_birth_date() {
        let record = ClinicalRecord::new().with(
            Demographics::new().with_birth_date(NaiveDate::from_ymd_opt(1950, 7, 1).unwrap()),
        );
        let ctx = derive(&record);
        assert_eq!(ctx.age_years, Some(74));
        assert_eq!(ctx.age_band, Some(AgeBand::Geriatric));
    }

    #[test]
    fn age_from_condition_text() {
        let record = ClinicalRecord::new().with(Condition::new("Pediatric patient age 10"));
        let ctx = derive(&record);
        assert_eq!(ctx.age_years, Some(10));
        assert_eq!(ctx.age_band, Some(AgeBand::Child));
    }

    #[test]
    fn age_phrase_years_old() {
        assert_eq!(age_in_text("72 year old male"), Some(72));
        assert_eq!(age_in_text("aged 15"), Some(15));
        assert_eq!(age_in_text("type 2 diabetes"), None);
    }

    #[test]
    fn age_phrase_variants() {
        assert_eq!(age_in_text("72-year-old"), Some(72));
        assert_eq!(age_in_text("5 y o boy"), Some(5));
        assert_eq!(age_in_text("5yo"), Some(5));
        assert_eq!(age_in_text("10 yrs old"), Some(10));

        let record = ClinicalRecord::new().with(Condition::new("Fever, 4 y/o"));
        assert_eq!(derive(&record).age_years, Some(4));
    }

    #[test]
    fn duration_is_not_an_age() {
        assert_eq!(age_in_text("hypertension for 5 years"), None);
        assert_eq!(age_in_text("diabetes 10 yrs"), None);
        assert_eq!(age_in_text("stage 3 chronic kidney disease"), None);

        let record = ClinicalRecord::new()
            .with(Condition::new("Hypertension for 5 years"))
            .with(Condition::new("diabetes 10 yrs"));
        let ctx = derive(&record);
        assert_eq!(ctx.age_years, None);
        assert_eq!(ctx.age_band, None);
    }

    #[test]
    fn band_keywords_match_whole_words() {
        for text in [
            "Postpartum after childbirth",
            "Childhood asthma",
            "Teenage acne scarring",
            "Newbornscreening clinic",
        ] {
            let record = ClinicalRecord::new().with(Condition::new(text));
            assert_eq!(derive(&record).age_band, None, "{text}");
        }
        assert_eq!(band_keyword("child with otitis media"), Some(AgeBand::Child));
        assert_eq!(band_keyword("frail elderly"), Some(AgeBand::Geriatric));
        assert_eq!(band_keyword("neonatal jaundice"), Some(AgeBand::Infant));
    }

    #[test]
    fn bare_pediatric_keyword_implies_child() {
        let record = ClinicalRecord::new().with(Condition::new("Pediatric patient"));
        let ctx = derive(&record);
        assert_eq!(ctx.age_years, None);
        assert_eq!(ctx.age_band, Some(AgeBand::Child));
    }

    #[test]
    fn missing_demographics_degrades_gracefully() {
        let ctx = derive(&ClinicalRecord::new());
        assert_eq!(ctx.age_band, None);
        assert_eq!(ctx.weight_kg, None);
        assert_eq!(ctx.sex, Sex::Unknown);
        assert_eq!(ctx.dosing_band(), AgeBand::Adult);
        assert!(!ctx.pregnant && !ctx.breastfeeding);
    }

    #[test]
    fn weight_in_pounds_is_converted() {
        let record = ClinicalRecord::new().with(Demographics::new().with_weight(100.0, "lb"));
        let ctx = derive(&record);
        let kg = ctx.weight_kg.unwrap();
        assert!((kg - 45.359_237).abs() < 1e-6);
    }

    #[test]
    fn weight_from_observation() {
        let record =
            ClinicalRecord::new().with(Observation::numeric("Body weight", 20.0, "kg"));
        assert_eq!(derive(&record).weight_kg, Some(20.0));
    }

    #[test]
    fn pregnancy_from_condition_or_observation() {
        let by_condition = ClinicalRecord::new().with(Condition::new("Pregnant"));
        assert!(derive(&by_condition).pregnant);

        let by_test = ClinicalRecord::new().with(Observation::text("Pregnancy test", "Positive"));
        assert!(derive(&by_test).pregnant);

        let negative = ClinicalRecord::new().with(Observation::text("Pregnancy test", "negative"));
        assert!(!derive(&negative).pregnant);

        let negated = ClinicalRecord::new().with(Condition::new("Not pregnant"));
        assert!(!derive(&negated).pregnant);
    }

    #[test]
    fn negation_elsewhere_does_not_cancel_pregnancy() {
        for text in [
            "Pregnancy, no complications",
            "Pregnant, not diabetic",
            "Gravid; denies pain",
        ] {
            let record = ClinicalRecord::new().with(Condition::new(text));
            assert!(derive(&record).pregnant, "{text}");
        }
        for text in ["Denies pregnancy", "Non-pregnant", "No pregnancy"] {
            let record = ClinicalRecord::new().with(Condition::new(text));
            assert!(!derive(&record).pregnant, "{text}");
        }
    }

    #[test]
    fn lactation_from_condition() {
        let record = ClinicalRecord::new().with(Condition::new("Breast-feeding"));
        assert!(derive(&record).breastfeeding);

        let spaced = ClinicalRecord::new().with(Condition::new("Breast feeding, no issues"));
        assert!(derive(&spaced).breastfeeding);

        let negated = ClinicalRecord::new().with(Condition::new("Not breastfeeding"));
        assert!(!derive(&negated).breastfeeding);
    }

    #[test]
    fn prepare_drops_unusable_entries() {
        let data = SafetyReferenceData::bundled().unwrap();
        let record = ClinicalRecord::new()
            .with(Medication::new("Coumadin 5mg"))
            .with(Medication::new("   "))
            .with(Condition::new(""))
            .with(Allergy::new("Penicillin"));
        let ctx = EvaluationContext::prepare(&record, &data, as_of());
        assert_eq!(ctx.medications.len(), 1);
        assert_eq!(ctx.medications[0].normalized, "warfarin");
        assert!(ctx.conditions.is_empty());
        assert_eq!(ctx.allergies[0].normalized, "penicillin");
    }

    #[test]
    fn prepared_medication_answers_to_class_keys() {
        let data = SafetyReferenceData::bundled().unwrap();
        let record = ClinicalRecord::new().with(Medication::new("Advil 200mg"));
        let ctx = EvaluationContext::prepare(&record, &data, as_of());
        assert!(ctx.medications[0].answers_to("ibuprofen"));
        assert!(ctx.medications[0].answers_to("class:nsaid"));
        assert!(!ctx.medications[0].answers_to("class:ssri"));
    }
}
