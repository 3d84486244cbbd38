use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// Canonical unordered pair
// ---------------------------------------------------------------------------

/// Unordered pair of names, stored sorted so (a, b) and (b, a) are one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(String, String);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }

    pub fn first(&self) -> &str {
        &self.0
    }

    pub fn second(&self) -> &str {
        &self.1
    }
}

// ---------------------------------------------------------------------------
// Doses and units
// ---------------------------------------------------------------------------

/// A dose amount with its canonical unit ("mg", "mcg", "g", "unit", "ml", "meq").
#[derive(Debug, Clone, PartialEq)]
pub struct Dose {
    pub value: f64,
    pub unit: &'static str,
}

/// Regex for a dose embedded in free text (compiled once via LazyLock).
static RE_DOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d+(?:\.\d+)?)\s*(milligrams?|micrograms?|grams?|mcg|µg|ug|mg|gm|g|units?|iu|meq|ml)\b",
    )
    .unwrap()
});

/// Map a free-text unit to its canonical spelling.
pub fn canonical_unit(unit: &str) -> Option<&'static str> {
    match unit.trim().to_lowercase().as_str() {
        "mg" | "milligram" | "milligrams" => Some("mg"),
        "mcg" | "µg" | "ug" | "microgram" | "micrograms" => Some("mcg"),
        "g" | "gm" | "gram" | "grams" => Some("g"),
        "unit" | "units" | "iu" | "u" => Some("unit"),
        "ml" | "millilitre" | "milliliter" => Some("ml"),
        "meq" => Some("meq"),
        _ => None,
    }
}

fn milligrams_per(unit: &str) -> Option<f64> {
    match unit {
        "g" => Some(1000.0),
        "mg" => Some(1.0),
        "mcg" => Some(0.001),
        _ => None,
    }
}

/// Convert `value` between units. Mass units convert through milligrams;
/// any other pair converts only to itself.
pub fn convert_dose(value: f64, from: &str, to: &str) -> Option<f64> {
    let from = canonical_unit(from)?;
    let to = canonical_unit(to)?;
    if from == to {
        return Some(value);
    }
    let from_mg = milligrams_per(from)?;
    let to_mg = milligrams_per(to)?;
    Some(value * from_mg / to_mg)
}

/// First dose mentioned in free text ("Warfarin 5mg daily" -> 5 mg).
pub fn parse_dose(text: &str) -> Option<Dose> {
    let lower = text.to_lowercase();
    let caps = RE_DOSE.captures(&lower)?;
    let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let unit = canonical_unit(caps.get(2)?.as_str())?;
    Some(Dose { value, unit })
}

// ---------------------------------------------------------------------------
// Frequency
// ---------------------------------------------------------------------------

static RE_EVERY_HOURS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:every|q)\s*(\d+(?:\.\d+)?)\s*(?:-\s*\d+\s*)?(?:h|hr|hrs|hour|hours)\b")
        .unwrap()
});
static RE_EVERY_DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bevery\s+(\d+)\s*days?\b").unwrap());
static RE_EVERY_OTHER_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:every other day|alternate days|qod)\b").unwrap());
static RE_TIMES_PER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        concat!(
            r"\b(once|twice|thrice|one|two|three|four|five|six|\d+)",
            r"\s*(?:times?|x)?\s*(?:a|per|/|each|every)?\s*(day|daily|d|week|weekly|wk)\b",
        ),
    )
    .unwrap()
});

fn count_word(word: &str) -> Option<f64> {
    match word {
        "once" | "one" => Some(1.0),
        "twice" | "two" => Some(2.0),
        "thrice" | "three" => Some(3.0),
        "four" => Some(4.0),
        "five" => Some(5.0),
        "six" => Some(6.0),
        n => n.parse::<f64>().ok(),
    }
}

/// Occurrences per day described by a frequency text ("every 12 hours" -> 2,
/// "tid" -> 3, "once weekly" -> 1/7). `None` when no schedule is stated,
/// which includes bare "as needed".
pub fn doses_per_day(frequency: &str) -> Option<f64> {
    let lower = frequency.to_lowercase();

    if let Some(caps) = RE_EVERY_HOURS.captures(&lower) {
        let hours = caps.get(1)?.as_str().parse::<f64>().ok()?;
        return (hours > 0.0).then(|| 24.0 / hours);
    }
    if let Some(caps) = RE_EVERY_DAYS.captures(&lower) {
        let days = caps.get(1)?.as_str().parse::<f64>().ok()?;
        return (days > 0.0).then(|| 1.0 / days);
    }
    if RE_EVERY_OTHER_DAY.is_match(&lower) {
        return Some(0.5);
    }
    if let Some(caps) = RE_TIMES_PER.captures(&lower) {
        let count = count_word(caps.get(1)?.as_str())?;
        let per_week = matches!(caps.get(2)?.as_str(), "week" | "weekly" | "wk");
        if count > 0.0 {
            return Some(if per_week { count / 7.0 } else { count });
        }
    }

    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let has = |words: &[&str]| tokens.iter().any(|t| words.contains(t));

    if has(&["qid", "qds"]) {
        Some(4.0)
    } else if has(&["tid", "tds"]) {
        Some(3.0)
    } else if has(&["bid", "bd"]) {
        Some(2.0)
    } else if has(&["weekly"]) {
        Some(1.0 / 7.0)
    } else if has(&["hourly"]) {
        Some(24.0)
    } else if has(&[
        "daily", "qd", "od", "nightly", "qhs", "hs", "qam", "qpm", "bedtime", "mane", "nocte",
    ]) {
        Some(1.0)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// Round to two decimals for messages ("7.5", "300", "0.07").
pub fn format_quantity(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded}")
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
