use super::helpers::collapse_whitespace;
use super::reference::SafetyReferenceData;

/// Dosage-form, route, unit and schedule words dropped from medication names.
const NOISE_TOKENS: &[&str] = &[
    // forms
    "tablet", "tablets", "tab", "tabs", "capsule", "capsules", "cap", "caps", "pill", "pills",
    "solution", "suspension", "syrup", "elixir", "liquid", "injection", "injectable", "inj",
    "cream", "ointment", "gel", "patch", "patches", "drops", "spray", "inhaler", "suppository",
    "lozenge", "powder", "chewable", "film", "coated", "enteric",
    // release modifiers
    "extended", "delayed", "release", "er", "xr", "sr", "xl", "cr", "dr", "ec", "la", "odt", "ir",
    // routes
    "oral", "iv", "im", "po", "sc", "subq", "topical",
    // units
    "mg", "mcg", "g", "gm", "ml", "unit", "units", "iu", "meq",
    // schedule
    "daily", "once", "twice", "bid", "tid", "qid", "qd", "od", "prn", "qhs", "hs", "weekly",
    "every", "hour", "hours", "morning", "night", "nightly", "bedtime", "as", "needed", "take",
    "by", "mouth", "times", "day", "per", "x",
];

/// Salt suffixes dropped unless they lead the name ("warfarin sodium" -> "warfarin",
/// "sodium bicarbonate" unchanged).
const SALT_TOKENS: &[&str] = &[
    "succinate", "tartrate", "hydrochloride", "hcl", "besylate", "maleate", "mesylate",
    "fumarate", "sodium", "potassium", "calcium",
];

/// Canonicalizes free-text medication, condition and allergy names.
/// Every function is total (empty input yields an empty string) and idempotent.
pub struct Normalizer<'a> {
    reference: &'a SafetyReferenceData,
}

impl<'a> Normalizer<'a> {
    pub fn new(reference: &'a SafetyReferenceData) -> Self {
        Self { reference }
    }

    /// Lowercase generic name with dose, form and schedule tokens removed and
    /// brand names mapped to their generic.
    pub fn normalize_medication(&self, name: &str) -> String {
        let cleaned = clean(name);
        let mut kept: Vec<&str> = Vec::new();
        for token in cleaned.split_whitespace() {
            let token = token.trim_matches('-');
            if token.is_empty()
                || !token.chars().any(char::is_alphanumeric)
                || token.starts_with(|c: char| c.is_ascii_digit())
                || NOISE_TOKENS.contains(&token)
            {
                continue;
            }
            if !kept.is_empty() && SALT_TOKENS.contains(&token) {
                continue;
            }
            kept.push(token);
        }

        let joined = kept.join(" ");
        if let Some(generic) = self.reference.resolve_generic(&joined) {
            return generic.to_string();
        }
        if kept.len() > 1 {
            if let Some(generic) = self.reference.resolve_generic(kept[0]) {
                return generic.to_string();
            }
        }
        joined
    }

    /// Lowercase condition name mapped through the synonym table.
    pub fn normalize_condition(&self, name: &str) -> String {
        let cleaned = collapse_whitespace(&clean(name));
        match self.reference.canonical_condition(&cleaned) {
            Some(canonical) => canonical.to_string(),
            None => cleaned,
        }
    }

    /// Trimmed, lowercased allergen.
    pub fn normalize_allergy(&self, name: &str) -> String {
        collapse_whitespace(&name.to_lowercase())
    }
}

/// Lowercase and replace everything but letters, digits and hyphens with spaces.
fn clean(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
        .collect()
}
