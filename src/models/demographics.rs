use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Sex;

/// Pounds to kilograms.
pub const KG_PER_LB: f64 = 0.453_592_37;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub birth_date: Option<NaiveDate>,
    /// Explicit age, used only when no birth date is available.
    pub age_years: Option<u32>,
    pub sex: Option<Sex>,
    pub weight: Option<f64>,
    /// "kg" (default) or "lb"/"lbs"/"pounds".
    pub weight_unit: Option<String>,
}

impl Demographics {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            birth_date: None,
            age_years: None,
            sex: None,
            weight: None,
            weight_unit: None,
        }
    }

    pub fn with_birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    pub fn with_age(mut self, years: u32) -> Self {
        self.age_years = Some(years);
        self
    }

    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = Some(sex);
        self
    }

    pub fn with_weight(mut self, weight: f64, unit: impl Into<String>) -> Self {
        self.weight = Some(weight);
        self.weight_unit = Some(unit.into());
        self
    }

    /// Age in whole years on `as_of`. Birth date wins over the explicit age.
    /// A birth date after `as_of` yields `None`.
    pub fn age_on(&self, as_of: NaiveDate) -> Option<u32> {
        match self.birth_date {
            Some(born) => completed_years(born, as_of),
            None => self.age_years,
        }
    }

    /// Weight in kilograms; pound inputs are converted, non-positive or
    /// unrecognised units yield `None`.
    pub fn weight_kg(&self) -> Option<f64> {
        let weight = self.weight.filter(|w| w.is_finite() && *w > 0.0)?;
        weight_to_kg(weight, self.weight_unit.as_deref())
    }
}

impl Default for Demographics {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a weight to kilograms. A missing unit is read as kilograms.
pub fn weight_to_kg(value: f64, unit: Option<&str>) -> Option<f64> {
    let unit = unit.map(|u| u.trim().to_lowercase()).unwrap_or_default();
    match unit.as_str() {
        "" | "kg" | "kgs" | "kilogram" | "kilograms" => Some(value),
        "lb" | "lbs" | "pound" | "pounds" => Some(value * KG_PER_LB),
        "g" | "grams" => Some(value / 1000.0),
        _ => None,
    }
}

fn completed_years(born: NaiveDate, as_of: NaiveDate) -> Option<u32> {
    if born > as_of {
        return None;
    }
    let mut years = as_of.year() - born.year();
    if (as_of.month(), as_of.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}
