use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A medication entry as delivered by the upstream extraction pipeline.
/// Structured dose and frequency are optional; when absent the engine tries
/// to recover them from the free-text name ("Warfarin 5mg daily").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub dose_value: Option<f64>,
    pub dose_unit: Option<String>,
    pub route: Option<String>,
    pub frequency: Option<String>,
    pub indication: Option<String>,
}

impl Medication {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            dose_value: None,
            dose_unit: None,
            route: None,
            frequency: None,
            indication: None,
        }
    }

    pub fn with_dose(mut self, value: f64, unit: impl Into<String>) -> Self {
        self.dose_value = Some(value);
        self.dose_unit = Some(unit.into());
        self
    }

    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_indication(mut self, indication: impl Into<String>) -> Self {
        self.indication = Some(indication.into());
        self
    }
}
