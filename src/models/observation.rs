use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A measured or reported observation (vital sign, lab, pregnancy test).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub value: Option<f64>,
    pub value_text: Option<String>,
    pub unit: Option<String>,
}

impl Observation {
    pub fn numeric(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            value: Some(value),
            value_text: None,
            unit: Some(unit.into()),
        }
    }

    pub fn text(name: impl Into<String>, value_text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            value: None,
            value_text: Some(value_text.into()),
            unit: None,
        }
    }
}
