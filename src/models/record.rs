use serde::{Deserialize, Serialize};

use super::{Allergy, Condition, Demographics, Medication, Observation};

/// One typed entry of a clinical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordEntry {
    Medication(Medication),
    Condition(Condition),
    Allergy(Allergy),
    Observation(Observation),
    Demographics(Demographics),
}

impl From<Medication> for RecordEntry {
    fn from(m: Medication) -> Self {
        Self::Medication(m)
    }
}

impl From<Condition> for RecordEntry {
    fn from(c: Condition) -> Self {
        Self::Condition(c)
    }
}

impl From<Allergy> for RecordEntry {
    fn from(a: Allergy) -> Self {
        Self::Allergy(a)
    }
}

impl From<Observation> for RecordEntry {
    fn from(o: Observation) -> Self {
        Self::Observation(o)
    }
}

impl From<Demographics> for RecordEntry {
    fn from(d: Demographics) -> Self {
        Self::Demographics(d)
    }
}

/// Read-only input of one evaluation. No entry type is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    #[serde(default)]
    pub entries: Vec<RecordEntry>,
}

impl ClinicalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append.
    pub fn with(mut self, entry: impl Into<RecordEntry>) -> Self {
        self.entries.push(entry.into());
        self
    }

    pub fn push(&mut self, entry: impl Into<RecordEntry>) {
        self.entries.push(entry.into());
    }

    pub fn medications(&self) -> impl Iterator<Item = &Medication> {
        self.entries.iter().filter_map(|e| match e {
            RecordEntry::Medication(m) => Some(m),
            _ => None,
        })
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.entries.iter().filter_map(|e| match e {
            RecordEntry::Condition(c) => Some(c),
            _ => None,
        })
    }

    pub fn allergies(&self) -> impl Iterator<Item = &Allergy> {
        self.entries.iter().filter_map(|e| match e {
            RecordEntry::Allergy(a) => Some(a),
            _ => None,
        })
    }

    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.entries.iter().filter_map(|e| match e {
            RecordEntry::Observation(o) => Some(o),
            _ => None,
        })
    }

    /// First demographics entry, if any.
    pub fn demographics(&self) -> Option<&Demographics> {
        self.entries.iter().find_map(|e| match e {
            RecordEntry::Demographics(d) => Some(d),
            _ => None,
        })
    }

    /// Entry counts per type; carries no patient data.
    pub fn shape(&self) -> RecordShape {
        let mut shape = RecordShape::default();
        for entry in &self.entries {
            match entry {
                RecordEntry::Medication(_) => shape.medications += 1,
                RecordEntry::Condition(_) => shape.conditions += 1,
                RecordEntry::Allergy(_) => shape.allergies += 1,
                RecordEntry::Observation(_) => shape.observations += 1,
                RecordEntry::Demographics(_) => shape.has_demographics = true,
            }
        }
        shape
    }
}

/// Input-shape metadata recorded in the audit log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordShape {
    pub medications: usize,
    pub conditions: usize,
    pub allergies: usize,
    pub observations: usize,
    pub has_demographics: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_filter_by_type() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Warfarin"))
            .with(Medication::new("Aspirin"))
            .with(Condition::new("Atrial fibrillation"))
            .with(Allergy::new("Penicillin"))
            .with(Demographics::new().with_age(70));

        assert_eq!(record.medications().count(), 2);
        assert_eq!(record.conditions().count(), 1);
        assert_eq!(record.allergies().count(), 1);
        assert_eq!(record.observations().count(), 0);
        assert_eq!(record.demographics().and_then(|d| d.age_years), Some(70));
    }

    #[test]
    fn shape_counts_entries() {
        let record = ClinicalRecord::new()
            .with(Medication::new("Metformin"))
            .with(Observation::numeric("Body weight", 80.0, "kg"));
        let shape = record.shape();
        assert_eq!(shape.medications, 1);
        assert_eq!(shape.observations, 1);
        assert!(!shape.has_demographics);
    }

    #[test]
    fn deserializes_tagged_entries_without_ids() {
        let json = r#"{
            "entries": [
                {"type": "medication", "name": "Lisinopril", "dose_value": 10.0, "dose_unit": "mg"},
                {"type": "condition", "name": "Hypertension"},
                {"type": "demographics", "age_years": 55, "sex": "female"}
            ]
        }"#;
        let record: ClinicalRecord = serde_json::from_str(json).unwrap();
        let med = record.medications().next().unwrap();
        assert_eq!(med.dose_value, Some(10.0));
        assert!(med.frequency.is_none());
        assert!(!med.id.is_nil());
        assert_eq!(record.shape().conditions, 1);
        assert!(record.shape().has_demographics);
    }

    #[test]
    fn empty_record_is_valid() {
        let record: ClinicalRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.shape(), RecordShape::default());
    }
}
