pub mod allergy;
pub mod condition;
pub mod demographics;
pub mod enums;
pub mod medication;
pub mod observation;
pub mod record;

pub use allergy::Allergy;
pub use condition::Condition;
pub use demographics::Demographics;
pub use medication::Medication;
pub use observation::Observation;
pub use record::{ClinicalRecord, RecordEntry, RecordShape};
