use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AUDIT_LOG_CAPACITY;
use crate::models::enums::RiskLevel;
use crate::models::RecordShape;

use super::types::SafetyError;

/// One evaluation, recorded without any clinical content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub request_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub shape: RecordShape,
    pub overall_score: f64,
    pub risk_level: RiskLevel,
    pub degraded: bool,
    pub error: Option<String>,
}

/// Append-only, size-bounded audit log shared by concurrent evaluations.
/// When full, the oldest half is discarded before the next append.
pub struct AuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_capacity(AUDIT_LOG_CAPACITY)
    }

    /// A capacity below 2 is raised to 2 so eviction always frees space.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&self, entry: AuditEntry) -> Result<(), SafetyError> {
        let mut entries = self.entries.lock().map_err(|_| SafetyError::LockFailed)?;
        if entries.len() >= self.capacity {
            let evicted = entries.len() / 2;
            entries.drain(..evicted);
            tracing::info!(
                evicted,
                remaining = entries.len(),
                "Audit log full, oldest half discarded"
            );
        }
        entries.push_back(entry);
        Ok(())
    }

    /// The newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Result<Vec<AuditEntry>, SafetyError> {
        let entries = self.entries.lock().map_err(|_| SafetyError::LockFailed)?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries.iter().skip(skip).cloned().collect())
    }

    pub fn len(&self) -> Result<usize, SafetyError> {
        let entries = self.entries.lock().map_err(|_| SafetyError::LockFailed)?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, SafetyError> {
        Ok(self.len()? == 0)
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
