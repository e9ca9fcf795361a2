use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a resolved record creates a new target row or updates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergePolicy {
    Insert,
    Update,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergePolicy::Insert => "insert",
            MergePolicy::Update => "update",
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of importing one source record.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Imported { target_id: i64, action: MergePolicy },
    /// Not an error: a referenced entity is missing. Progress still advances.
    Skipped { reason: String },
    /// The record could not be written; nothing of it was kept.
    Failed { reason: String },
    /// Retry once the rest of the step was processed.
    Deferred { reason: String },
}

impl ImportOutcome {
    pub fn inserted(target_id: i64) -> Self {
        ImportOutcome::Imported {
            target_id,
            action: MergePolicy::Insert,
        }
    }

    pub fn updated(target_id: i64) -> Self {
        ImportOutcome::Imported {
            target_id,
            action: MergePolicy::Update,
        }
    }

    pub fn imported(target_id: i64, action: MergePolicy) -> Self {
        ImportOutcome::Imported { target_id, action }
    }

    pub fn is_imported(&self) -> bool {
        matches!(self, ImportOutcome::Imported { .. })
    }

    pub fn target_id(&self) -> Option<i64> {
        match self {
            ImportOutcome::Imported { target_id, .. } => Some(*target_id),
            _ => None,
        }
    }
}
