use connectors::error::{AssetError, TargetError};
use engine_core::error::MappingStoreError;
use model::{error::RecordError, params::NumberValidationMode};
use thiserror::Error;

/// Conditions that abort the whole step. Everything else is reported per
/// record through [`ImportOutcome`](crate::outcome::ImportOutcome).
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Invalid order number '{number}' for product {source_id} (mode: {mode})")]
    InvalidNumber {
        source_id: String,
        number: String,
        mode: NumberValidationMode,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Mapping store error: {0}")]
    Mapping(#[from] MappingStoreError),

    #[error("Target unavailable: {0}")]
    Target(#[source] TargetError),
}

/// Why one record could not be written. Converted into an outcome (or a step
/// abort for [`RecordFailure::Fatal`]) once the unit of work is settled.
#[derive(Debug)]
pub enum RecordFailure {
    /// A referenced entity is not imported yet.
    Skipped(String),
    /// The record's own data could not be written.
    Failed(String),
    Fatal(ImportError),
}

impl RecordFailure {
    pub fn skipped(reason: impl Into<String>) -> Self {
        RecordFailure::Skipped(reason.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        RecordFailure::Failed(reason.into())
    }
}

impl From<ImportError> for RecordFailure {
    fn from(err: ImportError) -> Self {
        RecordFailure::Fatal(err)
    }
}

impl From<MappingStoreError> for RecordFailure {
    fn from(err: MappingStoreError) -> Self {
        RecordFailure::Fatal(ImportError::Mapping(err))
    }
}

impl From<TargetError> for RecordFailure {
    fn from(err: TargetError) -> Self {
        RecordFailure::Failed(err.to_string())
    }
}

impl From<RecordError> for RecordFailure {
    fn from(err: RecordError) -> Self {
        RecordFailure::Failed(err.to_string())
    }
}

impl From<AssetError> for RecordFailure {
    fn from(err: AssetError) -> Self {
        RecordFailure::Failed(err.to_string())
    }
}
