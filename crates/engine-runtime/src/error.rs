use connectors::error::{ProfileError, TargetError};
use engine_config::error::SettingsError;
use engine_core::error::{MappingStoreError, StateStoreError};
use thiserror::Error;

/// Top‐level errors of the migration engine.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Initialization error: {0}")]
    InitializationError(String),

    /// A token was passed to a run loop for a different step.
    #[error("Token belongs to step '{found}', expected '{expected}'")]
    StepMismatch { expected: String, found: String },

    #[error("Unknown step: {0}")]
    UnknownStep(String),

    /// A step ended with an Error token. The token is stored; the operator
    /// has to fix the cause and restart the step.
    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    #[error("Migration interrupted")]
    Interrupted,

    #[error("Source error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    #[error("Mapping store error: {0}")]
    Mapping(#[from] MappingStoreError),

    #[error("State store error: {0}")]
    State(#[from] StateStoreError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}
