use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A `${VAR}` placeholder names a variable that is not set.
    #[error("Undefined variable in settings: {0}")]
    MissingVariable(String),

    #[error("Unterminated placeholder starting at byte {0}")]
    UnterminatedPlaceholder(usize),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}
