use crate::core::value::Value;
use thiserror::Error;

/// Raised while projecting a loosely typed record onto a typed row.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    #[error("Missing required field '{0}'")]
    Missing(String),

    #[error("Invalid value '{value}' for field '{field}'")]
    Invalid { field: String, value: String },

    #[error("Unknown remapping for {table} key '{key}'")]
    UnmappedKey { table: String, key: String },
}

impl RecordError {
    pub fn invalid(field: &str, value: &Value) -> Self {
        RecordError::Invalid {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}
