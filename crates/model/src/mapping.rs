use crate::core::entity::EntityType;
use serde::{Deserialize, Serialize};

/// Separator of composite source keys (`<id>#<language>`).
pub const KEY_SEPARATOR: char = '#';

/// Durable correspondence between one source key and one target key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapping {
    pub entity_type: EntityType,
    pub source_key: String,
    pub target_key: String,
}

impl IdMapping {
    pub fn new(
        entity_type: EntityType,
        source_key: impl Into<String>,
        target_key: impl Into<String>,
    ) -> Self {
        Self {
            entity_type,
            source_key: source_key.into(),
            target_key: target_key.into(),
        }
    }

    pub fn target_id(&self) -> Option<i64> {
        self.target_key.trim().parse().ok()
    }
}

/// Builds `<id>#<language>` when a language qualifier is present.
pub fn composite_key(id: &str, language: Option<&str>) -> String {
    match language {
        Some(lang) if !lang.is_empty() => format!("{id}{KEY_SEPARATOR}{lang}"),
        _ => id.to_string(),
    }
}

/// Prefix matching every language-qualified key of `id`.
pub fn language_prefix(id: &str) -> String {
    format!("{id}{KEY_SEPARATOR}")
}

/// The base id of a possibly composite key.
pub fn base_key(key: &str) -> &str {
    key.split(KEY_SEPARATOR).next().unwrap_or(key)
}
