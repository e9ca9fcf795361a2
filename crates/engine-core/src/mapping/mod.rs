use crate::error::MappingStoreError;
use async_trait::async_trait;
use model::{core::entity::EntityType, mapping::IdMapping};

pub mod mysql_store;
pub mod sled_store;

/// Durable (entity type, source key) -> target key table.
///
/// `put` is an upsert: a second write for the same pair replaces the target
/// key. Nothing here knows about shop semantics.
#[async_trait]
pub trait IdMappingStore: Send + Sync {
    async fn put(
        &self,
        entity: EntityType,
        source_key: &str,
        target_key: &str,
    ) -> Result<(), MappingStoreError>;

    async fn get(
        &self,
        entity: EntityType,
        source_key: &str,
    ) -> Result<Option<String>, MappingStoreError>;

    /// First mapping whose source key starts with `prefix`, in key order.
    /// Only used as a fallback when an exact composite key is unknown.
    async fn get_like(
        &self,
        entity: EntityType,
        prefix: &str,
    ) -> Result<Option<String>, MappingStoreError>;

    /// Points every mapping of `entity` that targets `old_target` at
    /// `new_target`. Returns the number of rewritten rows.
    async fn retarget(
        &self,
        entity: EntityType,
        old_target: &str,
        new_target: &str,
    ) -> Result<u64, MappingStoreError>;

    /// Removes all mappings of the given types. Returns the number of rows removed.
    async fn clear(&self, entities: &[EntityType]) -> Result<u64, MappingStoreError>;

    async fn entries(&self, entity: EntityType) -> Result<Vec<IdMapping>, MappingStoreError>;

    /// Numeric target id of an exact mapping.
    async fn get_id(
        &self,
        entity: EntityType,
        source_key: &str,
    ) -> Result<Option<i64>, MappingStoreError> {
        Ok(self
            .get(entity, source_key)
            .await?
            .and_then(|target| target.trim().parse().ok()))
    }
}
