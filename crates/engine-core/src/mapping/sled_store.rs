use crate::{error::MappingStoreError, mapping::IdMappingStore};
use async_trait::async_trait;
use model::{core::entity::EntityType, mapping::IdMapping};
use sled::Batch;
use std::path::Path;
use tracing::debug;

/// Mapping table in an embedded sled database.
pub struct SledMappingStore {
    db: sled::Db,
}

impl SledMappingStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MappingStoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Shares an already opened database (tokens and mappings in one file).
    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }

    #[inline]
    fn type_prefix(entity: EntityType) -> String {
        format!("map:{:05}:", entity.code())
    }

    #[inline]
    fn key(entity: EntityType, source_key: &str) -> String {
        format!("{}{}", Self::type_prefix(entity), source_key)
    }

    fn scan(
        &self,
        prefix: String,
    ) -> impl Iterator<Item = Result<(sled::IVec, IdMapping), MappingStoreError>> + '_ {
        self.db.scan_prefix(prefix).map(|item| {
            let (key, value) = item?;
            let mapping: IdMapping = bincode::deserialize(&value)?;
            Ok((key, mapping))
        })
    }
}

#[async_trait]
impl IdMappingStore for SledMappingStore {
    async fn put(
        &self,
        entity: EntityType,
        source_key: &str,
        target_key: &str,
    ) -> Result<(), MappingStoreError> {
        let mapping = IdMapping::new(entity, source_key, target_key);
        let value = bincode::serialize(&mapping)?;
        self.db.insert(Self::key(entity, source_key), value)?;
        Ok(())
    }

    async fn get(
        &self,
        entity: EntityType,
        source_key: &str,
    ) -> Result<Option<String>, MappingStoreError> {
        match self.db.get(Self::key(entity, source_key))? {
            Some(bytes) => {
                let mapping: IdMapping = bincode::deserialize(&bytes)?;
                Ok(Some(mapping.target_key))
            }
            None => Ok(None),
        }
    }

    async fn get_like(
        &self,
        entity: EntityType,
        prefix: &str,
    ) -> Result<Option<String>, MappingStoreError> {
        match self.scan(Self::key(entity, prefix)).next() {
            Some(item) => Ok(Some(item?.1.target_key)),
            None => Ok(None),
        }
    }

    async fn retarget(
        &self,
        entity: EntityType,
        old_target: &str,
        new_target: &str,
    ) -> Result<u64, MappingStoreError> {
        let mut batch = Batch::default();
        let mut rewritten = 0;
        for item in self.scan(Self::type_prefix(entity)) {
            let (key, mut mapping) = item?;
            if mapping.target_key == old_target {
                mapping.target_key = new_target.to_string();
                batch.insert(key, bincode::serialize(&mapping)?);
                rewritten += 1;
            }
        }
        self.db.apply_batch(batch)?;
        debug!(%entity, old_target, new_target, rewritten, "Retargeted mappings");
        Ok(rewritten)
    }

    async fn clear(&self, entities: &[EntityType]) -> Result<u64, MappingStoreError> {
        let mut batch = Batch::default();
        let mut removed = 0;
        for entity in entities {
            for item in self.db.scan_prefix(Self::type_prefix(*entity)).keys() {
                batch.remove(item?);
                removed += 1;
            }
        }
        self.db.apply_batch(batch)?;
        self.db.flush_async().await?;
        Ok(removed)
    }

    async fn entries(&self, entity: EntityType) -> Result<Vec<IdMapping>, MappingStoreError> {
        self.scan(Self::type_prefix(entity))
            .map(|item| item.map(|(_, mapping)| mapping))
            .collect()
    }
}
