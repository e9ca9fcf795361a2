use crate::{
    error::{ImportError, RecordFailure},
    outcome::ImportOutcome,
    resolver::EntityResolver,
};
use connectors::{
    assets::AssetFetcher,
    target::{TargetStore, TargetTx},
};
use engine_core::mapping::IdMappingStore;
use model::{
    core::entity::EntityType,
    mapping::IdMapping,
    params::{RemapTables, RunParams},
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything an importer needs to write one record.
#[derive(Clone)]
pub struct ImportContext {
    pub target: Arc<dyn TargetStore>,
    pub mappings: Arc<dyn IdMappingStore>,
    pub params: RunParams,
    pub assets: Option<Arc<dyn AssetFetcher>>,
}

impl ImportContext {
    pub fn new(
        target: Arc<dyn TargetStore>,
        mappings: Arc<dyn IdMappingStore>,
        params: RunParams,
    ) -> Self {
        ImportContext {
            target,
            mappings,
            params,
            assets: None,
        }
    }

    pub fn with_assets(mut self, assets: Arc<dyn AssetFetcher>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn resolver(&self) -> EntityResolver<'_> {
        EntityResolver::new(self.mappings.as_ref())
    }

    pub async fn begin(&self) -> Result<UnitOfWork, ImportError> {
        let tx = self.target.begin().await.map_err(ImportError::Target)?;
        Ok(UnitOfWork {
            tx,
            mappings: Vec::new(),
            retargets: Vec::new(),
        })
    }
}

/// All writes for one source record: a target transaction plus the id
/// mappings to register once it committed.
pub struct UnitOfWork {
    tx: Box<dyn TargetTx>,
    /// Staged mappings; `true` keeps an existing mapping.
    mappings: Vec<(IdMapping, bool)>,
    retargets: Vec<(EntityType, String, String)>,
}

impl UnitOfWork {
    pub fn tx(&mut self) -> &mut dyn TargetTx {
        self.tx.as_mut()
    }

    /// Registers `source_key -> target_id` after a successful commit.
    pub fn map(&mut self, entity: EntityType, source_key: &str, target_id: i64) {
        self.mappings.push((
            IdMapping::new(entity, source_key, target_id.to_string()),
            false,
        ));
    }

    /// Like [`map`](Self::map) but never replaces an existing mapping.
    pub fn map_if_absent(&mut self, entity: EntityType, source_key: &str, target_id: i64) {
        self.mappings.push((
            IdMapping::new(entity, source_key, target_id.to_string()),
            true,
        ));
    }

    /// Redirects existing mappings after a successful commit.
    pub fn retarget(&mut self, entity: EntityType, old_target: i64, new_target: i64) {
        self.retargets
            .push((entity, old_target.to_string(), new_target.to_string()));
    }

    /// Commits when the record was imported, rolls back otherwise. Only a
    /// fatal failure becomes an error.
    pub async fn settle(
        self,
        mappings: &dyn IdMappingStore,
        result: Result<ImportOutcome, RecordFailure>,
    ) -> Result<ImportOutcome, ImportError> {
        let UnitOfWork {
            tx,
            mappings: staged,
            retargets,
        } = self;

        let outcome = match result {
            Ok(outcome) if outcome.is_imported() => outcome,
            other => {
                if let Err(e) = tx.rollback().await {
                    warn!(error = %e, "Rollback failed");
                }
                return match other {
                    Ok(outcome) => Ok(outcome),
                    Err(RecordFailure::Skipped(reason)) => Ok(ImportOutcome::Skipped { reason }),
                    Err(RecordFailure::Failed(reason)) => Ok(ImportOutcome::Failed { reason }),
                    Err(RecordFailure::Fatal(err)) => Err(err),
                };
            }
        };

        if let Err(e) = tx.commit().await {
            // Without a mapping the record is picked up again by a later run.
            return Ok(ImportOutcome::Failed {
                reason: format!("commit failed: {e}"),
            });
        }

        for (entity, old, new) in &retargets {
            mappings.retarget(*entity, old, new).await?;
        }
        for (mapping, keep_existing) in &staged {
            if *keep_existing
                && mappings
                    .get(mapping.entity_type, &mapping.source_key)
                    .await?
                    .is_some()
            {
                continue;
            }
            mappings
                .put(mapping.entity_type, &mapping.source_key, &mapping.target_key)
                .await?;
            debug!(
                entity = %mapping.entity_type,
                source_key = %mapping.source_key,
                target_key = %mapping.target_key,
                "Mapped"
            );
        }
        Ok(outcome)
    }
}

/// Target id of a remapped key: the configured mapping, else the raw key when
/// it is numeric.
pub fn remap_id(table: &str, mapped: Option<&str>, raw: &str) -> Result<i64, RecordFailure> {
    RemapTables::require_id(table, mapped.or(Some(raw)), raw).map_err(RecordFailure::from)
}
