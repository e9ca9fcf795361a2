use crate::{
    error::MigrationError, orchestrator::StepOrchestrator, run_loop::MigrationRunLoop,
    step::StepName,
};
use connectors::{
    assets::HttpAssetFetcher,
    profile::{SourceProfile, csv::CsvProfile, memory::MemoryProfile, mysql::MySqlProfile},
    target::{TargetStore, memory::MemoryTarget, mysql::MySqlTarget},
};
use engine_config::settings::{MappingSettings, MigrationSettings, SourceSettings, TargetSettings};
use engine_core::{
    budget::ChunkBudget,
    mapping::{IdMappingStore, mysql_store::MySqlMappingStore, sled_store::SledMappingStore},
    state::{TokenStore, sled_store::SledTokenStore},
};
use engine_processing::context::ImportContext;
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Directory holding the token and default mapping stores.
pub fn state_dir(settings: &MigrationSettings) -> Result<PathBuf, MigrationError> {
    if let Some(dir) = &settings.state_dir {
        return Ok(dir.clone());
    }
    let home_dir = dirs::home_dir().ok_or_else(|| {
        MigrationError::InitializationError("Could not determine home directory".to_string())
    })?;
    Ok(home_dir.join(".shopmig"))
}

pub async fn create_profile(
    settings: &MigrationSettings,
) -> Result<Arc<dyn SourceProfile>, MigrationError> {
    let name = settings.profile.as_str();
    let profile: Arc<dyn SourceProfile> = match &settings.source {
        SourceSettings::Memory { dir } => Arc::new(MemoryProfile::load_json_dir(name, dir).await?),
        SourceSettings::Csv { dir, delimiter } => {
            let delimiter = u8::try_from(*delimiter).map_err(|_| {
                MigrationError::InitializationError(format!(
                    "CSV delimiter '{delimiter}' is not a single byte"
                ))
            })?;
            Arc::new(CsvProfile::new(name, dir).with_delimiter(delimiter))
        }
        SourceSettings::Mysql { url, .. } => {
            Arc::new(MySqlProfile::connect(name, url, settings.source_queries())?)
        }
    };
    Ok(profile)
}

/// Every store a migration run writes to.
pub struct Runtime {
    pub profile: Arc<dyn SourceProfile>,
    pub target: Arc<dyn TargetStore>,
    pub mappings: Arc<dyn IdMappingStore>,
    pub tokens: Arc<dyn TokenStore>,
}

impl Runtime {
    pub async fn from_settings(settings: &MigrationSettings) -> Result<Self, MigrationError> {
        let state_dir = state_dir(settings)?;
        let profile = create_profile(settings).await?;

        let (target, pool) = match &settings.target {
            TargetSettings::Memory => {
                let target: Arc<dyn TargetStore> = Arc::new(MemoryTarget::new());
                (target, None)
            }
            TargetSettings::Mysql { url } => {
                let mysql = MySqlTarget::connect(url)?;
                let pool = mysql.pool().clone();
                let target: Arc<dyn TargetStore> = Arc::new(mysql);
                (target, Some(pool))
            }
        };

        let mappings: Arc<dyn IdMappingStore> = match (&settings.mappings, pool) {
            (MappingSettings::Mysql, Some(pool)) => {
                let store = MySqlMappingStore::new(pool);
                store.ensure_table().await?;
                Arc::new(store)
            }
            (MappingSettings::Mysql, None) => {
                return Err(MigrationError::InitializationError(
                    "mysql mappings require a mysql target".to_string(),
                ));
            }
            (MappingSettings::Sled { path }, _) => {
                let path = path.clone().unwrap_or_else(|| state_dir.join("mappings"));
                Arc::new(SledMappingStore::open(path)?)
            }
        };

        let tokens = Arc::new(SledTokenStore::open(state_dir.join("tokens"))?);
        info!(
            run_id = %settings.run_id,
            profile = profile.name(),
            state_dir = %state_dir.display(),
            "Runtime initialized"
        );

        Ok(Runtime {
            profile,
            target,
            mappings,
            tokens,
        })
    }

    pub fn import_context(&self, settings: &MigrationSettings) -> ImportContext {
        let ctx = ImportContext::new(
            self.target.clone(),
            self.mappings.clone(),
            settings.params.clone(),
        );
        match &settings.media_dir {
            Some(dir) => ctx.with_assets(Arc::new(HttpAssetFetcher::new(dir))),
            None => ctx,
        }
    }

    pub fn run_loop(
        &self,
        settings: &MigrationSettings,
        cancel: Option<CancellationToken>,
    ) -> MigrationRunLoop {
        let mut budget = ChunkBudget::new(settings.chunk.max_execution());
        if let Some(max) = settings.chunk.max_records {
            budget = budget.with_max_records(max);
        }
        let run_loop = MigrationRunLoop::new(self.profile.clone(), self.import_context(settings))
            .with_budget(budget)
            .with_page_size(settings.chunk.page_size);
        match cancel {
            Some(cancel) => run_loop.with_cancel(cancel),
            None => run_loop,
        }
    }

    pub fn orchestrator(
        &self,
        settings: &MigrationSettings,
        cancel: Option<CancellationToken>,
    ) -> Result<StepOrchestrator, MigrationError> {
        let steps = StepName::parse_list(&settings.steps)?;
        let run_loop = self.run_loop(settings, cancel);
        Ok(StepOrchestrator::new(run_loop, self.tokens.clone(), &settings.run_id).with_steps(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(dir: &std::path::Path) -> MigrationSettings {
        let raw = format!(
            r#"{{
                "run_id": "t",
                "source": {{ "kind": "memory", "dir": "{src}" }},
                "target": {{ "kind": "memory" }},
                "state_dir": "{state}",
                "chunk": {{ "max_records": 5 }},
                "steps": ["prices", "products"]
            }}"#,
            src = dir.join("fixtures").display(),
            state = dir.join("state").display(),
        );
        MigrationSettings::parse(&raw, &HashMap::new()).unwrap()
    }

    #[tokio::test]
    async fn builds_runtime_from_memory_settings() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = dir.path().join("fixtures");
        std::fs::create_dir_all(&fixtures).unwrap();
        std::fs::write(
            fixtures.join("products.json"),
            r#"[{"productID": 1, "ordernumber": "SW-1", "supplier": "ACME"}]"#,
        )
        .unwrap();

        let settings = settings(dir.path());
        let runtime = Runtime::from_settings(&settings).await.unwrap();
        assert_eq!(
            runtime
                .profile
                .count_for(model::core::entity::SourceEntity::Products)
                .await
                .unwrap(),
            1
        );

        let orchestrator = runtime.orchestrator(&settings, None).unwrap();
        assert_eq!(orchestrator.steps(), &[StepName::Products, StepName::Prices]);
        assert_eq!(orchestrator.run_id(), "t");
        assert!(dir.path().join("state").join("tokens").exists());
    }
}
