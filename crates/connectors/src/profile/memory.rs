use crate::{error::ProfileError, profile::SourceProfile};
use async_trait::async_trait;
use model::{core::entity::SourceEntity, records::record::SourceRecord};
use std::{collections::HashMap, path::Path};
use tracing::info;

/// Profile over records held in memory.
///
/// Also used for fixture exports: one `<entity>.json` file per entity, each
/// holding a JSON array of flat objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfile {
    name: String,
    records: HashMap<SourceEntity, Vec<SourceRecord>>,
}

impl MemoryProfile {
    pub fn new(name: &str) -> Self {
        MemoryProfile {
            name: name.to_string(),
            records: HashMap::new(),
        }
    }

    pub fn with(mut self, entity: SourceEntity, records: Vec<SourceRecord>) -> Self {
        self.records.insert(entity, records);
        self
    }

    pub fn push(&mut self, entity: SourceEntity, record: SourceRecord) {
        self.records.entry(entity).or_default().push(record);
    }

    pub async fn load_json_dir(name: &str, dir: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let dir = dir.as_ref();
        let mut profile = MemoryProfile::new(name);

        for entity in SourceEntity::ALL {
            let path = dir.join(format!("{entity}.json"));
            if !tokio::fs::try_exists(&path).await? {
                continue;
            }
            let raw = tokio::fs::read_to_string(&path).await?;
            let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(&raw)
                .map_err(|source| ProfileError::Fixture {
                    file: path.display().to_string(),
                    source,
                })?;
            info!(%entity, rows = rows.len(), file = %path.display(), "Loaded fixture");
            profile
                .records
                .insert(entity, rows.into_iter().map(SourceRecord::from).collect());
        }

        Ok(profile)
    }
}

#[async_trait]
impl SourceProfile for MemoryProfile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count_for(&self, entity: SourceEntity) -> Result<u64, ProfileError> {
        Ok(self.records.get(&entity).map_or(0, |r| r.len() as u64))
    }

    async fn page_for(
        &self,
        entity: SourceEntity,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<SourceRecord>, ProfileError> {
        let Some(records) = self.records.get(&entity) else {
            return Ok(Vec::new());
        };
        Ok(records
            .iter()
            .skip(offset as usize)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn loads_json_fixtures() {
        let dir = tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("categories.json"),
            r#"[{"categoryID": 1, "description": "Root"}, {"categoryID": 2, "parentID": 1, "description": "Child"}]"#,
        )
        .await
        .unwrap();

        let profile = MemoryProfile::load_json_dir("fixture", dir.path()).await.unwrap();
        assert_eq!(profile.count_for(SourceEntity::Categories).await.unwrap(), 2);
        assert_eq!(profile.count_for(SourceEntity::Products).await.unwrap(), 0);

        let page = profile.page_for(SourceEntity::Categories, 1, 10).await.unwrap();
        assert_eq!(page[0].string("description").as_deref(), Some("Child"));
    }

    #[tokio::test]
    async fn broken_fixture_names_the_file() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("orders.json"), "{not json").await.unwrap();
        let err = MemoryProfile::load_json_dir("fixture", dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("orders.json"));
    }
}
