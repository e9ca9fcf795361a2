use crate::{error::MappingStoreError, mapping::IdMappingStore};
use async_trait::async_trait;
use model::{core::entity::EntityType, mapping::IdMapping};
use mysql_async::{Pool, prelude::Queryable};
use tracing::{debug, info};

const MAPPING_TABLE: &str = "s_plugin_migrations";

/// Mapping table living next to the shop tables in the target database.
pub struct MySqlMappingStore {
    pool: Pool,
}

impl MySqlMappingStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates the mapping table when it does not exist yet.
    pub async fn ensure_table(&self) -> Result<(), MappingStoreError> {
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop(format!(
            "CREATE TABLE IF NOT EXISTS `{MAPPING_TABLE}` (
                `typeID` INT UNSIGNED NOT NULL,
                `sourceID` VARCHAR(255) NOT NULL,
                `targetID` VARCHAR(255) NOT NULL,
                PRIMARY KEY (`typeID`, `sourceID`)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        ))
        .await?;
        info!(table = MAPPING_TABLE, "Mapping table ready");
        Ok(())
    }
}

/// Escapes `%`, `_` and `\` so a source key can be used as a LIKE prefix.
fn like_prefix(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl IdMappingStore for MySqlMappingStore {
    async fn put(
        &self,
        entity: EntityType,
        source_key: &str,
        target_key: &str,
    ) -> Result<(), MappingStoreError> {
        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop(
            format!(
                "INSERT INTO `{MAPPING_TABLE}` (`typeID`, `sourceID`, `targetID`) VALUES (?, ?, ?)
                 ON DUPLICATE KEY UPDATE `targetID` = VALUES(`targetID`)"
            ),
            (entity.code(), source_key, target_key),
        )
        .await?;
        Ok(())
    }

    async fn get(
        &self,
        entity: EntityType,
        source_key: &str,
    ) -> Result<Option<String>, MappingStoreError> {
        let mut conn = self.pool.get_conn().await?;
        let target = conn
            .exec_first(
                format!(
                    "SELECT `targetID` FROM `{MAPPING_TABLE}` WHERE `typeID` = ? AND `sourceID` = ?"
                ),
                (entity.code(), source_key),
            )
            .await?;
        Ok(target)
    }

    async fn get_like(
        &self,
        entity: EntityType,
        prefix: &str,
    ) -> Result<Option<String>, MappingStoreError> {
        let mut conn = self.pool.get_conn().await?;
        let target = conn
            .exec_first(
                format!(
                    "SELECT `targetID` FROM `{MAPPING_TABLE}`
                     WHERE `typeID` = ? AND `sourceID` LIKE ?
                     ORDER BY `sourceID` LIMIT 1"
                ),
                (entity.code(), like_prefix(prefix)),
            )
            .await?;
        Ok(target)
    }

    async fn retarget(
        &self,
        entity: EntityType,
        old_target: &str,
        new_target: &str,
    ) -> Result<u64, MappingStoreError> {
        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop(
            format!(
                "UPDATE `{MAPPING_TABLE}` SET `targetID` = ? WHERE `typeID` = ? AND `targetID` = ?"
            ),
            (new_target, entity.code(), old_target),
        )
        .await?;
        let rewritten = conn.affected_rows();
        debug!(%entity, old_target, new_target, rewritten, "Retargeted mappings");
        Ok(rewritten)
    }

    async fn clear(&self, entities: &[EntityType]) -> Result<u64, MappingStoreError> {
        if entities.is_empty() {
            return Ok(0);
        }
        let codes = entities
            .iter()
            .map(|e| e.code().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop(format!(
            "DELETE FROM `{MAPPING_TABLE}` WHERE `typeID` IN ({codes})"
        ))
        .await?;
        Ok(conn.affected_rows())
    }

    async fn entries(&self, entity: EntityType) -> Result<Vec<IdMapping>, MappingStoreError> {
        let mut conn = self.pool.get_conn().await?;
        let rows: Vec<(String, String)> = conn
            .exec(
                format!(
                    "SELECT `sourceID`, `targetID` FROM `{MAPPING_TABLE}`
                     WHERE `typeID` = ? ORDER BY `sourceID`"
                ),
                (entity.code(),),
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|(source, target)| IdMapping::new(entity, source, target))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::like_prefix;

    #[test]
    fn like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("12#"), "12#%");
        assert_eq!(like_prefix("a_b%c"), "a\\_b\\%c%");
    }
}
