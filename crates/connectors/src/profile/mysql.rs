use crate::{
    error::ProfileError,
    profile::SourceProfile,
    sql::{params::MySqlParamStore, row::to_record},
};
use async_trait::async_trait;
use model::{core::entity::SourceEntity, records::record::SourceRecord};
use mysql_async::{Opts, Pool, Row, prelude::Queryable};
use std::collections::HashMap;
use tracing::{debug, info};

/// Profile over a live legacy shop database.
///
/// Each entity is described by one `SELECT` whose column aliases follow the
/// record field names (`productID`, `ordernumber`, ...). The query must carry
/// an `ORDER BY` on the source primary key so offsets stay stable.
pub struct MySqlProfile {
    name: String,
    pool: Pool,
    queries: HashMap<SourceEntity, String>,
}

impl MySqlProfile {
    pub fn connect(
        name: &str,
        url: &str,
        queries: HashMap<SourceEntity, String>,
    ) -> Result<Self, ProfileError> {
        let opts = Opts::from_url(url).map_err(|e| ProfileError::Config(e.to_string()))?;
        check_queries(&queries)?;
        info!(profile = name, entities = queries.len(), "Connecting MySQL profile");

        Ok(MySqlProfile {
            name: name.to_string(),
            pool: Pool::new(opts),
            queries,
        })
    }

    fn query(&self, entity: SourceEntity) -> Option<&str> {
        self.queries
            .get(&entity)
            .map(|q| q.trim().trim_end_matches(';'))
    }

    pub async fn disconnect(self) -> Result<(), ProfileError> {
        self.pool.disconnect().await?;
        Ok(())
    }
}

/// Rejects empty queries and queries without an `ORDER BY`. Resuming at an
/// offset needs a stable row order.
fn check_queries(queries: &HashMap<SourceEntity, String>) -> Result<(), ProfileError> {
    for (entity, query) in queries {
        if query.trim().is_empty() {
            return Err(ProfileError::Config(format!("Empty query for {entity}")));
        }
        if !has_order_by(query) {
            return Err(ProfileError::Config(format!(
                "Query for {entity} has no ORDER BY"
            )));
        }
    }
    Ok(())
}

fn has_order_by(query: &str) -> bool {
    let words: Vec<String> = query
        .split_whitespace()
        .map(|w| w.to_ascii_uppercase())
        .collect();
    words.windows(2).any(|w| w[0] == "ORDER" && w[1] == "BY")
}

#[async_trait]
impl SourceProfile for MySqlProfile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count_for(&self, entity: SourceEntity) -> Result<u64, ProfileError> {
        let Some(query) = self.query(entity) else {
            debug!(profile = %self.name, %entity, "Entity not provided by profile");
            return Ok(0);
        };
        let sql = format!("SELECT COUNT(*) FROM ({query}) AS src");
        let mut conn = self.pool.get_conn().await?;
        let count: Option<u64> = conn.query_first(sql).await?;
        Ok(count.unwrap_or(0))
    }

    async fn page_for(
        &self,
        entity: SourceEntity,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<SourceRecord>, ProfileError> {
        let Some(query) = self.query(entity) else {
            return Ok(Vec::new());
        };
        let sql = format!("{query} LIMIT ? OFFSET ?");
        let params = MySqlParamStore::default()
            .push(limit as i64)
            .push(offset as i64)
            .params();

        let mut conn = self.pool.get_conn().await?;
        let rows: Vec<Row> = conn.exec(sql, params).await?;
        debug!(profile = %self.name, %entity, offset, rows = rows.len(), "Fetched page");
        Ok(rows.iter().map(to_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queries(sql: &str) -> HashMap<SourceEntity, String> {
        HashMap::from([(SourceEntity::Products, sql.to_string())])
    }

    #[test]
    fn ordered_queries_are_accepted() {
        let sql = "SELECT id AS productID\n  FROM products\n  order\tby id;";
        assert!(check_queries(&queries(sql)).is_ok());
    }

    #[test]
    fn unordered_query_is_rejected() {
        let err = check_queries(&queries("SELECT * FROM products")).unwrap_err();
        assert!(matches!(err, ProfileError::Config(msg) if msg.contains("ORDER BY")));
    }

    #[test]
    fn empty_query_is_rejected() {
        let err = check_queries(&queries("  ")).unwrap_err();
        assert!(matches!(err, ProfileError::Config(msg) if msg.starts_with("Empty query")));
    }

    #[test]
    fn order_by_must_be_two_words() {
        assert!(!has_order_by("SELECT border_byte FROM t"));
        assert!(has_order_by("SELECT * FROM t ORDER BY id"));
    }
}
