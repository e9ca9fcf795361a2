use crate::error::CliError;
use async_trait::async_trait;
use connectors::{
    profile::SourceProfile,
    target::{TargetStore, TargetTx},
};
use engine_config::settings::{MigrationSettings, SourceSettings, TargetSettings};
use engine_runtime::factory;
use model::core::entity::SourceEntity;
use mysql_async::prelude::*;
use std::path::PathBuf;
use tracing::{error, info};

/// Trait for "pinging" a data source
#[async_trait]
pub trait ConnectionPinger {
    fn label(&self) -> &str;

    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

/// MySQL/MariaDB pinger
pub struct MySqlConnectionPinger {
    pub label: String,
    pub conn_str: String,
}

/// Checks that a fixture or export directory exists.
pub struct DirectoryPinger {
    pub label: String,
    pub dir: PathBuf,
}

/// Opens and rolls back one transaction on the in-memory target.
pub struct MemoryTargetPinger;

#[async_trait]
impl ConnectionPinger for MySqlConnectionPinger {
    fn label(&self) -> &str {
        &self.label
    }

    async fn ping(&self) -> Result<(), CliError> {
        info!(label = %self.label, "Pinging MySQL");

        let opts = mysql_async::Opts::from_url(&self.conn_str).map_err(|e| {
            error!("MySQL connection string parse failed: {}", e);
            CliError::MySql(mysql_async::Error::Url(e))
        })?;
        let pool = mysql_async::Pool::new(opts);
        let mut conn = pool.get_conn().await.map_err(|e| {
            error!(label = %self.label, "MySQL connection failed: {}", e);
            CliError::MySql(e)
        })?;

        let val: i32 = conn
            .query_first("SELECT 1")
            .await
            .map_err(|e| {
                error!(label = %self.label, "MySQL ping query failed: {}", e);
                CliError::MySql(e)
            })?
            .ok_or_else(|| CliError::Unexpected(format!("{} returned no result", self.label)))?;

        if val != 1 {
            return Err(CliError::Unexpected(format!(
                "{} returned unexpected result: {}",
                self.label, val
            )));
        }

        drop(conn);
        pool.disconnect().await.ok();
        Ok(())
    }
}

#[async_trait]
impl ConnectionPinger for DirectoryPinger {
    fn label(&self) -> &str {
        &self.label
    }

    async fn ping(&self) -> Result<(), CliError> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Err(CliError::Config(format!(
                "{} directory {} does not exist",
                self.label,
                self.dir.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectionPinger for MemoryTargetPinger {
    fn label(&self) -> &str {
        "target (memory)"
    }

    async fn ping(&self) -> Result<(), CliError> {
        let target = connectors::target::memory::MemoryTarget::new();
        let tx = target.begin().await.map_err(|e| CliError::Unexpected(e.to_string()))?;
        tx.rollback().await.map_err(|e| CliError::Unexpected(e.to_string()))?;
        Ok(())
    }
}

pub fn pingers(settings: &MigrationSettings) -> Vec<Box<dyn ConnectionPinger + Send + Sync>> {
    let mut pingers: Vec<Box<dyn ConnectionPinger + Send + Sync>> = Vec::new();
    match &settings.source {
        SourceSettings::Memory { dir } | SourceSettings::Csv { dir, .. } => {
            pingers.push(Box::new(DirectoryPinger {
                label: "source".into(),
                dir: dir.clone(),
            }))
        }
        SourceSettings::Mysql { url, .. } => pingers.push(Box::new(MySqlConnectionPinger {
            label: "source".into(),
            conn_str: url.clone(),
        })),
    }
    match &settings.target {
        TargetSettings::Memory => pingers.push(Box::new(MemoryTargetPinger)),
        TargetSettings::Mysql { url } => pingers.push(Box::new(MySqlConnectionPinger {
            label: "target".into(),
            conn_str: url.clone(),
        })),
    }
    pingers
}

/// Pings source and target, then counts the rows the profile offers.
pub async fn test_connections(settings: &MigrationSettings) -> Result<(), CliError> {
    for pinger in pingers(settings) {
        pinger.ping().await?;
        println!("{:<16} ok", pinger.label());
    }

    let profile = factory::create_profile(settings).await?;
    for entity in SourceEntity::ALL {
        match profile.count_for(entity).await {
            Ok(count) => println!("{:<20} {count}", entity.as_str()),
            Err(e) => println!("{:<20} unavailable ({e})", entity.as_str()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn missing_source_directory_fails() {
        let raw = r#"{
            "source": { "kind": "csv", "dir": "/definitely/not/here" },
            "target": { "kind": "memory" }
        }"#;
        let settings = MigrationSettings::parse(raw, &HashMap::new()).unwrap();
        let pingers = pingers(&settings);
        assert_eq!(pingers.len(), 2);
        assert!(pingers[0].ping().await.is_err());
        assert!(pingers[1].ping().await.is_ok());
    }
}
