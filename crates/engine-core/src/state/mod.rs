use crate::error::StateStoreError;
use async_trait::async_trait;
use model::progress::ProgressToken;

pub mod sled_store;

/// Keeps the last token returned for every step of a run so a restarted
/// process continues where the previous one stopped.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Stores `token` under its step and marks that step as the run's
    /// current one.
    async fn save(&self, run_id: &str, token: &ProgressToken) -> Result<(), StateStoreError>;

    async fn load(&self, run_id: &str, step: &str)
    -> Result<Option<ProgressToken>, StateStoreError>;

    async fn list(&self, run_id: &str) -> Result<Vec<ProgressToken>, StateStoreError>;

    /// Step most recently saved for the run.
    async fn current(&self, run_id: &str) -> Result<Option<String>, StateStoreError>;

    async fn clear(&self, run_id: &str) -> Result<(), StateStoreError>;
}
