use crate::{error::StateStoreError, state::TokenStore};
use async_trait::async_trait;
use model::progress::{ProgressToken, StepStatus};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use tracing::debug;

pub struct SledTokenStore {
    db: sled::Db,
}

impl SledTokenStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateStoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }

    #[inline]
    fn tok_key(run_id: &str, step: &str) -> String {
        format!("tok:{}:{}", run_id, step)
    }

    #[inline]
    fn cur_key(run_id: &str) -> String {
        format!("cur:{}", run_id)
    }

    /// A running token of the same step start must never move backwards.
    /// That only happens when an outdated chunk result is saved late.
    fn is_stale(existing: &ProgressToken, incoming: &ProgressToken) -> bool {
        existing.status == StepStatus::Running
            && incoming.status == StepStatus::Running
            && existing.start_time.is_some()
            && existing.start_time == incoming.start_time
            && incoming.offset < existing.offset
    }
}

#[async_trait]
impl TokenStore for SledTokenStore {
    async fn save(&self, run_id: &str, token: &ProgressToken) -> Result<(), StateStoreError> {
        let key = Self::tok_key(run_id, &token.step);
        let cur = Self::cur_key(run_id);
        let new_bytes = serde_json::to_vec(token)?;

        let result = self
            .db
            .transaction::<_, _, StateStoreError>(|tx_db| {
                if let Some(existing_bytes) = tx_db.get(&key)? {
                    let existing: ProgressToken = serde_json::from_slice(&existing_bytes)
                        .map_err(|e| ConflictableTransactionError::Abort(StateStoreError::Json(e)))?;
                    if Self::is_stale(&existing, token) {
                        debug!(
                            run_id,
                            step = %token.step,
                            stored = existing.offset,
                            incoming = token.offset,
                            "Ignoring outdated progress token"
                        );
                        return Ok(());
                    }
                }

                tx_db.insert(key.as_bytes(), new_bytes.as_slice())?;
                tx_db.insert(cur.as_bytes(), token.step.as_bytes())?;
                Ok(())
            });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(StateStoreError::SaveToken(e.to_string())),
        }
    }

    async fn load(
        &self,
        run_id: &str,
        step: &str,
    ) -> Result<Option<ProgressToken>, StateStoreError> {
        match self.db.get(Self::tok_key(run_id, step))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, run_id: &str) -> Result<Vec<ProgressToken>, StateStoreError> {
        let prefix = format!("tok:{}:", run_id);
        let mut tokens = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (_key, value) = item?;
            tokens.push(serde_json::from_slice(&value)?);
        }
        Ok(tokens)
    }

    async fn current(&self, run_id: &str) -> Result<Option<String>, StateStoreError> {
        Ok(self
            .db
            .get(Self::cur_key(run_id))?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    async fn clear(&self, run_id: &str) -> Result<(), StateStoreError> {
        let mut batch = sled::Batch::default();
        for key in self.db.scan_prefix(format!("tok:{}:", run_id)).keys() {
            batch.remove(key?);
        }
        batch.remove(Self::cur_key(run_id).as_bytes());
        self.db.apply_batch(batch)?;
        self.db.flush_async().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn running(step: &str, offset: u64) -> ProgressToken {
        let mut token = ProgressToken::new(step);
        token.offset = offset;
        token.count = 100;
        token
    }

    #[tokio::test]
    async fn saves_and_lists_tokens_per_run() {
        let dir = tempdir().unwrap();
        let store = SledTokenStore::open(dir.path()).unwrap();

        store.save("run", &running("categories", 10)).await.unwrap();
        store.save("run", &running("products", 3)).await.unwrap();
        store.save("other", &running("orders", 1)).await.unwrap();

        let loaded = store.load("run", "categories").await.unwrap().unwrap();
        assert_eq!(loaded.offset, 10);
        assert_eq!(store.list("run").await.unwrap().len(), 2);
        assert_eq!(store.current("run").await.unwrap().as_deref(), Some("products"));

        store.clear("run").await.unwrap();
        assert!(store.list("run").await.unwrap().is_empty());
        assert_eq!(store.current("run").await.unwrap(), None);
        assert_eq!(store.list("other").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn keeps_newer_offset_over_outdated_chunk() {
        let dir = tempdir().unwrap();
        let store = SledTokenStore::open(dir.path()).unwrap();
        let started = Utc::now();

        let mut ahead = running("products", 40);
        ahead.start_time = Some(started);
        let mut behind = running("products", 20);
        behind.start_time = Some(started);

        store.save("run", &ahead).await.unwrap();
        store.save("run", &behind).await.unwrap();
        assert_eq!(store.load("run", "products").await.unwrap().unwrap().offset, 40);
    }

    #[tokio::test]
    async fn terminal_token_replaces_running_one() {
        let dir = tempdir().unwrap();
        let store = SledTokenStore::open(dir.path()).unwrap();
        let started = Utc::now();

        let mut token = running("prices", 40);
        token.start_time = Some(started);
        store.save("run", &token).await.unwrap();

        token.offset = 0;
        token.status = StepStatus::Done;
        store.save("run", &token).await.unwrap();
        let stored = store.load("run", "prices").await.unwrap().unwrap();
        assert_eq!(stored.status, StepStatus::Done);
    }
}
