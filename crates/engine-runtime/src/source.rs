use async_trait::async_trait;
use connectors::{error::ProfileError, profile::SourceProfile};
use engine_core::{
    metrics::StepMetrics,
    retry::{RetryPolicy, classify_profile_error},
};
use model::{core::entity::SourceEntity, records::record::SourceRecord};
use std::sync::Arc;

/// Retries transient source failures before they abort a step.
pub struct RetryingProfile {
    inner: Arc<dyn SourceProfile>,
    policy: RetryPolicy,
    metrics: StepMetrics,
}

impl RetryingProfile {
    pub fn new(inner: Arc<dyn SourceProfile>, policy: RetryPolicy, metrics: StepMetrics) -> Self {
        RetryingProfile {
            inner,
            policy,
            metrics,
        }
    }
}

#[async_trait]
impl SourceProfile for RetryingProfile {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn count_for(&self, entity: SourceEntity) -> Result<u64, ProfileError> {
        self.policy
            .run_observed(
                || self.inner.count_for(entity),
                classify_profile_error,
                |_, _| self.metrics.increment_retries(1),
            )
            .await
            .map_err(|e| e.into_inner())
    }

    async fn page_for(
        &self,
        entity: SourceEntity,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<SourceRecord>, ProfileError> {
        self.policy
            .run_observed(
                || self.inner.page_for(entity, offset, limit),
                classify_profile_error,
                |_, _| self.metrics.increment_retries(1),
            )
            .await
            .map_err(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    /// Drops the first `failures` page queries.
    struct FlakyProfile {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SourceProfile for FlakyProfile {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn count_for(&self, _entity: SourceEntity) -> Result<u64, ProfileError> {
            Ok(1)
        }

        async fn page_for(
            &self,
            _entity: SourceEntity,
            _offset: u64,
            _limit: usize,
        ) -> Result<Vec<SourceRecord>, ProfileError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(ProfileError::Io(std::io::Error::other("connection reset")));
            }
            Ok(vec![SourceRecord::new().with("id", 1)])
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO, Duration::ZERO)
    }

    #[tokio::test]
    async fn transient_page_errors_are_retried_and_counted() {
        let metrics = StepMetrics::new();
        let profile = RetryingProfile::new(
            Arc::new(FlakyProfile {
                failures: 2,
                calls: AtomicUsize::new(0),
            }),
            policy(),
            metrics.clone(),
        );
        let page = profile.page_for(SourceEntity::Products, 0, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(metrics.snapshot().retries, 2);
    }

    #[tokio::test]
    async fn gives_up_after_policy_attempts() {
        let profile = RetryingProfile::new(
            Arc::new(FlakyProfile {
                failures: 10,
                calls: AtomicUsize::new(0),
            }),
            policy(),
            StepMetrics::new(),
        );
        let err = profile.page_for(SourceEntity::Products, 0, 10).await.unwrap_err();
        assert!(err.is_transient());
    }
}
