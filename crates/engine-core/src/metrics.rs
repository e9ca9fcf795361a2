use model::progress::ProgressToken;
use serde::{Deserialize, Serialize};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Token parameter holding the accumulated counters of a step.
pub const METRICS_PARAM: &str = "metrics";

#[derive(Debug, Default)]
struct InnerMetrics {
    inserted: AtomicU64,
    updated: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    deferred: AtomicU64,
    retries: AtomicU64,
}

/// Per-step record counters, shared between the run loop and its importers.
#[derive(Debug, Clone)]
pub struct StepMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub failed: u64,
    pub deferred: u64,
    pub retries: u64,
}

impl MetricsSnapshot {
    pub fn processed(&self) -> u64 {
        self.inserted + self.updated + self.skipped + self.failed
    }
}

impl StepMetrics {
    pub fn new() -> Self {
        StepMetrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    /// Continues counting from the snapshot stored in an earlier chunk's token.
    pub fn from_token(token: &ProgressToken) -> Self {
        let metrics = Self::new();
        let snapshot = token
            .param(METRICS_PARAM)
            .and_then(|v| serde_json::from_value::<MetricsSnapshot>(v.clone()).ok())
            .unwrap_or_default();
        let inner = &metrics.inner;
        inner.inserted.store(snapshot.inserted, Ordering::Relaxed);
        inner.updated.store(snapshot.updated, Ordering::Relaxed);
        inner.skipped.store(snapshot.skipped, Ordering::Relaxed);
        inner.failed.store(snapshot.failed, Ordering::Relaxed);
        inner.deferred.store(snapshot.deferred, Ordering::Relaxed);
        inner.retries.store(snapshot.retries, Ordering::Relaxed);
        metrics
    }

    pub fn write_to(&self, token: &mut ProgressToken) {
        if let Ok(value) = serde_json::to_value(self.snapshot()) {
            token.set_param(METRICS_PARAM, value);
        }
    }

    pub fn increment_inserted(&self) {
        self.inner.inserted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updated(&self) {
        self.inner.updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_skipped(&self) {
        self.inner.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.inner.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deferred(&self) {
        self.inner.deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retries(&self, count: u64) {
        self.inner.retries.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            inserted: self.inner.inserted.load(Ordering::Relaxed),
            updated: self.inner.updated.load(Ordering::Relaxed),
            skipped: self.inner.skipped.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
            deferred: self.inner.deferred.load(Ordering::Relaxed),
            retries: self.inner.retries.load(Ordering::Relaxed),
        }
    }
}

impl Default for StepMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_carry_over_between_chunks() {
        let metrics = StepMetrics::new();
        metrics.increment_inserted();
        metrics.increment_skipped();
        metrics.increment_retries(2);

        let mut token = ProgressToken::new("products");
        metrics.write_to(&mut token);

        let resumed = StepMetrics::from_token(&token);
        resumed.increment_updated();
        let snapshot = resumed.snapshot();
        assert_eq!(snapshot.inserted, 1);
        assert_eq!(snapshot.updated, 1);
        assert_eq!(snapshot.retries, 2);
        assert_eq!(snapshot.processed(), 3);
    }
}
