use chrono::{DateTime, Utc};
use model::progress::{ESTIMATE_UNKNOWN, PROGRESS_FINISHED, ProgressToken, StepStatus};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, info};

/// Offset, total and timing of one step, carried between chunks inside a
/// [`ProgressToken`].
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    token: ProgressToken,
}

impl ProgressTracker {
    pub fn new(step: impl Into<String>) -> Self {
        ProgressTracker {
            token: ProgressToken::new(step),
        }
    }

    /// Continues from a token returned by an earlier chunk. Terminal tokens
    /// restart the step from offset 0.
    pub fn resume(mut token: ProgressToken) -> Self {
        if token.status.is_terminal() {
            token.status = StepStatus::Running;
            token.offset = 0;
            token.start_time = None;
            token.message = None;
            token.progress = 0.0;
            token.estimated_remaining_secs = ESTIMATE_UNKNOWN;
        }
        ProgressTracker { token }
    }

    /// Fixes the step total. The start time is recorded on the first chunk only.
    pub fn start(&mut self, count: u64) {
        self.start_at(count, Utc::now());
    }

    pub fn start_at(&mut self, count: u64, now: DateTime<Utc>) {
        self.token.count = count.max(self.token.offset);
        self.token.status = StepStatus::Running;
        if self.token.start_time.is_none() {
            self.token.start_time = Some(now);
            info!(step = %self.token.step, count, "Step started");
        }
        self.refresh_progress(now);
    }

    /// Counts one processed record (imported or skipped alike).
    pub fn advance(&mut self) -> u64 {
        self.token.offset += 1;
        if self.token.offset > self.token.count {
            // Source grew between chunks.
            self.token.count = self.token.offset;
        }
        self.token.offset
    }

    /// `(now - start) / offset * (count - offset)`, or `None` before the
    /// first record.
    pub fn estimate_remaining(&self) -> Option<Duration> {
        self.estimate_remaining_at(Utc::now())
    }

    pub fn estimate_remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let start = self.token.start_time?;
        if self.token.offset == 0 {
            return None;
        }
        let elapsed = (now - start).to_std().unwrap_or_default();
        let remaining = self.token.count.saturating_sub(self.token.offset);
        let per_record = elapsed.as_secs_f64() / self.token.offset as f64;
        Some(Duration::from_secs_f64(per_record * remaining as f64))
    }

    /// Updates the progress fraction and remaining-time estimate for reporting.
    pub fn checkpoint(&mut self) {
        self.refresh_progress(Utc::now());
    }

    fn refresh_progress(&mut self, now: DateTime<Utc>) {
        self.token.progress = if self.token.count == 0 {
            0.0
        } else {
            self.token.offset as f64 / self.token.count as f64
        };
        self.token.estimated_remaining_secs = self
            .estimate_remaining_at(now)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(ESTIMATE_UNKNOWN);
    }

    pub fn done(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(step = %self.token.step, count = self.token.count, %message, "Step done");
        self.finish(StepStatus::Done, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(step = %self.token.step, offset = self.token.offset, %message, "Step aborted");
        self.finish(StepStatus::Error, message);
    }

    fn finish(&mut self, status: StepStatus, message: String) {
        self.token.status = status;
        self.token.message = Some(message);
        self.token.offset = 0;
        self.token.progress = PROGRESS_FINISHED;
        self.token.estimated_remaining_secs = ESTIMATE_UNKNOWN;
    }

    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.token.set_param(key, value);
    }

    pub fn param(&self, key: &str) -> Option<&JsonValue> {
        self.token.param(key)
    }

    pub fn take_param(&mut self, key: &str) -> Option<JsonValue> {
        self.token.take_param(key)
    }

    pub fn offset(&self) -> u64 {
        self.token.offset
    }

    pub fn count(&self) -> u64 {
        self.token.count
    }

    pub fn status(&self) -> StepStatus {
        self.token.status
    }

    pub fn is_first_chunk(&self) -> bool {
        self.token.is_first_chunk()
    }

    pub fn token(&self) -> &ProgressToken {
        &self.token
    }

    pub fn into_token(mut self) -> ProgressToken {
        if !self.token.status.is_terminal() {
            self.refresh_progress(Utc::now());
        }
        self.token
    }
}
