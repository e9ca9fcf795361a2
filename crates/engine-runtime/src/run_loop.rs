use crate::{error::MigrationError, source::RetryingProfile, step::StepName};
use connectors::profile::{DEFAULT_PAGE_SIZE, PagedCursor, RecordCursor, SourceProfile};
use engine_core::{
    budget::{BudgetTimer, ChunkBudget},
    metrics::{METRICS_PARAM, StepMetrics},
    progress::ProgressTracker,
    retry::RetryPolicy,
};
use engine_processing::{
    context::ImportContext,
    importer::{RecordImporter, importer_for},
    error::ImportError,
    outcome::{ImportOutcome, MergePolicy},
};
use model::{progress::ProgressToken, records::record::SourceRecord};
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Token parameter carrying records that could not be resolved yet.
pub const DEFERRED_PARAM: &str = "deferred";
/// Token parameter naming the step to run after a Done step.
pub const NEXT_STEP_PARAM: &str = "next_step";

/// Records buffered for the end-of-step retry passes.
///
/// A pass tries every `pending` record once. Records deferred again go to
/// `retry` and form the next pass, unless the pass resolved nothing.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DeferredQueue {
    pending: VecDeque<SourceRecord>,
    retry: Vec<SourceRecord>,
    progressed: bool,
}

impl DeferredQueue {
    fn from_token(tracker: &mut ProgressTracker) -> Self {
        let Some(value) = tracker.take_param(DEFERRED_PARAM) else {
            return Self::default();
        };
        match serde_json::from_value(value) {
            Ok(queue) => queue,
            Err(e) => {
                warn!(step = %tracker.token().step, error = %e, "Discarding undecodable deferred queue");
                Self::default()
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.retry.is_empty()
    }

    fn len(&self) -> usize {
        self.pending.len() + self.retry.len()
    }

    /// Starts the next pass. Returns the records given up on when the
    /// finished pass made no progress.
    fn next_pass(&mut self) -> Vec<SourceRecord> {
        let retry = std::mem::take(&mut self.retry);
        if self.progressed {
            self.pending = retry.into();
            self.progressed = false;
            Vec::new()
        } else {
            retry
        }
    }
}

/// Drives one step across as many invocations as its chunk budget needs.
///
/// Nothing is kept between invocations except the returned token: the caller
/// passes it back unchanged to continue.
pub struct MigrationRunLoop {
    profile: Arc<dyn SourceProfile>,
    ctx: ImportContext,
    budget: ChunkBudget,
    retry: RetryPolicy,
    page_size: usize,
    cancel: Option<CancellationToken>,
}

impl MigrationRunLoop {
    pub fn new(profile: Arc<dyn SourceProfile>, ctx: ImportContext) -> Self {
        MigrationRunLoop {
            profile,
            ctx,
            budget: ChunkBudget::default(),
            retry: RetryPolicy::for_database(),
            page_size: DEFAULT_PAGE_SIZE,
            cancel: None,
        }
    }

    pub fn with_budget(mut self, budget: ChunkBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Ends the current chunk early (with a Running token) once cancelled.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn context(&self) -> &ImportContext {
        &self.ctx
    }

    /// Runs one chunk of `step`. `None` starts the step; a terminal token
    /// restarts it from offset 0.
    pub async fn run(
        &self,
        step: StepName,
        token: Option<ProgressToken>,
    ) -> Result<ProgressToken, MigrationError> {
        let token = token.unwrap_or_else(|| ProgressToken::new(step.as_str()));
        if token.step != step.as_str() {
            return Err(MigrationError::StepMismatch {
                expected: step.as_str().to_string(),
                found: token.step,
            });
        }

        let restart = token.is_finished();
        let mut tracker = ProgressTracker::resume(token);
        if restart {
            tracker.take_param(DEFERRED_PARAM);
            tracker.take_param(METRICS_PARAM);
            tracker.take_param(NEXT_STEP_PARAM);
        }
        let metrics = StepMetrics::from_token(tracker.token());
        let mut deferred = DeferredQueue::from_token(&mut tracker);
        let importer = importer_for(step.entity());
        let profile: Arc<dyn SourceProfile> = Arc::new(RetryingProfile::new(
            self.profile.clone(),
            self.retry.clone(),
            metrics.clone(),
        ));
        let mut timer = self.budget.start();

        let offset = tracker.offset();
        let mut cursor =
            match PagedCursor::open(profile, step.entity(), offset, self.page_size).await {
                Ok(cursor) => cursor,
                Err(e) => return Ok(abort(step, tracker, &metrics, format!("source query failed: {e}"))),
            };
        tracker.start(cursor.row_count() + offset);
        info!(step = %step, offset, count = tracker.count(), deferred = deferred.len(), "Chunk started");

        loop {
            let record = match cursor.fetch().await {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => {
                    return Ok(abort(step, tracker, &metrics, format!("source query failed: {e}")));
                }
            };

            match importer.import(&self.ctx, &record).await {
                Ok(ImportOutcome::Deferred { reason }) => {
                    debug!(step = %step, offset = tracker.offset(), %reason, "Record deferred");
                    metrics.increment_deferred();
                    deferred.pending.push_back(record);
                }
                Ok(outcome) => count_outcome(step, &metrics, &outcome),
                Err(e) => {
                    error!(step = %step, offset = tracker.offset(), error = %e, "Step aborted");
                    return Ok(abort(step, tracker, &metrics, e.to_string()));
                }
            }

            tracker.advance();
            timer.record();
            if self.should_yield(&timer) {
                return Ok(suspend(step, tracker, &metrics, deferred, &timer));
            }
        }

        match self
            .drain_deferred(step, importer.as_ref(), &metrics, &mut deferred, &mut timer)
            .await
        {
            Ok(true) => {}
            Ok(false) => return Ok(suspend(step, tracker, &metrics, deferred, &timer)),
            Err(e) => {
                error!(step = %step, error = %e, "Step aborted during retry pass");
                return Ok(abort(step, tracker, &metrics, e.to_string()));
            }
        }

        Ok(finish(step, tracker, &metrics))
    }

    /// Retries deferred records pass by pass. Returns `false` when the
    /// budget ran out before the queue was empty. At least one record is
    /// tried per call, so an exhausted budget still makes progress.
    async fn drain_deferred(
        &self,
        step: StepName,
        importer: &dyn RecordImporter,
        metrics: &StepMetrics,
        deferred: &mut DeferredQueue,
        timer: &mut BudgetTimer,
    ) -> Result<bool, ImportError> {
        while !deferred.is_empty() {
            if deferred.pending.is_empty() {
                for record in deferred.next_pass() {
                    warn!(step = %step, record = ?record, "Dropping record with unresolved references");
                    metrics.increment_skipped();
                }
                continue;
            }
            let Some(record) = deferred.pending.pop_front() else {
                continue;
            };

            match importer.import(&self.ctx, &record).await? {
                ImportOutcome::Deferred { .. } => {
                    metrics.increment_deferred();
                    deferred.retry.push(record);
                }
                outcome => {
                    deferred.progressed = true;
                    count_outcome(step, metrics, &outcome);
                }
            }
            timer.record();
            if !deferred.is_empty() && self.should_yield(timer) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn should_yield(&self, timer: &BudgetTimer) -> bool {
        timer.exhausted()
            || self
                .cancel
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
    }
}

fn count_outcome(step: StepName, metrics: &StepMetrics, outcome: &ImportOutcome) {
    match outcome {
        ImportOutcome::Imported { target_id, action } => {
            debug!(step = %step, target_id, %action, "Record imported");
            match action {
                MergePolicy::Insert => metrics.increment_inserted(),
                MergePolicy::Update => metrics.increment_updated(),
            }
        }
        ImportOutcome::Skipped { reason } => {
            warn!(step = %step, %reason, "Record skipped");
            metrics.increment_skipped();
        }
        ImportOutcome::Failed { reason } => {
            warn!(step = %step, %reason, "Record failed");
            metrics.increment_failed();
        }
        ImportOutcome::Deferred { .. } => metrics.increment_deferred(),
    }
}

fn suspend(
    step: StepName,
    mut tracker: ProgressTracker,
    metrics: &StepMetrics,
    deferred: DeferredQueue,
    timer: &BudgetTimer,
) -> ProgressToken {
    tracker.checkpoint();
    if !deferred.is_empty() {
        if let Ok(value) = serde_json::to_value(&deferred) {
            tracker.add_param(DEFERRED_PARAM, value);
        }
    }
    let mut token = tracker.into_token();
    metrics.write_to(&mut token);
    info!(
        step = %step,
        offset = token.offset,
        count = token.count,
        records = timer.records(),
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "Chunk finished"
    );
    token
}

fn finish(step: StepName, mut tracker: ProgressTracker, metrics: &StepMetrics) -> ProgressToken {
    let m = metrics.snapshot();
    tracker.done(format!(
        "{} records: {} inserted, {} updated, {} skipped, {} failed",
        tracker.count(),
        m.inserted,
        m.updated,
        m.skipped,
        m.failed
    ));
    if let Some(next) = step.next() {
        tracker.add_param(NEXT_STEP_PARAM, next.as_str());
    }
    let mut token = tracker.into_token();
    metrics.write_to(&mut token);
    token
}

fn abort(
    step: StepName,
    mut tracker: ProgressTracker,
    metrics: &StepMetrics,
    message: String,
) -> ProgressToken {
    let offset = tracker.offset();
    let count = tracker.count();
    tracker.error(format!("{step} stopped at {offset}/{count}: {message}"));
    let mut token = tracker.into_token();
    metrics.write_to(&mut token);
    token
}
