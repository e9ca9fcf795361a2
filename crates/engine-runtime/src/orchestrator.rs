use crate::{
    error::MigrationError,
    run_loop::{MigrationRunLoop, NEXT_STEP_PARAM},
    step::StepName,
};
use engine_core::state::TokenStore;
use model::progress::{ProgressToken, StepStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Sequences the configured steps and persists every returned token, so a
/// restarted process continues with the step and offset it stopped at.
pub struct StepOrchestrator {
    run_loop: MigrationRunLoop,
    steps: Vec<StepName>,
    tokens: Arc<dyn TokenStore>,
    run_id: String,
}

impl StepOrchestrator {
    pub fn new(
        run_loop: MigrationRunLoop,
        tokens: Arc<dyn TokenStore>,
        run_id: impl Into<String>,
    ) -> Self {
        StepOrchestrator {
            run_loop,
            steps: StepName::ORDER.to_vec(),
            tokens,
            run_id: run_id.into(),
        }
    }

    pub fn with_steps(mut self, steps: Vec<StepName>) -> Self {
        self.steps = steps;
        self
    }

    pub fn steps(&self) -> &[StepName] {
        &self.steps
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_loop(&self) -> &MigrationRunLoop {
        &self.run_loop
    }

    /// Runs one chunk of `step` from its stored token and stores the result.
    pub async fn run_chunk(&self, step: StepName) -> Result<ProgressToken, MigrationError> {
        let stored = self.tokens.load(&self.run_id, step.as_str()).await?;
        let mut token = self.run_loop.run(step, stored).await?;

        if token.status == StepStatus::Done {
            match step.next_in(&self.steps) {
                Some(next) => token.set_param(NEXT_STEP_PARAM, next.as_str()),
                None => {
                    token.take_param(NEXT_STEP_PARAM);
                }
            }
        }
        self.tokens.save(&self.run_id, &token).await?;
        Ok(token)
    }

    /// First configured step that has not reported Done yet.
    pub async fn next_pending(&self) -> Result<Option<StepName>, MigrationError> {
        for step in &self.steps {
            match self.tokens.load(&self.run_id, step.as_str()).await? {
                Some(token) if token.status == StepStatus::Done => continue,
                _ => return Ok(Some(*step)),
            }
        }
        Ok(None)
    }

    /// Stored tokens of the configured steps, in step order.
    pub async fn tokens(&self) -> Result<Vec<ProgressToken>, MigrationError> {
        let mut tokens = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            if let Some(token) = self.tokens.load(&self.run_id, step.as_str()).await? {
                tokens.push(token);
            }
        }
        Ok(tokens)
    }

    /// Invokes chunks until every configured step is Done. Stops between
    /// chunks once `cancel` fires, leaving the stored tokens resumable.
    pub async fn run_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProgressToken>, MigrationError> {
        info!(run_id = %self.run_id, steps = self.steps.len(), "Migration started");

        loop {
            if cancel.is_cancelled() {
                warn!(run_id = %self.run_id, "Shutdown requested, progress saved");
                return Err(MigrationError::Interrupted);
            }
            let Some(step) = self.next_pending().await? else {
                break;
            };

            let token = self.run_chunk(step).await?;
            match token.status {
                StepStatus::Running => info!(
                    step = %step,
                    offset = token.offset,
                    count = token.count,
                    eta_secs = token.estimated_remaining_secs,
                    "Step in progress"
                ),
                StepStatus::Done => {}
                StepStatus::Error => {
                    return Err(MigrationError::StepFailed {
                        step: step.to_string(),
                        message: token.message.unwrap_or_default(),
                    });
                }
            }
        }

        info!(run_id = %self.run_id, "Migration completed");
        self.tokens().await
    }

    /// Forgets all stored tokens of this run.
    pub async fn reset_tokens(&self) -> Result<(), MigrationError> {
        self.tokens.clear(&self.run_id).await?;
        Ok(())
    }
}
