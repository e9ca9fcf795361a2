use std::time::{Duration, Instant};

/// Wall-clock (and optionally record) limit of one chunk invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBudget {
    pub max_execution: Duration,
    pub max_records: Option<u64>,
}

impl Default for ChunkBudget {
    fn default() -> Self {
        ChunkBudget {
            max_execution: Duration::from_secs(30),
            max_records: None,
        }
    }
}

impl ChunkBudget {
    pub fn new(max_execution: Duration) -> Self {
        ChunkBudget {
            max_execution,
            max_records: None,
        }
    }

    pub fn with_max_records(mut self, max_records: u64) -> Self {
        self.max_records = Some(max_records.max(1));
        self
    }

    /// Never yields before the source is exhausted.
    pub fn unbounded() -> Self {
        ChunkBudget {
            max_execution: Duration::MAX,
            max_records: None,
        }
    }

    /// Starts the per-invocation clock.
    pub fn start(&self) -> BudgetTimer {
        BudgetTimer {
            budget: *self,
            started: Instant::now(),
            records: 0,
        }
    }
}

/// Task clock of a single invocation. Unrelated to the step start time used
/// for progress estimates.
#[derive(Debug)]
pub struct BudgetTimer {
    budget: ChunkBudget,
    started: Instant,
    records: u64,
}

impl BudgetTimer {
    pub fn record(&mut self) {
        self.records += 1;
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn exhausted(&self) -> bool {
        if let Some(max) = self.budget.max_records {
            if self.records >= max {
                return true;
            }
        }
        self.elapsed() >= self.budget.max_execution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_limit_exhausts_budget() {
        let mut timer = ChunkBudget::unbounded().with_max_records(2).start();
        timer.record();
        assert!(!timer.exhausted());
        timer.record();
        assert!(timer.exhausted());
    }

    #[test]
    fn zero_duration_is_exhausted_immediately() {
        let timer = ChunkBudget::new(Duration::ZERO).start();
        assert!(timer.exhausted());
    }
}
