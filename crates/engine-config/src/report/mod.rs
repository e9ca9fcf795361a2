use chrono::{DateTime, Utc};
use engine_core::metrics::{METRICS_PARAM, MetricsSnapshot};
use model::progress::{ProgressToken, StepStatus};
use serde::Serialize;
use std::fmt;

/// Human and machine readable view of a stored step token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step: String,
    pub status: StepStatus,
    pub offset: u64,
    pub count: u64,
    /// Percent, absent once the step reached a terminal state.
    pub percent: Option<f64>,
    pub estimated_remaining_secs: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub next_step: Option<String>,
    pub metrics: MetricsSnapshot,
}

impl StepReport {
    pub fn from_token(token: &ProgressToken) -> Self {
        let metrics = token
            .param(METRICS_PARAM)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        let running = !token.status.is_terminal();

        StepReport {
            step: token.step.clone(),
            status: token.status,
            offset: token.offset,
            count: token.count,
            percent: running.then(|| (token.progress * 1000.0).round() / 10.0),
            estimated_remaining_secs: (running && token.estimated_remaining_secs >= 0)
                .then_some(token.estimated_remaining_secs),
            started_at: token.start_time,
            message: token.message.clone(),
            next_step: token.param_str("next_step").map(str::to_string),
            metrics,
        }
    }
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<20} {:<8}", self.step, self.status)?;
        match self.percent {
            Some(pct) => write!(f, " {}/{} ({pct:.1}%)", self.offset, self.count)?,
            None => write!(f, " {}", self.count)?,
        }
        let m = &self.metrics;
        write!(
            f,
            " ins={} upd={} skip={} fail={}",
            m.inserted, m.updated, m.skipped, m.failed
        )?;
        if let Some(secs) = self.estimated_remaining_secs {
            write!(f, " eta={secs}s")?;
        }
        if let Some(message) = &self.message {
            write!(f, " {message}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::metrics::StepMetrics;
    use model::progress::PROGRESS_FINISHED;

    #[test]
    fn running_token_reports_percent() {
        let mut token = ProgressToken::new("products");
        token.offset = 25;
        token.count = 200;
        token.progress = 0.125;
        token.estimated_remaining_secs = 70;
        let metrics = StepMetrics::new();
        metrics.increment_inserted();
        metrics.write_to(&mut token);

        let report = StepReport::from_token(&token);
        assert_eq!(report.percent, Some(12.5));
        assert_eq!(report.estimated_remaining_secs, Some(70));
        assert_eq!(report.metrics.inserted, 1);

        let line = report.to_string();
        assert!(line.contains("25/200 (12.5%)"));
        assert!(line.contains("eta=70s"));
    }

    #[test]
    fn finished_token_has_no_percent() {
        let mut token = ProgressToken::new("orders");
        token.status = StepStatus::Done;
        token.count = 4;
        token.progress = PROGRESS_FINISHED;
        token.message = Some("4 records".into());
        token.set_param("next_step", "order_details");

        let report = StepReport::from_token(&token);
        assert_eq!(report.percent, None);
        assert_eq!(report.next_step.as_deref(), Some("order_details"));
        assert!(report.to_string().ends_with("4 records"));
    }
}
