use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::{collections::BTreeMap, fmt};

/// Progress value reported once a step reached a terminal state.
pub const PROGRESS_FINISHED: f64 = -1.0;

/// Remaining-time estimate while nothing was processed yet.
pub const ESTIMATE_UNKNOWN: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StepStatus {
    #[default]
    Running,
    Done,
    Error,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Running => "Running",
            StepStatus::Done => "Done",
            StepStatus::Error => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Running)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resumable position of one migration step.
///
/// The token is the only state that survives between two chunk invocations:
/// the caller stores whatever it gets back and passes it in unchanged on the
/// next call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressToken {
    pub step: String,
    pub offset: u64,
    pub count: u64,
    pub status: StepStatus,
    pub message: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    /// Fraction in `0.0..=1.0`, or [`PROGRESS_FINISHED`].
    pub progress: f64,
    /// Seconds, or [`ESTIMATE_UNKNOWN`].
    pub estimated_remaining_secs: i64,
    #[serde(default)]
    pub extra_params: BTreeMap<String, JsonValue>,
}

impl ProgressToken {
    pub fn new(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            offset: 0,
            count: 0,
            status: StepStatus::Running,
            message: None,
            start_time: None,
            progress: 0.0,
            estimated_remaining_secs: ESTIMATE_UNKNOWN,
            extra_params: BTreeMap::new(),
        }
    }

    pub fn is_first_chunk(&self) -> bool {
        self.offset == 0 && self.start_time.is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn param(&self, key: &str) -> Option<&JsonValue> {
        self.extra_params.get(key)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.extra_params.get(key).and_then(JsonValue::as_str)
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.extra_params.insert(key.into(), value.into());
    }

    pub fn take_param(&mut self, key: &str) -> Option<JsonValue> {
        self.extra_params.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_survives_json_echo() {
        let mut token = ProgressToken::new("products");
        token.offset = 40;
        token.count = 100;
        token.set_param("next_step", "prices");

        let json = serde_json::to_string(&token).unwrap();
        let back: ProgressToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
        assert_eq!(back.param_str("next_step"), Some("prices"));
    }

    #[test]
    fn missing_extra_params_default_to_empty() {
        let json = r#"{"step":"orders","offset":3,"count":9,"status":"Running","message":null,
            "start_time":null,"progress":0.3,"estimated_remaining_secs":-1}"#;
        let token: ProgressToken = serde_json::from_str(json).unwrap();
        assert!(token.extra_params.is_empty());
        assert!(!token.is_first_chunk());
    }
}
