use crate::{core::value::Value, error::RecordError};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row extracted from a legacy schema: a flat bag of named scalars.
///
/// Field names are matched case-insensitively, the way the legacy SQL
/// aliases come back from different database drivers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    fields: BTreeMap<String, Value>,
}

impl SourceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_ascii_lowercase(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(&field.to_ascii_lowercase())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        match self.fields.get(field) {
            Some(v) => Some(v),
            None => self.fields.get(&field.to_ascii_lowercase()),
        }
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field).cloned().unwrap_or(Value::Null)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Trimmed string, `None` when absent, NULL or blank.
    pub fn string(&self, field: &str) -> Option<String> {
        self.get(field)
            .filter(|v| !v.is_blank())
            .and_then(Value::as_string)
            .map(|s| s.trim().to_string())
    }

    /// First non-blank string among several alias names.
    pub fn string_any(&self, fields: &[&str]) -> Option<String> {
        fields.iter().find_map(|f| self.string(f))
    }

    pub fn i64(&self, field: &str) -> Result<Option<i64>, RecordError> {
        match self.get(field) {
            None => Ok(None),
            Some(v) if v.is_blank() => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| RecordError::invalid(field, v)),
        }
    }

    pub fn f64(&self, field: &str) -> Result<Option<f64>, RecordError> {
        match self.get(field) {
            None => Ok(None),
            Some(v) if v.is_blank() => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| RecordError::invalid(field, v)),
        }
    }

    pub fn bool(&self, field: &str) -> Result<Option<bool>, RecordError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| RecordError::invalid(field, v)),
        }
    }

    /// Unparseable or zero dates are treated as absent rather than invalid.
    pub fn datetime(&self, field: &str) -> Option<NaiveDateTime> {
        self.get(field).and_then(Value::as_datetime)
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        self.get(field).and_then(Value::as_date)
    }

    pub fn required_string(&self, field: &str) -> Result<String, RecordError> {
        self.string(field)
            .ok_or_else(|| RecordError::Missing(field.to_string()))
    }

    pub fn required_i64(&self, field: &str) -> Result<i64, RecordError> {
        self.i64(field)?
            .ok_or_else(|| RecordError::Missing(field.to_string()))
    }

    /// Positive id, `None` for absent, blank or `0`.
    pub fn id(&self, field: &str) -> Result<Option<i64>, RecordError> {
        Ok(self.i64(field)?.filter(|id| *id > 0))
    }
}

impl FromIterator<(String, Value)> for SourceRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = SourceRecord::new();
        for (k, v) in iter {
            record.insert(&k, v);
        }
        record
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for SourceRecord {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
    }
}
