use crate::{error::RecordError, records::record::SourceRecord};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Highest number of points a vote can carry in the target schema.
pub const MAX_POINTS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub product_source_id: String,
    pub author: String,
    pub headline: String,
    pub comment: String,
    pub points: f64,
    pub active: bool,
    pub email: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl RatingRecord {
    pub fn from_record(record: &SourceRecord) -> Result<Self, RecordError> {
        let points = record
            .f64("points")?
            .ok_or_else(|| RecordError::Missing("points".into()))?;
        // Some profiles report on a 0..10 scale.
        let scale = record.f64("max_points")?.filter(|m| *m > 0.0).unwrap_or(MAX_POINTS);
        let points = (points * MAX_POINTS / scale).clamp(0.0, MAX_POINTS);

        Ok(RatingRecord {
            product_source_id: record
                .string_any(&["productID", "product_id"])
                .ok_or_else(|| RecordError::Missing("productID".into()))?,
            author: record.string("name").unwrap_or_default(),
            headline: record.string("headline").unwrap_or_default(),
            comment: record.string("comment").unwrap_or_default(),
            points,
            active: record.bool("active")?.unwrap_or(true),
            email: record.string("email"),
            created_at: record.datetime("date"),
        })
    }
}
