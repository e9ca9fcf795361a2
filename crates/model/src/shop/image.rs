use crate::{error::RecordError, records::record::SourceRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub product_source_id: Option<String>,
    pub order_number: Option<String>,
    /// Absolute URL or path relative to the asset base path.
    pub image: String,
    pub description: Option<String>,
    pub main: bool,
    pub position: Option<i64>,
}

impl ImageRecord {
    pub fn from_record(record: &SourceRecord) -> Result<Self, RecordError> {
        let product_source_id = record.string_any(&["productID", "product_id"]);
        let order_number = record.string("ordernumber");
        if product_source_id.is_none() && order_number.is_none() {
            return Err(RecordError::Missing("productID".into()));
        }
        Ok(ImageRecord {
            product_source_id,
            order_number,
            image: record
                .string_any(&["image", "img", "link"])
                .ok_or_else(|| RecordError::Missing("image".into()))?,
            description: record.string("description"),
            main: record.bool("main")?.unwrap_or(false),
            position: record.i64("position")?,
        })
    }

    /// File name without directories and query string.
    pub fn file_name(&self) -> &str {
        let path = self.image.split(['?', '#']).next().unwrap_or(&self.image);
        path.rsplit(['/', '\\']).next().unwrap_or(path)
    }

    /// Resolves the image location against `base` unless it is already absolute.
    pub fn location(&self, base: Option<&str>) -> String {
        let is_absolute = self.image.contains("://") || self.image.starts_with('/');
        match base {
            Some(base) if !is_absolute => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                self.image.trim_start_matches('/')
            ),
            _ => self.image.clone(),
        }
    }
}
