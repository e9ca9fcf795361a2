use crate::{error::ProfileError, profile::SourceProfile};
use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord};
use model::{core::entity::SourceEntity, core::value::Value, records::record::SourceRecord};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Profile over a directory of CSV exports, one `<entity>.csv` per entity.
///
/// Rows are served in file order; every cell arrives as a string and is
/// coerced by the typed record projections.
#[derive(Debug, Clone)]
pub struct CsvProfile {
    name: String,
    dir: PathBuf,
    delimiter: u8,
}

impl CsvProfile {
    pub fn new(name: &str, dir: impl Into<PathBuf>) -> Self {
        CsvProfile {
            name: name.to_string(),
            dir: dir.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn path_for(&self, entity: SourceEntity) -> PathBuf {
        self.dir.join(format!("{entity}.csv"))
    }

    fn reader(&self, path: &Path) -> Result<csv::Reader<std::fs::File>, ProfileError> {
        Ok(ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_path(path)?)
    }

    fn to_record(headers: &StringRecord, row: &StringRecord) -> SourceRecord {
        headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (header.trim().to_string(), value)
            })
            .collect()
    }
}

#[async_trait]
impl SourceProfile for CsvProfile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count_for(&self, entity: SourceEntity) -> Result<u64, ProfileError> {
        let path = self.path_for(entity);
        if !path.exists() {
            debug!(%entity, file = %path.display(), "No export file, nothing to count");
            return Ok(0);
        }
        let mut count = 0;
        for row in self.reader(&path)?.records() {
            row?;
            count += 1;
        }
        Ok(count)
    }

    async fn page_for(
        &self,
        entity: SourceEntity,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<SourceRecord>, ProfileError> {
        let path = self.path_for(entity);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = self.reader(&path)?;
        let headers = reader.headers()?.clone();

        let mut page = Vec::with_capacity(limit);
        for (line, row) in reader.records().enumerate().skip(offset as usize).take(limit) {
            let row = row?;
            if row.len() != headers.len() {
                warn!(%entity, line = line + 2, "Row width differs from header");
            }
            page.push(Self::to_record(&headers, &row));
        }
        Ok(page)
    }
}
