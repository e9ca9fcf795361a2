//! One importer per source entity. Each record is written inside its own
//! unit of work so a failing record leaves nothing behind.

use crate::outcome::ImportOutcome;
use model::{error::RecordError, params::RunParams};

pub mod article_categories;
pub mod categories;
pub mod configurators;
pub mod customers;
pub mod images;
pub mod order_details;
pub mod orders;
pub mod prices;
pub mod products;
pub mod ratings;
pub mod translations;

/// Target price group for a source group: remapped, as-is, or the run default.
pub(crate) fn price_group(params: &RunParams, raw: Option<&str>) -> String {
    match raw {
        Some(key) => params.remap.price_group(key).unwrap_or(key).to_string(),
        None => params.default_price_group.clone(),
    }
}

/// Outcome for a record whose fields could not be projected.
pub(crate) fn malformed(err: RecordError) -> ImportOutcome {
    ImportOutcome::Failed {
        reason: err.to_string(),
    }
}
