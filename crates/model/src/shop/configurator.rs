use crate::{error::RecordError, records::record::SourceRecord};
use serde::{Deserialize, Serialize};

/// Parses `Group:Option|Group:Option`. Malformed pairs are dropped.
pub fn parse_option_list(raw: &str) -> Vec<(String, String)> {
    raw.split('|')
        .filter_map(|pair| {
            let (group, option) = pair.split_once(':')?;
            let (group, option) = (group.trim(), option.trim());
            (!group.is_empty() && !option.is_empty())
                .then(|| (group.to_string(), option.to_string()))
        })
        .collect()
}

/// One configurator assignment: the variant `product_source_id` carries
/// `option` of `group`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguratorRecord {
    pub product_source_id: String,
    pub order_number: Option<String>,
    pub group: String,
    pub option: String,
    pub group_position: i64,
    pub option_position: i64,
}

impl ConfiguratorRecord {
    pub fn from_record(record: &SourceRecord) -> Result<Self, RecordError> {
        Ok(ConfiguratorRecord {
            product_source_id: record
                .string_any(&["productID", "product_id"])
                .ok_or_else(|| RecordError::Missing("productID".into()))?,
            order_number: record.string("ordernumber"),
            group: record
                .string_any(&["group_name", "group"])
                .ok_or_else(|| RecordError::Missing("group_name".into()))?,
            option: record
                .string_any(&["option_name", "option", "value"])
                .ok_or_else(|| RecordError::Missing("option_name".into()))?,
            group_position: record.i64("group_position")?.unwrap_or(0),
            option_position: record.i64("option_position")?.unwrap_or(0),
        })
    }
}
