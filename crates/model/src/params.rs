use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};

/// How order numbers that violate the target character set are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberValidationMode {
    /// Abort the step on the first invalid number.
    #[default]
    Complain,
    /// Fabricate a valid replacement number and continue.
    MakeValid,
    /// Import the number unchanged.
    Ignore,
}

impl FromStr for NumberValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "complain" => Ok(NumberValidationMode::Complain),
            "make_valid" | "makevalid" => Ok(NumberValidationMode::MakeValid),
            "ignore" => Ok(NumberValidationMode::Ignore),
            other => Err(format!("Unknown number validation mode: {other}")),
        }
    }
}

impl fmt::Display for NumberValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NumberValidationMode::Complain => "complain",
            NumberValidationMode::MakeValid => "make_valid",
            NumberValidationMode::Ignore => "ignore",
        })
    }
}

/// Source key -> target key tables supplied by the operator before a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemapTables {
    pub price_groups: HashMap<String, String>,
    pub languages: HashMap<String, String>,
    pub shops: HashMap<String, String>,
    pub tax_rates: HashMap<String, String>,
    pub customer_groups: HashMap<String, String>,
    pub order_statuses: HashMap<String, String>,
    pub payment_means: HashMap<String, String>,
}

impl RemapTables {
    fn lookup<'a>(table: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
        table.get(key.trim()).map(String::as_str)
    }

    pub fn price_group(&self, key: &str) -> Option<&str> {
        Self::lookup(&self.price_groups, key)
    }

    pub fn language(&self, key: &str) -> Option<&str> {
        Self::lookup(&self.languages, key)
    }

    pub fn shop(&self, key: &str) -> Option<&str> {
        Self::lookup(&self.shops, key)
    }

    pub fn tax_rate(&self, key: &str) -> Option<&str> {
        Self::lookup(&self.tax_rates, key)
    }

    pub fn customer_group(&self, key: &str) -> Option<&str> {
        Self::lookup(&self.customer_groups, key)
    }

    pub fn order_status(&self, key: &str) -> Option<&str> {
        Self::lookup(&self.order_statuses, key)
    }

    pub fn payment_mean(&self, key: &str) -> Option<&str> {
        Self::lookup(&self.payment_means, key)
    }

    /// Numeric target id for a remapped key.
    pub fn require_id(table: &str, mapped: Option<&str>, key: &str) -> Result<i64, RecordError> {
        mapped
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| RecordError::UnmappedKey {
                table: table.to_string(),
                key: key.to_string(),
            })
    }
}

/// Per-run configuration threaded unchanged through every chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    pub number_validation: NumberValidationMode,
    /// Prefix of fabricated order numbers.
    pub number_prefix: String,
    pub remap: RemapTables,
    /// Base URL or directory prepended to relative image paths.
    pub asset_base_path: Option<String>,
    /// Parent used for source categories without a parent.
    pub default_category_parent: i64,
    pub default_customer_group: String,
    pub default_shop_id: i64,
    /// Price group used when a price record carries none.
    pub default_price_group: String,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            number_validation: NumberValidationMode::Complain,
            number_prefix: "MIG".to_string(),
            remap: RemapTables::default(),
            asset_base_path: None,
            default_category_parent: 3,
            default_customer_group: "EK".to_string(),
            default_shop_id: 1,
            default_price_group: "EK".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing_accepts_legacy_spelling() {
        assert_eq!("makeValid".parse(), Ok(NumberValidationMode::MakeValid));
        assert_eq!("ignore".parse(), Ok(NumberValidationMode::Ignore));
        assert!("strict".parse::<NumberValidationMode>().is_err());
    }

    #[test]
    fn unmapped_keys_are_reported() {
        let mut remap = RemapTables::default();
        remap.shops.insert("1".into(), "2".into());
        assert_eq!(RemapTables::require_id("shops", remap.shop("1"), "1"), Ok(2));
        assert!(RemapTables::require_id("shops", remap.shop("9"), "9").is_err());
    }
}
