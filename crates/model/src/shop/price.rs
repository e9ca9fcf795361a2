use crate::{error::RecordError, records::record::SourceRecord};
use serde::{Deserialize, Serialize};

/// Converts a gross amount to net for storage.
pub fn gross_to_net(gross: f64, tax_rate: f64) -> f64 {
    gross * 100.0 / (100.0 + tax_rate)
}

/// Applies a percent discount to a base price.
pub fn discounted(base: f64, percent: f64) -> f64 {
    base * (100.0 - percent) / 100.0
}

/// One quantity-break price row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    pub price_group: String,
    pub article_id: i64,
    pub detail_id: i64,
    pub from: i64,
    /// Inclusive upper bound, `None` for the unbounded last tier.
    pub to: Option<i64>,
    pub price: f64,
    pub pseudo_price: f64,
    pub base_price: f64,
    pub percent: f64,
}

/// Typed projection of a price row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub product_source_id: Option<String>,
    pub order_number: Option<String>,
    pub price_group: Option<String>,
    pub from: i64,
    pub price: Option<f64>,
    pub pseudo_price: Option<f64>,
    pub base_price: Option<f64>,
    pub percent: Option<f64>,
    pub tax_rate: Option<f64>,
}

impl PriceRecord {
    pub fn from_record(record: &SourceRecord) -> Result<Self, RecordError> {
        let product_source_id = record.string_any(&["productID", "product_id"]);
        let order_number = record.string("ordernumber");
        if product_source_id.is_none() && order_number.is_none() {
            return Err(RecordError::Missing("productID".into()));
        }

        let from = record.i64("from")?.unwrap_or(1);
        if from < 1 {
            return Err(RecordError::Invalid {
                field: "from".into(),
                value: from.to_string(),
            });
        }

        Ok(PriceRecord {
            product_source_id,
            order_number,
            price_group: record.string("pricegroup"),
            from,
            price: record.f64("price")?,
            pseudo_price: record.f64("pseudoprice")?,
            base_price: record.f64("baseprice")?,
            percent: record.f64("percent")?,
            tax_rate: record.f64("tax")?.filter(|t| *t > 0.0),
        })
    }

    /// Gross values converted to net when a tax rate is present.
    pub fn net(&self, value: f64) -> f64 {
        match self.tax_rate {
            Some(tax) => gross_to_net(value, tax),
            None => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gross_to_net_is_exact_for_common_rates() {
        assert_eq!(gross_to_net(119.0, 19.0), 100.0);
        assert_eq!(gross_to_net(107.0, 7.0), 100.0);
    }

    #[test]
    fn defaults_to_first_tier() {
        let price = PriceRecord::from_record(&SourceRecord::new().with("productID", 1).with("price", 5))
            .unwrap();
        assert_eq!(price.from, 1);
        assert_eq!(price.net(5.0), 5.0);
    }

    #[test]
    fn rejects_tier_zero() {
        let record = SourceRecord::new().with("productID", 1).with("from", 0);
        assert!(PriceRecord::from_record(&record).is_err());
    }

    #[test]
    fn discount_scales_base() {
        assert_eq!(discounted(200.0, 10.0), 180.0);
    }
}
