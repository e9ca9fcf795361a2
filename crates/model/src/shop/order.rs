use crate::{error::RecordError, records::record::SourceRecord, shop::customer::Address};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub source_id: String,
    pub order_number: Option<String>,
    pub customer_source_id: Option<String>,
    pub ordered_at: Option<NaiveDateTime>,
    pub invoice_amount: f64,
    pub invoice_amount_net: Option<f64>,
    pub invoice_shipping: f64,
    pub invoice_shipping_net: Option<f64>,
    pub status: Option<String>,
    pub cleared: Option<String>,
    pub payment: Option<String>,
    pub shop: Option<String>,
    pub currency: String,
    pub currency_factor: f64,
    pub comment: Option<String>,
    pub customer_comment: Option<String>,
    pub net: bool,
    pub tax_free: bool,
    pub tracking_code: Option<String>,
    pub billing: Address,
    pub shipping: Option<Address>,
}

impl OrderRecord {
    pub fn from_record(record: &SourceRecord) -> Result<Self, RecordError> {
        let invoice_amount = record
            .f64("invoice_amount")?
            .ok_or_else(|| RecordError::Missing("invoice_amount".into()))?;

        Ok(OrderRecord {
            source_id: record
                .string_any(&["orderID", "order_id", "id"])
                .ok_or_else(|| RecordError::Missing("orderID".into()))?,
            order_number: record.string("ordernumber"),
            customer_source_id: record.string_any(&["customerID", "customer_id"]),
            ordered_at: record.datetime("date").or_else(|| record.datetime("ordertime")),
            invoice_amount,
            invoice_amount_net: record.f64("invoice_amount_net")?,
            invoice_shipping: record.f64("invoice_shipping")?.unwrap_or(0.0),
            invoice_shipping_net: record.f64("invoice_shipping_net")?,
            status: record.string_any(&["statusID", "status"]),
            cleared: record.string_any(&["clearedID", "cleared"]),
            payment: record.string_any(&["paymentID", "payment"]),
            shop: record.string_any(&["subshopID", "shopID"]),
            currency: record.string("currency").unwrap_or_else(|| "EUR".to_string()),
            currency_factor: record.f64("currency_factor")?.unwrap_or(1.0),
            comment: record.string("comment"),
            customer_comment: record.string("customercomment"),
            net: record.bool("net")?.unwrap_or(false),
            tax_free: record.bool("taxfree")?.unwrap_or(false),
            tracking_code: record.string("trackingcode"),
            billing: Address::from_record(record, "billing"),
            shipping: Some(Address::from_record(record, "shipping")).filter(|a| !a.is_empty()),
        })
    }
}

/// One line item of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetailRecord {
    pub source_id: String,
    pub order_source_id: String,
    pub product_source_id: Option<String>,
    pub article_order_number: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub tax_rate: Option<f64>,
    /// 0 = article, 2 = voucher, 3 = rebate, 4 = surcharge.
    pub mode: i64,
}

impl OrderDetailRecord {
    pub fn from_record(record: &SourceRecord) -> Result<Self, RecordError> {
        let quantity = record.i64("quantity")?.unwrap_or(1);
        if quantity < 0 {
            return Err(RecordError::Invalid {
                field: "quantity".into(),
                value: quantity.to_string(),
            });
        }
        Ok(OrderDetailRecord {
            source_id: record
                .string_any(&["orderdetailsID", "id"])
                .ok_or_else(|| RecordError::Missing("orderdetailsID".into()))?,
            order_source_id: record
                .string_any(&["orderID", "order_id"])
                .ok_or_else(|| RecordError::Missing("orderID".into()))?,
            product_source_id: record.string_any(&["productID", "product_id"]),
            article_order_number: record
                .string_any(&["article_ordernumber", "ordernumber"])
                .unwrap_or_default(),
            name: record
                .string("name")
                .ok_or_else(|| RecordError::Missing("name".into()))?,
            price: record.f64("price")?.unwrap_or(0.0),
            quantity,
            tax_rate: record.f64("tax")?,
            mode: record.i64("modus")?.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_amount_is_required() {
        let record = SourceRecord::new().with("orderID", 1);
        assert_eq!(
            OrderRecord::from_record(&record).unwrap_err(),
            RecordError::Missing("invoice_amount".into())
        );
    }

    #[test]
    fn detail_defaults() {
        let record = SourceRecord::new()
            .with("orderdetailsID", 10)
            .with("orderID", 1)
            .with("name", "Shirt");
        let detail = OrderDetailRecord::from_record(&record).unwrap();
        assert_eq!(detail.quantity, 1);
        assert_eq!(detail.mode, 0);
        assert_eq!(detail.article_order_number, "");
    }
}
