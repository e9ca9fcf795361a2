use crate::{error::RecordError, records::record::SourceRecord, shop::configurator::parse_option_list};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of free attribute slots on a detail.
pub const ATTRIBUTE_SLOTS: u8 = 20;

/// Whether a detail is the canonical representative of its article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailKind {
    Primary,
    Secondary,
}

impl DetailKind {
    pub fn code(&self) -> i64 {
        match self {
            DetailKind::Primary => 1,
            DetailKind::Secondary => 2,
        }
    }

    pub fn from_code(code: i64) -> Self {
        if code == 1 {
            DetailKind::Primary
        } else {
            DetailKind::Secondary
        }
    }
}

/// Allow-listed article columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleFields {
    pub name: Option<String>,
    pub description: Option<String>,
    pub description_long: Option<String>,
    pub keywords: Option<String>,
    pub meta_title: Option<String>,
    pub shipping_time: Option<String>,
    pub active: Option<bool>,
    pub pseudo_sales: Option<i64>,
    pub topseller: Option<bool>,
    pub notification: Option<bool>,
    pub last_stock: Option<bool>,
    pub added: Option<NaiveDateTime>,
    pub changed: Option<NaiveDateTime>,
    pub supplier_id: Option<i64>,
    pub supplier_name: Option<String>,
    pub tax_id: Option<i64>,
    pub tax_rate: Option<f64>,
}

/// Allow-listed detail columns. `None` means "not supplied by the profile".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailFields {
    pub order_number: Option<String>,
    pub supplier_number: Option<String>,
    pub additional_text: Option<String>,
    pub active: Option<bool>,
    pub in_stock: Option<i64>,
    pub stock_min: Option<i64>,
    pub weight: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub length: Option<f64>,
    pub ean: Option<String>,
    pub position: Option<i64>,
    pub purchase_unit: Option<f64>,
    pub reference_unit: Option<f64>,
    pub pack_unit: Option<String>,
    pub min_purchase: Option<i64>,
    pub purchase_steps: Option<i64>,
    pub max_purchase: Option<i64>,
    pub release_date: Option<NaiveDate>,
    pub shipping_free: Option<bool>,
    pub shipping_time: Option<String>,
}

/// Numbered free-text attribute slots present in one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSlots(pub BTreeMap<u8, String>);

impl AttributeSlots {
    pub fn from_record(record: &SourceRecord) -> Self {
        let slots = (1..=ATTRIBUTE_SLOTS)
            .filter_map(|slot| {
                let field = format!("attr{slot}");
                record
                    .get(&field)
                    .filter(|v| !v.is_null())
                    .and_then(|v| v.as_string())
                    .map(|v| (slot, v))
            })
            .collect();
        AttributeSlots(slots)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlays `other` onto `self`, leaving slots absent from `other` untouched.
    pub fn merge(&mut self, other: &AttributeSlots) {
        for (slot, value) in &other.0 {
            self.0.insert(*slot, value.clone());
        }
    }

    pub fn get(&self, slot: u8) -> Option<&str> {
        self.0.get(&slot).map(String::as_str)
    }
}

/// Tier-1 price shipped together with the product row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlinePrice {
    pub price: f64,
    pub pseudo_price: Option<f64>,
    pub price_group: Option<String>,
}

/// Typed projection of a product row. Unknown fields are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub source_id: String,
    pub parent_source_id: Option<String>,
    pub explicit_article_id: Option<i64>,
    pub explicit_detail_id: Option<i64>,
    pub article: ArticleFields,
    pub detail: DetailFields,
    pub attributes: AttributeSlots,
    pub inline_price: Option<InlinePrice>,
    pub configurator_options: Vec<(String, String)>,
}

impl ProductRecord {
    pub fn from_record(record: &SourceRecord) -> Result<Self, RecordError> {
        let source_id = record
            .string_any(&["productID", "product_id", "id"])
            .ok_or_else(|| RecordError::Missing("productID".into()))?;

        let article = ArticleFields {
            name: record.string("name"),
            description: record.string("description"),
            description_long: record.string("description_long"),
            keywords: record.string("keywords"),
            meta_title: record.string_any(&["metaTitle", "meta_title"]),
            shipping_time: record.string("shippingtime"),
            active: record.bool("active")?,
            pseudo_sales: record.i64("pseudosales")?,
            topseller: record.bool("topseller")?,
            notification: record.bool("notification")?,
            last_stock: record.bool("laststock")?,
            added: record.datetime("added").or_else(|| record.datetime("datum")),
            changed: record.datetime("changed").or_else(|| record.datetime("changetime")),
            supplier_id: record.id("supplierID")?,
            supplier_name: record.string("supplier"),
            tax_id: record.id("taxID")?,
            tax_rate: record.f64("tax")?,
        };

        let detail = DetailFields {
            order_number: record.string("ordernumber"),
            supplier_number: record.string("suppliernumber"),
            additional_text: record.string("additionaltext"),
            active: record.bool("active")?,
            in_stock: record.i64("instock")?,
            stock_min: record.i64("stockmin")?,
            weight: record.f64("weight")?,
            width: record.f64("width")?,
            height: record.f64("height")?,
            length: record.f64("length")?,
            ean: record.string("ean"),
            position: record.i64("position")?,
            purchase_unit: record.f64("purchaseunit")?,
            reference_unit: record.f64("referenceunit")?,
            pack_unit: record.string("packunit"),
            min_purchase: record.i64("minpurchase")?,
            purchase_steps: record.i64("purchasesteps")?,
            max_purchase: record.i64("maxpurchase")?,
            release_date: record.date("releasedate"),
            shipping_free: record.bool("shippingfree")?,
            shipping_time: record.string("shippingtime"),
        };

        let inline_price = record.f64("price")?.map(|price| InlinePrice {
            price,
            pseudo_price: record.f64("pseudoprice").ok().flatten(),
            price_group: record.string("pricegroup"),
        });

        let configurator_options = record
            .string("configurator_options")
            .map(|raw| parse_option_list(&raw))
            .unwrap_or_default();

        Ok(ProductRecord {
            source_id,
            parent_source_id: record.string_any(&["parentID", "parent_id"]).filter(|p| p != "0"),
            explicit_article_id: record.id("articleID")?,
            explicit_detail_id: record.id("articledetailsID")?,
            article,
            detail,
            attributes: AttributeSlots::from_record(record),
            inline_price,
            configurator_options,
        })
    }

    pub fn order_number(&self) -> Option<&str> {
        self.detail.order_number.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SourceRecord {
        SourceRecord::new()
            .with("productID", 7)
            .with("name", "Shirt")
            .with("ordernumber", "SW-7")
            .with("instock", "12")
            .with("attr3", "blue")
            .with("attr21", "ignored")
            .with("legacy_column", "ignored")
            .with("price", "19,99")
            .with("configurator_options", "Color:Red|Size:L")
    }

    #[test]
    fn projects_allow_listed_fields() {
        let product = ProductRecord::from_record(&record()).unwrap();
        assert_eq!(product.source_id, "7");
        assert_eq!(product.article.name.as_deref(), Some("Shirt"));
        assert_eq!(product.order_number(), Some("SW-7"));
        assert_eq!(product.detail.in_stock, Some(12));
        assert_eq!(product.attributes.0.len(), 1);
        assert_eq!(product.attributes.get(3), Some("blue"));
        assert_eq!(product.inline_price.as_ref().map(|p| p.price), Some(19.99));
        assert_eq!(
            product.configurator_options,
            vec![("Color".to_string(), "Red".to_string()), ("Size".to_string(), "L".to_string())]
        );
    }

    #[test]
    fn zero_parent_means_no_parent() {
        let product = ProductRecord::from_record(&record().with("parentID", "0")).unwrap();
        assert_eq!(product.parent_source_id, None);
    }

    #[test]
    fn product_id_is_required() {
        let err = ProductRecord::from_record(&SourceRecord::new().with("name", "x")).unwrap_err();
        assert_eq!(err, RecordError::Missing("productID".into()));
    }

    #[test]
    fn merging_attribute_slots_keeps_absent_ones() {
        let mut stored = AttributeSlots([(1, "a".to_string()), (2, "b".to_string())].into());
        stored.merge(&AttributeSlots([(2, "B".to_string())].into()));
        assert_eq!(stored.get(1), Some("a"));
        assert_eq!(stored.get(2), Some("B"));
    }
}
