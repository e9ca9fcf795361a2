use chrono::NaiveDateTime;
use model::shop::article::{ArticleFields, DetailFields, DetailKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub description_long: Option<String>,
    pub keywords: Option<String>,
    pub meta_title: Option<String>,
    pub shipping_time: Option<String>,
    pub active: bool,
    pub pseudo_sales: i64,
    pub topseller: bool,
    pub notification: bool,
    pub last_stock: bool,
    pub added: Option<NaiveDateTime>,
    pub changed: Option<NaiveDateTime>,
    pub supplier_id: i64,
    pub tax_id: i64,
    pub main_detail_id: Option<i64>,
    pub configurator_set_id: Option<i64>,
}

impl ArticleRow {
    pub fn from_fields(fields: &ArticleFields, supplier_id: i64, tax_id: i64) -> Self {
        ArticleRow {
            id: 0,
            name: fields.name.clone().unwrap_or_default(),
            description: fields.description.clone(),
            description_long: fields.description_long.clone(),
            keywords: fields.keywords.clone(),
            meta_title: fields.meta_title.clone(),
            shipping_time: fields.shipping_time.clone(),
            active: fields.active.unwrap_or(true),
            pseudo_sales: fields.pseudo_sales.unwrap_or(0),
            topseller: fields.topseller.unwrap_or(false),
            notification: fields.notification.unwrap_or(false),
            last_stock: fields.last_stock.unwrap_or(false),
            added: fields.added,
            changed: fields.changed,
            supplier_id,
            tax_id,
            main_detail_id: None,
            configurator_set_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRow {
    pub id: i64,
    pub article_id: i64,
    pub kind: DetailKind,
    pub order_number: String,
    pub fields: DetailFields,
}

impl DetailRow {
    pub fn new(article_id: i64, kind: DetailKind, order_number: &str, fields: &DetailFields) -> Self {
        let mut row = DetailRow {
            id: 0,
            article_id,
            kind,
            order_number: order_number.to_string(),
            fields: DetailFields::default(),
        };
        row.apply(fields);
        row
    }

    /// Overwrites every column supplied in `fields`; absent columns are kept.
    pub fn apply(&mut self, fields: &DetailFields) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(
                    if fields.$field.is_some() {
                        self.fields.$field = fields.$field.clone();
                    }
                )*
            };
        }
        overlay!(
            supplier_number,
            additional_text,
            active,
            in_stock,
            stock_min,
            weight,
            width,
            height,
            length,
            ean,
            position,
            purchase_unit,
            reference_unit,
            pack_unit,
            min_purchase,
            purchase_steps,
            max_purchase,
            release_date,
            shipping_free,
            shipping_time
        );
        self.fields.order_number = Some(self.order_number.clone());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: i64,
    pub parent_id: i64,
    pub name: String,
    pub position: i64,
    pub active: bool,
    pub meta_keywords: Option<String>,
    pub meta_description: Option<String>,
    pub cms_headline: Option<String>,
    pub cms_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerRow {
    pub id: i64,
    pub customer_number: Option<String>,
    pub email: String,
    pub password_hash: Option<String>,
    pub encoder: String,
    pub active: bool,
    pub newsletter: bool,
    pub first_login: Option<NaiveDateTime>,
    pub last_login: Option<NaiveDateTime>,
    pub customer_group: String,
    pub shop_id: i64,
    pub language_id: i64,
    pub payment_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressKind {
    Billing,
    Shipping,
}

impl AddressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressKind::Billing => "billing",
            AddressKind::Shipping => "shipping",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    pub id: i64,
    pub order_number: String,
    pub customer_id: i64,
    pub ordered_at: Option<NaiveDateTime>,
    pub invoice_amount: f64,
    pub invoice_amount_net: f64,
    pub invoice_shipping: f64,
    pub invoice_shipping_net: f64,
    pub status_id: i64,
    pub cleared_id: i64,
    pub payment_id: i64,
    pub shop_id: i64,
    pub currency: String,
    pub currency_factor: f64,
    pub comment: Option<String>,
    pub customer_comment: Option<String>,
    pub net: bool,
    pub tax_free: bool,
    pub tracking_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderDetailRow {
    pub id: i64,
    pub order_id: i64,
    pub order_number: String,
    pub article_id: i64,
    pub article_order_number: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub tax_rate: f64,
    pub mode: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRow {
    pub id: i64,
    pub article_id: i64,
    /// File stem, unique per article.
    pub name: String,
    pub extension: String,
    /// Stored location: media path after a download, source location otherwise.
    pub path: String,
    pub description: Option<String>,
    pub main: bool,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRow {
    /// `article` or `variant`.
    pub object_type: String,
    pub object_key: i64,
    pub language_id: i64,
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteRow {
    pub id: i64,
    pub article_id: i64,
    pub author: String,
    pub headline: String,
    pub comment: String,
    pub points: f64,
    pub active: bool,
    pub email: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}
