use crate::{
    error::TargetError,
    sql::{params::MySqlParamStore, row::to_record},
    target::{
        ShopSection, TargetStore, TargetTx,
        rows::{
            AddressKind, ArticleRow, CategoryRow, CustomerRow, DetailRow, ImageRow,
            OrderDetailRow, OrderRow, TranslationRow, VoteRow,
        },
    },
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use model::{
    core::value::Value,
    records::record::SourceRecord,
    shop::{
        article::{ATTRIBUTE_SLOTS, AttributeSlots, DetailFields, DetailKind},
        customer::Address,
        price::PriceTier,
    },
};
use mysql_async::{Conn, Opts, Params, Pool, Row, prelude::Queryable};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Sentinel stored in `s_articles_prices.to` for the unbounded last tier.
const UNBOUNDED_TIER: &str = "beliebig";

macro_rules! bind {
    ($($value:expr),* $(,)?) => {
        MySqlParamStore::from_values(&[$(Value::from($value)),*]).params()
    };
}

const DETAIL_COLUMNS: &str = "id, articleID, ordernumber, suppliernumber, kind, additionaltext, \
     active, instock, stockmin, weight, width, height, length, ean, position, purchaseunit, \
     referenceunit, packunit, minpurchase, purchasesteps, maxpurchase, releasedate, \
     shippingfree, shippingtime";

const ARTICLE_COLUMNS: &str = "id, name, description, description_long, keywords, metaTitle, \
     shippingtime, active, pseudosales, topseller, notification, laststock, datum, changetime, \
     supplierID, taxID, main_detail_id, configurator_set_id";

const CUSTOMER_COLUMNS: &str = "id, customernumber, email, password, encoder, active, \
     newsletter, firstlogin, lastlogin, customergroup, subshopID, language, paymentID";

const ORDER_COLUMNS: &str = "id, ordernumber, userID, ordertime, invoice_amount, \
     invoice_amount_net, invoice_shipping, invoice_shipping_net, status, cleared, paymentID, \
     subshopID, currency, currencyFactor, comment, customercomment, net, taxfree, trackingcode";

const ORDER_DETAIL_COLUMNS: &str = "id, orderID, ordernumber, articleID, articleordernumber, \
     name, price, quantity, tax_rate, modus";

fn int(r: &SourceRecord, col: &str) -> i64 {
    r.i64(col).ok().flatten().unwrap_or(0)
}

fn opt_int(r: &SourceRecord, col: &str) -> Option<i64> {
    r.i64(col).ok().flatten()
}

fn float(r: &SourceRecord, col: &str) -> f64 {
    r.f64(col).ok().flatten().unwrap_or(0.0)
}

fn opt_float(r: &SourceRecord, col: &str) -> Option<f64> {
    r.f64(col).ok().flatten()
}

fn flag(r: &SourceRecord, col: &str) -> bool {
    r.bool(col).ok().flatten().unwrap_or(false)
}

fn opt_flag(r: &SourceRecord, col: &str) -> Option<bool> {
    r.bool(col).ok().flatten()
}

fn text(r: &SourceRecord, col: &str) -> String {
    r.string(col).unwrap_or_default()
}

fn address_table(owner: &str, kind: AddressKind) -> String {
    format!("s_{owner}_{}address", kind.as_str())
}

/// Target shop in a Shopware-style MySQL schema.
pub struct MySqlTarget {
    pool: Pool,
}

impl MySqlTarget {
    pub fn connect(url: &str) -> Result<Self, TargetError> {
        let opts = Opts::from_url(url).map_err(|e| TargetError::MySql(e.into()))?;
        Ok(MySqlTarget {
            pool: Pool::new(opts),
        })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl TargetStore for MySqlTarget {
    async fn begin(&self) -> Result<Box<dyn TargetTx>, TargetError> {
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop("START TRANSACTION").await?;
        Ok(Box::new(MySqlTx { conn }))
    }

    async fn next_number(&self, counter: &str) -> Result<i64, TargetError> {
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop("START TRANSACTION").await?;

        let current: Option<i64> = conn
            .exec_first(
                "SELECT number FROM s_order_number WHERE name = ? FOR UPDATE",
                bind!(counter),
            )
            .await?;
        let Some(current) = current else {
            conn.query_drop("ROLLBACK").await?;
            return Err(TargetError::MissingCounter(counter.to_string()));
        };

        let next = current + 1;
        conn.exec_drop(
            "UPDATE s_order_number SET number = ? WHERE name = ?",
            bind!(next, counter),
        )
        .await?;
        conn.query_drop("COMMIT").await?;
        debug!(counter, number = next, "Incremented number counter");
        Ok(next)
    }
}

pub struct MySqlTx {
    conn: Conn,
}

impl MySqlTx {
    async fn record(&mut self, sql: &str, params: Params) -> Result<Option<SourceRecord>, TargetError> {
        let row: Option<Row> = self.conn.exec_first(sql, params).await?;
        Ok(row.as_ref().map(to_record))
    }

    async fn records(&mut self, sql: &str, params: Params) -> Result<Vec<SourceRecord>, TargetError> {
        let rows: Vec<Row> = self.conn.exec(sql, params).await?;
        Ok(rows.iter().map(to_record).collect())
    }

    async fn id(&mut self, sql: &str, params: Params) -> Result<Option<i64>, TargetError> {
        Ok(self.conn.exec_first(sql, params).await?)
    }

    async fn exec(&mut self, sql: &str, params: Params) -> Result<(), TargetError> {
        self.conn.exec_drop(sql, params).await?;
        Ok(())
    }

    async fn insert(&mut self, table: &'static str, sql: &str, params: Params) -> Result<i64, TargetError> {
        self.conn.exec_drop(sql, params).await?;
        self.conn
            .last_insert_id()
            .map(|id| id as i64)
            .ok_or(TargetError::NoInsertId(table))
    }

    fn detail_from(r: &SourceRecord) -> DetailRow {
        let order_number = text(r, "ordernumber");
        DetailRow {
            id: int(r, "id"),
            article_id: int(r, "articleID"),
            kind: DetailKind::from_code(int(r, "kind")),
            order_number: order_number.clone(),
            fields: DetailFields {
                order_number: Some(order_number),
                supplier_number: r.string("suppliernumber"),
                additional_text: r.string("additionaltext"),
                active: opt_flag(r, "active"),
                in_stock: opt_int(r, "instock"),
                stock_min: opt_int(r, "stockmin"),
                weight: opt_float(r, "weight"),
                width: opt_float(r, "width"),
                height: opt_float(r, "height"),
                length: opt_float(r, "length"),
                ean: r.string("ean"),
                position: opt_int(r, "position"),
                purchase_unit: opt_float(r, "purchaseunit"),
                reference_unit: opt_float(r, "referenceunit"),
                pack_unit: r.string("packunit"),
                min_purchase: opt_int(r, "minpurchase"),
                purchase_steps: opt_int(r, "purchasesteps"),
                max_purchase: opt_int(r, "maxpurchase"),
                release_date: r.date("releasedate"),
                shipping_free: opt_flag(r, "shippingfree"),
                shipping_time: r.string("shippingtime"),
            },
        }
    }

    fn detail_params(row: &DetailRow) -> Vec<Value> {
        let f = &row.fields;
        vec![
            Value::from(row.article_id),
            Value::from(row.order_number.as_str()),
            Value::from(f.supplier_number.as_deref()),
            Value::from(row.kind.code()),
            Value::from(f.additional_text.as_deref()),
            Value::from(f.active.unwrap_or(true)),
            Value::from(f.in_stock.unwrap_or(0)),
            Value::from(f.stock_min.unwrap_or(0)),
            Value::from(f.weight),
            Value::from(f.width),
            Value::from(f.height),
            Value::from(f.length),
            Value::from(f.ean.as_deref()),
            Value::from(f.position.unwrap_or(0)),
            Value::from(f.purchase_unit),
            Value::from(f.reference_unit),
            Value::from(f.pack_unit.as_deref()),
            Value::from(f.min_purchase.unwrap_or(1)),
            Value::from(f.purchase_steps),
            Value::from(f.max_purchase),
            Value::from(f.release_date),
            Value::from(f.shipping_free.unwrap_or(false)),
            Value::from(f.shipping_time.as_deref()),
        ]
    }

    fn tier_from(r: &SourceRecord) -> PriceTier {
        PriceTier {
            price_group: text(r, "pricegroup"),
            article_id: int(r, "articleID"),
            detail_id: int(r, "articledetailsID"),
            from: int(r, "from"),
            to: r
                .string("to")
                .filter(|to| to != UNBOUNDED_TIER)
                .and_then(|to| to.parse().ok()),
            price: float(r, "price"),
            pseudo_price: float(r, "pseudoprice"),
            base_price: float(r, "baseprice"),
            percent: float(r, "percent"),
        }
    }

    fn customer_from(r: &SourceRecord) -> CustomerRow {
        CustomerRow {
            id: int(r, "id"),
            customer_number: r.string("customernumber"),
            email: text(r, "email"),
            password_hash: r.string("password"),
            encoder: text(r, "encoder"),
            active: flag(r, "active"),
            newsletter: flag(r, "newsletter"),
            first_login: r.datetime("firstlogin"),
            last_login: r.datetime("lastlogin"),
            customer_group: text(r, "customergroup"),
            shop_id: int(r, "subshopID"),
            language_id: int(r, "language"),
            payment_id: opt_int(r, "paymentID"),
        }
    }

    fn customer_params(row: &CustomerRow) -> Vec<Value> {
        vec![
            Value::from(row.customer_number.as_deref()),
            Value::from(row.email.as_str()),
            Value::from(row.password_hash.as_deref().unwrap_or_default()),
            Value::from(row.encoder.as_str()),
            Value::from(row.active),
            Value::from(row.newsletter),
            Value::from(row.first_login),
            Value::from(row.last_login),
            Value::from(row.customer_group.as_str()),
            Value::from(row.shop_id),
            Value::from(row.language_id),
            Value::from(row.payment_id.unwrap_or(0)),
        ]
    }

    fn order_from(r: &SourceRecord) -> OrderRow {
        OrderRow {
            id: int(r, "id"),
            order_number: text(r, "ordernumber"),
            customer_id: int(r, "userID"),
            ordered_at: r.datetime("ordertime"),
            invoice_amount: float(r, "invoice_amount"),
            invoice_amount_net: float(r, "invoice_amount_net"),
            invoice_shipping: float(r, "invoice_shipping"),
            invoice_shipping_net: float(r, "invoice_shipping_net"),
            status_id: int(r, "status"),
            cleared_id: int(r, "cleared"),
            payment_id: int(r, "paymentID"),
            shop_id: int(r, "subshopID"),
            currency: text(r, "currency"),
            currency_factor: float(r, "currencyFactor"),
            comment: r.string("comment"),
            customer_comment: r.string("customercomment"),
            net: flag(r, "net"),
            tax_free: flag(r, "taxfree"),
            tracking_code: r.string("trackingcode"),
        }
    }

    fn order_params(row: &OrderRow) -> Vec<Value> {
        vec![
            Value::from(row.order_number.as_str()),
            Value::from(row.customer_id),
            Value::from(row.ordered_at),
            Value::from(row.invoice_amount),
            Value::from(row.invoice_amount_net),
            Value::from(row.invoice_shipping),
            Value::from(row.invoice_shipping_net),
            Value::from(row.status_id),
            Value::from(row.cleared_id),
            Value::from(row.payment_id),
            Value::from(row.shop_id),
            Value::from(row.currency.as_str()),
            Value::from(row.currency_factor),
            Value::from(row.comment.as_deref().unwrap_or_default()),
            Value::from(row.customer_comment.as_deref().unwrap_or_default()),
            Value::from(row.net),
            Value::from(row.tax_free),
            Value::from(row.tracking_code.as_deref().unwrap_or_default()),
        ]
    }

    fn order_detail_from(r: &SourceRecord) -> OrderDetailRow {
        OrderDetailRow {
            id: int(r, "id"),
            order_id: int(r, "orderID"),
            order_number: text(r, "ordernumber"),
            article_id: int(r, "articleID"),
            article_order_number: text(r, "articleordernumber"),
            name: text(r, "name"),
            price: float(r, "price"),
            quantity: int(r, "quantity"),
            tax_rate: float(r, "tax_rate"),
            mode: int(r, "modus"),
        }
    }

    fn order_detail_params(row: &OrderDetailRow) -> Vec<Value> {
        vec![
            Value::from(row.order_id),
            Value::from(row.order_number.as_str()),
            Value::from(row.article_id),
            Value::from(row.article_order_number.as_str()),
            Value::from(row.name.as_str()),
            Value::from(row.price),
            Value::from(row.quantity),
            Value::from(row.tax_rate),
            Value::from(row.mode),
        ]
    }

    fn image_from(r: &SourceRecord) -> ImageRow {
        ImageRow {
            id: int(r, "id"),
            article_id: int(r, "articleID"),
            name: text(r, "img"),
            extension: text(r, "extension"),
            path: text(r, "path"),
            description: r.string("description"),
            main: int(r, "main") == 1,
            position: int(r, "position"),
        }
    }

    fn category_params(row: &CategoryRow) -> Vec<Value> {
        vec![
            Value::from(row.parent_id),
            Value::from(row.name.as_str()),
            Value::from(row.position),
            Value::from(row.active),
            Value::from(row.meta_keywords.as_deref()),
            Value::from(row.meta_description.as_deref()),
            Value::from(row.cms_headline.as_deref()),
            Value::from(row.cms_text.as_deref()),
        ]
    }

    fn address_params(owner_id: i64, address: &Address) -> Vec<Value> {
        vec![
            Value::from(owner_id),
            Value::from(address.company.as_deref().unwrap_or_default()),
            Value::from(address.department.as_deref().unwrap_or_default()),
            Value::from(address.salutation.as_deref().unwrap_or_default()),
            Value::from(address.first_name.as_deref().unwrap_or_default()),
            Value::from(address.last_name.as_deref().unwrap_or_default()),
            Value::from(address.street.as_deref().unwrap_or_default()),
            Value::from(address.zip_code.as_deref().unwrap_or_default()),
            Value::from(address.city.as_deref().unwrap_or_default()),
            Value::from(address.country_iso.as_deref()),
            Value::from(address.phone.as_deref().unwrap_or_default()),
            Value::from(address.vat_id.as_deref().unwrap_or_default()),
        ]
    }

    /// Replaces the address of one owner; the country is looked up by ISO code.
    async fn write_address(
        &mut self,
        table: String,
        owner_column: &str,
        owner_id: i64,
        address: &Address,
    ) -> Result<(), TargetError> {
        self.exec(
            &format!("DELETE FROM {table} WHERE {owner_column} = ?"),
            bind!(owner_id),
        )
        .await?;
        let sql = format!(
            "INSERT INTO {table} ({owner_column}, company, department, salutation, firstname, \
             lastname, street, zipcode, city, countryID, phone, ustid) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, \
             COALESCE((SELECT id FROM s_core_countries WHERE countryiso = ? LIMIT 1), 0), ?, ?)"
        );
        let params = MySqlParamStore::from_values(&Self::address_params(owner_id, address)).params();
        self.exec(&sql, params).await
    }
}

#[async_trait]
impl TargetTx for MySqlTx {
    async fn article(&mut self, id: i64) -> Result<Option<ArticleRow>, TargetError> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM s_articles WHERE id = ?");
        Ok(self.record(&sql, bind!(id)).await?.map(|r| ArticleRow {
            id: int(&r, "id"),
            name: text(&r, "name"),
            description: r.string("description"),
            description_long: r.string("description_long"),
            keywords: r.string("keywords"),
            meta_title: r.string("metaTitle"),
            shipping_time: r.string("shippingtime"),
            active: flag(&r, "active"),
            pseudo_sales: int(&r, "pseudosales"),
            topseller: flag(&r, "topseller"),
            notification: flag(&r, "notification"),
            last_stock: flag(&r, "laststock"),
            added: r.datetime("datum"),
            changed: r.datetime("changetime"),
            supplier_id: int(&r, "supplierID"),
            tax_id: int(&r, "taxID"),
            main_detail_id: opt_int(&r, "main_detail_id"),
            configurator_set_id: opt_int(&r, "configurator_set_id"),
        }))
    }

    async fn insert_article(&mut self, row: &ArticleRow) -> Result<i64, TargetError> {
        let sql = "INSERT INTO s_articles (name, description, description_long, keywords, \
                   metaTitle, shippingtime, active, pseudosales, topseller, notification, \
                   laststock, datum, changetime, supplierID, taxID, main_detail_id, \
                   configurator_set_id) \
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, COALESCE(?, CURDATE()), \
                   COALESCE(?, NOW()), ?, ?, ?, ?)";
        let params = bind!(
            row.name.as_str(),
            row.description.as_deref().unwrap_or_default(),
            row.description_long.as_deref().unwrap_or_default(),
            row.keywords.as_deref().unwrap_or_default(),
            row.meta_title.as_deref(),
            row.shipping_time.as_deref(),
            row.active,
            row.pseudo_sales,
            row.topseller,
            row.notification,
            row.last_stock,
            row.added,
            row.changed,
            row.supplier_id,
            row.tax_id,
            row.main_detail_id,
            row.configurator_set_id,
        );
        self.insert("s_articles", sql, params).await
    }

    async fn touch_article(&mut self, id: i64, changed: NaiveDateTime) -> Result<(), TargetError> {
        self.exec(
            "UPDATE s_articles SET changetime = ? WHERE id = ?",
            bind!(changed, id),
        )
        .await
    }

    async fn set_main_detail(&mut self, article_id: i64, detail_id: i64) -> Result<(), TargetError> {
        self.exec(
            "UPDATE s_articles SET main_detail_id = ? WHERE id = ?",
            bind!(detail_id, article_id),
        )
        .await
    }

    async fn set_configurator_set(
        &mut self,
        article_id: i64,
        set_id: i64,
    ) -> Result<(), TargetError> {
        self.exec(
            "UPDATE s_articles SET configurator_set_id = ? WHERE id = ?",
            bind!(set_id, article_id),
        )
        .await
    }

    async fn supplier_by_name(&mut self, name: &str) -> Result<Option<i64>, TargetError> {
        self.id("SELECT id FROM s_articles_supplier WHERE name = ?", bind!(name))
            .await
    }

    async fn insert_supplier(&mut self, name: &str) -> Result<i64, TargetError> {
        self.insert(
            "s_articles_supplier",
            "INSERT INTO s_articles_supplier (name, img, link) VALUES (?, '', '')",
            bind!(name),
        )
        .await
    }

    async fn tax_exists(&mut self, id: i64) -> Result<bool, TargetError> {
        Ok(self
            .id("SELECT id FROM s_core_tax WHERE id = ?", bind!(id))
            .await?
            .is_some())
    }

    async fn tax_by_rate(&mut self, rate: f64) -> Result<Option<i64>, TargetError> {
        self.id(
            "SELECT id FROM s_core_tax WHERE ABS(tax - ?) < 0.005 ORDER BY id LIMIT 1",
            bind!(rate),
        )
        .await
    }

    async fn default_tax(&mut self) -> Result<Option<i64>, TargetError> {
        self.id("SELECT id FROM s_core_tax ORDER BY id LIMIT 1", Params::Empty)
            .await
    }

    async fn detail(&mut self, id: i64) -> Result<Option<DetailRow>, TargetError> {
        let sql = format!("SELECT {DETAIL_COLUMNS} FROM s_articles_details WHERE id = ?");
        Ok(self.record(&sql, bind!(id)).await?.as_ref().map(Self::detail_from))
    }

    async fn detail_by_number(&mut self, number: &str) -> Result<Option<DetailRow>, TargetError> {
        let sql = format!("SELECT {DETAIL_COLUMNS} FROM s_articles_details WHERE ordernumber = ?");
        Ok(self
            .record(&sql, bind!(number))
            .await?
            .as_ref()
            .map(Self::detail_from))
    }

    async fn insert_detail(&mut self, row: &DetailRow) -> Result<i64, TargetError> {
        let sql = "INSERT INTO s_articles_details (articleID, ordernumber, suppliernumber, kind, \
                   additionaltext, active, instock, stockmin, weight, width, height, length, ean, \
                   position, purchaseunit, referenceunit, packunit, minpurchase, purchasesteps, \
                   maxpurchase, releasedate, shippingfree, shippingtime) \
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
        let params = MySqlParamStore::from_values(&Self::detail_params(row)).params();
        self.insert("s_articles_details", sql, params).await
    }

    async fn update_detail(&mut self, row: &DetailRow) -> Result<(), TargetError> {
        let sql = "UPDATE s_articles_details SET articleID = ?, ordernumber = ?, \
                   suppliernumber = ?, kind = ?, additionaltext = ?, active = ?, instock = ?, \
                   stockmin = ?, weight = ?, width = ?, height = ?, length = ?, ean = ?, \
                   position = ?, purchaseunit = ?, referenceunit = ?, packunit = ?, \
                   minpurchase = ?, purchasesteps = ?, maxpurchase = ?, releasedate = ?, \
                   shippingfree = ?, shippingtime = ? WHERE id = ?";
        let mut values = Self::detail_params(row);
        values.push(Value::from(row.id));
        self.exec(sql, MySqlParamStore::from_values(&values).params())
            .await
    }

    async fn delete_detail(&mut self, id: i64) -> Result<(), TargetError> {
        for sql in [
            "DELETE FROM s_articles_attributes WHERE articledetailsID = ?",
            "DELETE FROM s_articles_prices WHERE articledetailsID = ?",
            "DELETE FROM s_article_configurator_option_relations WHERE article_id = ?",
            "DELETE FROM s_articles_details WHERE id = ?",
        ] {
            self.exec(sql, bind!(id)).await?;
        }
        Ok(())
    }

    async fn detail_has_options(&mut self, detail_id: i64) -> Result<bool, TargetError> {
        Ok(self
            .id(
                "SELECT option_id FROM s_article_configurator_option_relations \
                 WHERE article_id = ? LIMIT 1",
                bind!(detail_id),
            )
            .await?
            .is_some())
    }

    async fn attributes(&mut self, detail_id: i64) -> Result<Option<AttributeSlots>, TargetError> {
        let columns = (1..=ATTRIBUTE_SLOTS)
            .map(|slot| format!("attr{slot}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {columns} FROM s_articles_attributes WHERE articledetailsID = ?");
        Ok(self
            .record(&sql, bind!(detail_id))
            .await?
            .map(|r| AttributeSlots::from_record(&r)))
    }

    async fn insert_attributes(
        &mut self,
        article_id: i64,
        detail_id: i64,
        slots: &AttributeSlots,
    ) -> Result<(), TargetError> {
        let mut columns = vec!["articleID".to_string(), "articledetailsID".to_string()];
        let mut values = vec![Value::from(article_id), Value::from(detail_id)];
        for (slot, value) in &slots.0 {
            columns.push(format!("attr{slot}"));
            values.push(Value::from(value.as_str()));
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = format!(
            "INSERT INTO s_articles_attributes ({}) VALUES ({placeholders})",
            columns.join(", ")
        );
        self.exec(&sql, MySqlParamStore::from_values(&values).params())
            .await
    }

    async fn update_attributes(
        &mut self,
        detail_id: i64,
        slots: &AttributeSlots,
    ) -> Result<(), TargetError> {
        if slots.is_empty() {
            return Ok(());
        }
        let assignments = slots
            .0
            .keys()
            .map(|slot| format!("attr{slot} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values: Vec<Value> = slots.0.values().map(|v| Value::from(v.as_str())).collect();
        values.push(Value::from(detail_id));
        let sql = format!("UPDATE s_articles_attributes SET {assignments} WHERE articledetailsID = ?");
        self.exec(&sql, MySqlParamStore::from_values(&values).params())
            .await
    }

    async fn price_tiers(
        &mut self,
        price_group: &str,
        detail_id: i64,
    ) -> Result<Vec<PriceTier>, TargetError> {
        let records = self
            .records(
                "SELECT pricegroup, articleID, articledetailsID, `from`, `to`, price, \
                 pseudoprice, baseprice, percent FROM s_articles_prices \
                 WHERE pricegroup = ? AND articledetailsID = ? ORDER BY `from`",
                bind!(price_group, detail_id),
            )
            .await?;
        Ok(records.iter().map(Self::tier_from).collect())
    }

    async fn delete_price_tiers_from(
        &mut self,
        price_group: &str,
        detail_id: i64,
        from: i64,
    ) -> Result<(), TargetError> {
        self.exec(
            "DELETE FROM s_articles_prices \
             WHERE pricegroup = ? AND articledetailsID = ? AND `from` >= ?",
            bind!(price_group, detail_id, from),
        )
        .await
    }

    async fn set_price_tier_to(
        &mut self,
        price_group: &str,
        detail_id: i64,
        from: i64,
        to: i64,
    ) -> Result<(), TargetError> {
        self.exec(
            "UPDATE s_articles_prices SET `to` = ? \
             WHERE pricegroup = ? AND articledetailsID = ? AND `from` = ?",
            bind!(to.to_string(), price_group, detail_id, from),
        )
        .await
    }

    async fn insert_price_tier(&mut self, tier: &PriceTier) -> Result<(), TargetError> {
        let to = tier
            .to
            .map_or_else(|| UNBOUNDED_TIER.to_string(), |to| to.to_string());
        self.exec(
            "INSERT INTO s_articles_prices (pricegroup, `from`, `to`, articleID, \
             articledetailsID, price, pseudoprice, baseprice, percent) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            bind!(
                tier.price_group.as_str(),
                tier.from,
                to,
                tier.article_id,
                tier.detail_id,
                tier.price,
                tier.pseudo_price,
                tier.base_price,
                tier.percent,
            ),
        )
        .await
    }

    async fn insert_configurator_set(&mut self, name: &str) -> Result<i64, TargetError> {
        self.insert(
            "s_article_configurator_sets",
            "INSERT INTO s_article_configurator_sets (name, public, type) VALUES (?, 0, 0)",
            bind!(name),
        )
        .await
    }

    async fn configurator_group_by_name(&mut self, name: &str) -> Result<Option<i64>, TargetError> {
        self.id(
            "SELECT id FROM s_article_configurator_groups WHERE name = ?",
            bind!(name),
        )
        .await
    }

    async fn insert_configurator_group(
        &mut self,
        name: &str,
        position: i64,
    ) -> Result<i64, TargetError> {
        self.insert(
            "s_article_configurator_groups",
            "INSERT INTO s_article_configurator_groups (name, description, position) \
             VALUES (?, '', ?)",
            bind!(name, position),
        )
        .await
    }

    async fn configurator_option_by_name(
        &mut self,
        group_id: i64,
        name: &str,
    ) -> Result<Option<i64>, TargetError> {
        self.id(
            "SELECT id FROM s_article_configurator_options WHERE group_id = ? AND name = ?",
            bind!(group_id, name),
        )
        .await
    }

    async fn insert_configurator_option(
        &mut self,
        group_id: i64,
        name: &str,
        position: i64,
    ) -> Result<i64, TargetError> {
        self.insert(
            "s_article_configurator_options",
            "INSERT INTO s_article_configurator_options (group_id, name, position) \
             VALUES (?, ?, ?)",
            bind!(group_id, name, position),
        )
        .await
    }

    async fn link_set_group(&mut self, set_id: i64, group_id: i64) -> Result<(), TargetError> {
        self.exec(
            "INSERT IGNORE INTO s_article_configurator_set_group_relations (set_id, group_id) \
             VALUES (?, ?)",
            bind!(set_id, group_id),
        )
        .await
    }

    async fn link_set_option(&mut self, set_id: i64, option_id: i64) -> Result<(), TargetError> {
        self.exec(
            "INSERT IGNORE INTO s_article_configurator_set_option_relations (set_id, option_id) \
             VALUES (?, ?)",
            bind!(set_id, option_id),
        )
        .await
    }

    async fn link_option_detail(
        &mut self,
        option_id: i64,
        detail_id: i64,
    ) -> Result<(), TargetError> {
        self.exec(
            "INSERT IGNORE INTO s_article_configurator_option_relations (article_id, option_id) \
             VALUES (?, ?)",
            bind!(detail_id, option_id),
        )
        .await
    }

    async fn category(&mut self, id: i64) -> Result<Option<CategoryRow>, TargetError> {
        Ok(self
            .record(
                "SELECT id, parent, description, position, active, metakeywords, \
                 metadescription, cmsheadline, cmstext FROM s_categories WHERE id = ?",
                bind!(id),
            )
            .await?
            .map(|r| CategoryRow {
                id: int(&r, "id"),
                parent_id: int(&r, "parent"),
                name: text(&r, "description"),
                position: int(&r, "position"),
                active: flag(&r, "active"),
                meta_keywords: r.string("metakeywords"),
                meta_description: r.string("metadescription"),
                cms_headline: r.string("cmsheadline"),
                cms_text: r.string("cmstext"),
            }))
    }

    async fn category_by_name(
        &mut self,
        parent_id: i64,
        name: &str,
    ) -> Result<Option<i64>, TargetError> {
        self.id(
            "SELECT id FROM s_categories WHERE parent = ? AND description = ? LIMIT 1",
            bind!(parent_id, name),
        )
        .await
    }

    async fn insert_category(&mut self, row: &CategoryRow) -> Result<i64, TargetError> {
        let params = MySqlParamStore::from_values(&Self::category_params(row)).params();
        self.insert(
            "s_categories",
            "INSERT INTO s_categories (parent, description, position, active, metakeywords, \
             metadescription, cmsheadline, cmstext) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params,
        )
        .await
    }

    async fn update_category(&mut self, row: &CategoryRow) -> Result<(), TargetError> {
        let mut values = Self::category_params(row);
        values.push(Value::from(row.id));
        self.exec(
            "UPDATE s_categories SET parent = ?, description = ?, position = ?, active = ?, \
             metakeywords = ?, metadescription = ?, cmsheadline = ?, cmstext = ? WHERE id = ?",
            MySqlParamStore::from_values(&values).params(),
        )
        .await
    }

    async fn link_article_category(
        &mut self,
        article_id: i64,
        category_id: i64,
    ) -> Result<(), TargetError> {
        let existing = self
            .id(
                "SELECT id FROM s_articles_categories WHERE articleID = ? AND categoryID = ?",
                bind!(article_id, category_id),
            )
            .await?;
        if existing.is_some() {
            return Ok(());
        }
        self.exec(
            "INSERT INTO s_articles_categories (articleID, categoryID) VALUES (?, ?)",
            bind!(article_id, category_id),
        )
        .await
    }

    async fn customer(&mut self, id: i64) -> Result<Option<CustomerRow>, TargetError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM s_user WHERE id = ?");
        Ok(self
            .record(&sql, bind!(id))
            .await?
            .as_ref()
            .map(Self::customer_from))
    }

    async fn customer_by_email(&mut self, email: &str) -> Result<Option<i64>, TargetError> {
        self.id(
            "SELECT id FROM s_user WHERE email = ? AND accountmode = 0 LIMIT 1",
            bind!(email),
        )
        .await
    }

    async fn insert_customer(&mut self, row: &CustomerRow) -> Result<i64, TargetError> {
        let params = MySqlParamStore::from_values(&Self::customer_params(row)).params();
        self.insert(
            "s_user",
            "INSERT INTO s_user (customernumber, email, password, encoder, active, newsletter, \
             firstlogin, lastlogin, customergroup, subshopID, language, paymentID, accountmode) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
            params,
        )
        .await
    }

    async fn update_customer(&mut self, row: &CustomerRow) -> Result<(), TargetError> {
        let mut values = Self::customer_params(row);
        values.push(Value::from(row.id));
        self.exec(
            "UPDATE s_user SET customernumber = ?, email = ?, password = ?, encoder = ?, \
             active = ?, newsletter = ?, firstlogin = ?, lastlogin = ?, customergroup = ?, \
             subshopID = ?, language = ?, paymentID = ? WHERE id = ?",
            MySqlParamStore::from_values(&values).params(),
        )
        .await
    }

    async fn write_customer_address(
        &mut self,
        customer_id: i64,
        kind: AddressKind,
        address: &Address,
    ) -> Result<(), TargetError> {
        self.write_address(address_table("user", kind), "userID", customer_id, address)
            .await
    }

    async fn order(&mut self, id: i64) -> Result<Option<OrderRow>, TargetError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM s_order WHERE id = ?");
        Ok(self.record(&sql, bind!(id)).await?.as_ref().map(Self::order_from))
    }

    async fn order_by_number(&mut self, number: &str) -> Result<Option<i64>, TargetError> {
        self.id("SELECT id FROM s_order WHERE ordernumber = ?", bind!(number))
            .await
    }

    async fn insert_order(&mut self, row: &OrderRow) -> Result<i64, TargetError> {
        let params = MySqlParamStore::from_values(&Self::order_params(row)).params();
        self.insert(
            "s_order",
            "INSERT INTO s_order (ordernumber, userID, ordertime, invoice_amount, \
             invoice_amount_net, invoice_shipping, invoice_shipping_net, status, cleared, \
             paymentID, subshopID, currency, currencyFactor, comment, customercomment, net, \
             taxfree, trackingcode, transactionID, internalcomment, referer, language, \
             dispatchID) VALUES (?, ?, COALESCE(?, NOW()), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
             ?, ?, ?, '', '', '', '', 0)",
            params,
        )
        .await
    }

    async fn update_order(&mut self, row: &OrderRow) -> Result<(), TargetError> {
        let mut values = Self::order_params(row);
        values.push(Value::from(row.id));
        self.exec(
            "UPDATE s_order SET ordernumber = ?, userID = ?, ordertime = COALESCE(?, ordertime), \
             invoice_amount = ?, invoice_amount_net = ?, invoice_shipping = ?, \
             invoice_shipping_net = ?, status = ?, cleared = ?, paymentID = ?, subshopID = ?, \
             currency = ?, currencyFactor = ?, comment = ?, customercomment = ?, net = ?, \
             taxfree = ?, trackingcode = ? WHERE id = ?",
            MySqlParamStore::from_values(&values).params(),
        )
        .await
    }

    async fn write_order_address(
        &mut self,
        order_id: i64,
        kind: AddressKind,
        address: &Address,
    ) -> Result<(), TargetError> {
        self.write_address(address_table("order", kind), "orderID", order_id, address)
            .await
    }

    async fn order_detail(&mut self, id: i64) -> Result<Option<OrderDetailRow>, TargetError> {
        let sql = format!("SELECT {ORDER_DETAIL_COLUMNS} FROM s_order_details WHERE id = ?");
        Ok(self
            .record(&sql, bind!(id))
            .await?
            .as_ref()
            .map(Self::order_detail_from))
    }

    async fn insert_order_detail(&mut self, row: &OrderDetailRow) -> Result<i64, TargetError> {
        let params = MySqlParamStore::from_values(&Self::order_detail_params(row)).params();
        self.insert(
            "s_order_details",
            "INSERT INTO s_order_details (orderID, ordernumber, articleID, articleordernumber, \
             name, price, quantity, tax_rate, modus, status, shipped, shippedgroup, esdarticle, \
             config) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, 0, 0, '')",
            params,
        )
        .await
    }

    async fn update_order_detail(&mut self, row: &OrderDetailRow) -> Result<(), TargetError> {
        let mut values = Self::order_detail_params(row);
        values.push(Value::from(row.id));
        self.exec(
            "UPDATE s_order_details SET orderID = ?, ordernumber = ?, articleID = ?, \
             articleordernumber = ?, name = ?, price = ?, quantity = ?, tax_rate = ?, \
             modus = ? WHERE id = ?",
            MySqlParamStore::from_values(&values).params(),
        )
        .await
    }

    async fn image_by_name(
        &mut self,
        article_id: i64,
        name: &str,
    ) -> Result<Option<ImageRow>, TargetError> {
        Ok(self
            .record(
                "SELECT i.id, i.articleID, i.img, i.extension, i.description, i.main, \
                 i.position, m.path FROM s_articles_img i \
                 LEFT JOIN s_media m ON m.id = i.media_id \
                 WHERE i.articleID = ? AND i.img = ?",
                bind!(article_id, name),
            )
            .await?
            .as_ref()
            .map(Self::image_from))
    }

    async fn has_main_image(&mut self, article_id: i64) -> Result<bool, TargetError> {
        Ok(self
            .id(
                "SELECT id FROM s_articles_img WHERE articleID = ? AND main = 1 LIMIT 1",
                bind!(article_id),
            )
            .await?
            .is_some())
    }

    async fn clear_main_image(&mut self, article_id: i64) -> Result<(), TargetError> {
        self.exec(
            "UPDATE s_articles_img SET main = 2 WHERE articleID = ?",
            bind!(article_id),
        )
        .await
    }

    async fn insert_image(&mut self, row: &ImageRow) -> Result<i64, TargetError> {
        let media_id = self
            .insert(
                "s_media",
                "INSERT INTO s_media (albumID, name, description, path, type, extension, \
                 userID, created) VALUES (-1, ?, '', ?, 'IMAGE', ?, 0, CURDATE())",
                bind!(row.name.as_str(), row.path.as_str(), row.extension.as_str()),
            )
            .await?;
        self.insert(
            "s_articles_img",
            "INSERT INTO s_articles_img (articleID, img, main, description, position, width, \
             height, relations, extension, media_id) VALUES (?, ?, ?, ?, ?, 0, 0, '', ?, ?)",
            bind!(
                row.article_id,
                row.name.as_str(),
                if row.main { 1i64 } else { 2i64 },
                row.description.as_deref().unwrap_or_default(),
                row.position,
                row.extension.as_str(),
                media_id,
            ),
        )
        .await
    }

    async fn update_image(&mut self, row: &ImageRow) -> Result<(), TargetError> {
        self.exec(
            "UPDATE s_articles_img SET main = ?, description = ?, position = ?, extension = ? \
             WHERE id = ?",
            bind!(
                if row.main { 1i64 } else { 2i64 },
                row.description.as_deref().unwrap_or_default(),
                row.position,
                row.extension.as_str(),
                row.id,
            ),
        )
        .await?;
        self.exec(
            "UPDATE s_media m JOIN s_articles_img i ON i.media_id = m.id SET m.path = ? \
             WHERE i.id = ?",
            bind!(row.path.as_str(), row.id),
        )
        .await
    }

    async fn translation(
        &mut self,
        object_type: &str,
        object_key: i64,
        language_id: i64,
    ) -> Result<Option<BTreeMap<String, String>>, TargetError> {
        let data: Option<String> = self
            .conn
            .exec_first(
                "SELECT objectdata FROM s_core_translations \
                 WHERE objecttype = ? AND objectkey = ? AND objectlanguage = ?",
                bind!(object_type, object_key, language_id),
            )
            .await?;
        // Rows written by other tools may not be JSON; they are overwritten.
        Ok(data.and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    async fn write_translation(&mut self, row: &TranslationRow) -> Result<(), TargetError> {
        let data = serde_json::to_string(&row.data)
            .map_err(|e| TargetError::Encode(format!("translation data: {e}")))?;
        self.exec(
            "INSERT INTO s_core_translations (objecttype, objectdata, objectkey, objectlanguage) \
             VALUES (?, ?, ?, ?) ON DUPLICATE KEY UPDATE objectdata = VALUES(objectdata)",
            bind!(row.object_type.as_str(), data, row.object_key, row.language_id),
        )
        .await
    }

    async fn vote_by_key(
        &mut self,
        article_id: i64,
        author: &str,
        headline: &str,
    ) -> Result<Option<i64>, TargetError> {
        self.id(
            "SELECT id FROM s_articles_vote WHERE articleID = ? AND name = ? AND headline = ? \
             LIMIT 1",
            bind!(article_id, author, headline),
        )
        .await
    }

    async fn insert_vote(&mut self, row: &VoteRow) -> Result<i64, TargetError> {
        self.insert(
            "s_articles_vote",
            "INSERT INTO s_articles_vote (articleID, name, headline, comment, points, datum, \
             active, email) VALUES (?, ?, ?, ?, ?, COALESCE(?, NOW()), ?, ?)",
            bind!(
                row.article_id,
                row.author.as_str(),
                row.headline.as_str(),
                row.comment.as_str(),
                row.points,
                row.created_at,
                row.active,
                row.email.as_deref().unwrap_or_default(),
            ),
        )
        .await
    }

    async fn update_vote(&mut self, row: &VoteRow) -> Result<(), TargetError> {
        self.exec(
            "UPDATE s_articles_vote SET comment = ?, points = ?, active = ?, email = ? \
             WHERE id = ?",
            bind!(
                row.comment.as_str(),
                row.points,
                row.active,
                row.email.as_deref().unwrap_or_default(),
                row.id,
            ),
        )
        .await
    }

    async fn purge(&mut self, section: ShopSection) -> Result<(), TargetError> {
        let tables: &[&str] = match section {
            ShopSection::Articles => &[
                "s_articles",
                "s_articles_details",
                "s_articles_attributes",
                "s_articles_prices",
                "s_articles_categories",
                "s_articles_img",
                "s_articles_vote",
                "s_article_configurator_sets",
                "s_article_configurator_groups",
                "s_article_configurator_options",
                "s_article_configurator_set_group_relations",
                "s_article_configurator_set_option_relations",
                "s_article_configurator_option_relations",
                "s_core_translations",
            ],
            ShopSection::Categories => &["s_articles_categories", "s_categories"],
            ShopSection::Customers => &["s_user", "s_user_billingaddress", "s_user_shippingaddress"],
            ShopSection::Orders => &[
                "s_order",
                "s_order_details",
                "s_order_billingaddress",
                "s_order_shippingaddress",
            ],
        };
        for table in tables {
            self.exec(&format!("DELETE FROM {table}"), Params::Empty).await?;
        }
        info!(?section, tables = tables.len(), "Purged target tables");
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), TargetError> {
        self.conn.query_drop("COMMIT").await?;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), TargetError> {
        self.conn.query_drop("ROLLBACK").await?;
        Ok(())
    }
}
