use crate::error::TargetError;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use model::shop::{article::AttributeSlots, customer::Address, price::PriceTier};
use rows::{
    AddressKind, ArticleRow, CategoryRow, CustomerRow, DetailRow, ImageRow, OrderDetailRow,
    OrderRow, TranslationRow, VoteRow,
};
use std::collections::BTreeMap;

pub mod memory;
pub mod mysql;
pub mod rows;

/// Order number counter used for fabricated article numbers.
pub const ARTICLE_NUMBER_COUNTER: &str = "articleordernumber";
/// Order number counter used for orders imported without a number.
pub const INVOICE_COUNTER: &str = "invoice";

/// Groups of target tables wiped together by a shop reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShopSection {
    Articles,
    Categories,
    Customers,
    Orders,
}

impl ShopSection {
    pub const ALL: [ShopSection; 4] = [
        ShopSection::Articles,
        ShopSection::Categories,
        ShopSection::Customers,
        ShopSection::Orders,
    ];
}

/// The target shop schema.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Opens a unit of work. All writes for one source record go through a
    /// single transaction.
    async fn begin(&self) -> Result<Box<dyn TargetTx>, TargetError>;

    /// Atomically increments the named counter and returns the new value.
    ///
    /// Runs in its own committed transaction with the counter row locked, so
    /// a number handed out is never handed out again even if the caller's
    /// record transaction rolls back.
    async fn next_number(&self, counter: &str) -> Result<i64, TargetError>;
}

#[async_trait]
pub trait TargetTx: Send {
    // articles
    async fn article(&mut self, id: i64) -> Result<Option<ArticleRow>, TargetError>;
    async fn insert_article(&mut self, row: &ArticleRow) -> Result<i64, TargetError>;
    async fn touch_article(&mut self, id: i64, changed: NaiveDateTime) -> Result<(), TargetError>;
    async fn set_main_detail(&mut self, article_id: i64, detail_id: i64) -> Result<(), TargetError>;
    async fn set_configurator_set(&mut self, article_id: i64, set_id: i64)
    -> Result<(), TargetError>;
    async fn supplier_by_name(&mut self, name: &str) -> Result<Option<i64>, TargetError>;
    async fn insert_supplier(&mut self, name: &str) -> Result<i64, TargetError>;
    async fn tax_exists(&mut self, id: i64) -> Result<bool, TargetError>;
    async fn tax_by_rate(&mut self, rate: f64) -> Result<Option<i64>, TargetError>;
    /// Lowest tax id, used when a product carries no tax information.
    async fn default_tax(&mut self) -> Result<Option<i64>, TargetError>;

    // details
    async fn detail(&mut self, id: i64) -> Result<Option<DetailRow>, TargetError>;
    async fn detail_by_number(&mut self, number: &str) -> Result<Option<DetailRow>, TargetError>;
    async fn insert_detail(&mut self, row: &DetailRow) -> Result<i64, TargetError>;
    async fn update_detail(&mut self, row: &DetailRow) -> Result<(), TargetError>;
    /// Deletes a detail together with its attributes, prices and option links.
    async fn delete_detail(&mut self, id: i64) -> Result<(), TargetError>;
    async fn detail_has_options(&mut self, detail_id: i64) -> Result<bool, TargetError>;
    async fn attributes(&mut self, detail_id: i64) -> Result<Option<AttributeSlots>, TargetError>;
    async fn insert_attributes(
        &mut self,
        article_id: i64,
        detail_id: i64,
        slots: &AttributeSlots,
    ) -> Result<(), TargetError>;
    /// Writes only the slots present in `slots`.
    async fn update_attributes(
        &mut self,
        detail_id: i64,
        slots: &AttributeSlots,
    ) -> Result<(), TargetError>;

    // prices
    async fn price_tiers(
        &mut self,
        price_group: &str,
        detail_id: i64,
    ) -> Result<Vec<PriceTier>, TargetError>;
    async fn delete_price_tiers_from(
        &mut self,
        price_group: &str,
        detail_id: i64,
        from: i64,
    ) -> Result<(), TargetError>;
    async fn set_price_tier_to(
        &mut self,
        price_group: &str,
        detail_id: i64,
        from: i64,
        to: i64,
    ) -> Result<(), TargetError>;
    async fn insert_price_tier(&mut self, tier: &PriceTier) -> Result<(), TargetError>;

    // configurator
    async fn insert_configurator_set(&mut self, name: &str) -> Result<i64, TargetError>;
    async fn configurator_group_by_name(&mut self, name: &str) -> Result<Option<i64>, TargetError>;
    async fn insert_configurator_group(
        &mut self,
        name: &str,
        position: i64,
    ) -> Result<i64, TargetError>;
    async fn configurator_option_by_name(
        &mut self,
        group_id: i64,
        name: &str,
    ) -> Result<Option<i64>, TargetError>;
    async fn insert_configurator_option(
        &mut self,
        group_id: i64,
        name: &str,
        position: i64,
    ) -> Result<i64, TargetError>;
    async fn link_set_group(&mut self, set_id: i64, group_id: i64) -> Result<(), TargetError>;
    async fn link_set_option(&mut self, set_id: i64, option_id: i64) -> Result<(), TargetError>;
    async fn link_option_detail(&mut self, option_id: i64, detail_id: i64)
    -> Result<(), TargetError>;

    // categories
    async fn category(&mut self, id: i64) -> Result<Option<CategoryRow>, TargetError>;
    async fn category_by_name(
        &mut self,
        parent_id: i64,
        name: &str,
    ) -> Result<Option<i64>, TargetError>;
    async fn insert_category(&mut self, row: &CategoryRow) -> Result<i64, TargetError>;
    async fn update_category(&mut self, row: &CategoryRow) -> Result<(), TargetError>;
    async fn link_article_category(
        &mut self,
        article_id: i64,
        category_id: i64,
    ) -> Result<(), TargetError>;

    // customers
    async fn customer(&mut self, id: i64) -> Result<Option<CustomerRow>, TargetError>;
    async fn customer_by_email(&mut self, email: &str) -> Result<Option<i64>, TargetError>;
    async fn insert_customer(&mut self, row: &CustomerRow) -> Result<i64, TargetError>;
    async fn update_customer(&mut self, row: &CustomerRow) -> Result<(), TargetError>;
    async fn write_customer_address(
        &mut self,
        customer_id: i64,
        kind: AddressKind,
        address: &Address,
    ) -> Result<(), TargetError>;

    // orders
    async fn order(&mut self, id: i64) -> Result<Option<OrderRow>, TargetError>;
    async fn order_by_number(&mut self, number: &str) -> Result<Option<i64>, TargetError>;
    async fn insert_order(&mut self, row: &OrderRow) -> Result<i64, TargetError>;
    async fn update_order(&mut self, row: &OrderRow) -> Result<(), TargetError>;
    async fn write_order_address(
        &mut self,
        order_id: i64,
        kind: AddressKind,
        address: &Address,
    ) -> Result<(), TargetError>;
    async fn order_detail(&mut self, id: i64) -> Result<Option<OrderDetailRow>, TargetError>;
    async fn insert_order_detail(&mut self, row: &OrderDetailRow) -> Result<i64, TargetError>;
    async fn update_order_detail(&mut self, row: &OrderDetailRow) -> Result<(), TargetError>;

    // images
    async fn image_by_name(
        &mut self,
        article_id: i64,
        name: &str,
    ) -> Result<Option<ImageRow>, TargetError>;
    async fn has_main_image(&mut self, article_id: i64) -> Result<bool, TargetError>;
    async fn clear_main_image(&mut self, article_id: i64) -> Result<(), TargetError>;
    async fn insert_image(&mut self, row: &ImageRow) -> Result<i64, TargetError>;
    async fn update_image(&mut self, row: &ImageRow) -> Result<(), TargetError>;

    // translations
    async fn translation(
        &mut self,
        object_type: &str,
        object_key: i64,
        language_id: i64,
    ) -> Result<Option<BTreeMap<String, String>>, TargetError>;
    async fn write_translation(&mut self, row: &TranslationRow) -> Result<(), TargetError>;

    // votes
    async fn vote_by_key(
        &mut self,
        article_id: i64,
        author: &str,
        headline: &str,
    ) -> Result<Option<i64>, TargetError>;
    async fn insert_vote(&mut self, row: &VoteRow) -> Result<i64, TargetError>;
    async fn update_vote(&mut self, row: &VoteRow) -> Result<(), TargetError>;

    /// Deletes every row of one shop section.
    async fn purge(&mut self, section: ShopSection) -> Result<(), TargetError>;

    async fn commit(self: Box<Self>) -> Result<(), TargetError>;
    async fn rollback(self: Box<Self>) -> Result<(), TargetError>;
}
