use crate::{
    error::TargetError,
    target::{
        ARTICLE_NUMBER_COUNTER, INVOICE_COUNTER, ShopSection, TargetStore, TargetTx,
        rows::{
            AddressKind, ArticleRow, CategoryRow, CustomerRow, DetailRow, ImageRow,
            OrderDetailRow, OrderRow, TranslationRow, VoteRow,
        },
    },
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use model::shop::{article::AttributeSlots, customer::Address, price::PriceTier};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfiguratorGroup {
    pub name: String,
    pub position: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfiguratorOption {
    pub group_id: i64,
    pub name: String,
    pub position: i64,
}

/// Complete content of an in-memory shop.
#[derive(Debug, Clone, Default)]
pub struct ShopState {
    pub articles: BTreeMap<i64, ArticleRow>,
    pub details: BTreeMap<i64, DetailRow>,
    /// Detail id -> (article id, slots).
    pub attributes: BTreeMap<i64, (i64, AttributeSlots)>,
    pub prices: Vec<PriceTier>,
    pub suppliers: BTreeMap<i64, String>,
    pub taxes: BTreeMap<i64, f64>,
    pub configurator_sets: BTreeMap<i64, String>,
    pub configurator_groups: BTreeMap<i64, ConfiguratorGroup>,
    pub configurator_options: BTreeMap<i64, ConfiguratorOption>,
    pub set_groups: BTreeSet<(i64, i64)>,
    pub set_options: BTreeSet<(i64, i64)>,
    pub option_details: BTreeSet<(i64, i64)>,
    pub categories: BTreeMap<i64, CategoryRow>,
    pub article_categories: BTreeSet<(i64, i64)>,
    pub customers: BTreeMap<i64, CustomerRow>,
    pub customer_addresses: BTreeMap<(i64, AddressKind), Address>,
    pub orders: BTreeMap<i64, OrderRow>,
    pub order_addresses: BTreeMap<(i64, AddressKind), Address>,
    pub order_details: BTreeMap<i64, OrderDetailRow>,
    pub images: BTreeMap<i64, ImageRow>,
    pub translations: BTreeMap<(String, i64, i64), BTreeMap<String, String>>,
    pub votes: BTreeMap<i64, VoteRow>,
    pub counters: BTreeMap<String, i64>,
}

impl ShopState {
    /// Tiers of one (price group, detail) ordered by `from`.
    pub fn tiers(&self, price_group: &str, detail_id: i64) -> Vec<PriceTier> {
        let mut tiers: Vec<PriceTier> = self
            .prices
            .iter()
            .filter(|t| t.price_group == price_group && t.detail_id == detail_id)
            .cloned()
            .collect();
        tiers.sort_by_key(|t| t.from);
        tiers
    }
}

fn next_id<T>(table: &BTreeMap<i64, T>) -> i64 {
    table.keys().next_back().map_or(1, |id| id + 1)
}

/// In-memory target shop.
///
/// A transaction works on a copy of the whole state and swaps it in on
/// commit. Callers are expected to run one transaction at a time.
#[derive(Debug, Clone)]
pub struct MemoryTarget {
    state: Arc<Mutex<ShopState>>,
}

impl Default for MemoryTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTarget {
    /// Shop with the two default tax rates and both number counters.
    pub fn new() -> Self {
        let mut state = ShopState::default();
        state.taxes.insert(1, 19.0);
        state.taxes.insert(4, 7.0);
        state.counters.insert(ARTICLE_NUMBER_COUNTER.to_string(), 10000);
        state.counters.insert(INVOICE_COUNTER.to_string(), 20000);
        Self::from_state(state)
    }

    pub fn from_state(state: ShopState) -> Self {
        MemoryTarget {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn snapshot(&self) -> ShopState {
        self.state.lock().await.clone()
    }

    pub async fn counter(&self, name: &str) -> Option<i64> {
        self.state.lock().await.counters.get(name).copied()
    }
}

#[async_trait]
impl TargetStore for MemoryTarget {
    async fn begin(&self) -> Result<Box<dyn TargetTx>, TargetError> {
        let state = self.state.lock().await.clone();
        Ok(Box::new(MemoryTx {
            state,
            shared: Arc::clone(&self.state),
        }))
    }

    async fn next_number(&self, counter: &str) -> Result<i64, TargetError> {
        let mut state = self.state.lock().await;
        let value = state
            .counters
            .get_mut(counter)
            .ok_or_else(|| TargetError::MissingCounter(counter.to_string()))?;
        *value += 1;
        Ok(*value)
    }
}

pub struct MemoryTx {
    state: ShopState,
    shared: Arc<Mutex<ShopState>>,
}

impl MemoryTx {
    fn detail_mut(&mut self, id: i64) -> Result<&mut DetailRow, TargetError> {
        self.state
            .details
            .get_mut(&id)
            .ok_or(TargetError::NotFound { entity: "detail", id })
    }

    fn article_mut(&mut self, id: i64) -> Result<&mut ArticleRow, TargetError> {
        self.state
            .articles
            .get_mut(&id)
            .ok_or(TargetError::NotFound { entity: "article", id })
    }
}

#[async_trait]
impl TargetTx for MemoryTx {
    async fn article(&mut self, id: i64) -> Result<Option<ArticleRow>, TargetError> {
        Ok(self.state.articles.get(&id).cloned())
    }

    async fn insert_article(&mut self, row: &ArticleRow) -> Result<i64, TargetError> {
        let id = next_id(&self.state.articles);
        self.state.articles.insert(id, ArticleRow { id, ..row.clone() });
        Ok(id)
    }

    async fn touch_article(&mut self, id: i64, changed: NaiveDateTime) -> Result<(), TargetError> {
        self.article_mut(id)?.changed = Some(changed);
        Ok(())
    }

    async fn set_main_detail(&mut self, article_id: i64, detail_id: i64) -> Result<(), TargetError> {
        self.article_mut(article_id)?.main_detail_id = Some(detail_id);
        Ok(())
    }

    async fn set_configurator_set(
        &mut self,
        article_id: i64,
        set_id: i64,
    ) -> Result<(), TargetError> {
        self.article_mut(article_id)?.configurator_set_id = Some(set_id);
        Ok(())
    }

    async fn supplier_by_name(&mut self, name: &str) -> Result<Option<i64>, TargetError> {
        Ok(self
            .state
            .suppliers
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(id, _)| *id))
    }

    async fn insert_supplier(&mut self, name: &str) -> Result<i64, TargetError> {
        let id = next_id(&self.state.suppliers);
        self.state.suppliers.insert(id, name.to_string());
        Ok(id)
    }

    async fn tax_exists(&mut self, id: i64) -> Result<bool, TargetError> {
        Ok(self.state.taxes.contains_key(&id))
    }

    async fn tax_by_rate(&mut self, rate: f64) -> Result<Option<i64>, TargetError> {
        Ok(self
            .state
            .taxes
            .iter()
            .find(|(_, r)| (**r - rate).abs() < 0.005)
            .map(|(id, _)| *id))
    }

    async fn default_tax(&mut self) -> Result<Option<i64>, TargetError> {
        Ok(self.state.taxes.keys().next().copied())
    }

    async fn detail(&mut self, id: i64) -> Result<Option<DetailRow>, TargetError> {
        Ok(self.state.details.get(&id).cloned())
    }

    async fn detail_by_number(&mut self, number: &str) -> Result<Option<DetailRow>, TargetError> {
        Ok(self
            .state
            .details
            .values()
            .find(|d| d.order_number == number)
            .cloned())
    }

    async fn insert_detail(&mut self, row: &DetailRow) -> Result<i64, TargetError> {
        if self
            .state
            .details
            .values()
            .any(|d| !row.order_number.is_empty() && d.order_number == row.order_number)
        {
            return Err(TargetError::Duplicate {
                entity: "detail",
                key: row.order_number.clone(),
            });
        }
        let id = next_id(&self.state.details);
        self.state.details.insert(id, DetailRow { id, ..row.clone() });
        Ok(id)
    }

    async fn update_detail(&mut self, row: &DetailRow) -> Result<(), TargetError> {
        *self.detail_mut(row.id)? = row.clone();
        Ok(())
    }

    async fn delete_detail(&mut self, id: i64) -> Result<(), TargetError> {
        self.state.details.remove(&id);
        self.state.attributes.remove(&id);
        self.state.prices.retain(|t| t.detail_id != id);
        self.state.option_details.retain(|(_, detail)| *detail != id);
        Ok(())
    }

    async fn detail_has_options(&mut self, detail_id: i64) -> Result<bool, TargetError> {
        Ok(self
            .state
            .option_details
            .iter()
            .any(|(_, detail)| *detail == detail_id))
    }

    async fn attributes(&mut self, detail_id: i64) -> Result<Option<AttributeSlots>, TargetError> {
        Ok(self
            .state
            .attributes
            .get(&detail_id)
            .map(|(_, slots)| slots.clone()))
    }

    async fn insert_attributes(
        &mut self,
        article_id: i64,
        detail_id: i64,
        slots: &AttributeSlots,
    ) -> Result<(), TargetError> {
        self.state
            .attributes
            .insert(detail_id, (article_id, slots.clone()));
        Ok(())
    }

    async fn update_attributes(
        &mut self,
        detail_id: i64,
        slots: &AttributeSlots,
    ) -> Result<(), TargetError> {
        let (_, existing) = self
            .state
            .attributes
            .get_mut(&detail_id)
            .ok_or(TargetError::NotFound {
                entity: "attributes",
                id: detail_id,
            })?;
        existing.merge(slots);
        Ok(())
    }

    async fn price_tiers(
        &mut self,
        price_group: &str,
        detail_id: i64,
    ) -> Result<Vec<PriceTier>, TargetError> {
        Ok(self.state.tiers(price_group, detail_id))
    }

    async fn delete_price_tiers_from(
        &mut self,
        price_group: &str,
        detail_id: i64,
        from: i64,
    ) -> Result<(), TargetError> {
        self.state.prices.retain(|t| {
            !(t.price_group == price_group && t.detail_id == detail_id && t.from >= from)
        });
        Ok(())
    }

    async fn set_price_tier_to(
        &mut self,
        price_group: &str,
        detail_id: i64,
        from: i64,
        to: i64,
    ) -> Result<(), TargetError> {
        for tier in self.state.prices.iter_mut().filter(|t| {
            t.price_group == price_group && t.detail_id == detail_id && t.from == from
        }) {
            tier.to = Some(to);
        }
        Ok(())
    }

    async fn insert_price_tier(&mut self, tier: &PriceTier) -> Result<(), TargetError> {
        self.state.prices.push(tier.clone());
        Ok(())
    }

    async fn insert_configurator_set(&mut self, name: &str) -> Result<i64, TargetError> {
        let id = next_id(&self.state.configurator_sets);
        self.state.configurator_sets.insert(id, name.to_string());
        Ok(id)
    }

    async fn configurator_group_by_name(&mut self, name: &str) -> Result<Option<i64>, TargetError> {
        Ok(self
            .state
            .configurator_groups
            .iter()
            .find(|(_, g)| g.name == name)
            .map(|(id, _)| *id))
    }

    async fn insert_configurator_group(
        &mut self,
        name: &str,
        position: i64,
    ) -> Result<i64, TargetError> {
        let id = next_id(&self.state.configurator_groups);
        self.state.configurator_groups.insert(
            id,
            ConfiguratorGroup {
                name: name.to_string(),
                position,
            },
        );
        Ok(id)
    }

    async fn configurator_option_by_name(
        &mut self,
        group_id: i64,
        name: &str,
    ) -> Result<Option<i64>, TargetError> {
        Ok(self
            .state
            .configurator_options
            .iter()
            .find(|(_, o)| o.group_id == group_id && o.name == name)
            .map(|(id, _)| *id))
    }

    async fn insert_configurator_option(
        &mut self,
        group_id: i64,
        name: &str,
        position: i64,
    ) -> Result<i64, TargetError> {
        let id = next_id(&self.state.configurator_options);
        self.state.configurator_options.insert(
            id,
            ConfiguratorOption {
                group_id,
                name: name.to_string(),
                position,
            },
        );
        Ok(id)
    }

    async fn link_set_group(&mut self, set_id: i64, group_id: i64) -> Result<(), TargetError> {
        self.state.set_groups.insert((set_id, group_id));
        Ok(())
    }

    async fn link_set_option(&mut self, set_id: i64, option_id: i64) -> Result<(), TargetError> {
        self.state.set_options.insert((set_id, option_id));
        Ok(())
    }

    async fn link_option_detail(
        &mut self,
        option_id: i64,
        detail_id: i64,
    ) -> Result<(), TargetError> {
        self.state.option_details.insert((option_id, detail_id));
        Ok(())
    }

    async fn category(&mut self, id: i64) -> Result<Option<CategoryRow>, TargetError> {
        Ok(self.state.categories.get(&id).cloned())
    }

    async fn category_by_name(
        &mut self,
        parent_id: i64,
        name: &str,
    ) -> Result<Option<i64>, TargetError> {
        Ok(self
            .state
            .categories
            .values()
            .find(|c| c.parent_id == parent_id && c.name == name)
            .map(|c| c.id))
    }

    async fn insert_category(&mut self, row: &CategoryRow) -> Result<i64, TargetError> {
        let id = next_id(&self.state.categories);
        self.state.categories.insert(id, CategoryRow { id, ..row.clone() });
        Ok(id)
    }

    async fn update_category(&mut self, row: &CategoryRow) -> Result<(), TargetError> {
        let existing = self
            .state
            .categories
            .get_mut(&row.id)
            .ok_or(TargetError::NotFound {
                entity: "category",
                id: row.id,
            })?;
        *existing = row.clone();
        Ok(())
    }

    async fn link_article_category(
        &mut self,
        article_id: i64,
        category_id: i64,
    ) -> Result<(), TargetError> {
        self.state
            .article_categories
            .insert((article_id, category_id));
        Ok(())
    }

    async fn customer(&mut self, id: i64) -> Result<Option<CustomerRow>, TargetError> {
        Ok(self.state.customers.get(&id).cloned())
    }

    async fn customer_by_email(&mut self, email: &str) -> Result<Option<i64>, TargetError> {
        Ok(self
            .state
            .customers
            .values()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .map(|c| c.id))
    }

    async fn insert_customer(&mut self, row: &CustomerRow) -> Result<i64, TargetError> {
        let id = next_id(&self.state.customers);
        self.state.customers.insert(id, CustomerRow { id, ..row.clone() });
        Ok(id)
    }

    async fn update_customer(&mut self, row: &CustomerRow) -> Result<(), TargetError> {
        let existing = self
            .state
            .customers
            .get_mut(&row.id)
            .ok_or(TargetError::NotFound {
                entity: "customer",
                id: row.id,
            })?;
        *existing = row.clone();
        Ok(())
    }

    async fn write_customer_address(
        &mut self,
        customer_id: i64,
        kind: AddressKind,
        address: &Address,
    ) -> Result<(), TargetError> {
        self.state
            .customer_addresses
            .insert((customer_id, kind), address.clone());
        Ok(())
    }

    async fn order(&mut self, id: i64) -> Result<Option<OrderRow>, TargetError> {
        Ok(self.state.orders.get(&id).cloned())
    }

    async fn order_by_number(&mut self, number: &str) -> Result<Option<i64>, TargetError> {
        Ok(self
            .state
            .orders
            .values()
            .find(|o| o.order_number == number)
            .map(|o| o.id))
    }

    async fn insert_order(&mut self, row: &OrderRow) -> Result<i64, TargetError> {
        let id = next_id(&self.state.orders);
        self.state.orders.insert(id, OrderRow { id, ..row.clone() });
        Ok(id)
    }

    async fn update_order(&mut self, row: &OrderRow) -> Result<(), TargetError> {
        let existing = self
            .state
            .orders
            .get_mut(&row.id)
            .ok_or(TargetError::NotFound {
                entity: "order",
                id: row.id,
            })?;
        *existing = row.clone();
        Ok(())
    }

    async fn write_order_address(
        &mut self,
        order_id: i64,
        kind: AddressKind,
        address: &Address,
    ) -> Result<(), TargetError> {
        self.state
            .order_addresses
            .insert((order_id, kind), address.clone());
        Ok(())
    }

    async fn order_detail(&mut self, id: i64) -> Result<Option<OrderDetailRow>, TargetError> {
        Ok(self.state.order_details.get(&id).cloned())
    }

    async fn insert_order_detail(&mut self, row: &OrderDetailRow) -> Result<i64, TargetError> {
        let id = next_id(&self.state.order_details);
        self.state
            .order_details
            .insert(id, OrderDetailRow { id, ..row.clone() });
        Ok(id)
    }

    async fn update_order_detail(&mut self, row: &OrderDetailRow) -> Result<(), TargetError> {
        let existing = self
            .state
            .order_details
            .get_mut(&row.id)
            .ok_or(TargetError::NotFound {
                entity: "order_detail",
                id: row.id,
            })?;
        *existing = row.clone();
        Ok(())
    }

    async fn image_by_name(
        &mut self,
        article_id: i64,
        name: &str,
    ) -> Result<Option<ImageRow>, TargetError> {
        Ok(self
            .state
            .images
            .values()
            .find(|i| i.article_id == article_id && i.name == name)
            .cloned())
    }

    async fn has_main_image(&mut self, article_id: i64) -> Result<bool, TargetError> {
        Ok(self
            .state
            .images
            .values()
            .any(|i| i.article_id == article_id && i.main))
    }

    async fn clear_main_image(&mut self, article_id: i64) -> Result<(), TargetError> {
        for image in self
            .state
            .images
            .values_mut()
            .filter(|i| i.article_id == article_id)
        {
            image.main = false;
        }
        Ok(())
    }

    async fn insert_image(&mut self, row: &ImageRow) -> Result<i64, TargetError> {
        let id = next_id(&self.state.images);
        self.state.images.insert(id, ImageRow { id, ..row.clone() });
        Ok(id)
    }

    async fn update_image(&mut self, row: &ImageRow) -> Result<(), TargetError> {
        let existing = self
            .state
            .images
            .get_mut(&row.id)
            .ok_or(TargetError::NotFound {
                entity: "image",
                id: row.id,
            })?;
        *existing = row.clone();
        Ok(())
    }

    async fn translation(
        &mut self,
        object_type: &str,
        object_key: i64,
        language_id: i64,
    ) -> Result<Option<BTreeMap<String, String>>, TargetError> {
        Ok(self
            .state
            .translations
            .get(&(object_type.to_string(), object_key, language_id))
            .cloned())
    }

    async fn write_translation(&mut self, row: &TranslationRow) -> Result<(), TargetError> {
        self.state.translations.insert(
            (row.object_type.clone(), row.object_key, row.language_id),
            row.data.clone(),
        );
        Ok(())
    }

    async fn vote_by_key(
        &mut self,
        article_id: i64,
        author: &str,
        headline: &str,
    ) -> Result<Option<i64>, TargetError> {
        Ok(self
            .state
            .votes
            .values()
            .find(|v| v.article_id == article_id && v.author == author && v.headline == headline)
            .map(|v| v.id))
    }

    async fn insert_vote(&mut self, row: &VoteRow) -> Result<i64, TargetError> {
        let id = next_id(&self.state.votes);
        self.state.votes.insert(id, VoteRow { id, ..row.clone() });
        Ok(id)
    }

    async fn update_vote(&mut self, row: &VoteRow) -> Result<(), TargetError> {
        let existing = self
            .state
            .votes
            .get_mut(&row.id)
            .ok_or(TargetError::NotFound {
                entity: "vote",
                id: row.id,
            })?;
        *existing = row.clone();
        Ok(())
    }

    async fn purge(&mut self, section: ShopSection) -> Result<(), TargetError> {
        let state = &mut self.state;
        match section {
            ShopSection::Articles => {
                state.articles.clear();
                state.details.clear();
                state.attributes.clear();
                state.prices.clear();
                state.configurator_sets.clear();
                state.configurator_groups.clear();
                state.configurator_options.clear();
                state.set_groups.clear();
                state.set_options.clear();
                state.option_details.clear();
                state.article_categories.clear();
                state.images.clear();
                state.translations.clear();
                state.votes.clear();
            }
            ShopSection::Categories => {
                state.categories.clear();
                state.article_categories.clear();
            }
            ShopSection::Customers => {
                state.customers.clear();
                state.customer_addresses.clear();
            }
            ShopSection::Orders => {
                state.orders.clear();
                state.order_addresses.clear();
                state.order_details.clear();
            }
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), TargetError> {
        let MemoryTx { mut state, shared } = *self;
        let mut current = shared.lock().await;
        // Counters advance outside transactions.
        state.counters = std::mem::take(&mut current.counters);
        *current = state;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), TargetError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rollback_discards_writes() {
        let target = MemoryTarget::new();
        let mut tx = target.begin().await.unwrap();
        tx.insert_supplier("ACME").await.unwrap();
        tx.rollback().await.unwrap();
        assert!(target.snapshot().await.suppliers.is_empty());

        let mut tx = target.begin().await.unwrap();
        tx.insert_supplier("ACME").await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(target.snapshot().await.suppliers.len(), 1);
    }

    #[tokio::test]
    async fn counters_increment_outside_transactions() {
        let target = MemoryTarget::new();
        assert_eq!(target.next_number(ARTICLE_NUMBER_COUNTER).await.unwrap(), 10001);
        assert_eq!(target.next_number(ARTICLE_NUMBER_COUNTER).await.unwrap(), 10002);
        assert!(matches!(
            target.next_number("unknown").await,
            Err(TargetError::MissingCounter(_))
        ));

        let mut tx = target.begin().await.unwrap();
        assert_eq!(target.next_number(ARTICLE_NUMBER_COUNTER).await.unwrap(), 10003);
        tx.insert_supplier("ACME").await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(target.counter(ARTICLE_NUMBER_COUNTER).await, Some(10003));
    }

    #[tokio::test]
    async fn duplicate_order_numbers_are_rejected() {
        let target = MemoryTarget::new();
        let mut tx = target.begin().await.unwrap();
        let row = DetailRow::new(1, model::shop::article::DetailKind::Primary, "SW-1", &Default::default());
        tx.insert_detail(&row).await.unwrap();
        assert!(matches!(
            tx.insert_detail(&row).await,
            Err(TargetError::Duplicate { .. })
        ));
    }
}
