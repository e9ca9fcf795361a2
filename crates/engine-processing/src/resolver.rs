use crate::{error::RecordFailure, outcome::MergePolicy};
use connectors::target::{
    TargetTx,
    rows::{ArticleRow, CategoryRow, CustomerRow, DetailRow, OrderDetailRow, OrderRow},
};
use engine_core::{error::MappingStoreError, mapping::IdMappingStore};
use model::{
    core::entity::EntityType,
    mapping::{base_key, language_prefix},
    shop::{
        article::{DetailKind, ProductRecord},
        category::CategoryRecord,
        customer::CustomerRecord,
        order::{OrderDetailRecord, OrderRecord},
    },
};
use tracing::debug;

/// How an existing target entity was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    /// The record carried a target id.
    Explicit,
    Mapping,
    /// Language-independent fallback on a composite key.
    PrefixMapping,
    NaturalKey,
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedKind {
    Primary,
    Secondary,
    New,
}

impl From<DetailKind> for ResolvedKind {
    fn from(kind: DetailKind) -> Self {
        match kind {
            DetailKind::Primary => ResolvedKind::Primary,
            DetailKind::Secondary => ResolvedKind::Secondary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEntity {
    pub target_id: Option<i64>,
    pub kind: ResolvedKind,
    pub merge: MergePolicy,
    pub via: ResolvedVia,
}

impl ResolvedEntity {
    pub fn existing(target_id: i64, via: ResolvedVia) -> Self {
        ResolvedEntity {
            target_id: Some(target_id),
            kind: ResolvedKind::Primary,
            merge: MergePolicy::Update,
            via,
        }
    }

    pub fn new_entity() -> Self {
        ResolvedEntity {
            target_id: None,
            kind: ResolvedKind::New,
            merge: MergePolicy::Insert,
            via: ResolvedVia::New,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<ResolvedKind>) -> Self {
        self.kind = kind.into();
        self
    }
}

/// Primary when the detail is the article's main detail.
pub fn kind_of(detail_id: i64, main_detail_id: Option<i64>) -> DetailKind {
    if main_detail_id == Some(detail_id) {
        DetailKind::Primary
    } else {
        DetailKind::Secondary
    }
}

/// Article a variant is attached to.
#[derive(Debug, Clone)]
pub struct ParentArticle {
    pub article: ArticleRow,
    /// A variant was attached before, so the main detail is a real variant.
    pub attached: bool,
}

/// Finds the target entity a source record refers to.
///
/// Order: explicit target id, exact mapping, language-independent prefix
/// mapping, natural key in the target, otherwise new.
pub struct EntityResolver<'a> {
    mappings: &'a dyn IdMappingStore,
}

impl<'a> EntityResolver<'a> {
    pub fn new(mappings: &'a dyn IdMappingStore) -> Self {
        EntityResolver { mappings }
    }

    /// Mapping steps of the resolution order.
    pub async fn lookup(
        &self,
        entity: EntityType,
        source_key: &str,
        explicit: Option<i64>,
        language_fallback: bool,
    ) -> Result<Option<(i64, ResolvedVia)>, MappingStoreError> {
        if let Some(id) = explicit {
            return Ok(Some((id, ResolvedVia::Explicit)));
        }
        if let Some(id) = self.mappings.get_id(entity, source_key).await? {
            return Ok(Some((id, ResolvedVia::Mapping)));
        }
        if language_fallback {
            let base = base_key(source_key);
            let prefixed = self
                .mappings
                .get_like(entity, &language_prefix(base))
                .await?
                .and_then(|t| t.trim().parse().ok());
            if let Some(id) = prefixed {
                return Ok(Some((id, ResolvedVia::PrefixMapping)));
            }
            if base != source_key {
                if let Some(id) = self.mappings.get_id(entity, base).await? {
                    return Ok(Some((id, ResolvedVia::PrefixMapping)));
                }
            }
        }
        Ok(None)
    }

    /// Detail a product record refers to, if it was imported before.
    pub async fn product(
        &self,
        tx: &mut dyn TargetTx,
        product: &ProductRecord,
        order_number: &str,
    ) -> Result<(ResolvedEntity, Option<DetailRow>), RecordFailure> {
        let mut found = None;

        if let Some((id, via)) = self
            .lookup(
                EntityType::Article,
                &product.source_id,
                product.explicit_detail_id,
                false,
            )
            .await?
        {
            match tx.detail(id).await? {
                Some(row) => found = Some((row, via)),
                None if via == ResolvedVia::Explicit => {
                    return Err(RecordFailure::failed(format!("detail #{id} does not exist")));
                }
                None => debug!(source_key = %product.source_id, id, "Ignoring stale article mapping"),
            }
        }

        if found.is_none() && !order_number.is_empty() {
            found = tx
                .detail_by_number(order_number)
                .await?
                .map(|row| (row, ResolvedVia::NaturalKey));
        }

        match found {
            Some((row, via)) => {
                let main = tx.article(row.article_id).await?.and_then(|a| a.main_detail_id);
                let resolved =
                    ResolvedEntity::existing(row.id, via).with_kind(kind_of(row.id, main));
                Ok((resolved, Some(row)))
            }
            None => Ok((ResolvedEntity::new_entity(), None)),
        }
    }

    /// Detail referenced by a dependent record (price, image, rating, ...).
    pub async fn detail_for(
        &self,
        tx: &mut dyn TargetTx,
        product_source_id: Option<&str>,
        order_number: Option<&str>,
    ) -> Result<Option<DetailRow>, RecordFailure> {
        if let Some(source_id) = product_source_id {
            if let Some(id) = self.mappings.get_id(EntityType::Article, source_id).await? {
                if let Some(row) = tx.detail(id).await? {
                    return Ok(Some(row));
                }
            }
        }
        match order_number {
            Some(number) if !number.is_empty() => Ok(tx.detail_by_number(number).await?),
            _ => Ok(None),
        }
    }

    /// Article of a variant's parent product.
    pub async fn parent_article(
        &self,
        tx: &mut dyn TargetTx,
        parent_source_id: &str,
    ) -> Result<Option<ParentArticle>, RecordFailure> {
        if let Some(article_id) = self
            .mappings
            .get_id(EntityType::ArticleParent, parent_source_id)
            .await?
        {
            if let Some(article) = tx.article(article_id).await? {
                return Ok(Some(ParentArticle {
                    article,
                    attached: true,
                }));
            }
        }

        let Some(detail_id) = self
            .mappings
            .get_id(EntityType::Article, parent_source_id)
            .await?
        else {
            return Ok(None);
        };
        let Some(detail) = tx.detail(detail_id).await? else {
            return Ok(None);
        };
        Ok(tx.article(detail.article_id).await?.map(|article| ParentArticle {
            article,
            attached: false,
        }))
    }

    /// Target id of a category parent: exact key, any language of the same
    /// id, then the bare id.
    pub async fn category_parent(&self, parent_key: &str) -> Result<Option<i64>, MappingStoreError> {
        Ok(self
            .lookup(EntityType::Category, parent_key, None, true)
            .await?
            .map(|(id, _)| id))
    }

    pub async fn category(
        &self,
        tx: &mut dyn TargetTx,
        category: &CategoryRecord,
        parent_id: i64,
    ) -> Result<(ResolvedEntity, Option<CategoryRow>), RecordFailure> {
        if let Some((id, via)) = self
            .lookup(EntityType::Category, &category.source_key(), None, false)
            .await?
        {
            if let Some(row) = tx.category(id).await? {
                return Ok((ResolvedEntity::existing(id, via), Some(row)));
            }
        }
        if let Some(id) = tx.category_by_name(parent_id, &category.name).await? {
            let row = tx.category(id).await?;
            return Ok((ResolvedEntity::existing(id, ResolvedVia::NaturalKey), row));
        }
        Ok((ResolvedEntity::new_entity(), None))
    }

    /// Category an article gets assigned to for a bare source category id.
    pub async fn category_for_assignment(
        &self,
        category_source_id: &str,
    ) -> Result<Option<i64>, MappingStoreError> {
        if let Some(id) = self
            .mappings
            .get_id(EntityType::CategoryTarget, category_source_id)
            .await?
        {
            return Ok(Some(id));
        }
        self.category_parent(category_source_id).await
    }

    pub async fn customer(
        &self,
        tx: &mut dyn TargetTx,
        customer: &CustomerRecord,
    ) -> Result<(ResolvedEntity, Option<CustomerRow>), RecordFailure> {
        if let Some((id, via)) = self
            .lookup(EntityType::Customer, &customer.source_id, None, false)
            .await?
        {
            if let Some(row) = tx.customer(id).await? {
                return Ok((ResolvedEntity::existing(id, via), Some(row)));
            }
        }
        if let Some(id) = tx.customer_by_email(&customer.email).await? {
            let row = tx.customer(id).await?;
            return Ok((ResolvedEntity::existing(id, ResolvedVia::NaturalKey), row));
        }
        Ok((ResolvedEntity::new_entity(), None))
    }

    pub async fn order(
        &self,
        tx: &mut dyn TargetTx,
        order: &OrderRecord,
    ) -> Result<(ResolvedEntity, Option<OrderRow>), RecordFailure> {
        if let Some((id, via)) = self
            .lookup(EntityType::Order, &order.source_id, None, false)
            .await?
        {
            if let Some(row) = tx.order(id).await? {
                return Ok((ResolvedEntity::existing(id, via), Some(row)));
            }
        }
        if let Some(number) = order.order_number.as_deref() {
            if let Some(id) = tx.order_by_number(number).await? {
                let row = tx.order(id).await?;
                return Ok((ResolvedEntity::existing(id, ResolvedVia::NaturalKey), row));
            }
        }
        Ok((ResolvedEntity::new_entity(), None))
    }

    pub async fn order_detail(
        &self,
        tx: &mut dyn TargetTx,
        detail: &OrderDetailRecord,
    ) -> Result<(ResolvedEntity, Option<OrderDetailRow>), RecordFailure> {
        if let Some((id, via)) = self
            .lookup(EntityType::OrderDetail, &detail.source_id, None, false)
            .await?
        {
            if let Some(row) = tx.order_detail(id).await? {
                return Ok((ResolvedEntity::existing(id, via), Some(row)));
            }
        }
        Ok((ResolvedEntity::new_entity(), None))
    }

    /// Target id of an entity imported by an earlier step.
    pub async fn mapped_id(
        &self,
        entity: EntityType,
        source_key: &str,
    ) -> Result<Option<i64>, MappingStoreError> {
        self.mappings.get_id(entity, source_key).await
    }
}
