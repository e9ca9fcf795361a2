use crate::{
    context::ImportContext,
    error::ImportError,
    importers::{
        article_categories::ArticleCategoryImporter, categories::CategoryImporter,
        configurators::ConfiguratorImporter, customers::CustomerImporter,
        images::ImageImporter, order_details::OrderDetailImporter, orders::OrderImporter,
        prices::PriceImporter, products::ProductImporter, ratings::RatingImporter,
        translations::TranslationImporter,
    },
    outcome::ImportOutcome,
};
use async_trait::async_trait;
use model::{core::entity::SourceEntity, records::record::SourceRecord};
use std::sync::Arc;

/// Imports one source record into the target shop.
///
/// Record-level problems are returned as outcomes; an `Err` aborts the step.
#[async_trait]
pub trait RecordImporter: Send + Sync {
    fn entity(&self) -> SourceEntity;

    async fn import(
        &self,
        ctx: &ImportContext,
        record: &SourceRecord,
    ) -> Result<ImportOutcome, ImportError>;
}

pub fn importer_for(entity: SourceEntity) -> Arc<dyn RecordImporter> {
    match entity {
        SourceEntity::Products => Arc::new(ProductImporter),
        SourceEntity::Categories => Arc::new(CategoryImporter),
        SourceEntity::ArticleCategories => Arc::new(ArticleCategoryImporter),
        SourceEntity::Customers => Arc::new(CustomerImporter),
        SourceEntity::Prices => Arc::new(PriceImporter),
        SourceEntity::Images => Arc::new(ImageImporter),
        SourceEntity::Translations => Arc::new(TranslationImporter),
        SourceEntity::Ratings => Arc::new(RatingImporter),
        SourceEntity::AttributedProducts => Arc::new(ConfiguratorImporter),
        SourceEntity::Orders => Arc::new(OrderImporter),
        SourceEntity::OrderDetails => Arc::new(OrderDetailImporter),
    }
}
