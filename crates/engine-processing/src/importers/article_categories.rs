use crate::{
    context::{ImportContext, UnitOfWork},
    error::{ImportError, RecordFailure},
    importer::RecordImporter,
    importers::malformed,
    outcome::ImportOutcome,
};
use async_trait::async_trait;
use model::{
    core::entity::SourceEntity, records::record::SourceRecord,
    shop::category::ArticleCategoryRecord,
};

pub struct ArticleCategoryImporter;

#[async_trait]
impl RecordImporter for ArticleCategoryImporter {
    fn entity(&self) -> SourceEntity {
        SourceEntity::ArticleCategories
    }

    async fn import(
        &self,
        ctx: &ImportContext,
        record: &SourceRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let assignment = match ArticleCategoryRecord::from_record(record) {
            Ok(assignment) => assignment,
            Err(e) => return Ok(malformed(e)),
        };
        let mut uow = ctx.begin().await?;
        let result = assign(ctx, &mut uow, &assignment).await;
        uow.settle(ctx.mappings.as_ref(), result).await
    }
}

async fn assign(
    ctx: &ImportContext,
    uow: &mut UnitOfWork,
    assignment: &ArticleCategoryRecord,
) -> Result<ImportOutcome, RecordFailure> {
    let resolver = ctx.resolver();
    let Some(detail) = resolver
        .detail_for(uow.tx(), Some(&assignment.product_source_id), None)
        .await?
    else {
        return Err(RecordFailure::skipped(format!(
            "product {} is not imported",
            assignment.product_source_id
        )));
    };
    let Some(category_id) = resolver
        .category_for_assignment(&assignment.category_source_id)
        .await?
    else {
        return Err(RecordFailure::skipped(format!(
            "category {} is not imported",
            assignment.category_source_id
        )));
    };

    uow.tx()
        .link_article_category(detail.article_id, category_id)
        .await?;
    Ok(ImportOutcome::inserted(category_id))
}
