use crate::{
    context::{ImportContext, UnitOfWork},
    error::{ImportError, RecordFailure},
    importer::RecordImporter,
    importers::malformed,
    outcome::ImportOutcome,
    writers::configurator::{ConfiguratorWriter, OptionAssignment},
};
use async_trait::async_trait;
use model::{
    core::entity::SourceEntity, records::record::SourceRecord,
    shop::configurator::ConfiguratorRecord,
};

/// Configurator assignments delivered as separate rows, one option per row.
pub struct ConfiguratorImporter;

#[async_trait]
impl RecordImporter for ConfiguratorImporter {
    fn entity(&self) -> SourceEntity {
        SourceEntity::AttributedProducts
    }

    async fn import(
        &self,
        ctx: &ImportContext,
        record: &SourceRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let assignment = match ConfiguratorRecord::from_record(record) {
            Ok(assignment) => assignment,
            Err(e) => return Ok(malformed(e)),
        };
        let mut uow = ctx.begin().await?;
        let result = import_assignment(ctx, &mut uow, &assignment).await;
        uow.settle(ctx.mappings.as_ref(), result).await
    }
}

async fn import_assignment(
    ctx: &ImportContext,
    uow: &mut UnitOfWork,
    record: &ConfiguratorRecord,
) -> Result<ImportOutcome, RecordFailure> {
    let Some(detail) = ctx
        .resolver()
        .detail_for(
            uow.tx(),
            Some(&record.product_source_id),
            record.order_number.as_deref(),
        )
        .await?
    else {
        return Err(RecordFailure::skipped(format!(
            "product {} is not imported",
            record.product_source_id
        )));
    };

    let assignment = OptionAssignment {
        group: record.group.clone(),
        option: record.option.clone(),
        group_position: record.group_position,
        option_position: record.option_position,
    };
    let option_ids =
        ConfiguratorWriter::attach(uow.tx(), detail.article_id, detail.id, &[assignment]).await?;
    match option_ids.first() {
        Some(id) => Ok(ImportOutcome::inserted(*id)),
        None => Err(RecordFailure::failed("no option written")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{importers::products::ProductImporter, test_support::fixture};

    #[tokio::test]
    async fn assignment_links_option_to_detail() {
        let f = fixture();
        ProductImporter
            .import(
                &f.ctx,
                &SourceRecord::new()
                    .with("productID", 1)
                    .with("ordernumber", "SW-1")
                    .with("supplier", "ACME"),
            )
            .await
            .unwrap();

        let record = SourceRecord::new()
            .with("productID", 1)
            .with("group_name", "Size")
            .with("option_name", "L");
        let outcome = ConfiguratorImporter.import(&f.ctx, &record).await.unwrap();
        assert_eq!(outcome, ImportOutcome::inserted(1));

        let state = f.target.snapshot().await;
        assert!(state.option_details.contains(&(1, 1)));
        assert_eq!(state.articles[&1].configurator_set_id, Some(1));
    }

    #[tokio::test]
    async fn unknown_product_is_skipped() {
        let f = fixture();
        let record = SourceRecord::new()
            .with("productID", 9)
            .with("group_name", "Size")
            .with("option_name", "L");
        let outcome = ConfiguratorImporter.import(&f.ctx, &record).await.unwrap();
        assert!(matches!(outcome, ImportOutcome::Skipped { .. }));
    }
}
