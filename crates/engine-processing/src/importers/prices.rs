use crate::{
    context::{ImportContext, UnitOfWork},
    error::{ImportError, RecordFailure},
    importer::RecordImporter,
    importers::{malformed, price_group},
    outcome::{ImportOutcome, MergePolicy},
    writers::prices::{PriceWriter, TierPrice},
};
use async_trait::async_trait;
use model::{core::entity::SourceEntity, records::record::SourceRecord, shop::price::PriceRecord};

pub struct PriceImporter;

#[async_trait]
impl RecordImporter for PriceImporter {
    fn entity(&self) -> SourceEntity {
        SourceEntity::Prices
    }

    async fn import(
        &self,
        ctx: &ImportContext,
        record: &SourceRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let price = match PriceRecord::from_record(record) {
            Ok(price) => price,
            Err(e) => return Ok(malformed(e)),
        };
        let mut uow = ctx.begin().await?;
        let result = import_price(ctx, &mut uow, &price).await;
        uow.settle(ctx.mappings.as_ref(), result).await
    }
}

async fn import_price(
    ctx: &ImportContext,
    uow: &mut UnitOfWork,
    price: &PriceRecord,
) -> Result<ImportOutcome, RecordFailure> {
    let Some(detail) = ctx
        .resolver()
        .detail_for(
            uow.tx(),
            price.product_source_id.as_deref(),
            price.order_number.as_deref(),
        )
        .await?
    else {
        return Err(RecordFailure::skipped(format!(
            "product {} is not imported",
            price
                .product_source_id
                .as_deref()
                .or(price.order_number.as_deref())
                .unwrap_or_default()
        )));
    };

    let tier = TierPrice::from_record(price, price_group(&ctx.params, price.price_group.as_deref()));
    let replaced = uow
        .tx()
        .price_tiers(&tier.price_group, detail.id)
        .await?
        .iter()
        .any(|t| t.from == tier.from);
    PriceWriter::write(uow.tx(), detail.article_id, detail.id, &tier).await?;

    let action = if replaced {
        MergePolicy::Update
    } else {
        MergePolicy::Insert
    };
    Ok(ImportOutcome::imported(detail.id, action))
}
