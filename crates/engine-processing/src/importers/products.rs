use crate::{
    context::{ImportContext, UnitOfWork},
    error::{ImportError, RecordFailure},
    importer::RecordImporter,
    importers::{malformed, price_group},
    numbers::NumberValidator,
    outcome::ImportOutcome,
    resolver::kind_of,
    writers::{
        article::ArticleWriter,
        configurator::{ConfiguratorWriter, OptionAssignment},
        prices::{PriceWriter, TierPrice},
    },
};
use async_trait::async_trait;
use connectors::target::rows::DetailRow;
use engine_core::mapping::IdMappingStore;
use model::{
    core::entity::{EntityType, SourceEntity},
    records::record::SourceRecord,
    shop::article::{DetailKind, ProductRecord},
};
use tracing::{debug, info};

/// Articles, their details and attributes. Rows with a parent become
/// variants of the parent's article.
pub struct ProductImporter;

#[async_trait]
impl RecordImporter for ProductImporter {
    fn entity(&self) -> SourceEntity {
        SourceEntity::Products
    }

    async fn import(
        &self,
        ctx: &ImportContext,
        record: &SourceRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let product = match ProductRecord::from_record(record) {
            Ok(product) => product,
            Err(e) => return Ok(malformed(e)),
        };
        let mut uow = ctx.begin().await?;
        let result = import_product(ctx, &mut uow, &product).await;
        uow.settle(ctx.mappings.as_ref(), result).await
    }
}

async fn import_product(
    ctx: &ImportContext,
    uow: &mut UnitOfWork,
    product: &ProductRecord,
) -> Result<ImportOutcome, RecordFailure> {
    let number = NumberValidator::new(ctx)
        .validate(uow.tx(), &product.source_id, product.order_number())
        .await?;
    let (resolved, existing) = ctx.resolver().product(uow.tx(), product, &number).await?;
    debug!(source_key = %product.source_id, via = ?resolved.via, kind = ?resolved.kind, "Resolved product");

    if let Some(row) = &existing {
        if replaced_by_variant(ctx, product, row, &number).await? {
            // The parent's own detail is gone; its fields must not land on
            // the variant that took its place.
            ArticleWriter::touch(uow.tx(), row.article_id, product.article.changed).await?;
            debug!(
                source_key = %product.source_id,
                article_id = row.article_id,
                detail_id = row.id,
                "Parent detail was replaced by a variant, touching article only"
            );
            return Ok(ImportOutcome::imported(row.id, resolved.merge));
        }
    }

    let (article_id, detail_id) = match existing {
        Some(row) => {
            let row = ArticleWriter::update(
                uow.tx(),
                row,
                &number,
                &product.detail,
                product.article.changed,
            )
            .await?;
            (row.article_id, row.id)
        }
        None => match product.parent_source_id.as_deref() {
            Some(parent) => attach_variant(ctx, uow, product, parent, &number).await?,
            None => {
                ArticleWriter::insert_article(
                    uow.tx(),
                    &ctx.params,
                    &product.article,
                    &number,
                    &product.detail,
                )
                .await?
            }
        },
    };

    ArticleWriter::write_attributes(uow.tx(), article_id, detail_id, &product.attributes).await?;

    if let Some(inline) = &product.inline_price {
        let tier = TierPrice {
            price_group: price_group(&ctx.params, inline.price_group.as_deref()),
            from: 1,
            price: Some(inline.price),
            pseudo_price: inline.pseudo_price,
            base_price: None,
            percent: None,
            tax_rate: product.article.tax_rate,
        };
        PriceWriter::write(uow.tx(), article_id, detail_id, &tier).await?;
    }

    if !product.configurator_options.is_empty() {
        let options: Vec<OptionAssignment> = product
            .configurator_options
            .iter()
            .map(|(group, option)| OptionAssignment::new(group, option))
            .collect();
        ConfiguratorWriter::attach(uow.tx(), article_id, detail_id, &options).await?;
    }

    uow.map(EntityType::Article, &product.source_id, detail_id);
    Ok(ImportOutcome::imported(detail_id, resolved.merge))
}

/// True when `row` was reached through a parent mapping that was redirected
/// to the first variant. Order numbers are unique per detail, so a parent
/// whose own detail survived still matches on its number.
async fn replaced_by_variant(
    ctx: &ImportContext,
    product: &ProductRecord,
    row: &DetailRow,
    number: &str,
) -> Result<bool, RecordFailure> {
    if product.parent_source_id.is_some() || row.order_number == number {
        return Ok(false);
    }
    let parent = ctx
        .mappings
        .get_id(EntityType::ArticleParent, &product.source_id)
        .await?;
    Ok(parent == Some(row.article_id))
}

/// Adds a new detail to the article of `parent_source_id`.
///
/// The first variant replaces the parent's own detail when that one carries
/// no configurator options: it only existed to hold the parent. Mappings
/// pointing at the removed detail are redirected to the new one.
async fn attach_variant(
    ctx: &ImportContext,
    uow: &mut UnitOfWork,
    product: &ProductRecord,
    parent_source_id: &str,
    number: &str,
) -> Result<(i64, i64), RecordFailure> {
    let Some(parent) = ctx
        .resolver()
        .parent_article(uow.tx(), parent_source_id)
        .await?
    else {
        return Err(RecordFailure::skipped(format!(
            "parent product {parent_source_id} is not imported"
        )));
    };
    let article_id = parent.article.id;

    let placeholder = match (parent.attached, parent.article.main_detail_id) {
        (false, Some(main_id)) if !uow.tx().detail_has_options(main_id).await? => Some(main_id),
        _ => None,
    };
    let becomes_main = placeholder.is_some() || parent.article.main_detail_id.is_none();

    if let Some(dummy) = placeholder {
        uow.tx().delete_detail(dummy).await?;
    }

    let kind = if becomes_main {
        DetailKind::Primary
    } else {
        DetailKind::Secondary
    };
    let detail_id =
        ArticleWriter::insert_detail(uow.tx(), article_id, kind, number, &product.detail).await?;

    let main_detail_id = if becomes_main {
        uow.tx().set_main_detail(article_id, detail_id).await?;
        Some(detail_id)
    } else {
        parent.article.main_detail_id
    };
    if let Some(dummy) = placeholder {
        uow.retarget(EntityType::Article, dummy, detail_id);
        info!(
            parent = parent_source_id,
            article_id,
            replaced = dummy,
            detail_id,
            "Replaced placeholder detail with first variant"
        );
    }
    uow.map_if_absent(EntityType::ArticleParent, parent_source_id, article_id);

    debug!(
        source_key = %product.source_id,
        article_id,
        detail_id,
        kind = ?kind_of(detail_id, main_detail_id),
        "Attached variant"
    );
    Ok((article_id, detail_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, fixture_with};
    use model::{
        core::value::Value,
        params::{NumberValidationMode, RunParams},
    };

    fn product(id: i64, number: &str) -> SourceRecord {
        SourceRecord::new()
            .with("productID", id)
            .with("name", format!("Product {id}"))
            .with("ordernumber", number)
            .with("supplier", "ACME")
            .with("tax", 19.0)
    }

    #[tokio::test]
    async fn reimport_updates_instead_of_duplicating() {
        let f = fixture();
        let first = ProductImporter.import(&f.ctx, &product(1, "SW-1")).await.unwrap();
        let second = ProductImporter
            .import(&f.ctx, &product(1, "SW-1").with("instock", 5))
            .await
            .unwrap();

        assert_eq!(first, ImportOutcome::inserted(1));
        assert_eq!(second, ImportOutcome::updated(1));
        let state = f.target.snapshot().await;
        assert_eq!(state.articles.len(), 1);
        assert_eq!(state.details.len(), 1);
        assert_eq!(state.details[&1].fields.in_stock, Some(5));
        assert_eq!(f.mappings.entries(EntityType::Article).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_keeps_article_core_fields() {
        let f = fixture();
        ProductImporter.import(&f.ctx, &product(1, "SW-1")).await.unwrap();
        ProductImporter
            .import(&f.ctx, &product(1, "SW-1").with("name", "Renamed"))
            .await
            .unwrap();
        let state = f.target.snapshot().await;
        assert_eq!(state.articles[&1].name, "Product 1");
    }

    #[tokio::test]
    async fn missing_supplier_fails_the_record_only() {
        let f = fixture();
        let record = product(1, "SW-1").with("supplier", Value::Null);
        let outcome = ProductImporter.import(&f.ctx, &record).await.unwrap();
        assert!(matches!(outcome, ImportOutcome::Failed { .. }));
        assert!(f.target.snapshot().await.articles.is_empty());
        assert!(f.mappings.get(EntityType::Article, "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_number_aborts_in_complain_mode() {
        let f = fixture();
        let err = ProductImporter
            .import(&f.ctx, &product(1, "SW 1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::InvalidNumber { .. }));
    }

    #[tokio::test]
    async fn first_variant_replaces_placeholder_detail() {
        let f = fixture();
        ProductImporter.import(&f.ctx, &product(1, "PARENT")).await.unwrap();
        let red = ProductImporter
            .import(
                &f.ctx,
                &product(2, "SW-2")
                    .with("parentID", 1)
                    .with("configurator_options", "Color:Red"),
            )
            .await
            .unwrap();
        let blue = ProductImporter
            .import(
                &f.ctx,
                &product(3, "SW-3")
                    .with("parentID", 1)
                    .with("configurator_options", "Color:Blue"),
            )
            .await
            .unwrap();

        let state = f.target.snapshot().await;
        assert_eq!(state.articles.len(), 1);
        assert_eq!(state.details.len(), 2);
        let red_id = red.target_id().unwrap();
        let blue_id = blue.target_id().unwrap();
        assert_eq!(state.articles[&1].main_detail_id, Some(red_id));
        assert_eq!(state.details[&red_id].kind, DetailKind::Primary);
        assert_eq!(state.details[&blue_id].kind, DetailKind::Secondary);
        assert!(state.details.values().all(|d| d.order_number != "PARENT"));

        // The parent's mapping follows the replacement.
        assert_eq!(f.mappings.get_id(EntityType::Article, "1").await.unwrap(), Some(red_id));
        assert_eq!(f.mappings.get_id(EntityType::ArticleParent, "1").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn rerun_of_parent_leaves_first_variant_alone() {
        let f = fixture();
        let records = [
            product(1, "PARENT").with("instock", 10).with("price", 119.0),
            product(2, "SW-2")
                .with("parentID", 1)
                .with("configurator_options", "Color:Red"),
            product(3, "SW-3")
                .with("parentID", 1)
                .with("configurator_options", "Color:Blue"),
        ];
        for record in &records {
            ProductImporter.import(&f.ctx, record).await.unwrap();
        }
        let first = f.target.snapshot().await;

        let mut outcomes = Vec::new();
        for record in &records {
            outcomes.push(ProductImporter.import(&f.ctx, record).await.unwrap());
        }
        let second = f.target.snapshot().await;

        assert!(outcomes.iter().all(|o| o.is_imported()), "{outcomes:?}");
        assert_eq!(second.details, first.details);
        assert_eq!(second.prices, first.prices);
        assert_eq!(second.attributes, first.attributes);
        assert_eq!(second.option_details, first.option_details);
        let red_id = f.mappings.get_id(EntityType::Article, "2").await.unwrap().unwrap();
        assert_eq!(second.details[&red_id].fields.in_stock, None);
        assert!(second.prices.is_empty());
    }

    #[tokio::test]
    async fn variant_without_parent_is_skipped() {
        let f = fixture();
        let outcome = ProductImporter
            .import(&f.ctx, &product(2, "SW-2").with("parentID", 99))
            .await
            .unwrap();
        assert!(matches!(outcome, ImportOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn inline_price_and_attributes_are_written() {
        let f = fixture();
        let record = product(1, "SW-1").with("price", 119.0).with("attr1", "cotton");
        ProductImporter.import(&f.ctx, &record).await.unwrap();
        let state = f.target.snapshot().await;
        let tiers = state.tiers("EK", 1);
        assert_eq!(tiers.len(), 1);
        assert!((tiers[0].price - 100.0).abs() < 1e-9);
        assert_eq!(state.attributes[&1].1.get(1), Some("cotton"));
    }

    #[tokio::test]
    async fn make_valid_fabricates_a_number() {
        let f = fixture_with(RunParams {
            number_validation: NumberValidationMode::MakeValid,
            ..RunParams::default()
        });
        let outcome = ProductImporter.import(&f.ctx, &product(1, "")).await.unwrap();
        assert!(outcome.is_imported());
        let state = f.target.snapshot().await;
        assert_eq!(state.details[&1].order_number, "MIG10001");
        assert_eq!(
            f.mappings.get(EntityType::ValidNumber, "1").await.unwrap().as_deref(),
            Some("MIG10001")
        );
    }
}
