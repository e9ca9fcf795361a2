use crate::{
    context::{ImportContext, UnitOfWork},
    error::{ImportError, RecordFailure},
    importer::RecordImporter,
    importers::malformed,
    outcome::ImportOutcome,
};
use async_trait::async_trait;
use model::{
    core::entity::{EntityType, SourceEntity},
    records::record::SourceRecord,
    shop::order::OrderDetailRecord,
};

/// Order line items. Lines of products that were never imported keep
/// their number and name with article id 0.
pub struct OrderDetailImporter;

#[async_trait]
impl RecordImporter for OrderDetailImporter {
    fn entity(&self) -> SourceEntity {
        SourceEntity::OrderDetails
    }

    async fn import(
        &self,
        ctx: &ImportContext,
        record: &SourceRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let line = match OrderDetailRecord::from_record(record) {
            Ok(line) => line,
            Err(e) => return Ok(malformed(e)),
        };
        let mut uow = ctx.begin().await?;
        let result = import_line(ctx, &mut uow, &line).await;
        uow.settle(ctx.mappings.as_ref(), result).await
    }
}

async fn import_line(
    ctx: &ImportContext,
    uow: &mut UnitOfWork,
    line: &OrderDetailRecord,
) -> Result<ImportOutcome, RecordFailure> {
    let resolver = ctx.resolver();
    let order = match resolver
        .mapped_id(EntityType::Order, &line.order_source_id)
        .await?
    {
        Some(id) => uow.tx().order(id).await?,
        None => None,
    };
    let Some(order) = order else {
        return Err(RecordFailure::skipped(format!(
            "order {} is not imported",
            line.order_source_id
        )));
    };

    let number = Some(line.article_order_number.as_str()).filter(|n| !n.is_empty());
    let article_id = resolver
        .detail_for(uow.tx(), line.product_source_id.as_deref(), number)
        .await?
        .map_or(0, |detail| detail.article_id);

    let (resolved, existing) = resolver.order_detail(uow.tx(), line).await?;
    let mut row = existing.unwrap_or_default();
    row.order_id = order.id;
    row.order_number = order.order_number;
    row.article_id = article_id;
    row.article_order_number = line.article_order_number.clone();
    row.name = line.name.clone();
    row.price = line.price;
    row.quantity = line.quantity;
    row.tax_rate = line.tax_rate.unwrap_or(0.0);
    row.mode = line.mode;

    let id = match resolved.target_id {
        Some(id) => {
            row.id = id;
            uow.tx().update_order_detail(&row).await?;
            id
        }
        None => uow.tx().insert_order_detail(&row).await?,
    };

    uow.map(EntityType::OrderDetail, &line.source_id, id);
    Ok(ImportOutcome::imported(id, resolved.merge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        importers::{customers::CustomerImporter, orders::OrderImporter, products::ProductImporter},
        test_support::{Fixture, fixture},
    };

    async fn seed(f: &Fixture) {
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
        CustomerImporter
            .import(
                &f.ctx,
                &SourceRecord::new()
                    .with("customerID", 5)
                    .with("email", "ada@example.com"),
            )
            .await
            .unwrap();
        OrderImporter
            .import(
                &f.ctx,
                &SourceRecord::new()
                    .with("orderID", 7)
                    .with("customerID", 5)
                    .with("ordernumber", "A-1")
                    .with("invoice_amount", 20.0),
            )
            .await
            .unwrap();
    }

    fn line(id: i64, number: &str) -> SourceRecord {
        SourceRecord::new()
            .with("orderdetailsID", id)
            .with("orderID", 7)
            .with("article_ordernumber", number)
            .with("name", "Shirt")
            .with("price", 10.0)
            .with("quantity", 2)
    }

    #[tokio::test]
    async fn line_links_order_and_article() {
        let f = fixture();
        seed(&f).await;
        let outcome = OrderDetailImporter.import(&f.ctx, &line(1, "SW-1")).await.unwrap();
        assert_eq!(outcome, ImportOutcome::inserted(1));
        let row = &f.target.snapshot().await.order_details[&1];
        assert_eq!(row.order_id, 1);
        assert_eq!(row.order_number, "A-1");
        assert_eq!(row.article_id, 1);
        assert_eq!(row.quantity, 2);
    }

    #[tokio::test]
    async fn unknown_article_keeps_line_with_zero_id() {
        let f = fixture();
        seed(&f).await;
        let outcome = OrderDetailImporter.import(&f.ctx, &line(2, "GONE")).await.unwrap();
        assert!(outcome.is_imported());
        assert_eq!(f.target.snapshot().await.order_details[&1].article_id, 0);
    }

    #[tokio::test]
    async fn line_of_unknown_order_is_skipped() {
        let f = fixture();
        let outcome = OrderDetailImporter.import(&f.ctx, &line(1, "SW-1")).await.unwrap();
        assert!(matches!(outcome, ImportOutcome::Skipped { .. }));
    }
}
