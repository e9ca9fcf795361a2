use crate::{
    context::{ImportContext, UnitOfWork, remap_id},
    error::{ImportError, RecordFailure},
    importer::RecordImporter,
    importers::malformed,
    outcome::ImportOutcome,
};
use async_trait::async_trait;
use connectors::target::{INVOICE_COUNTER, rows::AddressKind};
use model::{
    core::entity::{EntityType, SourceEntity},
    records::record::SourceRecord,
    shop::order::OrderRecord,
};
use tracing::debug;

/// Order heads. Needs the customer imported first.
pub struct OrderImporter;

#[async_trait]
impl RecordImporter for OrderImporter {
    fn entity(&self) -> SourceEntity {
        SourceEntity::Orders
    }

    async fn import(
        &self,
        ctx: &ImportContext,
        record: &SourceRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let order = match OrderRecord::from_record(record) {
            Ok(order) => order,
            Err(e) => return Ok(malformed(e)),
        };
        let mut uow = ctx.begin().await?;
        let result = import_order(ctx, &mut uow, &order).await;
        uow.settle(ctx.mappings.as_ref(), result).await
    }
}

async fn import_order(
    ctx: &ImportContext,
    uow: &mut UnitOfWork,
    order: &OrderRecord,
) -> Result<ImportOutcome, RecordFailure> {
    let resolver = ctx.resolver();
    let customer_key = order.customer_source_id.as_deref().unwrap_or_default();
    let Some(customer_id) = resolver.mapped_id(EntityType::Customer, customer_key).await? else {
        return Err(RecordFailure::skipped(format!(
            "customer {customer_key} of order {} is not imported",
            order.source_id
        )));
    };

    let remap = &ctx.params.remap;
    let status_id = match order.status.as_deref() {
        Some(key) => remap_id("order_statuses", remap.order_status(key), key)?,
        None => 0,
    };
    let cleared_id = match order.cleared.as_deref() {
        Some(key) => remap_id("order_statuses", remap.order_status(key), key)?,
        None => 0,
    };
    let shop_id = match order.shop.as_deref() {
        Some(key) => remap_id("shops", remap.shop(key), key)?,
        None => ctx.params.default_shop_id,
    };
    let payment_id = match order.payment.as_deref() {
        Some(key) => Some(remap_id("payment_means", remap.payment_mean(key), key)?),
        None => None,
    };

    let (resolved, existing) = resolver.order(uow.tx(), order).await?;
    let mut row = existing.unwrap_or_default();

    if row.order_number.is_empty() {
        row.order_number = match &order.order_number {
            Some(number) => number.clone(),
            None => ctx
                .target
                .next_number(INVOICE_COUNTER)
                .await
                .map_err(ImportError::Target)?
                .to_string(),
        };
    }
    let payment_id = match payment_id {
        Some(id) => id,
        None => uow
            .tx()
            .customer(customer_id)
            .await?
            .and_then(|c| c.payment_id)
            .unwrap_or(row.payment_id),
    };

    row.customer_id = customer_id;
    row.ordered_at = order.ordered_at.or(row.ordered_at);
    row.invoice_amount = order.invoice_amount;
    row.invoice_amount_net = order.invoice_amount_net.unwrap_or(order.invoice_amount);
    row.invoice_shipping = order.invoice_shipping;
    row.invoice_shipping_net = order.invoice_shipping_net.unwrap_or(order.invoice_shipping);
    row.status_id = status_id;
    row.cleared_id = cleared_id;
    row.payment_id = payment_id;
    row.shop_id = shop_id;
    row.currency = order.currency.clone();
    row.currency_factor = order.currency_factor;
    row.comment.clone_from(&order.comment);
    row.customer_comment.clone_from(&order.customer_comment);
    row.net = order.net;
    row.tax_free = order.tax_free;
    row.tracking_code.clone_from(&order.tracking_code);

    let id = match resolved.target_id {
        Some(id) => {
            row.id = id;
            uow.tx().update_order(&row).await?;
            id
        }
        None => uow.tx().insert_order(&row).await?,
    };

    uow.tx()
        .write_order_address(id, AddressKind::Billing, &order.billing)
        .await?;
    let shipping = order.shipping.as_ref().unwrap_or(&order.billing);
    uow.tx()
        .write_order_address(id, AddressKind::Shipping, shipping)
        .await?;
    debug!(source_key = %order.source_id, id, number = %row.order_number, "Wrote order");

    uow.map(EntityType::Order, &order.source_id, id);
    Ok(ImportOutcome::imported(id, resolved.merge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{importers::customers::CustomerImporter, test_support::fixture};
    use engine_core::mapping::IdMappingStore;

    async fn seed_customer(f: &crate::test_support::Fixture) {
        CustomerImporter
            .import(
                &f.ctx,
                &SourceRecord::new()
                    .with("customerID", 5)
                    .with("email", "ada@example.com")
                    .with("paymentID", 3),
            )
            .await
            .unwrap();
    }

    fn order(id: i64) -> SourceRecord {
        SourceRecord::new()
            .with("orderID", id)
            .with("customerID", 5)
            .with("invoice_amount", 119.0)
            .with("billing_lastname", "Lovelace")
    }

    #[tokio::test]
    async fn order_without_customer_is_skipped() {
        let f = fixture();
        let outcome = OrderImporter.import(&f.ctx, &order(1)).await.unwrap();
        assert!(matches!(outcome, ImportOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn missing_number_draws_from_invoice_counter() {
        let f = fixture();
        seed_customer(&f).await;
        let outcome = OrderImporter.import(&f.ctx, &order(1)).await.unwrap();
        assert_eq!(outcome, ImportOutcome::inserted(1));

        let state = f.target.snapshot().await;
        let row = &state.orders[&1];
        assert_eq!(row.order_number, "20001");
        assert_eq!(row.customer_id, 1);
        // Payment falls back to the customer's.
        assert_eq!(row.payment_id, 3);
        assert!((row.invoice_amount_net - 119.0).abs() < 1e-9);
        assert_eq!(f.mappings.get_id(EntityType::Order, "1").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn reimport_keeps_order_number() {
        let f = fixture();
        seed_customer(&f).await;
        OrderImporter.import(&f.ctx, &order(1)).await.unwrap();
        let outcome = OrderImporter
            .import(&f.ctx, &order(1).with("trackingcode", "Z1"))
            .await
            .unwrap();
        assert_eq!(outcome, ImportOutcome::updated(1));
        let state = f.target.snapshot().await;
        assert_eq!(state.orders[&1].order_number, "20001");
        assert_eq!(state.orders[&1].tracking_code.as_deref(), Some("Z1"));
        assert_eq!(f.target.counter(INVOICE_COUNTER).await, Some(20001));
    }

    #[tokio::test]
    async fn explicit_number_is_kept() {
        let f = fixture();
        seed_customer(&f).await;
        OrderImporter
            .import(&f.ctx, &order(1).with("ordernumber", "A-100"))
            .await
            .unwrap();
        assert_eq!(f.target.snapshot().await.orders[&1].order_number, "A-100");
    }
}
