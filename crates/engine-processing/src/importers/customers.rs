use crate::{
    context::{ImportContext, UnitOfWork, remap_id},
    error::{ImportError, RecordFailure},
    importer::RecordImporter,
    importers::malformed,
    outcome::ImportOutcome,
};
use async_trait::async_trait;
use connectors::target::rows::{AddressKind, CustomerRow};
use model::{
    core::entity::{EntityType, SourceEntity},
    params::RunParams,
    records::record::SourceRecord,
    shop::customer::CustomerRecord,
};
use tracing::debug;

/// Password encoder assumed for legacy hashes without one.
const LEGACY_ENCODER: &str = "md5";

pub struct CustomerImporter;

#[async_trait]
impl RecordImporter for CustomerImporter {
    fn entity(&self) -> SourceEntity {
        SourceEntity::Customers
    }

    async fn import(
        &self,
        ctx: &ImportContext,
        record: &SourceRecord,
    ) -> Result<ImportOutcome, ImportError> {
        let customer = match CustomerRecord::from_record(record) {
            Ok(customer) => customer,
            Err(e) => return Ok(malformed(e)),
        };
        let mut uow = ctx.begin().await?;
        let result = import_customer(ctx, &mut uow, &customer).await;
        uow.settle(ctx.mappings.as_ref(), result).await
    }
}

/// Shop, language and payment ids of a customer after remapping.
struct CustomerRefs {
    group: String,
    shop_id: i64,
    language_id: i64,
    payment_id: Option<i64>,
}

fn remap_refs(params: &RunParams, customer: &CustomerRecord) -> Result<CustomerRefs, RecordFailure> {
    let remap = &params.remap;
    let group = match customer.customer_group.as_deref() {
        Some(key) => remap.customer_group(key).unwrap_or(key).to_string(),
        None => params.default_customer_group.clone(),
    };
    let shop_id = match customer.shop.as_deref() {
        Some(key) => remap_id("shops", remap.shop(key), key)?,
        None => params.default_shop_id,
    };
    // The shop's own language unless the customer says otherwise.
    let language_id = match customer.language.as_deref() {
        Some(key) => remap_id("languages", remap.language(key), key)?,
        None => shop_id,
    };
    let payment_id = customer
        .payment
        .as_deref()
        .map(|key| remap_id("payment_means", remap.payment_mean(key), key))
        .transpose()?;
    Ok(CustomerRefs {
        group,
        shop_id,
        language_id,
        payment_id,
    })
}

async fn import_customer(
    ctx: &ImportContext,
    uow: &mut UnitOfWork,
    customer: &CustomerRecord,
) -> Result<ImportOutcome, RecordFailure> {
    let refs = remap_refs(&ctx.params, customer)?;
    let (resolved, existing) = ctx.resolver().customer(uow.tx(), customer).await?;

    let mut row = existing.unwrap_or_default();
    row.email = customer.email.clone();
    if customer.customer_number.is_some() {
        row.customer_number.clone_from(&customer.customer_number);
    }
    if let Some(hash) = &customer.password_hash {
        row.password_hash = Some(hash.clone());
        row.encoder = customer
            .encoder
            .clone()
            .unwrap_or_else(|| LEGACY_ENCODER.to_string());
    }
    row.active = customer.active;
    row.newsletter = customer.newsletter;
    row.first_login = customer.first_login.or(row.first_login);
    row.last_login = customer.last_login.or(row.last_login);
    row.customer_group = refs.group;
    row.shop_id = refs.shop_id;
    row.language_id = refs.language_id;
    row.payment_id = refs.payment_id.or(row.payment_id);

    let id = match resolved.target_id {
        Some(id) => {
            row.id = id;
            uow.tx().update_customer(&row).await?;
            id
        }
        None => uow.tx().insert_customer(&row).await?,
    };

    if !customer.billing.is_empty() {
        uow.tx()
            .write_customer_address(id, AddressKind::Billing, &customer.billing)
            .await?;
    }
    let shipping = customer.shipping.as_ref().unwrap_or(&customer.billing);
    if !shipping.is_empty() {
        uow.tx()
            .write_customer_address(id, AddressKind::Shipping, shipping)
            .await?;
    }
    debug!(source_key = %customer.source_id, id, via = ?resolved.via, "Wrote customer");

    uow.map(EntityType::Customer, &customer.source_id, id);
    Ok(ImportOutcome::imported(id, resolved.merge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, fixture_with};
    use engine_core::mapping::IdMappingStore;

    fn customer(id: i64, email: &str) -> SourceRecord {
        SourceRecord::new()
            .with("customerID", id)
            .with("email", email)
            .with("billing_firstname", "Ada")
            .with("billing_lastname", "Lovelace")
            .with("billing_street", "Main St")
            .with("billing_city", "London")
    }

    #[tokio::test]
    async fn inserts_customer_with_addresses() {
        let f = fixture();
        let outcome = CustomerImporter
            .import(&f.ctx, &customer(5, "Ada@Example.com").with("md5_password", "abc"))
            .await
            .unwrap();
        assert_eq!(outcome, ImportOutcome::inserted(1));

        let state = f.target.snapshot().await;
        let row = &state.customers[&1];
        assert_eq!(row.email, "ada@example.com");
        assert_eq!(row.encoder, "md5");
        assert_eq!(row.customer_group, "EK");
        assert_eq!(row.shop_id, 1);
        // No shipping columns: billing is reused.
        assert_eq!(
            state.customer_addresses[&(1, AddressKind::Shipping)],
            state.customer_addresses[&(1, AddressKind::Billing)]
        );
        assert_eq!(f.mappings.get_id(EntityType::Customer, "5").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn known_email_is_merged() {
        let f = fixture();
        CustomerImporter
            .import(&f.ctx, &customer(5, "ada@example.com"))
            .await
            .unwrap();
        // Same person under a different source id.
        let outcome = CustomerImporter
            .import(&f.ctx, &customer(6, "ada@example.com"))
            .await
            .unwrap();
        assert_eq!(outcome, ImportOutcome::updated(1));
        assert_eq!(f.target.snapshot().await.customers.len(), 1);
    }

    #[tokio::test]
    async fn unmapped_shop_fails_record() {
        let f = fixture();
        let outcome = CustomerImporter
            .import(&f.ctx, &customer(5, "ada@example.com").with("subshopID", "main"))
            .await
            .unwrap();
        assert!(matches!(outcome, ImportOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn groups_and_shops_are_remapped() {
        let mut params = RunParams::default();
        params.remap.customer_groups.insert("1".into(), "H".into());
        params.remap.shops.insert("main".into(), "2".into());
        let f = fixture_with(params);
        CustomerImporter
            .import(
                &f.ctx,
                &customer(5, "ada@example.com")
                    .with("customergroup", "1")
                    .with("subshopID", "main"),
            )
            .await
            .unwrap();
        let state = f.target.snapshot().await;
        assert_eq!(state.customers[&1].customer_group, "H");
        assert_eq!(state.customers[&1].shop_id, 2);
        assert_eq!(state.customers[&1].language_id, 2);
    }

    #[tokio::test]
    async fn invalid_email_fails() {
        let f = fixture();
        let outcome = CustomerImporter
            .import(&f.ctx, &customer(5, "not-an-address"))
            .await
            .unwrap();
        assert!(matches!(outcome, ImportOutcome::Failed { .. }));
    }
}
