use connectors::profile::memory::MemoryProfile;
use engine_core::{
    mapping::IdMappingStore,
    metrics::{MetricsSnapshot, StepMetrics},
};
use model::{
    core::entity::{EntityType, SourceEntity},
    progress::ProgressToken,
    records::record::SourceRecord,
};

pub fn product(id: i64, number: &str) -> SourceRecord {
    SourceRecord::new()
        .with("productID", id)
        .with("name", format!("Product {id}"))
        .with("ordernumber", number)
        .with("supplier", "ACME")
        .with("tax", 19.0)
}

pub fn category(id: i64, parent: Option<i64>, name: &str) -> SourceRecord {
    let record = SourceRecord::new()
        .with("categoryID", id)
        .with("description", name);
    match parent {
        Some(parent) => record.with("parentID", parent),
        None => record,
    }
}

pub fn article_category(product: i64, category: i64) -> SourceRecord {
    SourceRecord::new()
        .with("productID", product)
        .with("categoryID", category)
}

pub fn price(product: i64, from: i64, gross: f64) -> SourceRecord {
    SourceRecord::new()
        .with("productID", product)
        .with("from", from)
        .with("price", gross)
        .with("tax", 19.0)
}

pub fn customer(id: i64, email: &str) -> SourceRecord {
    SourceRecord::new()
        .with("customerID", id)
        .with("email", email)
        .with("billing_firstname", "Ada")
        .with("billing_lastname", "Lovelace")
        .with("billing_street", "Main St")
        .with("billing_city", "London")
}

pub fn order(id: i64, customer: i64, number: &str) -> SourceRecord {
    SourceRecord::new()
        .with("orderID", id)
        .with("customerID", customer)
        .with("ordernumber", number)
        .with("invoice_amount", 20.0)
}

pub fn order_line(id: i64, order: i64, article_number: &str) -> SourceRecord {
    SourceRecord::new()
        .with("orderdetailsID", id)
        .with("orderID", order)
        .with("article_ordernumber", article_number)
        .with("name", "Shirt")
        .with("price", 10.0)
        .with("quantity", 2)
}

pub fn rating(product: i64, points: f64) -> SourceRecord {
    SourceRecord::new()
        .with("productID", product)
        .with("name", "Ada")
        .with("headline", "Fits")
        .with("comment", "Would buy again")
        .with("points", points)
}

pub fn translation(product: i64, language: &str, name: &str) -> SourceRecord {
    SourceRecord::new()
        .with("productID", product)
        .with("languageID", language)
        .with("name", name)
}

pub fn image(product: i64, path: &str) -> SourceRecord {
    SourceRecord::new()
        .with("productID", product)
        .with("image", path)
}

pub fn metrics(token: &ProgressToken) -> MetricsSnapshot {
    StepMetrics::from_token(token).snapshot()
}

/// `(source key, target key)` pairs of one entity type, sorted.
pub async fn mapping_rows(store: &dyn IdMappingStore, entity: EntityType) -> Vec<(String, String)> {
    let mut rows: Vec<(String, String)> = store
        .entries(entity)
        .await
        .expect("list mappings")
        .into_iter()
        .map(|m| (m.source_key, m.target_key))
        .collect();
    rows.sort();
    rows
}

pub async fn target_id(store: &dyn IdMappingStore, entity: EntityType, source_key: &str) -> i64 {
    store
        .get_id(entity, source_key)
        .await
        .expect("read mapping")
        .unwrap_or_else(|| panic!("no {entity:?} mapping for {source_key}"))
}

/// Categories arriving child-first, four products with links and tiered prices.
pub fn catalog() -> MemoryProfile {
    MemoryProfile::new("catalog")
        .with(
            SourceEntity::Categories,
            vec![
                category(3, Some(2), "Shirts"),
                category(2, Some(1), "Clothing"),
                category(1, None, "Root"),
                category(4, Some(1), "Shoes"),
            ],
        )
        .with(
            SourceEntity::Products,
            (1..=4).map(|id| product(id, &format!("SW-{id}"))).collect(),
        )
        .with(
            SourceEntity::ArticleCategories,
            vec![
                article_category(1, 3),
                article_category(2, 3),
                article_category(3, 4),
                article_category(4, 2),
            ],
        )
        .with(
            SourceEntity::Prices,
            vec![
                price(1, 1, 119.0),
                price(1, 10, 107.1),
                price(2, 1, 59.5),
                price(3, 1, 23.8),
                price(3, 5, 21.42),
            ],
        )
}
