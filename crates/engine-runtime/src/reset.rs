use crate::error::MigrationError;
use connectors::target::{ShopSection, TargetStore};
use engine_core::mapping::IdMappingStore;
use model::core::entity::EntityType;
use tracing::info;

/// Mapping types that point into the tables of `section`.
pub fn mapping_types(section: ShopSection) -> &'static [EntityType] {
    match section {
        ShopSection::Articles => &[
            EntityType::Article,
            EntityType::ValidNumber,
            EntityType::ArticleParent,
        ],
        ShopSection::Categories => &[EntityType::Category, EntityType::CategoryTarget],
        ShopSection::Customers => &[EntityType::Customer],
        ShopSection::Orders => &[EntityType::Order, EntityType::OrderDetail],
    }
}

/// Wipes the given target sections and every mapping into them, so the next
/// full run starts without duplicates. Returns the number of removed mappings.
pub async fn clear_shop(
    target: &dyn TargetStore,
    mappings: &dyn IdMappingStore,
    sections: &[ShopSection],
) -> Result<u64, MigrationError> {
    let mut tx = target.begin().await?;
    for section in sections {
        tx.purge(*section).await?;
    }
    tx.commit().await?;

    let types: Vec<EntityType> = sections
        .iter()
        .flat_map(|s| mapping_types(*s).iter().copied())
        .collect();
    let removed = mappings.clear(&types).await?;
    info!(?sections, removed, "Shop cleared");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::target::memory::MemoryTarget;
    use engine_core::mapping::sled_store::SledMappingStore;

    #[tokio::test]
    async fn clearing_articles_keeps_other_mappings() {
        let dir = tempfile::tempdir().unwrap();
        let target = MemoryTarget::new();
        let mappings = SledMappingStore::open(dir.path()).unwrap();
        mappings.put(EntityType::Article, "1", "10").await.unwrap();
        mappings.put(EntityType::ValidNumber, "1", "MIG10001").await.unwrap();
        mappings.put(EntityType::Customer, "7", "3").await.unwrap();

        let removed = clear_shop(&target, &mappings, &[ShopSection::Articles])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(mappings.get(EntityType::Article, "1").await.unwrap(), None);
        assert_eq!(
            mappings.get(EntityType::Customer, "7").await.unwrap().as_deref(),
            Some("3")
        );
    }

    #[test]
    fn every_mapping_type_belongs_to_a_section() {
        for entity in EntityType::ALL {
            assert!(
                ShopSection::ALL
                    .iter()
                    .any(|s| mapping_types(*s).contains(&entity)),
                "{entity}"
            );
        }
    }
}
