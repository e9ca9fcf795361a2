#[cfg(test)]
mod tests {
    use crate::{
        run_to_end, shop, shop_with,
        utils::{
            article_category, category, mapping_rows, metrics, price, product, target_id,
        },
    };
    use connectors::{
        profile::memory::MemoryProfile,
        target::{ARTICLE_NUMBER_COUNTER, TargetStore, TargetTx},
    };
    use engine_core::{budget::ChunkBudget, mapping::IdMappingStore};
    use engine_processing::{
        importer::importer_for,
        numbers::{NumberValidator, is_valid_number},
        outcome::ImportOutcome,
    };
    use engine_runtime::step::StepName;
    use model::{
        core::entity::{EntityType, SourceEntity},
        params::{NumberValidationMode, RunParams},
        progress::StepStatus,
    };
    use tracing_test::traced_test;

    fn close_to(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-9
    }

    // Scenario: The same product record is imported twice.
    // Expected Outcome: The first import inserts, the second updates the same
    // article; one article and one Article mapping exist afterwards.
    #[traced_test]
    #[tokio::test]
    async fn tc01_reimport_updates_instead_of_duplicating() {
        let shop = shop();
        let importer = importer_for(SourceEntity::Products);
        let record = product(1, "SW-1");

        let first = importer.import(&shop.ctx, &record).await.unwrap();
        let second = importer.import(&shop.ctx, &record).await.unwrap();

        assert_eq!(first, ImportOutcome::inserted(1));
        assert_eq!(second, ImportOutcome::updated(1));

        let state = shop.target.snapshot().await;
        assert_eq!(state.articles.len(), 1);
        assert_eq!(state.details.len(), 1);
        assert_eq!(
            mapping_rows(shop.mappings.as_ref(), EntityType::Article).await,
            vec![("1".to_string(), "1".to_string())]
        );
    }

    // Scenario: Quantity-break prices from 1, 5, 10 and 20 are written for one
    // variant, then the whole sequence is imported a second time.
    // Expected Outcome: The tiers form [1,4] [5,9] [10,19] [20,unbounded]
    // both times.
    #[traced_test]
    #[tokio::test]
    async fn tc02_price_tiers_stay_contiguous() {
        let shop = shop();
        let profile = MemoryProfile::new("fixture")
            .with(SourceEntity::Products, vec![product(1, "SW-1")])
            .with(
                SourceEntity::Prices,
                vec![
                    price(1, 1, 119.0),
                    price(1, 5, 107.1),
                    price(1, 10, 95.2),
                    price(1, 20, 83.3),
                ],
            );
        let run_loop = shop.run_loop(profile, ChunkBudget::unbounded());
        run_to_end(&run_loop, StepName::Products).await;

        for _ in 0..2 {
            let (done, _) = run_to_end(&run_loop, StepName::Prices).await;
            assert_eq!(done.status, StepStatus::Done);

            let tiers = shop.target.snapshot().await.tiers("EK", 1);
            let ranges: Vec<(i64, Option<i64>)> = tiers.iter().map(|t| (t.from, t.to)).collect();
            assert_eq!(
                ranges,
                vec![(1, Some(4)), (5, Some(9)), (10, Some(19)), (20, None)]
            );
        }
    }

    // Scenario: One (entity type, source key) pair is written repeatedly with
    // different target keys next to an unrelated pair.
    // Expected Outcome: One row per pair survives, holding the latest target.
    #[tokio::test]
    async fn tc03_mapping_put_is_an_upsert() {
        let shop = shop();
        let store = shop.mappings.as_ref();
        for target in ["10", "11", "12"] {
            store.put(EntityType::Customer, "5", target).await.unwrap();
        }
        store.put(EntityType::Order, "5", "99").await.unwrap();

        assert_eq!(
            mapping_rows(store, EntityType::Customer).await,
            vec![("5".to_string(), "12".to_string())]
        );
        assert_eq!(
            store.get(EntityType::Order, "5").await.unwrap().as_deref(),
            Some("99")
        );
    }

    // Scenario: The order-number repair runs twice for the same source id.
    // Expected Outcome: Both calls return the same number and only the first
    // one draws from the shop's number counter.
    #[tokio::test]
    async fn tc04_fabricated_number_is_stable() {
        let shop = shop_with(RunParams {
            number_validation: NumberValidationMode::MakeValid,
            ..RunParams::default()
        });
        let validator = NumberValidator::new(&shop.ctx);
        let mut tx = shop.target.begin().await.unwrap();

        let first = validator.repair(tx.as_mut(), "42").await.unwrap();
        let counter = shop.target.counter(ARTICLE_NUMBER_COUNTER).await;
        let second = validator.repair(tx.as_mut(), "42").await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, "MIG10001");
        assert_eq!(shop.target.counter(ARTICLE_NUMBER_COUNTER).await, counter);
        assert_eq!(counter, Some(10001));
    }

    // Scenario: A child category arrives before its parent.
    // Expected Outcome: The child is buffered, Root is imported first and the
    // retry pass links Child to Root; two categories and two mappings exist.
    #[traced_test]
    #[tokio::test]
    async fn tc05_child_category_waits_for_parent() {
        let shop = shop();
        let profile = MemoryProfile::new("fixture").with(
            SourceEntity::Categories,
            vec![category(2, Some(1), "Child"), category(1, None, "Root")],
        );
        let run_loop = shop.run_loop(profile, ChunkBudget::unbounded());
        let (token, _) = run_to_end(&run_loop, StepName::Categories).await;

        assert_eq!(token.status, StepStatus::Done);
        assert_eq!(metrics(&token).inserted, 2);
        assert_eq!(metrics(&token).deferred, 1);

        let root = target_id(shop.mappings.as_ref(), EntityType::Category, "1").await;
        let child = target_id(shop.mappings.as_ref(), EntityType::Category, "2").await;
        let state = shop.target.snapshot().await;
        assert_eq!(state.categories.len(), 2);
        assert_eq!(state.categories[&root].name, "Root");
        assert_eq!(state.categories[&child].name, "Child");
        assert_eq!(state.categories[&child].parent_id, root);
        assert_eq!(
            mapping_rows(shop.mappings.as_ref(), EntityType::Category).await.len(),
            2
        );
    }

    // Scenario: A gross price of 119 with 19% tax is imported for tier 1.
    // Expected Outcome: The stored net price is 100.
    #[traced_test]
    #[tokio::test]
    async fn tc06_gross_price_is_stored_net() {
        let shop = shop();
        let profile = MemoryProfile::new("fixture")
            .with(SourceEntity::Products, vec![product(1, "SW-1")])
            .with(SourceEntity::Prices, vec![price(1, 1, 119.0)]);
        let run_loop = shop.run_loop(profile, ChunkBudget::unbounded());
        run_to_end(&run_loop, StepName::Products).await;
        let (token, _) = run_to_end(&run_loop, StepName::Prices).await;

        assert_eq!(token.status, StepStatus::Done);
        let tiers = shop.target.snapshot().await.tiers("EK", 1);
        assert_eq!(tiers.len(), 1);
        assert!(close_to(tiers[0].price, 100.0), "stored {}", tiers[0].price);
        assert_eq!(tiers[0].to, None);
    }

    // Scenario: A product without an order number is imported in make_valid
    // mode.
    // Expected Outcome: The import succeeds with a fabricated, valid number
    // that is recorded as a ValidNumber mapping for the product.
    #[traced_test]
    #[tokio::test]
    async fn tc07_missing_order_number_is_repaired() {
        let shop = shop_with(RunParams {
            number_validation: NumberValidationMode::MakeValid,
            ..RunParams::default()
        });
        let profile = MemoryProfile::new("fixture")
            .with(SourceEntity::Products, vec![product(1, "")]);
        let run_loop = shop.run_loop(profile, ChunkBudget::unbounded());
        let (token, _) = run_to_end(&run_loop, StepName::Products).await;

        assert_eq!(token.status, StepStatus::Done);
        assert_eq!(metrics(&token).inserted, 1);

        let state = shop.target.snapshot().await;
        let number = &state.details[&1].order_number;
        assert!(is_valid_number(number), "{number}");
        assert!(number.starts_with("MIG"));
        assert_eq!(
            shop.mappings
                .get(EntityType::ValidNumber, "1")
                .await
                .unwrap()
                .as_ref(),
            Some(number)
        );
        assert!(logs_contain("Replaced invalid order number"));
    }

    // Scenario: Prices and category links reference products and categories
    // that were never imported.
    // Expected Outcome: Those records are skipped, the steps still finish.
    #[traced_test]
    #[tokio::test]
    async fn tc08_missing_references_are_skipped() {
        let shop = shop();
        let profile = MemoryProfile::new("fixture")
            .with(SourceEntity::Products, vec![product(1, "SW-1")])
            .with(SourceEntity::Categories, vec![category(1, None, "Root")])
            .with(SourceEntity::Prices, vec![price(9, 1, 10.0), price(1, 1, 11.9)])
            .with(
                SourceEntity::ArticleCategories,
                vec![article_category(1, 7), article_category(1, 1)],
            );
        let run_loop = shop.run_loop(profile, ChunkBudget::unbounded());
        for step in [StepName::Categories, StepName::Products] {
            run_to_end(&run_loop, step).await;
        }

        let (prices, _) = run_to_end(&run_loop, StepName::Prices).await;
        assert_eq!(prices.status, StepStatus::Done);
        assert_eq!(metrics(&prices).skipped, 1);
        assert_eq!(metrics(&prices).inserted, 1);

        let (links, _) = run_to_end(&run_loop, StepName::ArticleCategories).await;
        assert_eq!(links.status, StepStatus::Done);
        assert_eq!(metrics(&links).skipped, 1);
        assert_eq!(shop.target.snapshot().await.article_categories.len(), 1);
        assert!(logs_contain("Record skipped"));
    }

    // Scenario: The second of three products carries an invalid order number
    // while number validation is in complain mode.
    // Expected Outcome: The step stops with an Error token naming the record;
    // the first product stays imported.
    #[traced_test]
    #[tokio::test]
    async fn tc09_complain_mode_stops_the_step() {
        let shop = shop();
        let profile = MemoryProfile::new("fixture").with(
            SourceEntity::Products,
            vec![product(1, "SW-1"), product(2, "bad number"), product(3, "SW-3")],
        );
        let run_loop = shop.run_loop(profile, ChunkBudget::unbounded());
        let token = run_loop.run(StepName::Products, None).await.unwrap();

        assert_eq!(token.status, StepStatus::Error);
        assert_eq!(token.offset, 0);
        let message = token.message.unwrap_or_default();
        assert!(message.contains("products stopped at 1/3"), "{message}");
        assert_eq!(shop.target.snapshot().await.details.len(), 1);
        assert!(logs_contain("Step aborted"));
    }
}
