#[cfg(test)]
mod tests {
    use crate::{
        TestShop, run_to_end, shop,
        utils::{self, catalog, mapping_rows, metrics, product},
    };
    use connectors::{
        profile::memory::MemoryProfile,
        target::rows::{CategoryRow, DetailRow},
    };
    use engine_core::{budget::ChunkBudget, state::TokenStore};
    use engine_runtime::{error::MigrationError, step::StepName};
    use model::{
        core::entity::{EntityType, SourceEntity},
        progress::StepStatus,
        shop::price::PriceTier,
    };
    use std::{
        collections::{BTreeMap, BTreeSet},
        time::Duration,
    };
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    const CATALOG_STEPS: [StepName; 4] = [
        StepName::Categories,
        StepName::Products,
        StepName::ArticleCategories,
        StepName::Prices,
    ];

    #[derive(Debug, PartialEq)]
    struct CatalogState {
        categories: BTreeMap<i64, CategoryRow>,
        details: BTreeMap<i64, DetailRow>,
        links: BTreeSet<(i64, i64)>,
        prices: Vec<PriceTier>,
        mappings: Vec<Vec<(String, String)>>,
    }

    async fn catalog_state(shop: &TestShop) -> CatalogState {
        let state = shop.target.snapshot().await;
        let mut mappings = Vec::new();
        for entity in [EntityType::Category, EntityType::Article, EntityType::ValidNumber] {
            mappings.push(mapping_rows(shop.mappings.as_ref(), entity).await);
        }
        let mut prices = state.prices.clone();
        prices.sort_by_key(|t| (t.detail_id, t.from));
        CatalogState {
            categories: state.categories,
            details: state.details,
            links: state.article_categories,
            prices,
            mappings,
        }
    }

    async fn migrate_catalog(budget: ChunkBudget) -> (CatalogState, usize) {
        let shop = shop();
        let run_loop = shop.run_loop(catalog(), budget);
        let mut chunks = 0;
        for step in CATALOG_STEPS {
            let (token, taken) = run_to_end(&run_loop, step).await;
            assert_eq!(token.status, StepStatus::Done, "{step}: {:?}", token.message);
            chunks += taken;
        }
        (catalog_state(&shop).await, chunks)
    }

    // Scenario: The catalog steps run once in a single unbounded chunk each and
    // again with record budgets of 1, 2 and 5, feeding every token back in.
    // Expected Outcome: Every chunked run ends with the same categories,
    // variants, links, price tiers and id mappings as the unbounded run.
    #[traced_test]
    #[tokio::test]
    async fn tc01_chunked_runs_match_unbounded_run() {
        let (expected, chunks) = migrate_catalog(ChunkBudget::unbounded()).await;
        assert_eq!(chunks, CATALOG_STEPS.len());
        assert_eq!(expected.categories.len(), 4);
        assert_eq!(expected.details.len(), 4);
        assert_eq!(expected.links.len(), 4);
        assert_eq!(expected.prices.len(), 5);

        for max_records in [1, 2, 5] {
            let (chunked, chunks) =
                migrate_catalog(ChunkBudget::unbounded().with_max_records(max_records)).await;
            assert!(chunks > CATALOG_STEPS.len(), "budget {max_records} took {chunks} chunks");
            assert_eq!(chunked, expected, "budget {max_records}");
        }
    }

    // Scenario: A step is run one chunk at a time through two orchestrators
    // sharing one token store, as two CLI invocations would.
    // Expected Outcome: The second process resumes at the stored offset and the
    // step completes without importing anything twice.
    #[traced_test]
    #[tokio::test]
    async fn tc02_stored_token_resumes_in_new_process() {
        let shop = shop();
        let budget = ChunkBudget::unbounded().with_max_records(3);

        let first = shop.orchestrator(catalog(), budget);
        let token = first.run_chunk(StepName::Products).await.unwrap();
        assert_eq!(token.status, StepStatus::Running);
        assert_eq!(token.offset, 3);
        drop(first);

        let stored = shop.tokens.load("engine-tests", "products").await.unwrap().unwrap();
        assert_eq!(stored.offset, 3);

        let second = shop.orchestrator(catalog(), budget);
        let token = second.run_chunk(StepName::Products).await.unwrap();
        assert_eq!(token.status, StepStatus::Done);
        assert_eq!(token.param_str("next_step"), Some("article_categories"));
        assert_eq!(metrics(&token).inserted, 4);
        assert_eq!(metrics(&token).updated, 0);
        assert_eq!(shop.target.snapshot().await.details.len(), 4);
        assert!(logs_contain("Chunk finished"));
    }

    // Scenario: The whole migration is run with a small record budget.
    // Expected Outcome: The trampoline keeps invoking chunks until every step
    // reports Done; nothing is left pending.
    #[traced_test]
    #[tokio::test]
    async fn tc03_run_all_completes_every_step() {
        let shop = shop();
        let profile = catalog()
            .with(SourceEntity::Customers, vec![utils::customer(5, "ada@example.com")])
            .with(SourceEntity::Orders, vec![utils::order(7, 5, "A-1")])
            .with(SourceEntity::OrderDetails, vec![utils::order_line(1, 7, "SW-1")])
            .with(SourceEntity::Images, vec![utils::image(1, "media/shirt.jpg")])
            .with(SourceEntity::Translations, vec![utils::translation(1, "2", "Shirt")])
            .with(SourceEntity::Ratings, vec![utils::rating(1, 4.0)]);
        let orchestrator =
            shop.orchestrator(profile, ChunkBudget::unbounded().with_max_records(2));

        let tokens = orchestrator.run_all(&CancellationToken::new()).await.unwrap();
        assert_eq!(tokens.len(), StepName::ORDER.len());
        assert!(tokens.iter().all(|t| t.status == StepStatus::Done));
        assert_eq!(orchestrator.next_pending().await.unwrap(), None);

        let state = shop.target.snapshot().await;
        assert_eq!(state.customers.len(), 1);
        assert_eq!(state.orders.len(), 1);
        assert_eq!(state.order_details.len(), 1);
        assert_eq!(state.images.len(), 1);
        assert_eq!(state.translations.len(), 1);
        assert_eq!(state.votes.len(), 1);
        assert!(logs_contain("Migration completed"));
    }

    // Scenario: Shutdown is requested before the trampoline starts.
    // Expected Outcome: The run stops with Interrupted and a later run with a
    // fresh cancellation token finishes the migration.
    #[traced_test]
    #[tokio::test]
    async fn tc04_cancelled_migration_can_be_resumed() {
        let shop = shop();
        let orchestrator = shop
            .orchestrator(catalog(), ChunkBudget::unbounded())
            .with_steps(CATALOG_STEPS.to_vec());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = orchestrator.run_all(&cancel).await.unwrap_err();
        assert!(matches!(err, MigrationError::Interrupted));
        assert_eq!(orchestrator.next_pending().await.unwrap(), Some(StepName::Categories));

        let tokens = orchestrator.run_all(&CancellationToken::new()).await.unwrap();
        assert_eq!(tokens.len(), CATALOG_STEPS.len());
        assert!(tokens.iter().all(|t| t.is_finished()));
    }

    // Scenario: A step that already finished is started again.
    // Expected Outcome: The second run restarts from offset 0 and updates the
    // existing articles instead of inserting duplicates.
    #[traced_test]
    #[tokio::test]
    async fn tc05_finished_step_reruns_as_updates() {
        let shop = shop();
        let profile = MemoryProfile::new("fixture").with(
            SourceEntity::Products,
            (1..=3).map(|id| product(id, &format!("SW-{id}"))).collect(),
        );
        let run_loop = shop.run_loop(profile, ChunkBudget::unbounded());

        let (first, _) = run_to_end(&run_loop, StepName::Products).await;
        assert_eq!(metrics(&first).inserted, 3);
        let second = run_loop.run(StepName::Products, Some(first)).await.unwrap();

        assert_eq!(second.status, StepStatus::Done);
        assert_eq!(metrics(&second).inserted, 0);
        assert_eq!(metrics(&second).updated, 3);
        assert_eq!(shop.target.snapshot().await.articles.len(), 3);
        assert_eq!(
            mapping_rows(shop.mappings.as_ref(), EntityType::Article).await.len(),
            3
        );
    }

    // Scenario: The catalog steps run through the trampoline with a budget
    // that is already used up when each chunk starts.
    // Expected Outcome: Every invocation still imports one record, so the
    // child-first categories and the rest of the catalog finish.
    #[traced_test]
    #[tokio::test]
    async fn tc06_exhausted_budget_still_makes_progress() {
        let shop = shop();
        let orchestrator = shop
            .orchestrator(catalog(), ChunkBudget::new(Duration::ZERO))
            .with_steps(CATALOG_STEPS.to_vec());

        let tokens = tokio::time::timeout(
            Duration::from_secs(30),
            orchestrator.run_all(&CancellationToken::new()),
        )
        .await
        .expect("migration stalled")
        .unwrap();

        assert!(tokens.iter().all(|t| t.status == StepStatus::Done));
        let state = shop.target.snapshot().await;
        assert_eq!(state.categories.len(), 4);
        assert_eq!(state.details.len(), 4);
        assert_eq!(state.prices.len(), 5);
    }
}
