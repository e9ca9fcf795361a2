#![allow(dead_code)]

use connectors::{profile::memory::MemoryProfile, target::memory::MemoryTarget};
use engine_core::{
    budget::ChunkBudget, mapping::sled_store::SledMappingStore, retry::RetryPolicy,
    state::sled_store::SledTokenStore,
};
use engine_processing::context::ImportContext;
use engine_runtime::{orchestrator::StepOrchestrator, run_loop::MigrationRunLoop, step::StepName};
use model::{params::RunParams, progress::ProgressToken};
use std::sync::Arc;
use tempfile::TempDir;

pub mod engine;
pub mod integration;
pub mod utils;

const RUN_ID: &str = "engine-tests";

/// Chunks a single step may take before a test gives up on it.
const MAX_CHUNKS: usize = 1_000;

/// An in-memory target shop with sled-backed mapping and token stores in a
/// scratch directory.
pub struct TestShop {
    dir: TempDir,
    pub target: Arc<MemoryTarget>,
    pub mappings: Arc<SledMappingStore>,
    pub tokens: Arc<SledTokenStore>,
    pub ctx: ImportContext,
}

pub fn shop() -> TestShop {
    shop_with(RunParams::default())
}

pub fn shop_with(params: RunParams) -> TestShop {
    let dir = tempfile::tempdir().expect("create temp dir");
    let target = Arc::new(MemoryTarget::new());
    let mappings =
        Arc::new(SledMappingStore::open(dir.path().join("mappings")).expect("open mapping store"));
    let tokens =
        Arc::new(SledTokenStore::open(dir.path().join("tokens")).expect("open token store"));
    let ctx = ImportContext::new(target.clone(), mappings.clone(), params);
    TestShop {
        dir,
        target,
        mappings,
        tokens,
        ctx,
    }
}

impl TestShop {
    /// Run loop over `profile` with small pages and no source retries.
    pub fn run_loop(&self, profile: MemoryProfile, budget: ChunkBudget) -> MigrationRunLoop {
        MigrationRunLoop::new(Arc::new(profile), self.ctx.clone())
            .with_budget(budget)
            .with_retry(RetryPolicy::none())
            .with_page_size(3)
    }

    pub fn orchestrator(&self, profile: MemoryProfile, budget: ChunkBudget) -> StepOrchestrator {
        StepOrchestrator::new(self.run_loop(profile, budget), self.tokens.clone(), RUN_ID)
    }
}

/// Feeds each returned token back into the run loop until the step
/// finishes. Returns the final token and the number of chunks it took.
pub async fn run_to_end(run_loop: &MigrationRunLoop, step: StepName) -> (ProgressToken, usize) {
    let mut token = None;
    for chunk in 1..=MAX_CHUNKS {
        let next = run_loop.run(step, token).await.expect("run chunk");
        if next.is_finished() {
            return (next, chunk);
        }
        token = Some(next);
    }
    panic!("{step} did not finish within {MAX_CHUNKS} chunks");
}
