use crate::context::ImportContext;
use connectors::target::memory::MemoryTarget;
use engine_core::mapping::sled_store::SledMappingStore;
use model::params::RunParams;
use std::sync::Arc;
use tempfile::TempDir;

pub struct Fixture {
    _dir: TempDir,
    pub target: Arc<MemoryTarget>,
    pub mappings: Arc<SledMappingStore>,
    pub ctx: ImportContext,
}

pub fn fixture() -> Fixture {
    fixture_with(RunParams::default())
}

pub fn fixture_with(params: RunParams) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let target = Arc::new(MemoryTarget::new());
    let mappings = Arc::new(SledMappingStore::open(dir.path()).unwrap());
    let ctx = ImportContext::new(target.clone(), mappings.clone(), params);
    Fixture {
        _dir: dir,
        target,
        mappings,
        ctx,
    }
}
