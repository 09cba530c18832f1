//! Testing utilities and fixtures
//!
//! Shared by unit tests, integration tests and benches: canonical clean
//! data, worker doubles, and a context that wires an orchestrator to an
//! in-memory store.

pub mod fixtures;
pub mod mocks;

use crate::lookup::ReferenceDataSnapshot;
use crate::orchestrator::{OrchestratorSettings, ValidationOrchestrator};
use crate::output::{MemoryKeyValueStore, ValidationOutputService};
use crate::rules::{RegistryResult, RuleCatalogue};
use crate::sharding::ShardPolicy;
use crate::worker::{InProcessWorker, WorkerDispatch};
use std::sync::Arc;

/// An orchestrator over the standard catalogue and fixture reference data
pub struct TestContext {
    pub catalogue: Arc<RuleCatalogue>,
    pub reference: Arc<ReferenceDataSnapshot>,
    pub store: Arc<MemoryKeyValueStore>,
    pub settings: OrchestratorSettings,
}

impl TestContext {
    pub fn new() -> RegistryResult<Self> {
        Ok(Self {
            catalogue: Arc::new(RuleCatalogue::standard()?),
            reference: Arc::new(fixtures::reference_snapshot()),
            store: Arc::new(MemoryKeyValueStore::new()),
            settings: OrchestratorSettings::default(),
        })
    }

    pub fn with_shard_size(mut self, shard_size: usize) -> Self {
        if let Some(policy) = ShardPolicy::with_max_records(shard_size) {
            self.settings.shard_policy = policy;
        }
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn in_process_worker(&self) -> Arc<dyn WorkerDispatch> {
        Arc::new(InProcessWorker::new(self.catalogue.clone()))
    }

    pub fn orchestrator(&self, dispatcher: Arc<dyn WorkerDispatch>) -> ValidationOrchestrator {
        ValidationOrchestrator::new(
            self.settings,
            self.catalogue.clone(),
            self.reference.clone(),
            dispatcher,
            ValidationOutputService::new(self.store.clone()),
        )
    }
}
