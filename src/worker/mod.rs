//! Shard workers
//!
//! A worker receives one shard plus the frozen reference snapshot and
//! returns the findings of the learner rule set over that shard. The
//! orchestrator only sees [`WorkerDispatch`]; whether the shard is validated
//! on a local thread or crosses a process boundary is the transport's
//! concern.

pub mod in_process;
pub mod serialized;

pub use in_process::InProcessWorker;
pub use serialized::{SerializedWorker, WireRequest, WireResponse, WIRE_SCHEMA_VERSION};

use crate::cache::{InMemoryErrorCache, ValidationErrorCache};
use crate::engine;
use crate::lookup::{LookupError, ReferenceDataSnapshot};
use crate::model::ValidationError;
use crate::rules::{Profile, RegistryError, RuleCatalogue, RuleDependencies, RuleError};
use crate::sharding::Shard;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Failures that fail a shard, and with it the job
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Rule failed in shard {shard}")]
    Rule {
        shard: usize,
        #[source]
        source: RuleError,
    },

    #[error("Rule set could not be resolved for shard {shard}")]
    Registry {
        shard: usize,
        #[source]
        source: RegistryError,
    },

    #[error("Reference data rejected for shard {shard}")]
    Reference {
        shard: usize,
        #[source]
        source: LookupError,
    },

    #[error("Wire schema version {found} is not supported (expected {expected})")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("Failed to encode or decode shard payload")]
    Serialization(#[from] serde_json::Error),

    #[error("Worker for shard {shard} did not respond within {timeout:?}")]
    Timeout { shard: usize, timeout: Duration },

    #[error("Worker for shard {shard} failed: {message}")]
    Transport { shard: usize, message: String },
}

impl WorkerError {
    pub fn transport(shard: usize, message: impl Into<String>) -> Self {
        Self::Transport {
            shard,
            message: message.into(),
        }
    }
}

/// Everything a worker needs to validate one shard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardPayload {
    pub job_id: String,
    pub profile: Profile,
    pub shard: Shard,
    pub reference: Arc<ReferenceDataSnapshot>,
}

impl ShardPayload {
    pub fn shard_index(&self) -> usize {
        self.shard.index
    }
}

/// Submit a shard and wait for its findings
#[async_trait]
pub trait WorkerDispatch: Send + Sync {
    async fn submit(&self, payload: ShardPayload) -> WorkerResult<Vec<ValidationError>>;
}

/// Runs the learner rule set over one shard; shared by every transport
#[derive(Debug, Clone)]
pub struct ShardValidator {
    catalogue: Arc<RuleCatalogue>,
}

impl ShardValidator {
    pub fn new(catalogue: Arc<RuleCatalogue>) -> Self {
        Self { catalogue }
    }

    pub fn validate(&self, payload: &ShardPayload) -> WorkerResult<Vec<ValidationError>> {
        let shard = payload.shard_index();
        payload
            .reference
            .ensure_supported()
            .map_err(|source| WorkerError::Reference { shard, source })?;

        let deps = RuleDependencies::from_snapshot(&payload.reference);
        let rules = self
            .catalogue
            .learner
            .resolve(payload.profile, &deps)
            .map_err(|source| WorkerError::Registry { shard, source })?;
        let messages = self.catalogue.messages(&payload.reference.rule_overrides);

        // worker-local cache, merged into the job cache by the orchestrator
        let cache = InMemoryErrorCache::new();
        let stats = engine::execute(&rules, &payload.shard.learners, &messages, &cache)
            .map_err(|source| WorkerError::Rule { shard, source })?;

        debug!(
            job_id = %payload.job_id,
            shard,
            learners = stats.records,
            errors = stats.findings,
            "Shard validated"
        );
        Ok(cache.into_errors())
    }
}
