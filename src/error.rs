//! Job-level errors
//!
//! Every failure that ends a validation job surfaces as a [`JobError`]. An
//! absent submission is not one of them; it ends the job normally with
//! empty output.

use crate::config::ConfigError;
use crate::lookup::LookupError;
use crate::orchestrator::JobState;
use crate::output::OutputError;
use crate::rules::{RegistryError, RuleError};
use crate::worker::WorkerError;
use thiserror::Error;

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job {job_id} was cancelled after {state}")]
    Cancelled { job_id: String, state: JobState },

    #[error("Job {job_id} has an invalid rule configuration")]
    Registry {
        job_id: String,
        #[source]
        source: RegistryError,
    },

    #[error("Header validation failed for job {job_id}")]
    HeaderRule {
        job_id: String,
        #[source]
        source: RuleError,
    },

    #[error("Shard {shard} failed for job {job_id}")]
    Worker {
        job_id: String,
        shard: usize,
        #[source]
        source: WorkerError,
    },

    #[error("Failed to save output for job {job_id}")]
    Output {
        job_id: String,
        #[source]
        source: OutputError,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl JobError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
