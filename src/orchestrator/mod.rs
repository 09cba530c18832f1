//! Two-phase validation job
//!
//! ```text
//! Populated -> HeaderValidated -> GatedBlocked ----------------------------> Finalized
//!                              \-> Sharding -> Dispatched -> Aggregating -> Finalized
//! ```
//!
//! The header rule set runs once against the submission. Any blocking
//! header finding stops the job before a single shard is created. Otherwise
//! the learners are sharded, every shard is dispatched to a worker, and the
//! job waits for all of them. Shard results are merged into the job's error
//! cache in completion order; the first failed shard fails the whole job.

pub mod cancellation;

pub use cancellation::CancellationFlag;

use crate::cache::{InMemoryErrorCache, ValidationErrorCache};
use crate::config::{ConfigError, ConfigResult, ValidationConfig};
use crate::engine;
use crate::error::{JobError, JobResult};
use crate::lookup::ReferenceDataSnapshot;
use crate::model::{Submission, ValidationError};
use crate::output::{ValidationArtifacts, ValidationOutputService, ValidationSummary};
use crate::population::SubmissionSource;
use crate::rules::{Profile, RuleCatalogue, RuleDependencies, RuleMessages};
use crate::sharding::{Shard, ShardPolicy, ShardingService};
use crate::worker::{ShardPayload, WorkerDispatch, WorkerError};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// Job lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Populated,
    HeaderValidated,
    GatedBlocked,
    Sharding,
    Dispatched,
    Aggregating,
    Finalized,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Populated => "populated",
            JobState::HeaderValidated => "header-validated",
            JobState::GatedBlocked => "gated-blocked",
            JobState::Sharding => "sharding",
            JobState::Dispatched => "dispatched",
            JobState::Aggregating => "aggregating",
            JobState::Finalized => "finalized",
        };
        write!(f, "{name}")
    }
}

/// Orchestrator knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorSettings {
    pub profile: Profile,
    pub max_parallel_workers: usize,
    pub worker_timeout: Duration,
    pub shard_policy: ShardPolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        let config = ValidationConfig::default();
        Self {
            profile: config.profile,
            max_parallel_workers: config.max_parallel_workers,
            worker_timeout: config.worker_timeout,
            shard_policy: ShardPolicy::default(),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &ValidationConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            profile: config.profile,
            max_parallel_workers: config.max_parallel_workers,
            worker_timeout: config.worker_timeout,
            shard_policy: config.shard_policy()?,
        })
    }

    /// Reject settings a job cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_parallel_workers == 0 {
            return Err(ConfigError::invalid(
                "max_parallel_workers",
                "must be at least 1",
            ));
        }
        if self.worker_timeout.is_zero() {
            return Err(ConfigError::invalid("worker_timeout", "must be non-zero"));
        }
        Ok(())
    }
}

/// Result of a finalized job
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub job_id: String,
    /// States visited, in order
    pub transitions: Vec<JobState>,
    pub shards_dispatched: usize,
    /// Final cache contents: header findings, then shard findings in
    /// completion order
    pub errors: Vec<ValidationError>,
    pub artifacts: ValidationArtifacts,
}

impl JobOutcome {
    pub fn summary(&self) -> ValidationSummary {
        self.artifacts.summary
    }

    pub fn final_state(&self) -> Option<JobState> {
        self.transitions.last().copied()
    }
}

/// Per-job bookkeeping
struct JobRun<'a> {
    job_id: &'a str,
    cancel: &'a CancellationFlag,
    transitions: Vec<JobState>,
}

impl<'a> JobRun<'a> {
    fn new(job_id: &'a str, cancel: &'a CancellationFlag) -> Self {
        Self {
            job_id,
            cancel,
            transitions: Vec::new(),
        }
    }

    fn enter(&mut self, state: JobState) {
        debug!(job_id = self.job_id, state = %state, "Job state transition");
        self.transitions.push(state);
    }

    fn current(&self) -> Option<JobState> {
        self.transitions.last().copied()
    }

    fn check_cancelled(&self) -> JobResult<()> {
        if !self.cancel.is_cancelled() {
            return Ok(());
        }
        let state = self.current().unwrap_or(JobState::Populated);
        warn!(job_id = self.job_id, state = %state, "Job cancelled");
        Err(JobError::Cancelled {
            job_id: self.job_id.to_string(),
            state,
        })
    }
}

/// Runs validation jobs against one reference snapshot and rule catalogue
pub struct ValidationOrchestrator {
    settings: OrchestratorSettings,
    catalogue: Arc<RuleCatalogue>,
    reference: Arc<ReferenceDataSnapshot>,
    dispatcher: Arc<dyn WorkerDispatch>,
    output: ValidationOutputService,
    sharding: ShardingService,
}

impl ValidationOrchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        catalogue: Arc<RuleCatalogue>,
        reference: Arc<ReferenceDataSnapshot>,
        dispatcher: Arc<dyn WorkerDispatch>,
        output: ValidationOutputService,
    ) -> Self {
        Self {
            sharding: ShardingService::new(settings.shard_policy),
            settings,
            catalogue,
            reference,
            dispatcher,
            output,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run one job end to end.
    ///
    /// Configuration problems, including unusable settings, fail the job
    /// before any rule runs. Returns
    /// [`JobError::Cancelled`] if `cancel` is raised at a phase boundary, in
    /// which case nothing is saved.
    pub async fn run_job(
        &self,
        job_id: &str,
        source: &dyn SubmissionSource,
        cancel: &CancellationFlag,
    ) -> JobResult<JobOutcome> {
        let started = Instant::now();
        let mut run = JobRun::new(job_id, cancel);

        self.settings.validate()?;
        self.reference.ensure_supported()?;
        let deps = RuleDependencies::from_snapshot(&self.reference);
        let header_rules = self
            .catalogue
            .header
            .resolve(self.settings.profile, &deps)
            .map_err(|source| JobError::Registry {
                job_id: job_id.to_string(),
                source,
            })?;
        self.catalogue
            .learner
            .check(self.settings.profile, &self.reference.internal)
            .map_err(|source| JobError::Registry {
                job_id: job_id.to_string(),
                source,
            })?;
        let messages = self.catalogue.messages(&self.reference.rule_overrides);

        let Some(submission) = source.get().await else {
            warn!(job_id, "No submission available; finalizing with empty output");
            run.check_cancelled()?;
            return self
                .finalize(&mut run, Vec::new(), None, &messages, 0, started)
                .await;
        };
        run.enter(JobState::Populated);
        info!(
            job_id,
            learners = submission.learners.len(),
            profile = %self.settings.profile,
            "Starting validation job"
        );
        run.check_cancelled()?;

        let cache = InMemoryErrorCache::new();
        engine::execute(
            &header_rules,
            std::slice::from_ref(submission.as_ref()),
            &messages,
            &cache,
        )
        .map_err(|source| JobError::HeaderRule {
            job_id: job_id.to_string(),
            source,
        })?;
        run.enter(JobState::HeaderValidated);
        run.check_cancelled()?;

        if cache.has_blocking_errors() {
            run.enter(JobState::GatedBlocked);
            info!(job_id, errors = cache.len(), "Header validation blocked the job");
            return self
                .finalize(&mut run, cache.into_errors(), None, &messages, 0, started)
                .await;
        }

        run.enter(JobState::Sharding);
        let shards = self.sharding.partition(&submission);
        let shard_count = shards.len();

        self.dispatch(&mut run, shards, &cache).await?;

        self.finalize(
            &mut run,
            cache.into_errors(),
            Some(submission.as_ref()),
            &messages,
            shard_count,
            started,
        )
        .await
    }

    /// Fire every shard, then merge results as they complete
    async fn dispatch(
        &self,
        run: &mut JobRun<'_>,
        shards: Vec<Shard>,
        cache: &InMemoryErrorCache,
    ) -> JobResult<()> {
        let job_id = run.job_id;
        let semaphore = Arc::new(Semaphore::new(self.settings.max_parallel_workers));
        let mut pending = FuturesUnordered::new();
        let mut abort_handles: Vec<AbortHandle> = Vec::with_capacity(shards.len());

        for shard in shards {
            let index = shard.index;
            let payload = ShardPayload {
                job_id: job_id.to_string(),
                profile: self.settings.profile,
                shard,
                reference: self.reference.clone(),
            };
            let handle = tokio::spawn(run_shard(
                self.dispatcher.clone(),
                semaphore.clone(),
                payload,
                self.settings.worker_timeout,
            ));
            abort_handles.push(handle.abort_handle());
            pending.push(handle.map(move |joined| (index, joined)));
        }
        run.enter(JobState::Dispatched);
        info!(
            job_id,
            shards = abort_handles.len(),
            max_parallel = self.settings.max_parallel_workers,
            "Dispatched shards"
        );

        run.enter(JobState::Aggregating);
        while let Some((shard, joined)) = pending.next().await {
            let result = joined
                .map_err(|e| WorkerError::transport(shard, format!("worker task failed: {e}")))
                .and_then(|result| result);

            match result {
                Ok(errors) => {
                    debug!(job_id, shard, errors = errors.len(), "Shard completed");
                    cache.add_all(errors);
                }
                Err(source) => {
                    warn!(job_id, shard, error = %source, "Shard failed; aborting job");
                    for handle in &abort_handles {
                        handle.abort();
                    }
                    return Err(JobError::Worker {
                        job_id: job_id.to_string(),
                        shard,
                        source,
                    });
                }
            }
            run.check_cancelled()?;
        }
        Ok(())
    }

    async fn finalize(
        &self,
        run: &mut JobRun<'_>,
        errors: Vec<ValidationError>,
        validated: Option<&Submission>,
        messages: &RuleMessages,
        shards_dispatched: usize,
        started: Instant,
    ) -> JobResult<JobOutcome> {
        let job_id = run.job_id;
        let artifacts = self
            .output
            .process(job_id, &errors, validated, messages)
            .await
            .map_err(|source| JobError::Output {
                job_id: job_id.to_string(),
                source,
            })?;
        run.enter(JobState::Finalized);

        info!(
            job_id,
            errors = errors.len(),
            shards = shards_dispatched,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Validation job finished"
        );
        Ok(JobOutcome {
            job_id: job_id.to_string(),
            transitions: std::mem::take(&mut run.transitions),
            shards_dispatched,
            errors,
            artifacts,
        })
    }
}

async fn run_shard(
    dispatcher: Arc<dyn WorkerDispatch>,
    semaphore: Arc<Semaphore>,
    payload: ShardPayload,
    timeout: Duration,
) -> Result<Vec<ValidationError>, WorkerError> {
    let shard = payload.shard_index();
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| WorkerError::transport(shard, e.to_string()))?;

    match tokio::time::timeout(timeout, dispatcher.submit(payload)).await {
        Ok(result) => result,
        Err(_) => Err(WorkerError::Timeout { shard, timeout }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemoryKeyValueStore;
    use crate::population::StaticSubmissionSource;
    use crate::testing::fixtures;
    use crate::testing::mocks::{FailingWorker, RecordingWorker};
    use crate::worker::InProcessWorker;

    fn orchestrator(
        dispatcher: Arc<dyn WorkerDispatch>,
        shard_size: usize,
    ) -> ValidationOrchestrator {
        let settings = OrchestratorSettings {
            shard_policy: ShardPolicy::with_max_records(shard_size).unwrap(),
            ..Default::default()
        };
        ValidationOrchestrator::new(
            settings,
            Arc::new(RuleCatalogue::standard().unwrap()),
            Arc::new(fixtures::reference_snapshot()),
            dispatcher,
            ValidationOutputService::new(Arc::new(MemoryKeyValueStore::new())),
        )
    }

    fn in_process() -> Arc<dyn WorkerDispatch> {
        Arc::new(InProcessWorker::new(Arc::new(RuleCatalogue::standard().unwrap())))
    }

    #[tokio::test]
    async fn test_clean_submission_visits_every_detail_state() {
        let source = StaticSubmissionSource::new(fixtures::submission(fixtures::learners(5)));
        let outcome = orchestrator(in_process(), 2)
            .run_job("job-1", &source, &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(
            outcome.transitions,
            vec![
                JobState::Populated,
                JobState::HeaderValidated,
                JobState::Sharding,
                JobState::Dispatched,
                JobState::Aggregating,
                JobState::Finalized,
            ]
        );
        assert_eq!(outcome.shards_dispatched, 3);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.summary().valid_learner_count, 5);
    }

    #[tokio::test]
    async fn test_blocking_header_skips_sharding() {
        let mut submission = fixtures::submission(fixtures::learners(4));
        submission.header.collection_details.collection = "XYZ".to_string();
        let recorder = Arc::new(RecordingWorker::new(in_process()));

        let outcome = orchestrator(recorder.clone(), 2)
            .run_job("job-2", &StaticSubmissionSource::new(submission), &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(outcome.final_state(), Some(JobState::Finalized));
        assert!(outcome.transitions.contains(&JobState::GatedBlocked));
        assert!(!outcome.transitions.contains(&JobState::Sharding));
        assert_eq!(recorder.submitted().await.len(), 0);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].rule_name, "Header_2");
        assert!(outcome.artifacts.valid_learn_ref_numbers.is_empty());
    }

    #[tokio::test]
    async fn test_absent_submission_finalizes_empty() {
        let outcome = orchestrator(in_process(), 2)
            .run_job("job-3", &StaticSubmissionSource::empty(), &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(outcome.transitions, vec![JobState::Finalized]);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.artifacts, ValidationArtifacts::default());
    }

    #[tokio::test]
    async fn test_worker_failure_fails_job() {
        let failing = Arc::new(FailingWorker::new(in_process(), 1));
        let source = StaticSubmissionSource::new(fixtures::submission(fixtures::learners(6)));

        let err = orchestrator(failing, 2)
            .run_job("job-4", &source, &CancellationFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Worker { shard: 1, .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let source = StaticSubmissionSource::new(fixtures::submission(fixtures::learners(2)));

        let err = orchestrator(in_process(), 2)
            .run_job("job-5", &source, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            JobError::Cancelled {
                state: JobState::Populated,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_reference_domain_fails_before_population() {
        let orchestrator = ValidationOrchestrator::new(
            OrchestratorSettings::default(),
            Arc::new(RuleCatalogue::standard().unwrap()),
            Arc::new(ReferenceDataSnapshot::default()),
            in_process(),
            ValidationOutputService::new(Arc::new(MemoryKeyValueStore::new())),
        );
        let source = StaticSubmissionSource::new(fixtures::submission(fixtures::learners(1)));

        let err = orchestrator
            .run_job("job-6", &source, &CancellationFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Registry { .. }));
    }

    #[tokio::test]
    async fn test_zero_parallel_workers_fails_instead_of_waiting() {
        let settings = OrchestratorSettings {
            max_parallel_workers: 0,
            shard_policy: ShardPolicy::with_max_records(2).unwrap(),
            ..Default::default()
        };
        let orchestrator = ValidationOrchestrator::new(
            settings,
            Arc::new(RuleCatalogue::standard().unwrap()),
            Arc::new(fixtures::reference_snapshot()),
            in_process(),
            ValidationOutputService::new(Arc::new(MemoryKeyValueStore::new())),
        );
        let source = StaticSubmissionSource::new(fixtures::submission(fixtures::learners(3)));

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            orchestrator.run_job("job-7", &source, &CancellationFlag::new()),
        )
        .await
        .expect("job must not wait for a permit that never comes");
        assert!(matches!(
            result.unwrap_err(),
            JobError::Config(ConfigError::Invalid {
                field: "max_parallel_workers",
                ..
            })
        ));
    }

    #[test]
    fn test_settings_from_config() {
        let config = ValidationConfig {
            shard_size: 3,
            max_parallel_workers: 2,
            ..Default::default()
        };
        let settings = OrchestratorSettings::from_config(&config).unwrap();
        assert_eq!(settings.shard_policy.max_records_per_shard(), 3);
        assert_eq!(settings.max_parallel_workers, 2);

        let invalid = ValidationConfig {
            shard_size: 0,
            ..Default::default()
        };
        assert!(OrchestratorSettings::from_config(&invalid).is_err());
    }
}
