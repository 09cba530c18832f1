//! End-to-end validation jobs through the orchestrator

use anyhow::Result;
use learnval::lookup::RuleOverride;
use learnval::model::{Learner, Severity, ValidationError};
use learnval::orchestrator::{CancellationFlag, JobState, OrchestratorSettings};
use learnval::output::{ArtifactKeys, KeyValueStore, OutputValidationError};
use learnval::population::StaticSubmissionSource;
use learnval::testing::fixtures;
use learnval::testing::mocks::{
    CancellingWorker, DelayedWorker, FailingWorker, RecordingWorker, StalledWorker,
};
use learnval::testing::TestContext;
use learnval::worker::{WorkerDispatch, WorkerError};
use learnval::JobError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One day of learning with 70 additional hours
fn with_excess_hours(mut learner: Learner) -> Learner {
    let delivery = &mut learner.learning_deliveries[0];
    delivery.add_hours = Some(70);
    delivery.learn_planned_end_date = delivery.learn_start_date;
    learner
}

/// Seven learners; LRN002, LRN005 and LRN007 each break one rule
fn mixed_learners() -> Vec<Learner> {
    let mut learners = fixtures::learners(7);
    learners[1] = with_excess_hours(learners[1].clone());
    learners[4] = with_excess_hours(learners[4].clone());
    learners[6].learning_deliveries[0].prog_type = Some(2);
    learners
}

fn sorted(mut errors: Vec<ValidationError>) -> Vec<ValidationError> {
    errors.sort();
    errors
}

#[tokio::test]
async fn test_finding_in_middle_shard_is_reported_once() -> Result<()> {
    let context = TestContext::new()?.with_shard_size(3);
    let recorder = Arc::new(RecordingWorker::new(context.in_process_worker()));
    let orchestrator = context.orchestrator(recorder.clone());

    let mut learners = fixtures::learners(7);
    learners[4] = with_excess_hours(learners[4].clone());
    let source = StaticSubmissionSource::new(fixtures::submission(learners));

    let outcome = orchestrator
        .run_job("job-middle", &source, &CancellationFlag::new())
        .await?;

    assert_eq!(outcome.shards_dispatched, 3);
    let mut submitted = recorder.submitted().await;
    submitted.sort_unstable();
    assert_eq!(submitted, vec![0, 1, 2]);

    assert_eq!(outcome.errors.len(), 1);
    let finding = &outcome.errors[0];
    assert_eq!(finding.rule_name, "AddHours_04");
    assert_eq!(finding.learner_reference_number.as_deref(), Some("LRN005"));
    assert_eq!(finding.aim_sequence_number, Some(1));
    assert_eq!(finding.severity, Some(Severity::Error));

    assert_eq!(outcome.artifacts.invalid_learn_ref_numbers, vec!["LRN005"]);
    assert_eq!(outcome.summary().valid_learner_count, 6);
    assert_eq!(outcome.summary().invalid_learner_count, 1);
    Ok(())
}

#[tokio::test]
async fn test_header_gate_prevents_dispatch() -> Result<()> {
    let context = TestContext::new()?.with_shard_size(2);
    let recorder = Arc::new(RecordingWorker::new(context.in_process_worker()));
    let orchestrator = context.orchestrator(recorder.clone());

    let mut submission = fixtures::submission(mixed_learners());
    submission.header.source.ukprn = 99_999_999;
    let outcome = orchestrator
        .run_job(
            "job-gated",
            &StaticSubmissionSource::new(submission),
            &CancellationFlag::new(),
        )
        .await?;

    assert!(recorder.submitted().await.is_empty());
    assert_eq!(outcome.shards_dispatched, 0);
    assert_eq!(
        outcome.transitions,
        vec![
            JobState::Populated,
            JobState::HeaderValidated,
            JobState::GatedBlocked,
            JobState::Finalized,
        ]
    );
    let rules: Vec<&str> = outcome.errors.iter().map(|e| e.rule_name.as_str()).collect();
    assert_eq!(rules, vec!["UKPRN_03"]);
    assert!(outcome.artifacts.valid_learn_ref_numbers.is_empty());
    assert!(outcome.artifacts.invalid_learn_ref_numbers.is_empty());
    Ok(())
}

/// A context whose `Header_2` findings carry the given override
fn context_with_header_override(value: RuleOverride) -> Result<TestContext> {
    let mut context = TestContext::new()?.with_shard_size(2);
    context.reference =
        Arc::new(fixtures::reference_snapshot().with_rule_override("Header_2", value));
    Ok(context)
}

#[tokio::test]
async fn test_warning_header_finding_does_not_gate() -> Result<()> {
    let context = context_with_header_override(RuleOverride::severity(Severity::Warning))?;
    let recorder = Arc::new(RecordingWorker::new(context.in_process_worker()));

    let mut submission = fixtures::submission(fixtures::learners(4));
    submission.header.collection_details.collection = "XYZ".to_string();
    let outcome = context
        .orchestrator(recorder.clone())
        .run_job(
            "job-warning-header",
            &StaticSubmissionSource::new(submission),
            &CancellationFlag::new(),
        )
        .await?;

    assert!(!outcome.transitions.contains(&JobState::GatedBlocked));
    assert_eq!(outcome.shards_dispatched, 2);
    assert_eq!(recorder.submitted().await.len(), 2);

    let findings: Vec<(&str, Option<Severity>)> = outcome
        .errors
        .iter()
        .map(|e| (e.rule_name.as_str(), e.severity))
        .collect();
    assert_eq!(findings, vec![("Header_2", Some(Severity::Warning))]);
    assert_eq!(outcome.summary().valid_learner_count, 4);
    assert_eq!(outcome.summary().warning_count, 1);
    Ok(())
}

#[tokio::test]
async fn test_header_finding_without_severity_gates() -> Result<()> {
    let context = context_with_header_override(RuleOverride::clear_severity())?;
    let recorder = Arc::new(RecordingWorker::new(context.in_process_worker()));

    let mut submission = fixtures::submission(fixtures::learners(4));
    submission.header.collection_details.collection = "XYZ".to_string();
    let outcome = context
        .orchestrator(recorder.clone())
        .run_job(
            "job-unclassified-header",
            &StaticSubmissionSource::new(submission),
            &CancellationFlag::new(),
        )
        .await?;

    assert!(outcome.transitions.contains(&JobState::GatedBlocked));
    assert!(recorder.submitted().await.is_empty());
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].rule_name, "Header_2");
    assert_eq!(outcome.errors[0].severity, None);

    let stored = context
        .store
        .get(&ArtifactKeys::for_job("job-unclassified-header").validation_errors)
        .await?
        .unwrap_or_default();
    let persisted: Vec<OutputValidationError> = serde_json::from_str(&stored)?;
    assert_eq!(persisted[0].severity, None);
    Ok(())
}

#[tokio::test]
async fn test_completion_order_does_not_change_findings() -> Result<()> {
    let context = TestContext::new()?.with_shard_size(3);
    let slow = Duration::from_millis(40);

    let first_slow: HashMap<usize, Duration> = HashMap::from([(0, slow)]);
    let last_slow: HashMap<usize, Duration> = HashMap::from([(2, slow), (1, slow / 2)]);

    let mut runs = Vec::new();
    for (job_id, delays) in [("job-a", first_slow), ("job-b", last_slow)] {
        let worker: Arc<dyn WorkerDispatch> =
            Arc::new(DelayedWorker::new(context.in_process_worker(), delays));
        let source = StaticSubmissionSource::new(fixtures::submission(mixed_learners()));
        let outcome = context
            .orchestrator(worker)
            .run_job(job_id, &source, &CancellationFlag::new())
            .await?;
        runs.push(outcome);
    }

    let (a, b) = (&runs[0], &runs[1]);
    assert_eq!(a.errors.len(), 3);
    assert_eq!(sorted(a.errors.clone()), sorted(b.errors.clone()));

    let mut invalid_a = a.artifacts.invalid_learn_ref_numbers.clone();
    let mut invalid_b = b.artifacts.invalid_learn_ref_numbers.clone();
    invalid_a.sort();
    invalid_b.sort();
    assert_eq!(invalid_a, vec!["LRN002", "LRN005", "LRN007"]);
    assert_eq!(invalid_a, invalid_b);
    assert_eq!(a.summary(), b.summary());
    Ok(())
}

#[tokio::test]
async fn test_cancellation_during_aggregation_saves_nothing() -> Result<()> {
    let context = TestContext::new()?.with_shard_size(2);
    let cancel = CancellationFlag::new();
    let worker = Arc::new(CancellingWorker::new(
        context.in_process_worker(),
        cancel.clone(),
        0,
    ));
    let orchestrator = context.orchestrator(worker);
    let source = StaticSubmissionSource::new(fixtures::submission(fixtures::learners(6)));

    let err = orchestrator
        .run_job("job-cancelled", &source, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(matches!(
        err,
        JobError::Cancelled {
            state: JobState::Aggregating,
            ..
        }
    ));
    assert!(context.store.keys().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_shard_fails_job_without_output() -> Result<()> {
    let context = TestContext::new()?.with_shard_size(2);
    let worker = Arc::new(FailingWorker::new(context.in_process_worker(), 2));
    let source = StaticSubmissionSource::new(fixtures::submission(fixtures::learners(6)));

    let err = context
        .orchestrator(worker)
        .run_job("job-failed", &source, &CancellationFlag::new())
        .await
        .unwrap_err();

    match err {
        JobError::Worker { shard, source, .. } => {
            assert_eq!(shard, 2);
            assert!(matches!(source, WorkerError::Transport { shard: 2, .. }));
        }
        other => panic!("expected worker failure, got {other:?}"),
    }
    assert!(context.store.keys().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_stalled_worker_times_out() -> Result<()> {
    let settings = OrchestratorSettings {
        worker_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let context = TestContext::new()?.with_settings(settings).with_shard_size(5);
    let worker = Arc::new(StalledWorker::new(Duration::from_secs(30)));
    let source = StaticSubmissionSource::new(fixtures::submission(fixtures::learners(3)));

    let err = context
        .orchestrator(worker)
        .run_job("job-stalled", &source, &CancellationFlag::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        JobError::Worker {
            shard: 0,
            source: WorkerError::Timeout { shard: 0, .. },
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_artifacts_are_persisted_under_job_keys() -> Result<()> {
    let context = TestContext::new()?.with_shard_size(3);
    let orchestrator = context.orchestrator(context.in_process_worker());
    let source = StaticSubmissionSource::new(fixtures::submission(mixed_learners()));

    let outcome = orchestrator
        .run_job("job-stored", &source, &CancellationFlag::new())
        .await?;

    let keys = ArtifactKeys::for_job("job-stored");
    let mut stored = context.store.keys().await;
    stored.sort();
    let mut expected = vec![
        keys.valid_learn_ref_numbers.clone(),
        keys.invalid_learn_ref_numbers.clone(),
        keys.validation_errors.clone(),
        keys.validation_error_message_lookup.clone(),
    ];
    expected.sort();
    assert_eq!(stored, expected);

    let valid: Vec<String> = serde_json::from_str(
        &context
            .store
            .get(&keys.valid_learn_ref_numbers)
            .await?
            .unwrap_or_default(),
    )?;
    assert_eq!(valid, vec!["LRN001", "LRN003", "LRN004", "LRN006"]);

    let errors: Vec<OutputValidationError> = serde_json::from_str(
        &context
            .store
            .get(&keys.validation_errors)
            .await?
            .unwrap_or_default(),
    )?;
    assert_eq!(errors.len(), outcome.errors.len());
    assert!(errors.iter().all(|e| e.severity.as_deref() == Some("E")));
    Ok(())
}

#[tokio::test]
async fn test_absent_submission_persists_empty_artifacts() -> Result<()> {
    let context = TestContext::new()?;
    let outcome = context
        .orchestrator(context.in_process_worker())
        .run_job("job-empty", &StaticSubmissionSource::empty(), &CancellationFlag::new())
        .await?;

    assert_eq!(outcome.transitions, vec![JobState::Finalized]);
    let keys = ArtifactKeys::for_job("job-empty");
    let stored = context.store.get(&keys.validation_errors).await?;
    assert_eq!(stored.as_deref(), Some("[]"));
    Ok(())
}
