//! Output artifacts of a validation job
//!
//! The final error cache is turned into four artifacts, each saved under a
//! job-scoped key:
//!
//! - `ValidLearnRefNumbers`: learners with no `Error` finding
//! - `InvalidLearnRefNumbers`: learners with at least one `Error` finding
//! - `ValidationErrors`: every finding, severity rendered as `E`/`W`
//! - `ValidationErrorMessageLookup`: message text per rule that fired

pub mod store;

pub use store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};

use crate::model::{ErrorMessageParameter, Submission, ValidationError};
use crate::rules::RuleMessages;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub type OutputResult<T> = Result<T, OutputError>;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid artifact key: {0}")]
    InvalidKey(String),
}

impl OutputError {
    pub fn serialization<E: std::fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Keys the four artifacts of a job are saved under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKeys {
    pub valid_learn_ref_numbers: String,
    pub invalid_learn_ref_numbers: String,
    pub validation_errors: String,
    pub validation_error_message_lookup: String,
}

impl ArtifactKeys {
    pub fn for_job(job_id: &str) -> Self {
        Self {
            valid_learn_ref_numbers: format!("{job_id}/ValidLearnRefNumbers"),
            invalid_learn_ref_numbers: format!("{job_id}/InvalidLearnRefNumbers"),
            validation_errors: format!("{job_id}/ValidationErrors"),
            validation_error_message_lookup: format!("{job_id}/ValidationErrorMessageLookup"),
        }
    }
}

/// A finding as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputValidationError {
    pub learner_reference_number: Option<String>,
    pub aim_sequence_number: Option<i64>,
    pub rule_name: String,
    /// `E`, `W` or absent
    pub severity: Option<String>,
    pub validation_error_parameters: Vec<ErrorMessageParameter>,
}

impl From<&ValidationError> for OutputValidationError {
    fn from(error: &ValidationError) -> Self {
        Self {
            learner_reference_number: error.learner_reference_number.clone(),
            aim_sequence_number: error.aim_sequence_number,
            rule_name: error.rule_name.clone(),
            severity: error.severity.map(|s| s.code().to_string()),
            validation_error_parameters: error.error_message_parameters.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorMessageLookup {
    pub rule_name: String,
    pub message: Option<String>,
}

/// Counts reported back to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub valid_learner_count: usize,
    pub invalid_learner_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
}

/// The four artifacts plus their summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationArtifacts {
    pub valid_learn_ref_numbers: Vec<String>,
    pub invalid_learn_ref_numbers: Vec<String>,
    pub validation_errors: Vec<OutputValidationError>,
    pub message_lookups: Vec<ValidationErrorMessageLookup>,
    pub summary: ValidationSummary,
}

impl ValidationArtifacts {
    /// Build artifacts from the final findings.
    ///
    /// `validated` is the submission whose learners went through detail
    /// validation; when detail validation never ran it is `None` and no
    /// learner is reported valid. A clean submission lists every learner as
    /// valid, even though no finding names any of them.
    pub fn build(
        errors: &[ValidationError],
        validated: Option<&Submission>,
        messages: &RuleMessages,
    ) -> Self {
        let invalid_learn_ref_numbers = invalid_learn_ref_numbers(errors);
        let valid_learn_ref_numbers = match validated {
            Some(submission) => {
                let invalid: HashSet<&str> =
                    invalid_learn_ref_numbers.iter().map(String::as_str).collect();
                submission
                    .learner_references()
                    .filter(|reference| !invalid.contains(reference))
                    .map(str::to_string)
                    .collect()
            }
            None => Vec::new(),
        };

        let validation_errors: Vec<OutputValidationError> =
            errors.iter().map(OutputValidationError::from).collect();

        let mut seen = HashSet::new();
        let message_lookups = errors
            .iter()
            .filter(|e| seen.insert(e.rule_name.as_str()))
            .map(|e| ValidationErrorMessageLookup {
                rule_name: e.rule_name.clone(),
                message: messages.message_for(&e.rule_name).map(str::to_string),
            })
            .collect();

        let summary = ValidationSummary {
            valid_learner_count: valid_learn_ref_numbers.len(),
            invalid_learner_count: invalid_learn_ref_numbers.len(),
            error_count: errors.iter().filter(|e| e.is_error()).count(),
            warning_count: errors
                .iter()
                .filter(|e| e.severity == Some(crate::model::Severity::Warning))
                .count(),
        };

        Self {
            valid_learn_ref_numbers,
            invalid_learn_ref_numbers,
            validation_errors,
            message_lookups,
            summary,
        }
    }
}

/// Distinct learners with an `Error` finding, in first-seen order
pub fn invalid_learn_ref_numbers(errors: &[ValidationError]) -> Vec<String> {
    let mut seen = HashSet::new();
    errors
        .iter()
        .filter(|e| e.is_error())
        .filter_map(|e| e.learner_reference_number.as_deref())
        .filter(|reference| !reference.is_empty() && seen.insert(*reference))
        .map(str::to_string)
        .collect()
}

/// Builds and persists the artifacts of a job
#[derive(Clone)]
pub struct ValidationOutputService {
    store: Arc<dyn KeyValueStore>,
}

impl ValidationOutputService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn process(
        &self,
        job_id: &str,
        errors: &[ValidationError],
        validated: Option<&Submission>,
        messages: &RuleMessages,
    ) -> OutputResult<ValidationArtifacts> {
        let artifacts = ValidationArtifacts::build(errors, validated, messages);
        self.save(job_id, &artifacts).await?;

        info!(
            job_id,
            valid = artifacts.summary.valid_learner_count,
            invalid = artifacts.summary.invalid_learner_count,
            errors = artifacts.summary.error_count,
            warnings = artifacts.summary.warning_count,
            "Saved validation output"
        );
        Ok(artifacts)
    }

    /// Save the four artifacts concurrently
    pub async fn save(&self, job_id: &str, artifacts: &ValidationArtifacts) -> OutputResult<()> {
        let keys = ArtifactKeys::for_job(job_id);
        let valid = to_json(&artifacts.valid_learn_ref_numbers)?;
        let invalid = to_json(&artifacts.invalid_learn_ref_numbers)?;
        let errors = to_json(&artifacts.validation_errors)?;
        let lookups = to_json(&artifacts.message_lookups)?;

        tokio::try_join!(
            self.store.save(&keys.valid_learn_ref_numbers, valid),
            self.store.save(&keys.invalid_learn_ref_numbers, invalid),
            self.store.save(&keys.validation_errors, errors),
            self.store.save(&keys.validation_error_message_lookup, lookups),
        )?;
        Ok(())
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> OutputResult<String> {
    serde_json::to_string(value).map_err(OutputError::serialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use crate::rules::RuleDetail;
    use crate::testing::fixtures;

    fn error(rule: &str, learner: &str, severity: Option<Severity>) -> ValidationError {
        ValidationError {
            severity,
            ..ValidationError::new(rule).with_learner(learner)
        }
    }

    fn messages() -> RuleMessages {
        let mut messages = RuleMessages::new();
        messages.insert(
            "AddHours_04",
            RuleDetail {
                message: "Too many hours".to_string(),
                severity: Some(Severity::Error),
            },
        );
        messages
    }

    #[test]
    fn test_invalid_refs_distinct_first_seen_errors_only() {
        let errors = vec![
            error("AddHours_04", "LRN003", Some(Severity::Error)),
            error("LearnAimRef_29", "LRN001", Some(Severity::Warning)),
            error("ULN_03", "LRN002", Some(Severity::Error)),
            error("AimType_01", "LRN003", Some(Severity::Error)),
            error("Custom_01", "LRN004", None),
        ];
        assert_eq!(invalid_learn_ref_numbers(&errors), vec!["LRN003", "LRN002"]);
    }

    #[test]
    fn test_build_artifacts_after_detail_validation() {
        let submission = fixtures::submission(fixtures::learners(4));
        let errors = vec![
            error("AddHours_04", "LRN002", Some(Severity::Error)),
            error("LearnAimRef_29", "LRN003", Some(Severity::Warning)),
            error("AddHours_04", "LRN004", Some(Severity::Error)),
        ];

        let artifacts = ValidationArtifacts::build(&errors, Some(&submission), &messages());
        assert_eq!(artifacts.valid_learn_ref_numbers, vec!["LRN001", "LRN003"]);
        assert_eq!(artifacts.invalid_learn_ref_numbers, vec!["LRN002", "LRN004"]);
        assert_eq!(artifacts.validation_errors[1].severity.as_deref(), Some("W"));
        assert_eq!(
            artifacts.message_lookups,
            vec![
                ValidationErrorMessageLookup {
                    rule_name: "AddHours_04".to_string(),
                    message: Some("Too many hours".to_string()),
                },
                ValidationErrorMessageLookup {
                    rule_name: "LearnAimRef_29".to_string(),
                    message: None,
                },
            ]
        );
        assert_eq!(
            artifacts.summary,
            ValidationSummary {
                valid_learner_count: 2,
                invalid_learner_count: 2,
                error_count: 2,
                warning_count: 1,
            }
        );
    }

    #[test]
    fn test_no_valid_learners_without_detail_validation() {
        let errors = vec![ValidationError::new("Header_2").with_severity(Severity::Error)];
        let artifacts = ValidationArtifacts::build(&errors, None, &messages());

        assert!(artifacts.valid_learn_ref_numbers.is_empty());
        assert!(artifacts.invalid_learn_ref_numbers.is_empty());
        assert_eq!(artifacts.validation_errors.len(), 1);
        assert_eq!(artifacts.validation_errors[0].severity.as_deref(), Some("E"));
    }

    #[test]
    fn test_absent_severity_renders_as_null() {
        let errors = vec![ValidationError::new("Custom_01")];
        let artifacts = ValidationArtifacts::build(&errors, None, &messages());
        let json = serde_json::to_value(&artifacts.validation_errors).unwrap();
        assert!(json[0]["severity"].is_null());
    }

    #[tokio::test]
    async fn test_process_saves_all_four_keys() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let service = ValidationOutputService::new(store.clone());

        let artifacts = service
            .process("job-1", &[], None, &messages())
            .await
            .unwrap();
        assert_eq!(artifacts, ValidationArtifacts::default());

        assert_eq!(
            store.keys().await,
            vec![
                "job-1/InvalidLearnRefNumbers",
                "job-1/ValidLearnRefNumbers",
                "job-1/ValidationErrorMessageLookup",
                "job-1/ValidationErrors",
            ]
        );
        assert_eq!(
            store.get("job-1/ValidationErrors").await.unwrap().as_deref(),
            Some("[]")
        );
    }
}
