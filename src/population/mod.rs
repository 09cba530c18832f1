//! Sources of populated submissions
//!
//! An absent submission is a normal outcome, not an error: the job finishes
//! with empty output.

use crate::model::Submission;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Supplies the submission for a job
#[async_trait]
pub trait SubmissionSource: Send + Sync {
    async fn get(&self) -> Option<Arc<Submission>>;
}

/// Source over an already-built submission
#[derive(Debug, Clone, Default)]
pub struct StaticSubmissionSource {
    submission: Option<Arc<Submission>>,
}

impl StaticSubmissionSource {
    pub fn new(submission: Submission) -> Self {
        Self {
            submission: Some(Arc::new(submission)),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionSource for StaticSubmissionSource {
    async fn get(&self) -> Option<Arc<Submission>> {
        self.submission.clone()
    }
}

/// Source reading a JSON submission from disk
#[derive(Debug, Clone)]
pub struct JsonFileSubmissionSource {
    path: PathBuf,
}

impl JsonFileSubmissionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SubmissionSource for JsonFileSubmissionSource {
    async fn get(&self) -> Option<Arc<Submission>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Submission could not be read");
                return None;
            }
        };

        match serde_json::from_str::<Submission>(&content) {
            Ok(submission) => {
                debug!(
                    path = %self.path.display(),
                    learners = submission.learners.len(),
                    "Loaded submission"
                );
                Some(Arc::new(submission))
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Submission could not be parsed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticSubmissionSource::new(fixtures::submission(fixtures::learners(2)));
        assert_eq!(source.get().await.unwrap().learners.len(), 2);
        assert!(StaticSubmissionSource::empty().get().await.is_none());
    }

    #[tokio::test]
    async fn test_json_file_source_reads_submission() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("submission.json");
        let submission = fixtures::submission(fixtures::learners(3));
        std::fs::write(&path, serde_json::to_string(&submission).unwrap()).unwrap();

        let loaded = JsonFileSubmissionSource::new(&path).get().await.unwrap();
        assert_eq!(*loaded, submission);
    }

    #[tokio::test]
    async fn test_json_file_source_absent_on_failure() {
        let temp_dir = TempDir::new().unwrap();
        let missing = JsonFileSubmissionSource::new(temp_dir.path().join("missing.json"));
        assert!(missing.get().await.is_none());

        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(JsonFileSubmissionSource::new(&path).get().await.is_none());
    }
}
