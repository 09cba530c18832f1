//! Worker that validates shards on the blocking thread pool

use super::{ShardPayload, ShardValidator, WorkerDispatch, WorkerError, WorkerResult};
use crate::model::ValidationError;
use crate::rules::RuleCatalogue;
use async_trait::async_trait;
use std::sync::Arc;

/// Validates shards in this process, sharing the reference snapshot by `Arc`
#[derive(Debug, Clone)]
pub struct InProcessWorker {
    validator: Arc<ShardValidator>,
}

impl InProcessWorker {
    pub fn new(catalogue: Arc<RuleCatalogue>) -> Self {
        Self {
            validator: Arc::new(ShardValidator::new(catalogue)),
        }
    }
}

#[async_trait]
impl WorkerDispatch for InProcessWorker {
    async fn submit(&self, payload: ShardPayload) -> WorkerResult<Vec<ValidationError>> {
        let shard = payload.shard_index();
        let validator = self.validator.clone();

        // rule execution is CPU bound
        tokio::task::spawn_blocking(move || validator.validate(&payload))
            .await
            .map_err(|e| WorkerError::transport(shard, format!("worker task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Profile;
    use crate::sharding::Shard;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_submit_validates_shard() {
        let worker = InProcessWorker::new(Arc::new(RuleCatalogue::standard().unwrap()));
        let mut learners = fixtures::learners(3);
        learners[2].uln = Some(1234567890);

        let payload = ShardPayload {
            job_id: "job-1".to_string(),
            profile: Profile::Full,
            shard: Shard {
                index: 0,
                header: fixtures::submission(Vec::new()).header,
                learners,
            },
            reference: Arc::new(fixtures::reference_snapshot()),
        };

        let errors = worker.submit(payload).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule_name, "ULN_03");
        assert_eq!(errors[0].learner_reference_number.as_deref(), Some("LRN003"));
    }
}
