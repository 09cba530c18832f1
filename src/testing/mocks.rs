//! Worker doubles that wrap a real dispatcher

use crate::model::ValidationError;
use crate::orchestrator::CancellationFlag;
use crate::worker::{ShardPayload, WorkerDispatch, WorkerError, WorkerResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Records the shard indexes it receives before delegating
pub struct RecordingWorker {
    inner: Arc<dyn WorkerDispatch>,
    submitted: Mutex<Vec<usize>>,
}

impl RecordingWorker {
    pub fn new(inner: Arc<dyn WorkerDispatch>) -> Self {
        Self {
            inner,
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub async fn submitted(&self) -> Vec<usize> {
        self.submitted.lock().await.clone()
    }
}

#[async_trait]
impl WorkerDispatch for RecordingWorker {
    async fn submit(&self, payload: ShardPayload) -> WorkerResult<Vec<ValidationError>> {
        self.submitted.lock().await.push(payload.shard_index());
        self.inner.submit(payload).await
    }
}

/// Fails one shard with a transport error, delegates the rest
pub struct FailingWorker {
    inner: Arc<dyn WorkerDispatch>,
    failing_shard: usize,
}

impl FailingWorker {
    pub fn new(inner: Arc<dyn WorkerDispatch>, failing_shard: usize) -> Self {
        Self {
            inner,
            failing_shard,
        }
    }
}

#[async_trait]
impl WorkerDispatch for FailingWorker {
    async fn submit(&self, payload: ShardPayload) -> WorkerResult<Vec<ValidationError>> {
        if payload.shard_index() == self.failing_shard {
            return Err(WorkerError::transport(self.failing_shard, "simulated worker crash"));
        }
        self.inner.submit(payload).await
    }
}

/// Delays each shard by a per-shard amount to force a completion order
pub struct DelayedWorker {
    inner: Arc<dyn WorkerDispatch>,
    delays: HashMap<usize, Duration>,
}

impl DelayedWorker {
    pub fn new(inner: Arc<dyn WorkerDispatch>, delays: HashMap<usize, Duration>) -> Self {
        Self { inner, delays }
    }
}

#[async_trait]
impl WorkerDispatch for DelayedWorker {
    async fn submit(&self, payload: ShardPayload) -> WorkerResult<Vec<ValidationError>> {
        if let Some(delay) = self.delays.get(&payload.shard_index()) {
            tokio::time::sleep(*delay).await;
        }
        self.inner.submit(payload).await
    }
}

/// Raises a cancellation flag once the given shard has completed
pub struct CancellingWorker {
    inner: Arc<dyn WorkerDispatch>,
    cancel: CancellationFlag,
    after_shard: usize,
}

impl CancellingWorker {
    pub fn new(
        inner: Arc<dyn WorkerDispatch>,
        cancel: CancellationFlag,
        after_shard: usize,
    ) -> Self {
        Self {
            inner,
            cancel,
            after_shard,
        }
    }
}

#[async_trait]
impl WorkerDispatch for CancellingWorker {
    async fn submit(&self, payload: ShardPayload) -> WorkerResult<Vec<ValidationError>> {
        let shard = payload.shard_index();
        let result = self.inner.submit(payload).await;
        if shard == self.after_shard {
            self.cancel.cancel();
        }
        result
    }
}

/// Never answers within any reasonable timeout
pub struct StalledWorker {
    stall: Duration,
}

impl StalledWorker {
    pub fn new(stall: Duration) -> Self {
        Self { stall }
    }
}

#[async_trait]
impl WorkerDispatch for StalledWorker {
    async fn submit(&self, _payload: ShardPayload) -> WorkerResult<Vec<ValidationError>> {
        tokio::time::sleep(self.stall).await;
        Ok(Vec::new())
    }
}
