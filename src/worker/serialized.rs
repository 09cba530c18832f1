//! Worker transport that round-trips every shard through the wire format
//!
//! Requests and responses are JSON envelopes carrying a schema version.
//! A worker built against a different version refuses the request instead
//! of misreading it. The worker side of the exchange is
//! [`SerializedWorker::handle`], which takes and returns raw bytes exactly as
//! an out-of-process worker would.

use super::{ShardPayload, ShardValidator, WorkerDispatch, WorkerError, WorkerResult};
use crate::model::ValidationError;
use crate::rules::RuleCatalogue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Version of the request and response envelopes
pub const WIRE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRequest {
    pub schema_version: u32,
    pub payload: ShardPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireResponse {
    pub schema_version: u32,
    pub job_id: String,
    pub shard: usize,
    pub errors: Vec<ValidationError>,
}

pub fn encode_request(payload: ShardPayload) -> WorkerResult<Vec<u8>> {
    let request = WireRequest {
        schema_version: WIRE_SCHEMA_VERSION,
        payload,
    };
    Ok(serde_json::to_vec(&request)?)
}

pub fn decode_request(bytes: &[u8]) -> WorkerResult<ShardPayload> {
    let request: WireRequest = serde_json::from_slice(bytes)?;
    check_version(request.schema_version)?;
    Ok(request.payload)
}

pub fn encode_response(
    job_id: &str,
    shard: usize,
    errors: Vec<ValidationError>,
) -> WorkerResult<Vec<u8>> {
    let response = WireResponse {
        schema_version: WIRE_SCHEMA_VERSION,
        job_id: job_id.to_string(),
        shard,
        errors,
    };
    Ok(serde_json::to_vec(&response)?)
}

pub fn decode_response(bytes: &[u8]) -> WorkerResult<WireResponse> {
    let response: WireResponse = serde_json::from_slice(bytes)?;
    check_version(response.schema_version)?;
    Ok(response)
}

fn check_version(found: u32) -> WorkerResult<()> {
    if found != WIRE_SCHEMA_VERSION {
        return Err(WorkerError::SchemaMismatch {
            found,
            expected: WIRE_SCHEMA_VERSION,
        });
    }
    Ok(())
}

/// Serializes each shard, validates the decoded copy and decodes the reply
#[derive(Debug, Clone)]
pub struct SerializedWorker {
    validator: Arc<ShardValidator>,
}

impl SerializedWorker {
    pub fn new(catalogue: Arc<RuleCatalogue>) -> Self {
        Self {
            validator: Arc::new(ShardValidator::new(catalogue)),
        }
    }

    /// Worker side: request bytes in, response bytes out
    pub fn handle(&self, request: &[u8]) -> WorkerResult<Vec<u8>> {
        let payload = decode_request(request)?;
        let errors = self.validator.validate(&payload)?;
        encode_response(&payload.job_id, payload.shard_index(), errors)
    }
}

#[async_trait]
impl WorkerDispatch for SerializedWorker {
    async fn submit(&self, payload: ShardPayload) -> WorkerResult<Vec<ValidationError>> {
        let shard = payload.shard_index();
        let request = encode_request(payload)?;
        trace!(shard, bytes = request.len(), "Encoded shard request");

        let worker = self.clone();
        let response = tokio::task::spawn_blocking(move || worker.handle(&request))
            .await
            .map_err(|e| WorkerError::transport(shard, format!("worker task failed: {e}")))??;

        let response = decode_response(&response)?;
        if response.shard != shard {
            return Err(WorkerError::transport(
                shard,
                format!("response was for shard {}", response.shard),
            ));
        }
        Ok(response.errors)
    }
}
