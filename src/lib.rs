//! # learnval
//!
//! Rule-driven validation of learner record submissions.
//!
//! ## Usage
//!
//! ```bash
//! learnval run --submission submission.json --reference reference.json [--shard-size 500]
//! learnval rules [--profile reduced]
//! ```
//!
//! ## Modules
//!
//! - `model` - Submission, learner and validation finding types
//! - `lookup` - Reference data domains and the frozen per-job snapshot
//! - `rules` - Rule trait, registry, profiles and the built-in catalogue
//! - `engine` - Executes a rule list over a batch of records
//! - `cache` - Append-only job error cache
//! - `sharding` - Order-preserving partitioning of learners into shards
//! - `worker` - In-process and serialized shard workers
//! - `population` - Submission sources
//! - `orchestrator` - Two-phase job pipeline with header gate and shard fan-out
//! - `output` - Artifact building and key-value persistence
//! - `config` - Layered job configuration
//! - `testing` - Fixtures and worker doubles for tests
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod population;
pub mod rules;
pub mod sharding;
pub mod worker;

pub mod testing;

pub use error::{JobError, JobResult};
