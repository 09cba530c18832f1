//! Job configuration
//!
//! Values are layered: built-in defaults, then a TOML file, then `LEARNVAL_*`
//! environment variables, then command-line flags applied by the binary.

pub mod loader;

pub use loader::ConfigLoader;

use crate::rules::Profile;
use crate::sharding::{ShardPolicy, DEFAULT_SHARD_SIZE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Prefix of every environment variable read by [`ValidationConfig::merge_env_vars`]
pub const ENV_PREFIX: &str = "LEARNVAL_";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// How shards reach their workers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Shards are validated on local threads sharing the reference snapshot
    #[default]
    InProcess,
    /// Every shard round-trips through the versioned wire format
    Serialized,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in-process" | "in_process" => Ok(Self::InProcess),
            "serialized" => Ok(Self::Serialized),
            other => Err(format!(
                "unknown transport '{other}' (expected in-process or serialized)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum learners per shard
    pub shard_size: usize,
    /// Maximum shards validated at once
    pub max_parallel_workers: usize,
    /// How long one shard may take before the job fails
    #[serde(with = "humantime_serde")]
    pub worker_timeout: Duration,
    pub profile: Profile,
    pub transport: TransportKind,
    pub log_level: Option<String>,
    /// Root directory for the file artifact store
    pub output_dir: Option<PathBuf>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            shard_size: DEFAULT_SHARD_SIZE,
            max_parallel_workers: 4,
            worker_timeout: Duration::from_secs(600),
            profile: Profile::Full,
            transport: TransportKind::InProcess,
            log_level: None,
            output_dir: None,
        }
    }
}

impl ValidationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply `LEARNVAL_*` variables from the process environment
    pub fn merge_env_vars(&mut self) -> ConfigResult<()> {
        self.merge_env_with(|name| std::env::var(name).ok())
    }

    /// Apply `LEARNVAL_*` variables obtained through `lookup`
    pub fn merge_env_with<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));

        if let Some(value) = var("SHARD_SIZE") {
            self.shard_size = value
                .parse()
                .map_err(|e| ConfigError::invalid("shard_size", format!("{value}: {e}")))?;
        }
        if let Some(value) = var("MAX_PARALLEL_WORKERS") {
            self.max_parallel_workers = value.parse().map_err(|e| {
                ConfigError::invalid("max_parallel_workers", format!("{value}: {e}"))
            })?;
        }
        if let Some(value) = var("WORKER_TIMEOUT") {
            self.worker_timeout = humantime::parse_duration(&value)
                .map_err(|e| ConfigError::invalid("worker_timeout", format!("{value}: {e}")))?;
        }
        if let Some(value) = var("PROFILE") {
            self.profile = value
                .parse()
                .map_err(|e: String| ConfigError::invalid("profile", e))?;
        }
        if let Some(value) = var("TRANSPORT") {
            self.transport = value
                .parse()
                .map_err(|e: String| ConfigError::invalid("transport", e))?;
        }
        if let Some(value) = var("LOG_LEVEL") {
            self.log_level = Some(value);
        }
        if let Some(value) = var("OUTPUT_DIR") {
            self.output_dir = Some(PathBuf::from(value));
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.shard_size == 0 {
            return Err(ConfigError::invalid("shard_size", "must be at least 1"));
        }
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

    pub fn shard_policy(&self) -> ConfigResult<ShardPolicy> {
        ShardPolicy::with_max_records(self.shard_size)
            .ok_or_else(|| ConfigError::invalid("shard_size", "must be at least 1"))
    }
}
