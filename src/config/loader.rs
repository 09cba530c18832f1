use super::{ConfigError, ConfigResult, ValidationConfig};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "learnval.toml";

/// Loads [`ValidationConfig`] from an optional file and the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader for an explicit file; a missing explicit file is an error
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Loader that reads `learnval.toml` from `dir` if it exists
    pub fn discover(dir: &Path) -> Self {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        Self {
            path: candidate.exists().then_some(candidate),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn load(&self) -> ConfigResult<ValidationConfig> {
        let mut config = match &self.path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Read {
                        path: path.clone(),
                        source,
                    })?;
                let config = ValidationConfig::from_toml_str(&content).map_err(|source| {
                    ConfigError::Parse {
                        path: path.clone(),
                        source,
                    }
                })?;
                debug!(path = %path.display(), "Loaded config file");
                config
            }
            None => ValidationConfig::default(),
        };

        config.merge_env_vars()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "max_parallel_workers = 8\n").unwrap();

        let loader = ConfigLoader::discover(temp_dir.path());
        assert_eq!(loader.path(), Some(path.as_path()));

        let config = loader.load().await.unwrap();
        assert_eq!(config.max_parallel_workers, 8);
    }

    #[tokio::test]
    async fn test_missing_explicit_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_path(temp_dir.path().join("absent.toml"));
        assert!(matches!(
            loader.load().await.unwrap_err(),
            ConfigError::Read { .. }
        ));
    }

    #[tokio::test]
    async fn test_malformed_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "shard_size = \"lots\"").unwrap();

        let err = ConfigLoader::with_path(&path).load().await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_discover_without_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(ConfigLoader::discover(temp_dir.path()).path().is_none());
    }
}
