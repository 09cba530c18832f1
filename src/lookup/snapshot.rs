//! Frozen reference data snapshot shipped to workers
//!
//! The snapshot crosses the worker boundary whenever workers run out of
//! process, so it carries an explicit schema version.

use super::{
    ExternalDataCache, InternalDataCache, LarsData, LookupDetailsProvider, LookupError,
    LookupResult, UlnData,
};
use crate::model::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Current reference snapshot schema version
pub const REFERENCE_SCHEMA_VERSION: u32 = 1;

/// Per-rule override of the catalogue's default message or severity.
///
/// `severity` is three-way: a missing field keeps the default, `null`
/// clears it (findings carry no severity) and a value replaces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_field"
    )]
    pub severity: Option<Option<Severity>>,
}

impl RuleOverride {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            severity: None,
        }
    }

    pub fn severity(severity: Severity) -> Self {
        Self {
            message: None,
            severity: Some(Some(severity)),
        }
    }

    pub fn clear_severity() -> Self {
        Self {
            message: None,
            severity: Some(None),
        }
    }
}

// A field that is present, even as `null`, deserializes to `Some`
fn present_field<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// All reference data for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDataSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub internal: Arc<InternalDataCache>,
    #[serde(default)]
    pub external: Arc<ExternalDataCache>,
    #[serde(default)]
    pub rule_overrides: BTreeMap<String, RuleOverride>,
}

fn default_schema_version() -> u32 {
    REFERENCE_SCHEMA_VERSION
}

impl Default for ReferenceDataSnapshot {
    fn default() -> Self {
        Self::new(InternalDataCache::default(), ExternalDataCache::default())
    }
}

impl ReferenceDataSnapshot {
    pub fn new(internal: InternalDataCache, external: ExternalDataCache) -> Self {
        Self {
            schema_version: REFERENCE_SCHEMA_VERSION,
            internal: Arc::new(internal),
            external: Arc::new(external),
            rule_overrides: BTreeMap::new(),
        }
    }

    pub fn with_rule_override(
        mut self,
        rule_name: impl Into<String>,
        value: RuleOverride,
    ) -> Self {
        self.rule_overrides.insert(rule_name.into(), value);
        self
    }

    /// Load a snapshot from a JSON file and check its schema version
    pub async fn from_json_file(path: &Path) -> LookupResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LookupError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let snapshot = Self::from_json_str(&content)?;
        debug!(
            path = %path.display(),
            simple = snapshot.internal.simple_lookups.len(),
            coded = snapshot.internal.coded_lookups.len(),
            limited_life = snapshot.internal.limited_life_lookups.len(),
            lars = snapshot.external.lars_learning_deliveries.len(),
            "Loaded reference data"
        );
        Ok(snapshot)
    }

    pub fn from_json_str(content: &str) -> LookupResult<Self> {
        let snapshot: Self =
            serde_json::from_str(content).map_err(|source| LookupError::Parse { source })?;
        snapshot.ensure_supported()?;
        Ok(snapshot)
    }

    pub fn ensure_supported(&self) -> LookupResult<()> {
        if self.schema_version != REFERENCE_SCHEMA_VERSION {
            return Err(LookupError::UnsupportedSchema {
                found: self.schema_version,
                expected: REFERENCE_SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    pub fn lookup_provider(&self) -> LookupDetailsProvider {
        LookupDetailsProvider::new(self.internal.clone())
    }

    pub fn lars_data(&self) -> LarsData {
        LarsData::new(self.external.clone())
    }

    pub fn uln_data(&self) -> UlnData {
        UlnData::new(self.external.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_defaults_when_absent() {
        let snapshot = ReferenceDataSnapshot::from_json_str("{}").unwrap();
        assert_eq!(snapshot.schema_version, REFERENCE_SCHEMA_VERSION);
    }

    #[test]
    fn test_rejects_unknown_schema_version() {
        let err = ReferenceDataSnapshot::from_json_str(r#"{"schema_version": 99}"#).unwrap_err();
        assert!(matches!(
            err,
            LookupError::UnsupportedSchema {
                found: 99,
                expected: REFERENCE_SCHEMA_VERSION
            }
        ));
    }

    #[test]
    fn test_rule_overrides_parse() {
        let json = r#"{
            "rule_overrides": {
                "AddHours_04": { "severity": "Warning" },
                "ULN_03": { "severity": null },
                "Header_2": { "message": "Bad collection" }
            }
        }"#;
        let snapshot = ReferenceDataSnapshot::from_json_str(json).unwrap();
        let overrides = &snapshot.rule_overrides;
        assert_eq!(overrides["AddHours_04"], RuleOverride::severity(Severity::Warning));
        assert_eq!(overrides["ULN_03"], RuleOverride::clear_severity());
        assert_eq!(overrides["Header_2"], RuleOverride::message("Bad collection"));
    }

    #[test]
    fn test_cleared_severity_survives_the_wire() {
        let snapshot = ReferenceDataSnapshot::default()
            .with_rule_override("ULN_03", RuleOverride::clear_severity());
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded = ReferenceDataSnapshot::from_json_str(&json).unwrap();
        assert_eq!(decoded.rule_overrides["ULN_03"].severity, Some(None));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("reference.json");
        tokio::fs::write(&path, r#"{"schema_version": 1}"#).await.unwrap();

        let snapshot = ReferenceDataSnapshot::from_json_file(&path).await.unwrap();
        assert!(snapshot.rule_overrides.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let err = ReferenceDataSnapshot::from_json_file(Path::new("/nonexistent/reference.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Read { .. }));
    }
}
