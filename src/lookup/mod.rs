//! Reference data consulted by rules
//!
//! Lookup domains come in three shapes:
//!
//! - **Simple**: a set of integer codes with no time dimension
//! - **Coded**: a set of string codes
//! - **Time restricted**: integer codes each carrying a validity window
//!
//! All domains are populated once, frozen into a [`ReferenceDataSnapshot`]
//! and shared read-only by every worker for the lifetime of a job.

pub mod external;
pub mod provider;
pub mod snapshot;

pub use external::{
    ExternalDataCache, LarsData, LarsDataService, LarsFrameworkAim, LarsLearningDelivery, UlnData,
    UlnDataService,
};
pub use provider::{LookupDetailsProvider, ProvideLookupDetails};
pub use snapshot::{ReferenceDataSnapshot, RuleOverride, REFERENCE_SCHEMA_VERSION};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for reference data operations
pub type LookupResult<T> = Result<T, LookupError>;

/// Reference data errors; all of them are fatal configuration problems
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Reference domain {domain} is missing")]
    MissingDomain { domain: LookupDomain },

    #[error("Unsupported reference data schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("Failed to read reference data from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse reference data: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
}

/// Integer domains without a time dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SimpleKey {
    Accom,
    AimType,
    CompStatus,
    EmpStat,
    FinType,
    FundModel,
    PriorAttain,
    ProgType,
}

/// String code domains without a time dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CodedKey {
    AppFinRecord,
    LearnDelFamType,
    QualEnt3,
    Sex,
}

/// Integer domains whose values are only valid within a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeRestrictedKey {
    LlddCat,
    TtAccom,
}

/// Any lookup domain, used when declaring and checking requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LookupDomain {
    Simple(SimpleKey),
    Coded(CodedKey),
    TimeRestricted(TimeRestrictedKey),
}

impl fmt::Display for LookupDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupDomain::Simple(key) => write!(f, "simple:{:?}", key),
            LookupDomain::Coded(key) => write!(f, "coded:{:?}", key),
            LookupDomain::TimeRestricted(key) => write!(f, "time-restricted:{:?}", key),
        }
    }
}

/// Validity window, inclusive at both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityPeriod {
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
}

impl ValidityPeriod {
    pub fn new(valid_from: NaiveDate, valid_to: NaiveDate) -> Self {
        Self {
            valid_from,
            valid_to,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && date <= self.valid_to
    }
}

/// The collection year a submission is validated against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicYear {
    /// Four digit code, e.g. "1819"
    pub code: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for AcademicYear {
    fn default() -> Self {
        Self {
            code: "1819".to_string(),
            start: NaiveDate::from_ymd_opt(2018, 8, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2019, 7, 31).unwrap_or_default(),
        }
    }
}

/// Internally maintained lookup domains
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InternalDataCache {
    #[serde(default)]
    pub academic_year: AcademicYear,
    #[serde(default)]
    pub simple_lookups: BTreeMap<SimpleKey, BTreeSet<i64>>,
    #[serde(default)]
    pub coded_lookups: BTreeMap<CodedKey, BTreeSet<String>>,
    #[serde(default)]
    pub limited_life_lookups: BTreeMap<TimeRestrictedKey, BTreeMap<i64, ValidityPeriod>>,
}

impl InternalDataCache {
    /// Whether the named domain was populated
    pub fn has_domain(&self, domain: LookupDomain) -> bool {
        match domain {
            LookupDomain::Simple(key) => self.simple_lookups.contains_key(&key),
            LookupDomain::Coded(key) => self.coded_lookups.contains_key(&key),
            LookupDomain::TimeRestricted(key) => self.limited_life_lookups.contains_key(&key),
        }
    }

    /// Fail on the first domain in `expected` that was never populated
    pub fn require(&self, expected: &[LookupDomain]) -> LookupResult<()> {
        match expected.iter().find(|domain| !self.has_domain(**domain)) {
            Some(domain) => Err(LookupError::MissingDomain { domain: *domain }),
            None => Ok(()),
        }
    }
}
