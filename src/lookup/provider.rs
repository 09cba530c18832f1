//! Lookup and validity queries over the internal domains

use super::{CodedKey, InternalDataCache, SimpleKey, TimeRestrictedKey};
use chrono::NaiveDate;
use std::sync::Arc;

/// Read-only lookup queries used by rules.
///
/// Unknown keys and unknown candidates are a normal negative result,
/// never an error.
pub trait ProvideLookupDetails: Send + Sync {
    /// Membership in a simple integer domain
    fn contains(&self, key: SimpleKey, candidate: i64) -> bool;

    /// Membership in a coded string domain
    fn contains_code(&self, key: CodedKey, candidate: &str) -> bool;

    /// Membership in a time restricted domain, ignoring the validity window
    fn contains_limited_life(&self, key: TimeRestrictedKey, candidate: i64) -> bool;

    /// Present in a time restricted domain and valid on `as_of`
    fn is_current(&self, key: TimeRestrictedKey, candidate: i64, as_of: NaiveDate) -> bool;
}

/// Lookup provider backed by a frozen [`InternalDataCache`]
#[derive(Debug, Clone)]
pub struct LookupDetailsProvider {
    cache: Arc<InternalDataCache>,
}

impl LookupDetailsProvider {
    pub fn new(cache: Arc<InternalDataCache>) -> Self {
        Self { cache }
    }
}

impl ProvideLookupDetails for LookupDetailsProvider {
    fn contains(&self, key: SimpleKey, candidate: i64) -> bool {
        self.cache
            .simple_lookups
            .get(&key)
            .is_some_and(|values| values.contains(&candidate))
    }

    fn contains_code(&self, key: CodedKey, candidate: &str) -> bool {
        self.cache
            .coded_lookups
            .get(&key)
            .is_some_and(|values| values.contains(candidate))
    }

    fn contains_limited_life(&self, key: TimeRestrictedKey, candidate: i64) -> bool {
        self.cache
            .limited_life_lookups
            .get(&key)
            .is_some_and(|values| values.contains_key(&candidate))
    }

    fn is_current(&self, key: TimeRestrictedKey, candidate: i64, as_of: NaiveDate) -> bool {
        self.cache
            .limited_life_lookups
            .get(&key)
            .and_then(|values| values.get(&candidate))
            .is_some_and(|period| period.contains(as_of))
    }
}
