//! Append-only validation error cache
//!
//! One cache accumulates a job's findings: header findings first, then each
//! shard's findings as it completes. Entries are never removed or reordered
//! and there is no de-duplication.

use crate::model::ValidationError;
use std::sync::{Mutex, MutexGuard};

/// Append-only sink for findings
pub trait ValidationErrorCache: Send + Sync {
    fn add(&self, error: ValidationError);

    fn add_all(&self, errors: Vec<ValidationError>) {
        for error in errors {
            self.add(error);
        }
    }

    /// Copy of every finding in insertion order
    fn snapshot(&self) -> Vec<ValidationError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any finding blocks progression past the header gate
    fn has_blocking_errors(&self) -> bool {
        self.snapshot().iter().any(ValidationError::is_blocking)
    }
}

/// Thread-safe in-memory cache
#[derive(Debug, Default)]
pub struct InMemoryErrorCache {
    errors: Mutex<Vec<ValidationError>>,
}

impl InMemoryErrorCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ValidationError>> {
        // appends are atomic, so a poisoned lock still holds consistent data
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ValidationErrorCache for InMemoryErrorCache {
    fn add(&self, error: ValidationError) {
        self.lock().push(error);
    }

    fn add_all(&self, errors: Vec<ValidationError>) {
        self.lock().extend(errors);
    }

    fn snapshot(&self) -> Vec<ValidationError> {
        self.lock().clone()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn has_blocking_errors(&self) -> bool {
        self.lock().iter().any(ValidationError::is_blocking)
    }
}
