//! Validation rules and the machinery to select them
//!
//! A rule is a stateless check over one subject type. Rules receive their
//! collaborators at construction, are resolved from a [`RuleSetRegistry`]
//! by profile, and report findings through a [`RuleEmitter`]. A rule never
//! returns findings directly and never fails for bad learner data; an
//! `Err` from [`Rule::validate`] means a programming defect and fails the
//! shard it runs in.

pub mod catalogue;
pub mod derived;
pub mod emitter;
pub mod messages;
pub mod query;
pub mod registry;

pub use catalogue::RuleCatalogue;
pub use emitter::RuleEmitter;
pub use messages::{RuleDetail, RuleMessages};
pub use registry::{
    Profile, RegistryError, RegistryResult, RuleDependencies, RuleDescriptor, RuleSetRegistry,
};

use crate::model::Subject;
use std::fmt;
use thiserror::Error;

/// Result type for rule execution
pub type RuleResult<T> = Result<T, RuleError>;

/// Defects raised while a rule runs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Rule {rule} precondition violated: {reason}")]
    Precondition { rule: String, reason: String },

    #[error("Rule {rule} failed: {reason}")]
    Defect { rule: String, reason: String },
}

impl RuleError {
    pub fn precondition(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Precondition {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    pub fn defect(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Defect {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    pub fn rule_name(&self) -> &str {
        match self {
            Self::Precondition { rule, .. } | Self::Defect { rule, .. } => rule,
        }
    }
}

/// A validation rule over subjects of type `T`
pub trait Rule<T: Subject>: Send + Sync {
    /// Unique name findings are tagged with, e.g. `AddHours_04`
    fn rule_name(&self) -> &'static str;

    /// Inspect `subject` and emit zero or more findings
    fn validate(&self, subject: &T, emitter: &mut RuleEmitter<'_>) -> RuleResult<()>;
}

impl<T: Subject> fmt::Debug for dyn Rule<T> + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rule").field(&self.rule_name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_error_carries_rule_name() {
        let err = RuleError::defect("AddHours_04", "bad state");
        assert_eq!(err.rule_name(), "AddHours_04");
        assert_eq!(err.to_string(), "Rule AddHours_04 failed: bad state");

        let err = RuleError::precondition("ULN_03", "missing collaborator");
        assert_eq!(err.rule_name(), "ULN_03");
    }

    struct Silent;

    impl Rule<crate::model::Learner> for Silent {
        fn rule_name(&self) -> &'static str {
            "Silent_01"
        }

        fn validate(
            &self,
            _subject: &crate::model::Learner,
            _emitter: &mut RuleEmitter<'_>,
        ) -> RuleResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_rule_objects_debug_as_their_name() {
        let rules: Vec<std::sync::Arc<dyn Rule<crate::model::Learner>>> =
            vec![std::sync::Arc::new(Silent)];
        assert_eq!(format!("{rules:?}"), r#"[Rule("Silent_01")]"#);
    }
}
