//! Validation findings emitted by rules

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Short code used in persisted artifacts
    pub fn code(self) -> &'static str {
        match self {
            Severity::Error => "E",
            Severity::Warning => "W",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

/// A single (name, value) pair used to template the rule message
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ErrorMessageParameter {
    pub property_name: String,
    pub value: String,
}

impl ErrorMessageParameter {
    pub fn new(property_name: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            property_name: property_name.into(),
            value: value.to_string(),
        }
    }
}

/// One classified finding
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValidationError {
    pub rule_name: String,
    pub learner_reference_number: Option<String>,
    pub aim_sequence_number: Option<i64>,
    pub severity: Option<Severity>,
    #[serde(default)]
    pub error_message_parameters: Vec<ErrorMessageParameter>,
}

impl ValidationError {
    pub fn new(rule_name: impl Into<String>) -> Self {
        Self {
            rule_name: rule_name.into(),
            learner_reference_number: None,
            aim_sequence_number: None,
            severity: None,
            error_message_parameters: Vec::new(),
        }
    }

    pub fn with_learner(mut self, learn_ref_number: impl Into<String>) -> Self {
        self.learner_reference_number = Some(learn_ref_number.into());
        self
    }

    pub fn with_aim_sequence(mut self, aim_seq_number: i64) -> Self {
        self.aim_sequence_number = Some(aim_seq_number);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Whether this finding blocks progression past the header gate.
    ///
    /// A finding without a severity counts as blocking.
    pub fn is_blocking(&self) -> bool {
        matches!(self.severity.unwrap_or(Severity::Error), Severity::Error)
    }

    /// Whether this finding marks its learner invalid (strict `Error` only)
    pub fn is_error(&self) -> bool {
        self.severity == Some(Severity::Error)
    }
}
