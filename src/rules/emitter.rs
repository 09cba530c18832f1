//! Finding builder handed to a rule for one (rule, record) invocation

use crate::model::{ErrorMessageParameter, Severity, ValidationError};
use chrono::NaiveDate;
use std::fmt;

/// Date format used when a date is rendered into a message parameter
pub const PARAMETER_DATE_FORMAT: &str = "%d/%m/%Y";

/// Collects the findings a rule raises against a single record.
///
/// Every finding is tagged with the rule name, the record reference and the
/// severity configured for the rule; the rule only supplies the aim sequence
/// number and message parameters.
#[derive(Debug)]
pub struct RuleEmitter<'a> {
    rule_name: &'a str,
    reference: Option<&'a str>,
    severity: Option<Severity>,
    emitted: Vec<ValidationError>,
}

impl<'a> RuleEmitter<'a> {
    pub fn new(rule_name: &'a str, reference: Option<&'a str>, severity: Option<Severity>) -> Self {
        Self {
            rule_name,
            reference,
            severity,
            emitted: Vec::new(),
        }
    }

    /// Raise a finding against the record
    pub fn emit(
        &mut self,
        aim_sequence_number: Option<i64>,
        parameters: Vec<ErrorMessageParameter>,
    ) {
        self.emitted.push(ValidationError {
            rule_name: self.rule_name.to_string(),
            learner_reference_number: self.reference.map(str::to_string),
            aim_sequence_number,
            severity: self.severity,
            error_message_parameters: parameters,
        });
    }

    pub fn parameter(name: &str, value: impl fmt::Display) -> ErrorMessageParameter {
        ErrorMessageParameter::new(name, value)
    }

    pub fn date_parameter(name: &str, value: NaiveDate) -> ErrorMessageParameter {
        ErrorMessageParameter::new(name, value.format(PARAMETER_DATE_FORMAT))
    }

    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.emitted
    }
}
