//! Message text and severity per rule name

use crate::lookup::RuleOverride;
use crate::model::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resolved message and severity for one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDetail {
    pub message: String,
    pub severity: Option<Severity>,
}

/// Message and severity lookup by rule name.
///
/// Built from the catalogue defaults and then patched with any overrides
/// carried by the reference snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleMessages {
    details: BTreeMap<String, RuleDetail>,
}

impl RuleMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rule_name: impl Into<String>, detail: RuleDetail) {
        self.details.insert(rule_name.into(), detail);
    }

    /// Apply overrides on top of the defaults.
    ///
    /// An override for an unknown rule name still creates an entry so that
    /// externally registered rules can be given text.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, RuleOverride>) {
        for (rule_name, value) in overrides {
            let detail = self
                .details
                .entry(rule_name.clone())
                .or_insert_with(|| RuleDetail {
                    message: String::new(),
                    severity: None,
                });
            if let Some(message) = &value.message {
                detail.message = message.clone();
            }
            if let Some(severity) = value.severity {
                detail.severity = severity;
            }
        }
    }

    pub fn detail(&self, rule_name: &str) -> Option<&RuleDetail> {
        self.details.get(rule_name)
    }

    /// Severity for a rule; unknown rules have no severity
    pub fn severity_for(&self, rule_name: &str) -> Option<Severity> {
        self.details.get(rule_name).and_then(|d| d.severity)
    }

    pub fn message_for(&self, rule_name: &str) -> Option<&str> {
        self.details.get(rule_name).map(|d| d.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleDetail)> {
        self.details.iter().map(|(name, detail)| (name.as_str(), detail))
    }

    pub fn len(&self) -> usize {
        self.details.len()
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> RuleMessages {
        let mut messages = RuleMessages::new();
        messages.insert(
            "AddHours_04",
            RuleDetail {
                message: "AddHours too high".to_string(),
                severity: Some(Severity::Error),
            },
        );
        messages
    }

    #[test]
    fn test_override_severity_keeps_message() {
        let mut messages = defaults();
        let overrides = BTreeMap::from([(
            "AddHours_04".to_string(),
            RuleOverride::severity(Severity::Warning),
        )]);
        messages.apply_overrides(&overrides);

        assert_eq!(messages.severity_for("AddHours_04"), Some(Severity::Warning));
        assert_eq!(messages.message_for("AddHours_04"), Some("AddHours too high"));
    }

    #[test]
    fn test_unknown_rule_has_no_severity() {
        let messages = defaults();
        assert_eq!(messages.severity_for("Custom_01"), None);
        assert_eq!(messages.message_for("Custom_01"), None);
    }

    #[test]
    fn test_override_for_unregistered_rule_adds_entry() {
        let mut messages = defaults();
        let overrides = BTreeMap::from([(
            "Custom_01".to_string(),
            RuleOverride::message("Custom text"),
        )]);
        messages.apply_overrides(&overrides);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages.message_for("Custom_01"), Some("Custom text"));
        assert_eq!(messages.severity_for("Custom_01"), None);
    }

    #[test]
    fn test_override_can_clear_severity() {
        let mut messages = defaults();
        let overrides =
            BTreeMap::from([("AddHours_04".to_string(), RuleOverride::clear_severity())]);
        messages.apply_overrides(&overrides);

        assert_eq!(messages.severity_for("AddHours_04"), None);
        assert_eq!(messages.message_for("AddHours_04"), Some("AddHours too high"));
    }
}
