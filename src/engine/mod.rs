//! Rule execution engine
//!
//! Runs a resolved rule list over a batch of records, record-major: every
//! rule sees the first record before any rule sees the second. Findings go
//! to the supplied cache as each (rule, record) invocation completes. A rule
//! defect, including a panic inside a rule, stops execution and propagates.

use crate::cache::ValidationErrorCache;
use crate::model::Subject;
use crate::rules::{Rule, RuleEmitter, RuleError, RuleMessages, RuleResult};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace};

/// Summary of one engine run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub records: usize,
    pub rule_invocations: usize,
    pub findings: usize,
}

/// Execute `rules` against every record, appending findings to `sink`.
///
/// Severity for each finding is taken from `messages` by rule name.
pub fn execute<T: Subject>(
    rules: &[Arc<dyn Rule<T>>],
    records: &[T],
    messages: &RuleMessages,
    sink: &dyn ValidationErrorCache,
) -> RuleResult<ExecutionStats> {
    let mut stats = ExecutionStats::default();

    for record in records {
        stats.records += 1;
        for rule in rules {
            let rule_name = rule.rule_name();
            let mut emitter =
                RuleEmitter::new(rule_name, record.reference(), messages.severity_for(rule_name));

            invoke(rule.as_ref(), record, &mut emitter)?;
            stats.rule_invocations += 1;

            if !emitter.is_empty() {
                trace!(
                    rule = rule_name,
                    reference = record.reference().unwrap_or("-"),
                    findings = emitter.len(),
                    "Rule raised findings"
                );
                stats.findings += emitter.len();
                sink.add_all(emitter.into_errors());
            }
        }
    }

    debug!(
        records = stats.records,
        rules = rules.len(),
        findings = stats.findings,
        "Rule set executed"
    );
    Ok(stats)
}

fn invoke<T: Subject>(
    rule: &dyn Rule<T>,
    record: &T,
    emitter: &mut RuleEmitter<'_>,
) -> RuleResult<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| rule.validate(record, emitter))) {
        Ok(result) => result,
        Err(payload) => Err(RuleError::defect(rule.rule_name(), panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
