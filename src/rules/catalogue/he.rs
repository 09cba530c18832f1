//! Rules over the higher-education sub-record

use crate::lookup::{LookupDomain, ProvideLookupDetails, TimeRestrictedKey};
use crate::model::{Learner, Severity};
use crate::rules::{Rule, RuleDescriptor, RuleEmitter, RuleResult};
use std::sync::Arc;

/// Term-time accommodation must be a known code
pub struct TtAccom01 {
    lookups: Arc<dyn ProvideLookupDetails>,
}

impl TtAccom01 {
    pub const NAME: &'static str = "TTACCOM_01";

    pub fn new(lookups: Arc<dyn ProvideLookupDetails>) -> Self {
        Self { lookups }
    }

    pub fn descriptor() -> RuleDescriptor<Learner> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The TTACCOM is not a valid lookup",
            severity: Some(Severity::Error),
            requires: &[LookupDomain::TimeRestricted(TimeRestrictedKey::TtAccom)],
            build: |deps| Arc::new(TtAccom01::new(deps.lookups.clone())),
        }
    }
}

impl Rule<Learner> for TtAccom01 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Learner, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        let Some(ttaccom) = subject.learner_he.as_ref().and_then(|he| he.ttaccom) else {
            return Ok(());
        };
        if !self
            .lookups
            .contains_limited_life(TimeRestrictedKey::TtAccom, ttaccom)
        {
            emitter.emit(None, vec![RuleEmitter::parameter("TTACCOM", ttaccom)]);
        }
        Ok(())
    }
}
