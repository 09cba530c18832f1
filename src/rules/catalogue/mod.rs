//! Built-in rule catalogue
//!
//! Adding a rule means writing it, registering its descriptor here and
//! naming it in the profiles that should run it. Nothing in the engine or
//! orchestrator changes.

pub mod he;
pub mod header;
pub mod learner;
pub mod learning_delivery;

use super::messages::RuleMessages;
use super::registry::{Profile, RegistryResult, RuleSetRegistry};
use crate::lookup::RuleOverride;
use crate::model::{Learner, Submission};
use std::collections::BTreeMap;

/// Rules that only consult external (LARS and ULN) reference data
pub const EXTERNAL_DATA_RULES: [&str; 3] = [
    learning_delivery::LearnAimRef01::NAME,
    learning_delivery::LearnAimRef29::NAME,
    learner::Uln03::NAME,
];

/// Header and learner registries for one job
#[derive(Debug)]
pub struct RuleCatalogue {
    pub header: RuleSetRegistry<Submission>,
    pub learner: RuleSetRegistry<Learner>,
}

impl RuleCatalogue {
    pub fn new(header: RuleSetRegistry<Submission>, learner: RuleSetRegistry<Learner>) -> Self {
        Self { header, learner }
    }

    /// Every built-in rule with the `full` and `reduced` profiles declared
    pub fn standard() -> RegistryResult<Self> {
        Ok(Self::new(header_registry()?, learner_registry()?))
    }

    /// Default messages of both registries patched with `overrides`
    pub fn messages(&self, overrides: &BTreeMap<String, RuleOverride>) -> RuleMessages {
        let mut messages = self.header.default_messages();
        self.learner.extend_messages(&mut messages);
        messages.apply_overrides(overrides);
        messages
    }
}

pub fn header_registry() -> RegistryResult<RuleSetRegistry<Submission>> {
    let mut registry = RuleSetRegistry::new("header");
    registry.register(header::Header2::descriptor())?;
    registry.register(header::Header3::descriptor())?;
    registry.register(header::Ukprn3::descriptor())?;

    let all: Vec<String> = registry.descriptors().map(|d| d.name.to_string()).collect();
    registry.declare(Profile::Full, all.clone());
    registry.declare(Profile::Reduced, all);
    Ok(registry)
}

pub fn learner_registry() -> RegistryResult<RuleSetRegistry<Learner>> {
    let mut registry = RuleSetRegistry::new("learner");
    registry.register(learning_delivery::AddHours04::descriptor())?;
    registry.register(learning_delivery::AimType01::descriptor())?;
    registry.register(learner::EmpStat12::descriptor())?;
    registry.register(learning_delivery::FundModel04::descriptor())?;
    registry.register(learning_delivery::LearnAimRef01::descriptor())?;
    registry.register(learning_delivery::LearnAimRef29::descriptor())?;
    registry.register(learning_delivery::LearnDelFamType01::descriptor())?;
    registry.register(learner::LlddCat02::descriptor())?;
    registry.register(learning_delivery::ProgType02::descriptor())?;
    registry.register(learning_delivery::SwsSupAimId01::descriptor())?;
    registry.register(he::TtAccom01::descriptor())?;
    registry.register(learner::Uln03::descriptor())?;

    let all: Vec<String> = registry.descriptors().map(|d| d.name.to_string()).collect();
    let reduced: Vec<String> = all
        .iter()
        .filter(|name| !EXTERNAL_DATA_RULES.contains(&name.as_str()))
        .cloned()
        .collect();
    registry.declare(Profile::Full, all);
    registry.declare(Profile::Reduced, reduced);
    Ok(registry)
}
