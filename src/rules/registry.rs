//! Rule descriptors, profiles and rule-set resolution
//!
//! Rules are registered once as descriptors. A profile names an ordered list
//! of rule ids; resolving a profile checks every id exists, appears once and
//! has its reference data available, then constructs the rules with their
//! collaborators.

use super::derived::Dd07;
use super::messages::{RuleDetail, RuleMessages};
use super::query::{
    EmploymentStatusQueryService, LearningDeliveryFamQueryService, LearningDeliveryQueryService,
};
use super::Rule;
use crate::lookup::{
    AcademicYear, InternalDataCache, LarsDataService, LookupDomain, LookupError,
    ProvideLookupDetails, ReferenceDataSnapshot, UlnDataService,
};
use crate::model::{Severity, Subject};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Rule-set configuration errors; these fail a job before any rule runs
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Rule {rule} is registered more than once")]
    DuplicateRegistration { rule: String },

    #[error("Profile {profile} lists unknown rule {rule}")]
    UnknownRule { profile: Profile, rule: String },

    #[error("Profile {profile} lists rule {rule} more than once")]
    DuplicateRule { profile: Profile, rule: String },

    #[error("Profile {profile} has no rule set for {subject}")]
    UndeclaredProfile {
        profile: Profile,
        subject: &'static str,
    },

    #[error("Rule {rule} cannot run without its reference data")]
    MissingReferenceData {
        rule: String,
        #[source]
        source: LookupError,
    },
}

/// Named selection of rules to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Every catalogued rule
    Full,
    /// Rules that need only internal reference data
    Reduced,
}

impl Default for Profile {
    fn default() -> Self {
        Self::Full
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Full => write!(f, "full"),
            Profile::Reduced => write!(f, "reduced"),
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(Profile::Full),
            "reduced" => Ok(Profile::Reduced),
            other => Err(format!("unknown profile '{other}' (expected full or reduced)")),
        }
    }
}

/// Collaborators a rule may take at construction
#[derive(Clone)]
pub struct RuleDependencies {
    pub internal: Arc<InternalDataCache>,
    pub lookups: Arc<dyn ProvideLookupDetails>,
    pub lars: Arc<dyn LarsDataService>,
    pub ulns: Arc<dyn UlnDataService>,
    pub academic_year: AcademicYear,
    pub dd07: Dd07,
    pub deliveries: LearningDeliveryQueryService,
    pub fams: LearningDeliveryFamQueryService,
    pub employment: EmploymentStatusQueryService,
}

impl RuleDependencies {
    pub fn from_snapshot(snapshot: &ReferenceDataSnapshot) -> Self {
        Self {
            internal: snapshot.internal.clone(),
            lookups: Arc::new(snapshot.lookup_provider()),
            lars: Arc::new(snapshot.lars_data()),
            ulns: Arc::new(snapshot.uln_data()),
            academic_year: snapshot.internal.academic_year.clone(),
            dd07: Dd07,
            deliveries: LearningDeliveryQueryService,
            fams: LearningDeliveryFamQueryService,
            employment: EmploymentStatusQueryService,
        }
    }
}

impl fmt::Debug for RuleDependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDependencies")
            .field("academic_year", &self.academic_year)
            .finish_non_exhaustive()
    }
}

/// Builds a rule from its collaborators
pub type RuleConstructor<T> = fn(&RuleDependencies) -> Arc<dyn Rule<T>>;

/// Registration record for one rule
pub struct RuleDescriptor<T: Subject> {
    pub name: &'static str,
    pub message: &'static str,
    pub severity: Option<Severity>,
    /// Internal lookup domains the rule consults
    pub requires: &'static [LookupDomain],
    pub build: RuleConstructor<T>,
}

impl<T: Subject> Clone for RuleDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            message: self.message,
            severity: self.severity,
            requires: self.requires,
            build: self.build,
        }
    }
}

impl<T: Subject> fmt::Debug for RuleDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDescriptor")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .field("requires", &self.requires)
            .finish_non_exhaustive()
    }
}

/// Registered rules for one subject type plus the rule set of each profile
pub struct RuleSetRegistry<T: Subject> {
    subject: &'static str,
    descriptors: HashMap<String, RuleDescriptor<T>>,
    registration_order: Vec<String>,
    rule_sets: HashMap<Profile, Vec<String>>,
}

impl<T: Subject> fmt::Debug for RuleSetRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSetRegistry")
            .field("subject", &self.subject)
            .field("rules", &self.registration_order)
            .field("rule_sets", &self.rule_sets)
            .finish()
    }
}

impl<T: Subject> RuleSetRegistry<T> {
    /// Empty registry; `subject` names the record type in errors and logs
    pub fn new(subject: &'static str) -> Self {
        Self {
            subject,
            descriptors: HashMap::new(),
            registration_order: Vec::new(),
            rule_sets: HashMap::new(),
        }
    }

    pub fn subject(&self) -> &'static str {
        self.subject
    }

    pub fn register(&mut self, descriptor: RuleDescriptor<T>) -> RegistryResult<()> {
        if self.descriptors.contains_key(descriptor.name) {
            return Err(RegistryError::DuplicateRegistration {
                rule: descriptor.name.to_string(),
            });
        }
        self.registration_order.push(descriptor.name.to_string());
        self.descriptors
            .insert(descriptor.name.to_string(), descriptor);
        Ok(())
    }

    /// Set the ordered rule ids for a profile, replacing any earlier set
    pub fn declare<I, S>(&mut self, profile: Profile, rule_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule_sets
            .insert(profile, rule_ids.into_iter().map(Into::into).collect());
    }

    pub fn descriptor(&self, name: &str) -> Option<&RuleDescriptor<T>> {
        self.descriptors.get(name)
    }

    /// Registered descriptors in registration order
    pub fn descriptors(&self) -> impl Iterator<Item = &RuleDescriptor<T>> {
        self.registration_order
            .iter()
            .filter_map(|name| self.descriptors.get(name))
    }

    pub fn rule_set(&self, profile: Profile) -> Option<&[String]> {
        self.rule_sets.get(&profile).map(Vec::as_slice)
    }

    /// Catalogue default messages and severities of every registered rule
    pub fn default_messages(&self) -> RuleMessages {
        let mut messages = RuleMessages::new();
        self.extend_messages(&mut messages);
        messages
    }

    pub fn extend_messages(&self, messages: &mut RuleMessages) {
        for descriptor in self.descriptors() {
            messages.insert(
                descriptor.name,
                RuleDetail {
                    message: descriptor.message.to_string(),
                    severity: descriptor.severity,
                },
            );
        }
    }

    /// Check a profile's rule set without building anything
    pub fn check(&self, profile: Profile, internal: &InternalDataCache) -> RegistryResult<()> {
        self.checked_descriptors(profile, internal).map(|_| ())
    }

    /// Construct the rules of `profile` in declared order
    pub fn resolve(
        &self,
        profile: Profile,
        deps: &RuleDependencies,
    ) -> RegistryResult<Vec<Arc<dyn Rule<T>>>> {
        let descriptors = self.checked_descriptors(profile, &deps.internal)?;
        let rules: Vec<_> = descriptors.iter().map(|d| (d.build)(deps)).collect();
        debug!(
            subject = self.subject,
            profile = %profile,
            rules = rules.len(),
            "Resolved rule set"
        );
        Ok(rules)
    }

    fn checked_descriptors(
        &self,
        profile: Profile,
        internal: &InternalDataCache,
    ) -> RegistryResult<Vec<&RuleDescriptor<T>>> {
        let ids = self
            .rule_sets
            .get(&profile)
            .ok_or(RegistryError::UndeclaredProfile {
                profile,
                subject: self.subject,
            })?;

        let mut seen = HashSet::with_capacity(ids.len());
        let mut descriptors = Vec::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id.as_str()) {
                return Err(RegistryError::DuplicateRule {
                    profile,
                    rule: id.clone(),
                });
            }
            let descriptor = self
                .descriptors
                .get(id)
                .ok_or_else(|| RegistryError::UnknownRule {
                    profile,
                    rule: id.clone(),
                })?;
            internal
                .require(descriptor.requires)
                .map_err(|source| RegistryError::MissingReferenceData {
                    rule: id.clone(),
                    source,
                })?;
            descriptors.push(descriptor);
        }
        Ok(descriptors)
    }
}
