//! Rules over the submission header and learning provider

use crate::model::{Severity, Submission};
use crate::rules::{Rule, RuleDescriptor, RuleEmitter, RuleResult};
use std::sync::Arc;

/// Collection name every submission must carry
pub const COLLECTION_NAME: &str = "ILR";

/// The collection must be "ILR"
#[derive(Debug, Default)]
pub struct Header2;

impl Header2 {
    pub const NAME: &'static str = "Header_2";

    pub fn descriptor() -> RuleDescriptor<Submission> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The Collection must be 'ILR'",
            severity: Some(Severity::Error),
            requires: &[],
            build: |_| Arc::new(Header2),
        }
    }
}

impl Rule<Submission> for Header2 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Submission, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        let collection = &subject.header.collection_details.collection;
        if collection != COLLECTION_NAME {
            emitter.emit(None, vec![RuleEmitter::parameter("Collection", collection)]);
        }
        Ok(())
    }
}

/// The collection year must be the academic year being validated
#[derive(Debug)]
pub struct Header3 {
    academic_year_code: String,
}

impl Header3 {
    pub const NAME: &'static str = "Header_3";

    pub fn new(academic_year_code: impl Into<String>) -> Self {
        Self {
            academic_year_code: academic_year_code.into(),
        }
    }

    pub fn descriptor() -> RuleDescriptor<Submission> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The Year must be the current academic year",
            severity: Some(Severity::Error),
            requires: &[],
            build: |deps| Arc::new(Header3::new(deps.academic_year.code.clone())),
        }
    }
}

impl Rule<Submission> for Header3 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Submission, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        let year = &subject.header.collection_details.year;
        if *year != self.academic_year_code {
            emitter.emit(None, vec![RuleEmitter::parameter("Year", year)]);
        }
        Ok(())
    }
}

/// The provider UKPRN must match the UKPRN in the header source
#[derive(Debug, Default)]
pub struct Ukprn3;

impl Ukprn3 {
    pub const NAME: &'static str = "UKPRN_03";

    pub fn descriptor() -> RuleDescriptor<Submission> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The UKPRN is not the same as recorded in the Header",
            severity: Some(Severity::Error),
            requires: &[],
            build: |_| Arc::new(Ukprn3),
        }
    }
}

impl Rule<Submission> for Ukprn3 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Submission, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        let ukprn = subject.learning_provider.ukprn;
        if ukprn != subject.header.source.ukprn {
            emitter.emit(None, vec![RuleEmitter::parameter("UKPRN", ukprn)]);
        }
        Ok(())
    }
}
