//! Rules over learner-level fields and employment history

use super::learning_delivery::AIM_TYPE_PROGRAMME;
use crate::lookup::{LookupDomain, ProvideLookupDetails, TimeRestrictedKey, UlnDataService};
use crate::model::{Learner, Severity};
use crate::rules::derived::Dd07;
use crate::rules::query::{EmploymentStatusQueryService, LearningDeliveryFamQueryService};
use crate::rules::{Rule, RuleDescriptor, RuleEmitter, RuleResult};
use std::sync::Arc;

/// Not in paid employment, looking for work and available to start work
pub const EMP_STAT_NOT_EMPLOYED_SEEKING: i64 = 11;
/// Learning delivery monitoring codes exempting an apprentice from EmpStat_12
pub const EMP_STAT_12_EXEMPT_LDM_CODES: [&str; 3] = ["353", "354", "355"];
/// Temporary ULN used while a learner's real ULN is pending
pub const TEMPORARY_ULN: i64 = 9_999_999_999;

/// Apprentices must be employed at the start of their programme
#[derive(Debug, Default)]
pub struct EmpStat12 {
    dd07: Dd07,
    fams: LearningDeliveryFamQueryService,
    employment: EmploymentStatusQueryService,
}

impl EmpStat12 {
    pub const NAME: &'static str = "EmpStat_12";

    pub fn new(
        dd07: Dd07,
        fams: LearningDeliveryFamQueryService,
        employment: EmploymentStatusQueryService,
    ) -> Self {
        Self {
            dd07,
            fams,
            employment,
        }
    }

    pub fn descriptor() -> RuleDescriptor<Learner> {
        RuleDescriptor {
            name: Self::NAME,
            message: "Employment status must be paid employment at the start of an apprenticeship",
            severity: Some(Severity::Error),
            requires: &[],
            build: |deps| Arc::new(EmpStat12::new(deps.dd07, deps.fams, deps.employment)),
        }
    }
}

impl Rule<Learner> for EmpStat12 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Learner, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        for delivery in &subject.learning_deliveries {
            if delivery.aim_type != AIM_TYPE_PROGRAMME
                || !self.dd07.is_apprenticeship(delivery.prog_type)
            {
                continue;
            }
            let emp_stat = self
                .employment
                .emp_stat_applicable_on(subject, delivery.learn_start_date);
            if emp_stat != Some(EMP_STAT_NOT_EMPLOYED_SEEKING) {
                continue;
            }
            if self.fams.has_any_learning_delivery_fam_codes_for_type(
                delivery,
                "LDM",
                &EMP_STAT_12_EXEMPT_LDM_CODES,
            ) {
                continue;
            }
            emitter.emit(
                Some(delivery.aim_seq_number),
                vec![RuleEmitter::date_parameter(
                    "LearnStartDate",
                    delivery.learn_start_date,
                )],
            );
        }
        Ok(())
    }
}

/// LLDD categories must be current at the learner's first start date
pub struct LlddCat02 {
    lookups: Arc<dyn ProvideLookupDetails>,
}

impl LlddCat02 {
    pub const NAME: &'static str = "LLDDCat_02";

    pub fn new(lookups: Arc<dyn ProvideLookupDetails>) -> Self {
        Self { lookups }
    }

    pub fn descriptor() -> RuleDescriptor<Learner> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The LLDD category is not valid on the learning start date",
            severity: Some(Severity::Error),
            requires: &[LookupDomain::TimeRestricted(TimeRestrictedKey::LlddCat)],
            build: |deps| Arc::new(LlddCat02::new(deps.lookups.clone())),
        }
    }
}

impl Rule<Learner> for LlddCat02 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Learner, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        let Some(start) = subject.earliest_start_date() else {
            return Ok(());
        };
        for problem in &subject.lldd_and_health_problems {
            let key = TimeRestrictedKey::LlddCat;
            if self.lookups.contains_limited_life(key, problem.lldd_cat)
                && !self.lookups.is_current(key, problem.lldd_cat, start)
            {
                emitter.emit(
                    None,
                    vec![
                        RuleEmitter::parameter("LLDDCat", problem.lldd_cat),
                        RuleEmitter::date_parameter("LearnStartDate", start),
                    ],
                );
            }
        }
        Ok(())
    }
}

/// A returned ULN must be on the learner register
pub struct Uln03 {
    ulns: Arc<dyn UlnDataService>,
}

impl Uln03 {
    pub const NAME: &'static str = "ULN_03";

    pub fn new(ulns: Arc<dyn UlnDataService>) -> Self {
        Self { ulns }
    }

    pub fn descriptor() -> RuleDescriptor<Learner> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The ULN is not a valid ULN on the learner register",
            severity: Some(Severity::Error),
            requires: &[],
            build: |deps| Arc::new(Uln03::new(deps.ulns.clone())),
        }
    }
}

impl Rule<Learner> for Uln03 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Learner, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        if let Some(uln) = subject.uln {
            if uln != TEMPORARY_ULN && !self.ulns.exists(uln) {
                emitter.emit(None, vec![RuleEmitter::parameter("ULN", uln)]);
            }
        }
        Ok(())
    }
}
