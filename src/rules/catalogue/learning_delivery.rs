//! Rules over a learner's learning deliveries

use crate::lookup::{LarsDataService, LookupDomain, ProvideLookupDetails, SimpleKey};
use crate::model::{Learner, Severity};
use crate::rules::derived::{average_add_hours_per_learning_day, Dd07};
use crate::rules::query::LearningDeliveryFamQueryService;
use crate::rules::{Rule, RuleDescriptor, RuleEmitter, RuleResult};
use std::sync::Arc;

/// Aim type of a programme aim
pub const AIM_TYPE_PROGRAMME: i64 = 1;
/// Aim type of a learning aim that is not part of a programme
pub const AIM_TYPE_STANDALONE: i64 = 4;
/// Fund model for non-funded provision
pub const FUND_MODEL_NON_FUNDED: i64 = 99;
/// Community learning and 16-19 fund models
pub const FUND_MODELS_NOT_FOR_APPRENTICESHIPS: [i64; 2] = [10, 25];
/// Source of funding FAM type
pub const FAM_TYPE_SOF: &str = "SOF";

const ADD_HOURS_THRESHOLD: i64 = 60;
const AVERAGE_ADD_HOURS_PER_DAY_THRESHOLD: f64 = 24.0;

/// Additional hours must be plausible across the planned learning period
#[derive(Debug, Default)]
pub struct AddHours04;

impl AddHours04 {
    pub const NAME: &'static str = "AddHours_04";

    pub fn descriptor() -> RuleDescriptor<Learner> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The Additional hours are more than 24 hours per day of learning",
            severity: Some(Severity::Error),
            requires: &[],
            build: |_| Arc::new(AddHours04),
        }
    }
}

impl Rule<Learner> for AddHours04 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Learner, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        for delivery in &subject.learning_deliveries {
            let Some(add_hours) = delivery.add_hours else {
                continue;
            };
            let over_average = average_add_hours_per_learning_day(delivery)
                .is_some_and(|average| average > AVERAGE_ADD_HOURS_PER_DAY_THRESHOLD);
            if add_hours > ADD_HOURS_THRESHOLD && over_average {
                emitter.emit(
                    Some(delivery.aim_seq_number),
                    vec![RuleEmitter::parameter("AddHours", add_hours)],
                );
            }
        }
        Ok(())
    }
}

/// The aim type must be a recognised value
pub struct AimType01 {
    lookups: Arc<dyn ProvideLookupDetails>,
}

impl AimType01 {
    pub const NAME: &'static str = "AimType_01";

    pub fn new(lookups: Arc<dyn ProvideLookupDetails>) -> Self {
        Self { lookups }
    }

    pub fn descriptor() -> RuleDescriptor<Learner> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The Aim type is not a valid lookup",
            severity: Some(Severity::Error),
            requires: &[LookupDomain::Simple(SimpleKey::AimType)],
            build: |deps| Arc::new(AimType01::new(deps.lookups.clone())),
        }
    }
}

impl Rule<Learner> for AimType01 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Learner, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        for delivery in &subject.learning_deliveries {
            if !self.lookups.contains(SimpleKey::AimType, delivery.aim_type) {
                emitter.emit(
                    Some(delivery.aim_seq_number),
                    vec![RuleEmitter::parameter("AimType", delivery.aim_type)],
                );
            }
        }
        Ok(())
    }
}

/// Apprenticeships cannot be funded through community learning or 16-19
#[derive(Debug, Default)]
pub struct FundModel04 {
    dd07: Dd07,
}

impl FundModel04 {
    pub const NAME: &'static str = "FundModel_04";

    pub fn new(dd07: Dd07) -> Self {
        Self { dd07 }
    }

    pub fn descriptor() -> RuleDescriptor<Learner> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The Funding model is not valid for an apprenticeship programme",
            severity: Some(Severity::Error),
            requires: &[],
            build: |deps| Arc::new(FundModel04::new(deps.dd07)),
        }
    }
}

impl Rule<Learner> for FundModel04 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Learner, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        for delivery in &subject.learning_deliveries {
            if FUND_MODELS_NOT_FOR_APPRENTICESHIPS.contains(&delivery.fund_model)
                && self.dd07.is_apprenticeship(delivery.prog_type)
            {
                emitter.emit(
                    Some(delivery.aim_seq_number),
                    vec![RuleEmitter::parameter("FundModel", delivery.fund_model)],
                );
            }
        }
        Ok(())
    }
}

/// The learning aim reference must exist in LARS
pub struct LearnAimRef01 {
    lars: Arc<dyn LarsDataService>,
}

impl LearnAimRef01 {
    pub const NAME: &'static str = "LearnAimRef_01";

    pub fn new(lars: Arc<dyn LarsDataService>) -> Self {
        Self { lars }
    }

    pub fn descriptor() -> RuleDescriptor<Learner> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The Learning aim reference is not a valid lookup on LARS",
            severity: Some(Severity::Error),
            requires: &[],
            build: |deps| Arc::new(LearnAimRef01::new(deps.lars.clone())),
        }
    }
}

impl Rule<Learner> for LearnAimRef01 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Learner, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        for delivery in &subject.learning_deliveries {
            if !self.lars.learn_aim_ref_exists(&delivery.learn_aim_ref) {
                emitter.emit(
                    Some(delivery.aim_seq_number),
                    vec![RuleEmitter::parameter("LearnAimRef", &delivery.learn_aim_ref)],
                );
            }
        }
        Ok(())
    }
}

/// A known learning aim must be effective on the learning start date
pub struct LearnAimRef29 {
    lars: Arc<dyn LarsDataService>,
}

impl LearnAimRef29 {
    pub const NAME: &'static str = "LearnAimRef_29";

    pub fn new(lars: Arc<dyn LarsDataService>) -> Self {
        Self { lars }
    }

    pub fn descriptor() -> RuleDescriptor<Learner> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The Learning aim is not valid in LARS on the learning start date",
            severity: Some(Severity::Warning),
            requires: &[],
            build: |deps| Arc::new(LearnAimRef29::new(deps.lars.clone())),
        }
    }
}

impl Rule<Learner> for LearnAimRef29 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Learner, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        for delivery in &subject.learning_deliveries {
            // unknown aims are reported by LearnAimRef_01
            if self.lars.learn_aim_ref_exists(&delivery.learn_aim_ref)
                && !self.lars.effective_dates_valid_for_learn_aim_ref(
                    &delivery.learn_aim_ref,
                    delivery.learn_start_date,
                )
            {
                emitter.emit(
                    Some(delivery.aim_seq_number),
                    vec![
                        RuleEmitter::parameter("LearnAimRef", &delivery.learn_aim_ref),
                        RuleEmitter::date_parameter("LearnStartDate", delivery.learn_start_date),
                    ],
                );
            }
        }
        Ok(())
    }
}

/// Funded deliveries must record their source of funding
#[derive(Debug, Default)]
pub struct LearnDelFamType01 {
    fams: LearningDeliveryFamQueryService,
}

impl LearnDelFamType01 {
    pub const NAME: &'static str = "LearnDelFAMType_01";

    pub fn new(fams: LearningDeliveryFamQueryService) -> Self {
        Self { fams }
    }

    pub fn descriptor() -> RuleDescriptor<Learner> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The Source of funding must be returned for funded learning aims",
            severity: Some(Severity::Error),
            requires: &[],
            build: |deps| Arc::new(LearnDelFamType01::new(deps.fams)),
        }
    }
}

impl Rule<Learner> for LearnDelFamType01 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Learner, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        for delivery in &subject.learning_deliveries {
            if delivery.fund_model != FUND_MODEL_NON_FUNDED
                && !self
                    .fams
                    .has_learning_delivery_fam_type(delivery, FAM_TYPE_SOF)
            {
                emitter.emit(
                    Some(delivery.aim_seq_number),
                    vec![
                        RuleEmitter::parameter("FundModel", delivery.fund_model),
                        RuleEmitter::parameter("LearnDelFAMType", FAM_TYPE_SOF),
                    ],
                );
            }
        }
        Ok(())
    }
}

/// Standalone aims must not record a programme type
#[derive(Debug, Default)]
pub struct ProgType02;

impl ProgType02 {
    pub const NAME: &'static str = "ProgType_02";

    pub fn descriptor() -> RuleDescriptor<Learner> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The Programme type must not be returned for aims outside a programme",
            severity: Some(Severity::Error),
            requires: &[],
            build: |_| Arc::new(ProgType02),
        }
    }
}

impl Rule<Learner> for ProgType02 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Learner, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        for delivery in &subject.learning_deliveries {
            if delivery.aim_type != AIM_TYPE_STANDALONE {
                continue;
            }
            if let Some(prog_type) = delivery.prog_type {
                emitter.emit(
                    Some(delivery.aim_seq_number),
                    vec![
                        RuleEmitter::parameter("AimType", delivery.aim_type),
                        RuleEmitter::parameter("ProgType", prog_type),
                    ],
                );
            }
        }
        Ok(())
    }
}

/// The subcontracted workplace aim id must be a GUID when present
#[derive(Debug, Default)]
pub struct SwsSupAimId01;

impl SwsSupAimId01 {
    pub const NAME: &'static str = "SWSSupAimId_01";

    pub fn descriptor() -> RuleDescriptor<Learner> {
        RuleDescriptor {
            name: Self::NAME,
            message: "The SWSupAimId must be a valid GUID",
            severity: Some(Severity::Error),
            requires: &[],
            build: |_| Arc::new(SwsSupAimId01),
        }
    }
}

impl Rule<Learner> for SwsSupAimId01 {
    fn rule_name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, subject: &Learner, emitter: &mut RuleEmitter<'_>) -> RuleResult<()> {
        for delivery in &subject.learning_deliveries {
            let Some(id) = delivery.sws_sup_aim_id.as_deref() else {
                continue;
            };
            if uuid::Uuid::parse_str(id.trim()).is_err() {
                emitter.emit(
                    Some(delivery.aim_seq_number),
                    vec![RuleEmitter::parameter("SWSupAimId", id)],
                );
            }
        }
        Ok(())
    }
}
