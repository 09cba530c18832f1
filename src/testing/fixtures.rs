//! Canonical test data: a clean submission and the reference data it passes

use crate::lookup::{
    AcademicYear, CodedKey, ExternalDataCache, InternalDataCache, LarsLearningDelivery,
    ReferenceDataSnapshot, SimpleKey, TimeRestrictedKey, ValidityPeriod,
};
use crate::model::{
    CollectionDetails, Header, Learner, LearningDelivery, LearningDeliveryFam, LearningProvider,
    Source, Subject, Submission, ValidationError,
};
use crate::rules::{Rule, RuleDependencies, RuleEmitter};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

pub const PROVIDER_UKPRN: i64 = 10_000_001;
pub const LEARN_AIM_REF: &str = "50023408";
pub const REGISTERED_ULN: i64 = 1_000_000_001;

/// Calendar date, panicking on an impossible date
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| panic!("invalid test date {year}-{month}-{day}"))
}

/// A delivery that passes every built-in rule against [`reference_snapshot`]
pub fn delivery() -> LearningDelivery {
    LearningDelivery {
        learn_aim_ref: LEARN_AIM_REF.to_string(),
        aim_type: 4,
        aim_seq_number: 1,
        learn_start_date: date(2018, 9, 1),
        learn_planned_end_date: date(2019, 6, 30),
        fund_model: 35,
        learning_delivery_fams: vec![LearningDeliveryFam {
            learn_del_fam_type: "SOF".to_string(),
            learn_del_fam_code: "105".to_string(),
            date_from: None,
            date_to: None,
        }],
        ..Default::default()
    }
}

/// A learner with one clean delivery
pub fn learner(learn_ref_number: &str) -> Learner {
    Learner {
        learn_ref_number: learn_ref_number.to_string(),
        date_of_birth: Some(date(2000, 1, 1)),
        learning_deliveries: vec![delivery()],
        ..Default::default()
    }
}

/// `count` clean learners numbered `LRN001`, `LRN002`, ...
pub fn learners(count: usize) -> Vec<Learner> {
    (1..=count).map(|i| learner(&format!("LRN{i:03}"))).collect()
}

/// A submission with a header that passes every header rule
pub fn submission(learners: Vec<Learner>) -> Submission {
    Submission {
        header: Header {
            collection_details: CollectionDetails {
                collection: "ILR".to_string(),
                year: "1819".to_string(),
                file_preparation_date: Some(date(2018, 10, 1)),
            },
            source: Source {
                ukprn: PROVIDER_UKPRN,
                software_supplier: Some("Test Supplier".to_string()),
                date_time: Some(date(2018, 10, 1)),
            },
        },
        learning_provider: LearningProvider {
            ukprn: PROVIDER_UKPRN,
        },
        learners,
    }
}

/// Reference data populated with every domain the built-in rules need
pub fn reference_snapshot() -> ReferenceDataSnapshot {
    let mut internal = InternalDataCache {
        academic_year: AcademicYear::default(),
        ..Default::default()
    };
    internal
        .simple_lookups
        .insert(SimpleKey::AimType, BTreeSet::from([1, 3, 4, 5]));
    internal.simple_lookups.insert(
        SimpleKey::FundModel,
        BTreeSet::from([10, 25, 35, 36, 70, 81, 82, 99]),
    );
    internal
        .simple_lookups
        .insert(SimpleKey::EmpStat, BTreeSet::from([10, 11, 12, 98]));
    internal.simple_lookups.insert(
        SimpleKey::FinType,
        BTreeSet::from([1, 2, 4, 5, 6, 9, 24, 25, 29, 45]),
    );
    internal.coded_lookups.insert(
        CodedKey::LearnDelFamType,
        ["ACT", "LDM", "RES", "SOF"].into_iter().map(String::from).collect(),
    );
    internal.limited_life_lookups.insert(
        TimeRestrictedKey::TtAccom,
        BTreeMap::from([
            (1, ValidityPeriod::new(date(2013, 6, 14), date(2020, 6, 14))),
            (2, ValidityPeriod::new(date(2009, 4, 28), date(2020, 6, 14))),
            (9, ValidityPeriod::new(date(2000, 2, 1), date(2008, 8, 26))),
        ]),
    );
    internal.limited_life_lookups.insert(
        TimeRestrictedKey::LlddCat,
        BTreeMap::from([
            (1, ValidityPeriod::new(date(1990, 1, 1), date(2015, 7, 31))),
            (4, ValidityPeriod::new(date(2015, 8, 1), date(2099, 12, 31))),
        ]),
    );

    let mut external = ExternalDataCache::default();
    external.lars_learning_deliveries.insert(
        LEARN_AIM_REF.to_string(),
        LarsLearningDelivery {
            learn_aim_ref: LEARN_AIM_REF.to_string(),
            effective_from: date(2015, 8, 1),
            effective_to: None,
            notional_nvq_level: Some("2".to_string()),
            framework_aims: Vec::new(),
        },
    );
    external.ulns.insert(REGISTERED_ULN);

    ReferenceDataSnapshot::new(internal, external)
}

pub fn rule_dependencies() -> RuleDependencies {
    RuleDependencies::from_snapshot(&reference_snapshot())
}

/// Run one rule against one subject with an `Error` severity
pub fn run_rule<T: Subject>(rule: &dyn Rule<T>, subject: &T) -> Vec<ValidationError> {
    let mut emitter = RuleEmitter::new(
        rule.rule_name(),
        subject.reference(),
        Some(crate::model::Severity::Error),
    );
    if let Err(e) = rule.validate(subject, &mut emitter) {
        panic!("rule {} failed: {e}", rule.rule_name());
    }
    emitter.into_errors()
}
