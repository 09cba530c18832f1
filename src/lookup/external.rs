//! Externally sourced reference data (LARS catalogue and the ULN register)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One learning aim in the LARS catalogue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LarsLearningDelivery {
    pub learn_aim_ref: String,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub notional_nvq_level: Option<String>,
    #[serde(default)]
    pub framework_aims: Vec<LarsFrameworkAim>,
}

impl LarsLearningDelivery {
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.effective_from <= date && self.effective_to.map_or(true, |to| date <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LarsFrameworkAim {
    pub fwork_code: i64,
    pub prog_type: i64,
    pub pway_code: i64,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalDataCache {
    /// LARS learning deliveries keyed by learning aim reference
    #[serde(default)]
    pub lars_learning_deliveries: BTreeMap<String, LarsLearningDelivery>,
    #[serde(default)]
    pub ulns: BTreeSet<i64>,
}

/// Queries over the LARS learning aim catalogue
pub trait LarsDataService: Send + Sync {
    fn learn_aim_ref_exists(&self, learn_aim_ref: &str) -> bool;

    fn effective_dates_valid_for_learn_aim_ref(&self, learn_aim_ref: &str, date: NaiveDate)
        -> bool;

    fn framework_code_exists_for_framework_aims(
        &self,
        learn_aim_ref: &str,
        prog_type: Option<i64>,
        fwork_code: Option<i64>,
        pway_code: Option<i64>,
    ) -> bool;
}

/// Queries over the unique learner number register
pub trait UlnDataService: Send + Sync {
    fn exists(&self, uln: i64) -> bool;
}

#[derive(Debug, Clone)]
pub struct LarsData {
    cache: Arc<ExternalDataCache>,
}

impl LarsData {
    pub fn new(cache: Arc<ExternalDataCache>) -> Self {
        Self { cache }
    }

    fn delivery(&self, learn_aim_ref: &str) -> Option<&LarsLearningDelivery> {
        self.cache.lars_learning_deliveries.get(learn_aim_ref)
    }
}

impl LarsDataService for LarsData {
    fn learn_aim_ref_exists(&self, learn_aim_ref: &str) -> bool {
        self.delivery(learn_aim_ref).is_some()
    }

    fn effective_dates_valid_for_learn_aim_ref(
        &self,
        learn_aim_ref: &str,
        date: NaiveDate,
    ) -> bool {
        self.delivery(learn_aim_ref)
            .is_some_and(|delivery| delivery.is_effective_on(date))
    }

    fn framework_code_exists_for_framework_aims(
        &self,
        learn_aim_ref: &str,
        prog_type: Option<i64>,
        fwork_code: Option<i64>,
        pway_code: Option<i64>,
    ) -> bool {
        self.delivery(learn_aim_ref).is_some_and(|delivery| {
            delivery.framework_aims.iter().any(|aim| {
                Some(aim.prog_type) == prog_type
                    && Some(aim.fwork_code) == fwork_code
                    && Some(aim.pway_code) == pway_code
            })
        })
    }
}

#[derive(Debug, Clone)]
pub struct UlnData {
    cache: Arc<ExternalDataCache>,
}

impl UlnData {
    pub fn new(cache: Arc<ExternalDataCache>) -> Self {
        Self { cache }
    }
}

impl UlnDataService for UlnData {
    fn exists(&self, uln: i64) -> bool {
        self.cache.ulns.contains(&uln)
    }
}
