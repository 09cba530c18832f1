//! Learner records and their nested child collections

use super::Subject;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One learner's record, the primary validation subject
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Learner {
    pub learn_ref_number: String,
    pub uln: Option<i64>,
    pub date_of_birth: Option<NaiveDate>,
    pub accom: Option<i64>,
    pub plan_learn_hours: Option<i64>,
    #[serde(default)]
    pub lldd_and_health_problems: Vec<LlddAndHealthProblem>,
    #[serde(default)]
    pub employment_statuses: Vec<LearnerEmploymentStatus>,
    pub learner_he: Option<LearnerHe>,
    #[serde(default)]
    pub learning_deliveries: Vec<LearningDelivery>,
}

impl Learner {
    /// Earliest learning start date across all deliveries
    pub fn earliest_start_date(&self) -> Option<NaiveDate> {
        self.learning_deliveries
            .iter()
            .map(|d| d.learn_start_date)
            .min()
    }
}

impl Subject for Learner {
    fn reference(&self) -> Option<&str> {
        Some(&self.learn_ref_number)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningDelivery {
    pub learn_aim_ref: String,
    pub aim_type: i64,
    pub aim_seq_number: i64,
    pub learn_start_date: NaiveDate,
    pub learn_planned_end_date: NaiveDate,
    pub fund_model: i64,
    pub prog_type: Option<i64>,
    pub fwork_code: Option<i64>,
    pub pway_code: Option<i64>,
    pub add_hours: Option<i64>,
    pub comp_status: Option<i64>,
    pub sws_sup_aim_id: Option<String>,
    #[serde(default)]
    pub learning_delivery_fams: Vec<LearningDeliveryFam>,
}

/// Learning delivery funding and monitoring record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningDeliveryFam {
    pub learn_del_fam_type: String,
    pub learn_del_fam_code: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlddAndHealthProblem {
    pub lldd_cat: i64,
    pub primary_lldd: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerEmploymentStatus {
    pub emp_stat: i64,
    pub date_emp_stat_app: NaiveDate,
    #[serde(default)]
    pub monitorings: Vec<EmploymentStatusMonitoring>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmploymentStatusMonitoring {
    pub esm_type: String,
    pub esm_code: i64,
}

/// Higher-education sub-record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerHe {
    pub ttaccom: Option<i64>,
    #[serde(default)]
    pub financial_supports: Vec<FinancialSupport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSupport {
    pub fin_type: i64,
    pub fin_amount: i64,
}
