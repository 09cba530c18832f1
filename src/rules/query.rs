//! Read-only queries over nested learner collections

use crate::model::{Learner, LearnerEmploymentStatus, LearningDelivery, LearningDeliveryFam};
use chrono::NaiveDate;

/// Queries over a delivery's funding and monitoring records
#[derive(Debug, Clone, Copy, Default)]
pub struct LearningDeliveryFamQueryService;

impl LearningDeliveryFamQueryService {
    pub fn has_learning_delivery_fam_type(
        &self,
        delivery: &LearningDelivery,
        fam_type: &str,
    ) -> bool {
        delivery
            .learning_delivery_fams
            .iter()
            .any(|fam| fam.learn_del_fam_type.eq_ignore_ascii_case(fam_type))
    }

    pub fn has_any_learning_delivery_fam_codes_for_type(
        &self,
        delivery: &LearningDelivery,
        fam_type: &str,
        codes: &[&str],
    ) -> bool {
        self.fams_of_type(delivery, fam_type)
            .any(|fam| codes.iter().any(|code| fam.learn_del_fam_code == *code))
    }

    pub fn fams_of_type<'a>(
        &self,
        delivery: &'a LearningDelivery,
        fam_type: &'a str,
    ) -> impl Iterator<Item = &'a LearningDeliveryFam> + 'a {
        delivery
            .learning_delivery_fams
            .iter()
            .filter(move |fam| fam.learn_del_fam_type.eq_ignore_ascii_case(fam_type))
    }
}

/// Queries over a learner's deliveries
#[derive(Debug, Clone, Copy, Default)]
pub struct LearningDeliveryQueryService;

impl LearningDeliveryQueryService {
    pub fn deliveries_of_aim_type<'a>(
        &self,
        learner: &'a Learner,
        aim_type: i64,
    ) -> impl Iterator<Item = &'a LearningDelivery> + 'a {
        learner
            .learning_deliveries
            .iter()
            .filter(move |d| d.aim_type == aim_type)
    }

    pub fn has_delivery_with_fund_model(&self, learner: &Learner, fund_models: &[i64]) -> bool {
        learner
            .learning_deliveries
            .iter()
            .any(|d| fund_models.contains(&d.fund_model))
    }
}

/// Queries over a learner's employment history
#[derive(Debug, Clone, Copy, Default)]
pub struct EmploymentStatusQueryService;

impl EmploymentStatusQueryService {
    /// The status applicable on `date`: the latest one applied on or before it
    pub fn status_applicable_on<'a>(
        &self,
        learner: &'a Learner,
        date: NaiveDate,
    ) -> Option<&'a LearnerEmploymentStatus> {
        learner
            .employment_statuses
            .iter()
            .filter(|status| status.date_emp_stat_app <= date)
            .max_by_key(|status| status.date_emp_stat_app)
    }

    pub fn emp_stat_applicable_on(&self, learner: &Learner, date: NaiveDate) -> Option<i64> {
        self.status_applicable_on(learner, date)
            .map(|status| status.emp_stat)
    }
}
