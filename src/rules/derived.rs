//! Derived data shared by several rules

use crate::model::LearningDelivery;

/// Programme types that identify an apprenticeship
pub const APPRENTICESHIP_PROG_TYPES: [i64; 7] = [2, 3, 20, 21, 22, 23, 25];

/// Derived data 07: is the programme type an apprenticeship
#[derive(Debug, Clone, Copy, Default)]
pub struct Dd07;

impl Dd07 {
    pub fn is_apprenticeship(&self, prog_type: Option<i64>) -> bool {
        prog_type.is_some_and(|p| APPRENTICESHIP_PROG_TYPES.contains(&p))
    }
}

/// Average additional hours per learning day.
///
/// Learning days run from the start date to the planned end date inclusive.
/// Returns `None` when there are no additional hours or the planned end date
/// precedes the start date.
pub fn average_add_hours_per_learning_day(delivery: &LearningDelivery) -> Option<f64> {
    let add_hours = delivery.add_hours?;
    let days = (delivery.learn_planned_end_date - delivery.learn_start_date).num_days() + 1;
    if days <= 0 {
        return None;
    }
    Some(add_hours as f64 / days as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_dd07_apprenticeship_prog_types() {
        let dd07 = Dd07;
        for prog_type in APPRENTICESHIP_PROG_TYPES {
            assert!(dd07.is_apprenticeship(Some(prog_type)));
        }
        assert!(!dd07.is_apprenticeship(Some(24)));
        assert!(!dd07.is_apprenticeship(Some(99)));
        assert!(!dd07.is_apprenticeship(None));
    }

    #[test]
    fn test_average_add_hours_single_day() {
        let delivery = LearningDelivery {
            add_hours: Some(70),
            learn_start_date: date(2018, 9, 1),
            learn_planned_end_date: date(2018, 9, 1),
            ..Default::default()
        };
        assert_eq!(average_add_hours_per_learning_day(&delivery), Some(70.0));
    }

    #[test]
    fn test_average_add_hours_spreads_across_days() {
        let delivery = LearningDelivery {
            add_hours: Some(100),
            learn_start_date: date(2018, 9, 1),
            learn_planned_end_date: date(2018, 9, 10),
            ..Default::default()
        };
        assert_eq!(average_add_hours_per_learning_day(&delivery), Some(10.0));
    }

    #[test]
    fn test_average_add_hours_inverted_dates() {
        let delivery = LearningDelivery {
            add_hours: Some(100),
            learn_start_date: date(2018, 9, 10),
            learn_planned_end_date: date(2018, 9, 1),
            ..Default::default()
        };
        assert_eq!(average_add_hours_per_learning_day(&delivery), None);
        assert_eq!(
            average_add_hours_per_learning_day(&LearningDelivery::default()),
            None
        );
    }
}
