//! Submission root and header records

use super::{Learner, Subject};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One uploaded batch of learner records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub header: Header,
    #[serde(default)]
    pub learning_provider: LearningProvider,
    #[serde(default)]
    pub learners: Vec<Learner>,
}

impl Submission {
    /// Learner references in submission order
    pub fn learner_references(&self) -> impl Iterator<Item = &str> {
        self.learners.iter().map(|l| l.learn_ref_number.as_str())
    }
}

impl Subject for Submission {
    fn reference(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub collection_details: CollectionDetails,
    pub source: Source,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionDetails {
    /// Collection name, e.g. "ILR"
    pub collection: String,
    /// Four digit academic year code, e.g. "1819"
    pub year: String,
    pub file_preparation_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub ukprn: i64,
    pub software_supplier: Option<String>,
    pub date_time: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningProvider {
    pub ukprn: i64,
}
