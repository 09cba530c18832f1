//! Data model for a validation job
//!
//! Submissions and learners are plain immutable data. Rules only read them,
//! so there is no behaviour here beyond a few convenience accessors.

pub mod learner;
pub mod submission;
pub mod validation_error;

pub use learner::{
    EmploymentStatusMonitoring, FinancialSupport, Learner, LearnerEmploymentStatus, LearnerHe,
    LearningDelivery, LearningDeliveryFam, LlddAndHealthProblem,
};
pub use submission::{CollectionDetails, Header, LearningProvider, Source, Submission};
pub use validation_error::{ErrorMessageParameter, Severity, ValidationError};

/// Something a rule set can be executed against.
///
/// The reference is the key errors are tagged with; subject types without a
/// per-record key (the submission header) return `None`.
pub trait Subject: Send + Sync {
    fn reference(&self) -> Option<&str>;
}
