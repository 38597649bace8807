//! Regulatory submission lifecycle: drafting, fee derivation, the status
//! state machine, and the internal review gate.
//!
//! A submission moves `draft → submitted → under_review` and ends in exactly
//! one of `approved`, `rejected`, `withdrawn`, or `expired`, with a detour
//! through `revision_needed` when the authority wants changes. Every applied
//! transition appends one audit entry; terminal statuses are closed.

pub mod domain;
pub mod fees;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AuthorityStatus, FeeKind, FeePaymentStatus, NewSubmission, ProjectId, StatusChange,
    StatusUpdate, Submission, SubmissionFee, SubmissionId, SubmissionStatus,
};
pub use fees::{calculate_fees, total_amount, FeeContext};
pub use repository::{SubmissionRepository, SubmissionView};
pub use router::submission_router;
pub use service::{FieldIssue, LifecycleError, SubmissionLifecycle, ValidationError};
