use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::storage::{StorageError, Versioned};

use super::domain::{ProjectId, Submission, SubmissionFee, SubmissionId};
use super::fees;

/// Storage abstraction so the lifecycle service can be exercised in
/// isolation. `update` is a compare-and-swap against the revision read
/// earlier; a stale revision fails with [`StorageError::RevisionConflict`],
/// which is how two simultaneous transitions on one submission are kept from
/// both succeeding.
pub trait SubmissionRepository: Send + Sync {
    fn insert(&self, submission: Submission) -> Result<Versioned<Submission>, StorageError>;
    fn fetch(&self, id: &SubmissionId) -> Result<Option<Versioned<Submission>>, StorageError>;
    fn list_for_project(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<Versioned<Submission>>, StorageError>;
    fn update(
        &self,
        submission: Submission,
        expected_revision: u64,
    ) -> Result<Versioned<Submission>, StorageError>;
}

/// Sanitized representation of a submission for API responses. `overdue` is
/// derived against the supplied evaluation date, never read from storage.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    pub id: SubmissionId,
    pub project_id: ProjectId,
    pub title: String,
    pub internal_reference: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_completion_date: Option<NaiveDate>,
    pub overdue: bool,
    pub total_amount: Decimal,
    pub fees: Vec<SubmissionFee>,
}

impl SubmissionView {
    pub fn of(submission: &Submission, today: NaiveDate) -> Self {
        Self {
            id: submission.id.clone(),
            project_id: submission.project_id.clone(),
            title: submission.title.clone(),
            internal_reference: submission.internal_reference.clone(),
            status: submission.status.label(),
            submission_number: submission.submission_number.clone(),
            submission_date: submission.submission_date,
            expected_completion_date: submission.expected_completion_date,
            overdue: submission.is_overdue(today),
            total_amount: fees::total_amount(&submission.fees),
            fees: submission.fees.clone(),
        }
    }
}
