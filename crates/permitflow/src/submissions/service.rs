use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::approvals::{
    ApprovalEngine, CompletionPolicy, NewStep, NewWorkflow, Workflow, WorkflowError, WorkflowId,
    WorkflowKind, WorkflowRepository, WorkflowStatus, WorkflowTarget,
};
use crate::calendar::project_completion_date;
use crate::directory::{AuthorityDirectory, DocumentKind};
use crate::documents::domain::DocumentOwner;
use crate::documents::repository::DocumentRepository;
use crate::storage::{StorageError, Versioned};

use super::domain::{
    AuthorityStatus, FeeKind, FeePaymentStatus, NewSubmission, ProjectId, StatusUpdate, Submission,
    SubmissionFee, SubmissionId, SubmissionStatus,
};
use super::fees::{calculate_fees, FeeContext};
use super::repository::SubmissionRepository;

/// Service owning every submission state change. Reads go straight to the
/// repository; writes re-derive the full record and persist it with one
/// compare-and-swap, so two racing callers never interleave partial updates.
pub struct SubmissionLifecycle<S, D, W> {
    submissions: Arc<S>,
    documents: Arc<D>,
    reviews: ApprovalEngine<W>,
    directory: Arc<AuthorityDirectory>,
}

impl<S, D, W> SubmissionLifecycle<S, D, W>
where
    S: SubmissionRepository + 'static,
    D: DocumentRepository + 'static,
    W: WorkflowRepository + 'static,
{
    pub fn new(
        submissions: Arc<S>,
        documents: Arc<D>,
        workflows: Arc<W>,
        directory: Arc<AuthorityDirectory>,
    ) -> Self {
        Self {
            submissions,
            documents,
            reviews: ApprovalEngine::new(workflows),
            directory,
        }
    }

    /// Creates a draft. The draft carries no fees and no dates; both are
    /// derived at submit time.
    pub fn create(
        &self,
        new: NewSubmission,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Submission>, LifecycleError> {
        let mut issues = Vec::new();
        if new.title.trim().is_empty() {
            issues.push(FieldIssue {
                field: "title",
                problem: "title must not be blank".to_string(),
            });
        }
        if new.created_by.trim().is_empty() {
            issues.push(FieldIssue {
                field: "created_by",
                problem: "creator must be named".to_string(),
            });
        }

        let authority = self.directory.authority(&new.authority_id);
        if authority.is_none() {
            issues.push(FieldIssue {
                field: "authority_id",
                problem: format!("unknown authority '{}'", new.authority_id.0),
            });
        }
        let category = self.directory.category(&new.category_id);
        if category.is_none() {
            issues.push(FieldIssue {
                field: "category_id",
                problem: format!("unknown category '{}'", new.category_id.0),
            });
        }
        if let (Some(authority), Some(category)) = (authority, category) {
            if !authority.accepts(&category.id) {
                issues.push(FieldIssue {
                    field: "category_id",
                    problem: format!(
                        "authority '{}' does not process category '{}'",
                        authority.id.0, category.id.0
                    ),
                });
            }
        }

        if !issues.is_empty() {
            return Err(ValidationError { issues }.into());
        }

        let submission = Submission {
            id: SubmissionId(token("sub")),
            project_id: new.project_id,
            authority_id: new.authority_id,
            category_id: new.category_id,
            title: new.title,
            status: SubmissionStatus::Draft,
            internal_reference: internal_reference(now.date_naive()),
            submission_number: None,
            expedited: new.expedited,
            created_by: new.created_by,
            created_at: now,
            submission_date: None,
            expected_completion_date: None,
            fees: Vec::new(),
            status_history: Vec::new(),
        };

        self.submissions
            .insert(submission)
            .map_err(LifecycleError::from_storage)
    }

    pub fn get(&self, id: &SubmissionId) -> Result<Versioned<Submission>, LifecycleError> {
        self.submissions
            .fetch(id)
            .map_err(LifecycleError::from_storage)?
            .ok_or(LifecycleError::NotFound)
    }

    pub fn list_for_project(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<Versioned<Submission>>, LifecycleError> {
        self.submissions
            .list_for_project(project)
            .map_err(LifecycleError::from_storage)
    }

    /// Hands a draft (or a revision) to the authority. The required-document
    /// check, the fee derivation, and the completion projection all happen
    /// here, then the new state is persisted in one write.
    ///
    /// The first submit stamps `submission_date` and it never moves again; a
    /// resubmission after `revision_needed` restarts only the completion
    /// projection. Settled fee lines survive recalculation untouched.
    pub fn submit(
        &self,
        id: &SubmissionId,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Submission>, LifecycleError> {
        let Versioned {
            record: mut submission,
            revision,
        } = self.get(id)?;

        if !matches!(
            submission.status,
            SubmissionStatus::Draft | SubmissionStatus::RevisionNeeded
        ) {
            return Err(LifecycleError::InvalidTransition {
                from: submission.status,
                to: SubmissionStatus::Submitted,
            });
        }

        let category = self
            .directory
            .category(&submission.category_id)
            .ok_or_else(|| {
                ValidationError::single(
                    "category_id",
                    format!("unknown category '{}'", submission.category_id.0),
                )
            })?;

        let missing = self.missing_documents(&submission.id, &category.required_documents)?;
        if !missing.is_empty() {
            return Err(LifecycleError::Incomplete { missing });
        }

        let today = now.date_naive();
        let context = FeeContext {
            created_on: submission.created_at.date_naive(),
            submission_date: submission.submission_date.unwrap_or(today),
            expedited: submission.expedited,
        };
        let computed = calculate_fees(&category.fees, &context);
        let existing = std::mem::take(&mut submission.fees);
        submission.fees = merge_fee_lines(computed, existing);

        if submission.submission_date.is_none() {
            submission.submission_date = Some(today);
        }

        let processing_days = self
            .directory
            .processing_days(&submission.authority_id, &submission.category_id)
            .unwrap_or(category.typical_processing_days);
        submission.expected_completion_date = Some(project_completion_date(today, processing_days));

        submission.transition(SubmissionStatus::Submitted, actor, None, now);

        self.submissions
            .update(submission, revision)
            .map_err(LifecycleError::from_storage)
    }

    /// Applies an authority-reported status. `approved` is additionally gated
    /// on the firm's own review: while the latest internal review instance is
    /// open or returned, the approval is refused.
    pub fn update_status(
        &self,
        id: &SubmissionId,
        update: StatusUpdate,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Submission>, LifecycleError> {
        let Versioned {
            record: mut submission,
            revision,
        } = self.get(id)?;

        let next = update.status.as_submission_status();
        if !submission.status.accepts_authority_status(update.status) {
            return Err(LifecycleError::InvalidTransition {
                from: submission.status,
                to: next,
            });
        }

        if update.status == AuthorityStatus::Approved {
            if let Some(latest) = self.latest_review(&submission.id)? {
                if latest.record.status.blocks_approval() {
                    return Err(LifecycleError::ReviewPending {
                        workflow: latest.record.id,
                    });
                }
            }
        }

        if let Some(number) = update.submission_number {
            match &submission.submission_number {
                None => submission.submission_number = Some(number),
                Some(existing) if existing == &number => {}
                Some(existing) => {
                    return Err(ValidationError::single(
                        "submission_number",
                        format!(
                            "already assigned '{existing}', refusing to overwrite with '{number}'"
                        ),
                    )
                    .into());
                }
            }
        }

        submission.transition(next, actor, update.comments, now);

        self.submissions
            .update(submission, revision)
            .map_err(LifecycleError::from_storage)
    }

    /// Withdraws an in-flight submission. Withdrawing an already-withdrawn
    /// submission is a no-op; withdrawing any other terminal one is refused.
    pub fn withdraw(
        &self,
        id: &SubmissionId,
        actor: &str,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Submission>, LifecycleError> {
        let Versioned {
            record: mut submission,
            revision,
        } = self.get(id)?;

        if submission.status == SubmissionStatus::Withdrawn {
            return Ok(Versioned {
                record: submission,
                revision,
            });
        }
        if submission.status.is_terminal() {
            return Err(LifecycleError::InvalidTransition {
                from: submission.status,
                to: SubmissionStatus::Withdrawn,
            });
        }

        submission.transition(SubmissionStatus::Withdrawn, actor, comments, now);

        self.submissions
            .update(submission, revision)
            .map_err(LifecycleError::from_storage)
    }

    /// Marks an overdue in-flight submission as lapsed. Refused while the
    /// expected completion date has not passed.
    pub fn expire(
        &self,
        id: &SubmissionId,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Submission>, LifecycleError> {
        let Versioned {
            record: mut submission,
            revision,
        } = self.get(id)?;

        if submission.status.is_terminal() {
            return Err(LifecycleError::InvalidTransition {
                from: submission.status,
                to: SubmissionStatus::Expired,
            });
        }
        if !submission.is_overdue(now.date_naive()) {
            return Err(LifecycleError::NotYetOverdue);
        }

        submission.transition(SubmissionStatus::Expired, actor, None, now);

        self.submissions
            .update(submission, revision)
            .map_err(LifecycleError::from_storage)
    }

    /// Records payment of one fee line. Accepted in any status; the money
    /// may arrive after the authority has already decided.
    pub fn record_fee_payment(
        &self,
        id: &SubmissionId,
        kind: FeeKind,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Submission>, LifecycleError> {
        self.settle_fee(id, kind, FeePaymentStatus::Paid, reference, now)
    }

    /// Waives one fee line, excluding it from the outstanding total.
    pub fn waive_fee(
        &self,
        id: &SubmissionId,
        kind: FeeKind,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Submission>, LifecycleError> {
        self.settle_fee(id, kind, FeePaymentStatus::Waived, Some(reason), now)
    }

    fn settle_fee(
        &self,
        id: &SubmissionId,
        kind: FeeKind,
        status: FeePaymentStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Submission>, LifecycleError> {
        let Versioned {
            record: mut submission,
            revision,
        } = self.get(id)?;

        let fee = submission
            .fees
            .iter_mut()
            .find(|fee| fee.kind == kind)
            .ok_or(LifecycleError::UnknownFee(kind))?;
        if fee.status.is_settled() {
            return Err(LifecycleError::FeeAlreadySettled(kind));
        }

        fee.status = status;
        fee.settled_at = Some(now);
        fee.settlement_note = note;

        self.submissions
            .update(submission, revision)
            .map_err(LifecycleError::from_storage)
    }

    /// Starts an internal review against the submission. Only one instance
    /// may be open at a time; a settled instance stays as history and a new
    /// one picks up after a revision cycle.
    pub fn begin_internal_review(
        &self,
        id: &SubmissionId,
        policy: CompletionPolicy,
        steps: Vec<NewStep>,
        started_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Workflow>, LifecycleError> {
        let Versioned {
            record: submission, ..
        } = self.get(id)?;

        if !matches!(
            submission.status,
            SubmissionStatus::Submitted | SubmissionStatus::UnderReview
        ) {
            return Err(LifecycleError::ReviewNotStartable {
                status: submission.status,
            });
        }

        if let Some(latest) = self.latest_review(&submission.id)? {
            if latest.record.status == WorkflowStatus::InProgress {
                return Err(LifecycleError::ReviewPending {
                    workflow: latest.record.id,
                });
            }
        }

        let workflow = NewWorkflow {
            name: format!("Internal review of {}", submission.internal_reference),
            kind: WorkflowKind::SubmissionReview,
            target: WorkflowTarget::Submission(submission.id.clone()),
            policy,
            steps,
            started_by: started_by.to_string(),
        };
        Ok(self.reviews.start(workflow, now)?)
    }

    /// Every internal review ever run against the submission, oldest first.
    pub fn review_history(
        &self,
        id: &SubmissionId,
    ) -> Result<Vec<Versioned<Workflow>>, LifecycleError> {
        let target = WorkflowTarget::Submission(id.clone());
        Ok(self.reviews.find_for_target(&target)?)
    }

    fn latest_review(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<Versioned<Workflow>>, LifecycleError> {
        let target = WorkflowTarget::Submission(id.clone());
        let mut instances = self.reviews.find_for_target(&target)?;
        Ok(instances.pop())
    }

    fn missing_documents(
        &self,
        id: &SubmissionId,
        required: &[DocumentKind],
    ) -> Result<Vec<DocumentKind>, LifecycleError> {
        let owner = DocumentOwner::Submission(id.clone());
        let documents = self
            .documents
            .list_for_owner(&owner)
            .map_err(LifecycleError::from_storage)?;
        let covered: BTreeSet<DocumentKind> = documents
            .iter()
            .filter(|versioned| !versioned.record.is_archived())
            .map(|versioned| versioned.record.kind)
            .collect();
        Ok(required
            .iter()
            .copied()
            .filter(|kind| !covered.contains(kind))
            .collect())
    }
}

fn token(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("{prefix}-{}", suffix.to_ascii_lowercase())
}

/// Firm-internal reference, stamped once at creation: `SUB-<date>-<suffix>`.
fn internal_reference(today: NaiveDate) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!(
        "SUB-{}-{}",
        today.format("%Y%m%d"),
        suffix.to_ascii_uppercase()
    )
}

/// Replaces the fee list with the freshly computed one while keeping every
/// settled line. A settled line of a computed kind wins over the computed
/// line; settled lines whose trigger no longer fires are retained rather
/// than refunded.
fn merge_fee_lines(
    computed: Vec<SubmissionFee>,
    existing: Vec<SubmissionFee>,
) -> Vec<SubmissionFee> {
    let mut settled: Vec<SubmissionFee> = existing
        .into_iter()
        .filter(|fee| fee.status.is_settled())
        .collect();

    let mut merged: Vec<SubmissionFee> = Vec::with_capacity(computed.len() + settled.len());
    for fee in computed {
        match settled.iter().position(|kept| kept.kind == fee.kind) {
            Some(index) => merged.push(settled.remove(index)),
            None => merged.push(fee),
        }
    }
    merged.append(&mut settled);
    merged.sort_by_key(|fee| fee.kind);
    merged
}

fn kind_labels(kinds: &[DocumentKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A single failed input check, named by the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub problem: String,
}

/// Input rejection reporting every failed check at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub(crate) fn single(field: &'static str, problem: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue {
                field,
                problem: problem.into(),
            }],
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid submission: ")?;
        for (index, issue) in self.issues.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", issue.field, issue.problem)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Error raised by the submission lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("submission not found")]
    NotFound,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("cannot move a {} submission to {}", .from.label(), .to.label())]
    InvalidTransition {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },
    #[error("required documents missing: {}", kind_labels(.missing))]
    Incomplete { missing: Vec<DocumentKind> },
    #[error("internal review {workflow} has not cleared")]
    ReviewPending { workflow: WorkflowId },
    #[error("internal review cannot start while the submission is {}", .status.label())]
    ReviewNotStartable { status: SubmissionStatus },
    #[error("submission is not past its expected completion date")]
    NotYetOverdue,
    #[error("submission carries no {} fee line", .0.label())]
    UnknownFee(FeeKind),
    #[error("{} fee line is already settled", .0.label())]
    FeeAlreadySettled(FeeKind),
    #[error(transparent)]
    Review(#[from] WorkflowError),
    #[error("submission was modified concurrently")]
    ConcurrentModification,
    #[error(transparent)]
    Storage(StorageError),
}

impl LifecycleError {
    fn from_storage(error: StorageError) -> Self {
        match error {
            StorageError::RevisionConflict => Self::ConcurrentModification,
            StorageError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}
