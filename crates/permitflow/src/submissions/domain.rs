use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::directory::{AuthorityId, CategoryId};

/// Identifier wrapper for regulatory submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for the project a submission belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a submission. Terminal statuses permit no further
/// transition; withdrawal is a status, never a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    RevisionNeeded,
    Withdrawn,
    Expired,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Draft => "draft",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::UnderReview => "under_review",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::RevisionNeeded => "revision_needed",
            SubmissionStatus::Withdrawn => "withdrawn",
            SubmissionStatus::Expired => "expired",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            SubmissionStatus::Approved
                | SubmissionStatus::Rejected
                | SubmissionStatus::Withdrawn
                | SubmissionStatus::Expired
        )
    }

    /// Whether the external authority may move a submission from this status
    /// to `next`. Re-announcing the current status is rejected so every
    /// transition appends exactly one audit entry.
    pub const fn accepts_authority_status(self, next: AuthorityStatus) -> bool {
        match self {
            SubmissionStatus::Submitted => true,
            SubmissionStatus::UnderReview => !matches!(next, AuthorityStatus::UnderReview),
            _ => false,
        }
    }
}

/// The subset of statuses an external authority can report back. Keeping
/// this a separate closed set means caller-driven transitions (withdraw)
/// and calendar-driven ones (expire) cannot be smuggled through the
/// status-update path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityStatus {
    UnderReview,
    Approved,
    Rejected,
    RevisionNeeded,
}

impl AuthorityStatus {
    pub const fn as_submission_status(self) -> SubmissionStatus {
        match self {
            AuthorityStatus::UnderReview => SubmissionStatus::UnderReview,
            AuthorityStatus::Approved => SubmissionStatus::Approved,
            AuthorityStatus::Rejected => SubmissionStatus::Rejected,
            AuthorityStatus::RevisionNeeded => SubmissionStatus::RevisionNeeded,
        }
    }
}

/// Authority-driven status update payload. `submission_number` carries the
/// reference the authority assigns once it accepts the submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: AuthorityStatus,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub submission_number: Option<String>,
}

/// Immutable audit entry appended on every applied status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub previous: SubmissionStatus,
    pub next: SubmissionStatus,
    pub actor: String,
    pub recorded_at: DateTime<Utc>,
    pub comments: Option<String>,
}

/// Kind of a fee line. The ordering is the presentation order of a fee list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    Base,
    Late,
    Expedite,
}

impl FeeKind {
    pub const fn label(self) -> &'static str {
        match self {
            FeeKind::Base => "base",
            FeeKind::Late => "late",
            FeeKind::Expedite => "expedite",
        }
    }
}

/// Payment state of a single fee line. `Paid` and `Waived` are settled and
/// never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeePaymentStatus {
    Unpaid,
    Paid,
    Waived,
}

impl FeePaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            FeePaymentStatus::Unpaid => "unpaid",
            FeePaymentStatus::Paid => "paid",
            FeePaymentStatus::Waived => "waived",
        }
    }

    pub const fn is_settled(self) -> bool {
        !matches!(self, FeePaymentStatus::Unpaid)
    }
}

/// A single fee line attached to a submission. `settlement_note` carries the
/// payment reference for paid lines and the reason for waived ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFee {
    pub kind: FeeKind,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: FeePaymentStatus,
    pub settled_at: Option<DateTime<Utc>>,
    pub settlement_note: Option<String>,
}

/// Caller input for creating a submission in `draft`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub project_id: ProjectId,
    pub authority_id: AuthorityId,
    pub category_id: CategoryId,
    pub title: String,
    #[serde(default)]
    pub expedited: bool,
    pub created_by: String,
}

/// The central submission record. Mutated only through the lifecycle
/// service; never physically deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub project_id: ProjectId,
    pub authority_id: AuthorityId,
    pub category_id: CategoryId,
    pub title: String,
    pub status: SubmissionStatus,
    pub internal_reference: String,
    pub submission_number: Option<String>,
    pub expedited: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub submission_date: Option<NaiveDate>,
    pub expected_completion_date: Option<NaiveDate>,
    pub fees: Vec<SubmissionFee>,
    pub status_history: Vec<StatusChange>,
}

impl Submission {
    /// True while the submission is still in flight and `today` has passed
    /// its expected completion date. Evaluated on demand, never stored.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        match self.expected_completion_date {
            Some(expected) => today > expected,
            None => false,
        }
    }

    /// Applies a status transition, appending the matching audit entry.
    pub(crate) fn transition(
        &mut self,
        next: SubmissionStatus,
        actor: &str,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status_history.push(StatusChange {
            previous: self.status,
            next,
            actor: actor.to_string(),
            recorded_at: now,
            comments,
        });
        self.status = next;
    }

    pub fn fee(&self, kind: FeeKind) -> Option<&SubmissionFee> {
        self.fees.iter().find(|fee| fee.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn submission_with(
        status: SubmissionStatus,
        expected_completion_date: Option<NaiveDate>,
    ) -> Submission {
        Submission {
            id: SubmissionId("sub-1".to_string()),
            project_id: ProjectId("proj-1".to_string()),
            authority_id: AuthorityId("dbkl".to_string()),
            category_id: CategoryId("building-plan".to_string()),
            title: "Tower A".to_string(),
            status,
            internal_reference: "SUB-20240101-AAAAAA".to_string(),
            submission_number: None,
            expedited: false,
            created_by: "arch.lee".to_string(),
            created_at: date(2024, 1, 1).and_hms_opt(9, 0, 0).expect("time").and_utc(),
            submission_date: None,
            expected_completion_date,
            fees: Vec::new(),
            status_history: Vec::new(),
        }
    }

    #[test]
    fn terminal_statuses_are_closed() {
        for status in [
            SubmissionStatus::Approved,
            SubmissionStatus::Rejected,
            SubmissionStatus::Withdrawn,
            SubmissionStatus::Expired,
        ] {
            assert!(status.is_terminal());
            for next in [
                AuthorityStatus::UnderReview,
                AuthorityStatus::Approved,
                AuthorityStatus::Rejected,
                AuthorityStatus::RevisionNeeded,
            ] {
                assert!(!status.accepts_authority_status(next));
            }
        }
    }

    #[test]
    fn authority_cannot_touch_drafts() {
        assert!(!SubmissionStatus::Draft.accepts_authority_status(AuthorityStatus::Approved));
        assert!(!SubmissionStatus::Draft.accepts_authority_status(AuthorityStatus::UnderReview));
        assert!(
            !SubmissionStatus::RevisionNeeded.accepts_authority_status(AuthorityStatus::Approved)
        );
    }

    #[test]
    fn submitted_accepts_every_authority_status() {
        for next in [
            AuthorityStatus::UnderReview,
            AuthorityStatus::Approved,
            AuthorityStatus::Rejected,
            AuthorityStatus::RevisionNeeded,
        ] {
            assert!(SubmissionStatus::Submitted.accepts_authority_status(next));
        }
    }

    #[test]
    fn under_review_rejects_a_repeat_announcement() {
        assert!(
            !SubmissionStatus::UnderReview.accepts_authority_status(AuthorityStatus::UnderReview)
        );
        assert!(SubmissionStatus::UnderReview.accepts_authority_status(AuthorityStatus::Approved));
    }

    #[test]
    fn overdue_requires_active_status_and_passed_projection() {
        let expected = date(2024, 2, 1);

        let active = submission_with(SubmissionStatus::Submitted, Some(expected));
        assert!(!active.is_overdue(date(2024, 1, 20)));
        assert!(!active.is_overdue(expected));
        assert!(active.is_overdue(date(2024, 2, 2)));

        let terminal = submission_with(SubmissionStatus::Approved, Some(expected));
        assert!(!terminal.is_overdue(date(2024, 3, 1)));

        let draft = submission_with(SubmissionStatus::Draft, None);
        assert!(!draft.is_overdue(date(2024, 3, 1)));
    }

    #[test]
    fn transition_appends_one_audit_entry() {
        let mut submission = submission_with(SubmissionStatus::Submitted, None);
        let now = date(2024, 1, 5).and_hms_opt(8, 0, 0).expect("time").and_utc();

        submission.transition(
            SubmissionStatus::UnderReview,
            "dbkl-gateway",
            Some("assigned to reviewer".to_string()),
            now,
        );

        assert_eq!(submission.status, SubmissionStatus::UnderReview);
        assert_eq!(submission.status_history.len(), 1);
        let entry = &submission.status_history[0];
        assert_eq!(entry.previous, SubmissionStatus::Submitted);
        assert_eq!(entry.next, SubmissionStatus::UnderReview);
        assert_eq!(entry.actor, "dbkl-gateway");
        assert_eq!(entry.recorded_at, now);
    }
}
