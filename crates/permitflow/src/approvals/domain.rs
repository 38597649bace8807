use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::documents::domain::DocumentId;
use crate::submissions::domain::SubmissionId;

/// Identifier wrapper for workflows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkflowId(pub String);

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for individual workflow steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(pub String);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The entity a workflow reviews. One workflow instance belongs to exactly
/// one target; a target may accumulate several instances over time as
/// returned reviews are restarted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum WorkflowTarget {
    Document(DocumentId),
    Submission(SubmissionId),
}

/// What the workflow instance is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    DocumentApproval,
    SubmissionReview,
}

impl WorkflowKind {
    pub const fn label(self) -> &'static str {
        match self {
            WorkflowKind::DocumentApproval => "document_approval",
            WorkflowKind::SubmissionReview => "submission_review",
        }
    }
}

/// How steps become actionable. `Sequential` releases steps strictly in
/// order; `AnyOrder` lets every pending step be acted on. Rejection
/// short-circuits under both policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    Sequential,
    AnyOrder,
}

/// Terminal action a reviewer records on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Approved,
    Rejected,
    Returned,
}

impl StepAction {
    pub const fn label(self) -> &'static str {
        match self {
            StepAction::Approved => "approved",
            StepAction::Rejected => "rejected",
            StepAction::Returned => "returned",
        }
    }
}

/// State of one step. `Skipped` marks steps that were never acted on because
/// an earlier step settled the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Resolved {
        action: StepAction,
        actor: String,
        comments: Option<String>,
        completed_at: DateTime<Utc>,
    },
    Skipped,
}

/// A single review step bound to an assignee. `sequence` is the 1-based
/// position used by the sequential policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: StepId,
    pub sequence: u32,
    pub name: String,
    pub assignee: String,
    pub state: StepState,
}

impl WorkflowStep {
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, StepState::Resolved { .. })
    }

    pub fn action(&self) -> Option<StepAction> {
        match &self.state {
            StepState::Resolved { action, .. } => Some(*action),
            _ => None,
        }
    }
}

/// Overall outcome of a workflow instance. A settled instance accepts no
/// further step actions; `ReturnedForRevision` still holds the owning
/// entity's approval gate closed until a fresh instance approves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    InProgress,
    Approved,
    Rejected,
    ReturnedForRevision,
}

impl WorkflowStatus {
    pub const fn label(self) -> &'static str {
        match self {
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Approved => "approved",
            WorkflowStatus::Rejected => "rejected",
            WorkflowStatus::ReturnedForRevision => "returned_for_revision",
        }
    }

    /// Whether this instance itself is finished.
    pub const fn is_settled(self) -> bool {
        !matches!(self, WorkflowStatus::InProgress)
    }

    /// Whether the owning submission or document must wait before it can be
    /// approved. Returned reviews keep the gate closed; a new instance must
    /// run after revision.
    pub const fn blocks_approval(self) -> bool {
        matches!(
            self,
            WorkflowStatus::InProgress | WorkflowStatus::ReturnedForRevision
        )
    }
}

/// An ordered review sequence against one target. Mutated only through the
/// approval engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub kind: WorkflowKind,
    pub target: WorkflowTarget,
    pub policy: CompletionPolicy,
    pub status: WorkflowStatus,
    pub steps: Vec<WorkflowStep>,
    pub started_by: String,
    pub started_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Workflow {
    pub fn step(&self, id: &StepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| &step.id == id)
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_settled()
    }

    /// Settles the instance: remaining pending steps are marked skipped so
    /// the record shows they were never acted on.
    pub(crate) fn settle(&mut self, status: WorkflowStatus, now: DateTime<Utc>) {
        for step in &mut self.steps {
            if matches!(step.state, StepState::Pending) {
                step.state = StepState::Skipped;
            }
        }
        self.status = status;
        self.settled_at = Some(now);
    }
}

/// Caller input for one step of a new workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStep {
    pub name: String,
    pub assignee: String,
}

/// Caller input for starting a workflow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkflow {
    pub name: String,
    pub kind: WorkflowKind,
    pub target: WorkflowTarget,
    pub policy: CompletionPolicy,
    pub steps: Vec<NewStep>,
    pub started_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, hour, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn three_step_workflow() -> Workflow {
        let steps = (1..=3)
            .map(|sequence| WorkflowStep {
                id: StepId(format!("stp-{sequence}")),
                sequence,
                name: format!("Review {sequence}"),
                assignee: format!("reviewer-{sequence}"),
                state: StepState::Pending,
            })
            .collect();

        Workflow {
            id: WorkflowId("wfl-1".to_string()),
            name: "Internal review".to_string(),
            kind: WorkflowKind::SubmissionReview,
            target: WorkflowTarget::Submission(SubmissionId("sub-1".to_string())),
            policy: CompletionPolicy::Sequential,
            status: WorkflowStatus::InProgress,
            steps,
            started_by: "lead.architect".to_string(),
            started_at: instant(9),
            settled_at: None,
        }
    }

    #[test]
    fn settling_skips_pending_steps() {
        let mut workflow = three_step_workflow();
        workflow.steps[0].state = StepState::Resolved {
            action: StepAction::Rejected,
            actor: "reviewer-1".to_string(),
            comments: None,
            completed_at: instant(10),
        };

        workflow.settle(WorkflowStatus::Rejected, instant(10));

        assert_eq!(workflow.status, WorkflowStatus::Rejected);
        assert_eq!(workflow.settled_at, Some(instant(10)));
        assert!(matches!(workflow.steps[1].state, StepState::Skipped));
        assert!(matches!(workflow.steps[2].state, StepState::Skipped));
        assert!(workflow.steps[0].is_resolved());
    }

    #[test]
    fn returned_reviews_keep_the_approval_gate_closed() {
        assert!(WorkflowStatus::InProgress.blocks_approval());
        assert!(WorkflowStatus::ReturnedForRevision.blocks_approval());
        assert!(!WorkflowStatus::Approved.blocks_approval());
        assert!(!WorkflowStatus::Rejected.blocks_approval());
    }

    #[test]
    fn settled_statuses_are_every_status_but_in_progress() {
        assert!(!WorkflowStatus::InProgress.is_settled());
        assert!(WorkflowStatus::Approved.is_settled());
        assert!(WorkflowStatus::Rejected.is_settled());
        assert!(WorkflowStatus::ReturnedForRevision.is_settled());
    }
}
