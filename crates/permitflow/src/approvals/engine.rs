use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::storage::{StorageError, Versioned};

use super::domain::{
    CompletionPolicy, NewWorkflow, StepAction, StepId, StepState, Workflow, WorkflowId,
    WorkflowStatus, WorkflowStep, WorkflowTarget,
};
use super::repository::WorkflowRepository;

/// Error raised by the approval engine.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("workflow not found")]
    UnknownWorkflow,
    #[error("step {0} does not belong to any workflow")]
    UnknownStep(StepId),
    #[error("a workflow needs at least one step")]
    EmptyWorkflow,
    #[error("step {step} has no assignee")]
    MissingAssignee { step: String },
    #[error("step {0} is already resolved")]
    StepAlreadyResolved(StepId),
    #[error("step {0} is not actionable")]
    StepNotActionable(StepId),
    #[error("workflow was modified concurrently")]
    ConcurrentModification,
    #[error(transparent)]
    Storage(StorageError),
}

impl WorkflowError {
    fn from_storage(error: StorageError) -> Self {
        match error {
            StorageError::RevisionConflict => Self::ConcurrentModification,
            StorageError::NotFound => Self::UnknownWorkflow,
            other => Self::Storage(other),
        }
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

/// Service driving ordered review sequences to a terminal outcome. A single
/// rejection settles the whole instance immediately; a return settles it as
/// `ReturnedForRevision`, after which a fresh instance must be started.
pub struct ApprovalEngine<R> {
    repository: Arc<R>,
}

impl<R> ApprovalEngine<R>
where
    R: WorkflowRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Starts a workflow instance with its steps pending. Step order is the
    /// order given; the sequential policy releases them one at a time.
    pub fn start(
        &self,
        new: NewWorkflow,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Workflow>, WorkflowError> {
        if new.steps.is_empty() {
            return Err(WorkflowError::EmptyWorkflow);
        }
        if let Some(blank) = new.steps.iter().find(|step| step.assignee.trim().is_empty()) {
            return Err(WorkflowError::MissingAssignee {
                step: blank.name.clone(),
            });
        }

        let steps = new
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| WorkflowStep {
                id: StepId(token("stp")),
                sequence: index as u32 + 1,
                name: step.name,
                assignee: step.assignee,
                state: StepState::Pending,
            })
            .collect();

        let workflow = Workflow {
            id: WorkflowId(token("wfl")),
            name: new.name,
            kind: new.kind,
            target: new.target,
            policy: new.policy,
            status: WorkflowStatus::InProgress,
            steps,
            started_by: new.started_by,
            started_at: now,
            settled_at: None,
        };

        self.repository
            .insert(workflow)
            .map_err(WorkflowError::from_storage)
    }

    /// Records a reviewer's terminal action on a step and re-derives the
    /// workflow outcome. Fails when the step is already resolved, was
    /// skipped by an earlier short-circuit, or is still locked behind an
    /// unresolved predecessor under the sequential policy.
    pub fn complete_step(
        &self,
        step_id: &StepId,
        action: StepAction,
        comments: Option<String>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Workflow>, WorkflowError> {
        let Versioned {
            record: mut workflow,
            revision,
        } = self
            .repository
            .find_by_step(step_id)
            .map_err(WorkflowError::from_storage)?
            .ok_or_else(|| WorkflowError::UnknownStep(step_id.clone()))?;

        if workflow.is_settled() {
            return Err(WorkflowError::StepNotActionable(step_id.clone()));
        }

        let index = workflow
            .steps
            .iter()
            .position(|step| &step.id == step_id)
            .ok_or_else(|| WorkflowError::UnknownStep(step_id.clone()))?;

        match workflow.steps[index].state {
            StepState::Resolved { .. } => {
                return Err(WorkflowError::StepAlreadyResolved(step_id.clone()))
            }
            StepState::Skipped => return Err(WorkflowError::StepNotActionable(step_id.clone())),
            StepState::Pending => {}
        }

        if workflow.policy == CompletionPolicy::Sequential
            && workflow.steps[..index].iter().any(|step| !step.is_resolved())
        {
            return Err(WorkflowError::StepNotActionable(step_id.clone()));
        }

        workflow.steps[index].state = StepState::Resolved {
            action,
            actor: actor.to_string(),
            comments,
            completed_at: now,
        };

        match action {
            StepAction::Rejected => workflow.settle(WorkflowStatus::Rejected, now),
            StepAction::Returned => workflow.settle(WorkflowStatus::ReturnedForRevision, now),
            StepAction::Approved => {
                let all_approved = workflow
                    .steps
                    .iter()
                    .all(|step| step.action() == Some(StepAction::Approved));
                if all_approved {
                    workflow.settle(WorkflowStatus::Approved, now);
                }
            }
        }

        self.repository
            .update(workflow, revision)
            .map_err(WorkflowError::from_storage)
    }

    pub fn get(&self, id: &WorkflowId) -> Result<Versioned<Workflow>, WorkflowError> {
        self.repository
            .fetch(id)
            .map_err(WorkflowError::from_storage)?
            .ok_or(WorkflowError::UnknownWorkflow)
    }

    pub fn status(&self, id: &WorkflowId) -> Result<WorkflowStatus, WorkflowError> {
        Ok(self.get(id)?.record.status)
    }

    /// Every instance ever started against the target, oldest first.
    pub fn find_for_target(
        &self,
        target: &WorkflowTarget,
    ) -> Result<Vec<Versioned<Workflow>>, WorkflowError> {
        self.repository
            .list_for_target(target)
            .map_err(WorkflowError::from_storage)
    }
}
