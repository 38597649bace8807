use crate::storage::{StorageError, Versioned};

use super::domain::{StepId, Workflow, WorkflowId, WorkflowTarget};

/// Storage abstraction over the workflow aggregate (instance plus steps).
/// `update` is a compare-and-swap on the revision read earlier, which is how
/// two reviewers are kept from both resolving the same step.
/// `list_for_target` returns instances in start order, oldest first, so the
/// most recent instance is last.
pub trait WorkflowRepository: Send + Sync {
    fn insert(&self, workflow: Workflow) -> Result<Versioned<Workflow>, StorageError>;
    fn fetch(&self, id: &WorkflowId) -> Result<Option<Versioned<Workflow>>, StorageError>;
    fn find_by_step(&self, step: &StepId) -> Result<Option<Versioned<Workflow>>, StorageError>;
    fn list_for_target(
        &self,
        target: &WorkflowTarget,
    ) -> Result<Vec<Versioned<Workflow>>, StorageError>;
    fn update(
        &self,
        workflow: Workflow,
        expected_revision: u64,
    ) -> Result<Versioned<Workflow>, StorageError>;
}
