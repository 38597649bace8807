//! Multi-step approval workflows for documents and submissions.
//!
//! A workflow is an ordered list of reviewer steps driven to a single terminal
//! outcome. Approval requires every step; a rejection or a return settles the
//! instance immediately and skips whatever was still pending. Settled
//! instances are immutable history. A revision cycle starts a fresh instance
//! against the same target.

pub mod domain;
pub mod engine;
pub mod repository;
pub mod router;

pub use domain::{
    CompletionPolicy, NewStep, NewWorkflow, StepAction, StepId, StepState, Workflow, WorkflowId,
    WorkflowKind, WorkflowStatus, WorkflowStep, WorkflowTarget,
};
pub use engine::{ApprovalEngine, WorkflowError};
pub use repository::WorkflowRepository;
pub use router::approval_router;
