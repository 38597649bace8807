//! Core engine for regulatory submission tracking: authority reference data,
//! the submission state machine, fee calculation, the document version store,
//! sharing, and internal approval workflows.

pub mod approvals;
pub mod calendar;
pub mod config;
pub mod directory;
pub mod documents;
pub mod error;
pub mod storage;
pub mod submissions;
pub mod telemetry;
