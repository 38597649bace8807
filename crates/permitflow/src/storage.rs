//! Types shared by every repository boundary.

use serde::{Deserialize, Serialize};

/// Revision-stamped envelope handed back by repository reads and writes.
///
/// The revision is an opaque optimistic-concurrency token. Writers pass the
/// revision they read back to `update`; a stale token means another writer
/// got there first and the update is refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub record: T,
    pub revision: u64,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("record already exists")]
    AlreadyExists,
    #[error("record not found")]
    NotFound,
    #[error("stored revision does not match the expected revision")]
    RevisionConflict,
    #[error("storage operation timed out")]
    Timeout,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
