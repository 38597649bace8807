//! Document management: append-only version chains, review comments, and
//! recipient-scoped sharing.
//!
//! A document's history is never rewritten. Uploads append versions, a
//! restore copies an earlier version forward under a new number, archiving
//! flips a flag and leaves everything readable. Shares are separate records
//! so each grant carries its own expiry, password, and revocation.

pub mod domain;
pub mod repository;
pub mod router;
pub mod sharing;
pub mod store;

pub use domain::{
    CommentAnchor, CommentId, CommentKind, Document, DocumentComment, DocumentId, DocumentOwner,
    DocumentShare, DocumentStatus, DocumentVersion, NewComment, NewDocument, NewShare, NewVersion,
    PermissionLevel, ShareAccess, ShareId, ShareRecipient, ShareState, ShareView, VersionId,
};
pub use repository::{DocumentRepository, ShareRepository};
pub use router::{document_router, DocumentRoutes};
pub use sharing::{ShareError, ShareManager};
pub use store::{DocumentStore, StoreError};
