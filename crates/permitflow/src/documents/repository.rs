use crate::storage::{StorageError, Versioned};

use super::domain::{Document, DocumentId, DocumentOwner, DocumentShare, ShareId};

/// Storage abstraction over the document aggregate (record, version chain,
/// comments) so the store can be exercised in isolation. `update` is a
/// compare-and-swap on the revision read earlier; a stale revision fails
/// with [`StorageError::RevisionConflict`].
pub trait DocumentRepository: Send + Sync {
    fn insert(&self, document: Document) -> Result<Versioned<Document>, StorageError>;
    fn fetch(&self, id: &DocumentId) -> Result<Option<Versioned<Document>>, StorageError>;
    fn list_for_owner(&self, owner: &DocumentOwner)
        -> Result<Vec<Versioned<Document>>, StorageError>;
    fn update(
        &self,
        document: Document,
        expected_revision: u64,
    ) -> Result<Versioned<Document>, StorageError>;
}

/// Storage abstraction for shares. Shares are separate records so two
/// grants on one document revoke independently.
pub trait ShareRepository: Send + Sync {
    fn insert(&self, share: DocumentShare) -> Result<Versioned<DocumentShare>, StorageError>;
    fn fetch(&self, id: &ShareId) -> Result<Option<Versioned<DocumentShare>>, StorageError>;
    fn list_for_document(
        &self,
        document: &DocumentId,
    ) -> Result<Vec<Versioned<DocumentShare>>, StorageError>;
    fn update(
        &self,
        share: DocumentShare,
        expected_revision: u64,
    ) -> Result<Versioned<DocumentShare>, StorageError>;
}
