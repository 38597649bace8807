use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::storage::{StorageError, Versioned};

use super::domain::{
    CommentId, Document, DocumentComment, DocumentId, DocumentStatus, DocumentVersion, NewComment,
    NewDocument, NewVersion, VersionId,
};
use super::repository::DocumentRepository;

/// Error raised by the document version store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,
    #[error("version {0} does not belong to this document")]
    VersionNotFound(VersionId),
    #[error("document is archived and accepts no new versions")]
    Archived,
    #[error("comment {0} does not belong to this document")]
    UnknownComment(CommentId),
    #[error("comment {0} is already resolved")]
    CommentAlreadyResolved(CommentId),
    #[error("'{0}' is not a valid content type")]
    InvalidContentType(String),
    #[error("document was modified concurrently")]
    ConcurrentModification,
    #[error(transparent)]
    Storage(StorageError),
}

impl StoreError {
    fn from_storage(error: StorageError) -> Self {
        match error {
            StorageError::RevisionConflict => Self::ConcurrentModification,
            StorageError::NotFound => Self::NotFound,
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

fn checked_content_type(raw: &str) -> Result<String, StoreError> {
    let trimmed = raw.trim();
    trimmed
        .parse::<mime::Mime>()
        .map(|_| trimmed.to_string())
        .map_err(|_| StoreError::InvalidContentType(raw.to_string()))
}

/// Service owning the append-only version chain of each document. History
/// is never rewritten: uploads append, restores copy forward, archiving
/// flips a flag.
pub struct DocumentStore<R> {
    repository: Arc<R>,
}

impl<R> DocumentStore<R>
where
    R: DocumentRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Creates a document with its initial version (revision label 1).
    pub fn create(
        &self,
        new: NewDocument,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Document>, StoreError> {
        let initial = self.build_version(1, new.content, now)?;
        let document = Document {
            id: DocumentId(token("doc")),
            title: new.title,
            kind: new.kind,
            owner: new.owner,
            status: DocumentStatus::Active,
            tags: new.tags,
            created_at: now,
            current_version: initial.id.clone(),
            versions: vec![initial],
            comments: Vec::new(),
        };

        self.repository
            .insert(document)
            .map_err(StoreError::from_storage)
    }

    pub fn get(&self, id: &DocumentId) -> Result<Versioned<Document>, StoreError> {
        self.repository
            .fetch(id)
            .map_err(StoreError::from_storage)?
            .ok_or(StoreError::NotFound)
    }

    /// Appends a new version and moves the current-version pointer. Prior
    /// versions are untouched.
    pub fn upload_version(
        &self,
        id: &DocumentId,
        new: NewVersion,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Document>, StoreError> {
        let Versioned {
            record: mut document,
            revision,
        } = self.get(id)?;

        if document.is_archived() {
            return Err(StoreError::Archived);
        }

        let version = self.build_version(document.next_version_number(), new, now)?;
        document.current_version = version.id.clone();
        document.versions.push(version);

        self.repository
            .update(document, revision)
            .map_err(StoreError::from_storage)
    }

    /// Restores an earlier version by appending a new one whose content
    /// reference is copied from the target. The revision sequence keeps
    /// counting forward; nothing is rewritten or deleted.
    pub fn restore(
        &self,
        id: &DocumentId,
        version_id: &VersionId,
        restored_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Document>, StoreError> {
        let Versioned {
            record: mut document,
            revision,
        } = self.get(id)?;

        if document.is_archived() {
            return Err(StoreError::Archived);
        }

        let target = document
            .version(version_id)
            .ok_or_else(|| StoreError::VersionNotFound(version_id.clone()))?;

        let restored = DocumentVersion {
            id: VersionId(token("ver")),
            number: document.next_version_number(),
            content_reference: target.content_reference.clone(),
            content_type: target.content_type.clone(),
            uploaded_by: restored_by.to_string(),
            uploaded_at: now,
            notes: Some(format!("restored from version {}", target.number)),
        };
        document.current_version = restored.id.clone();
        document.versions.push(restored);

        self.repository
            .update(document, revision)
            .map_err(StoreError::from_storage)
    }

    /// All versions in creation order.
    pub fn list_versions(&self, id: &DocumentId) -> Result<Vec<DocumentVersion>, StoreError> {
        Ok(self.get(id)?.record.versions)
    }

    /// Flips the document to archived. Archiving an archived document is a
    /// no-op; the version chain stays readable either way.
    pub fn archive(&self, id: &DocumentId) -> Result<Versioned<Document>, StoreError> {
        let versioned = self.get(id)?;
        if versioned.record.is_archived() {
            return Ok(versioned);
        }

        let Versioned {
            record: mut document,
            revision,
        } = versioned;
        document.status = DocumentStatus::Archived;

        self.repository
            .update(document, revision)
            .map_err(StoreError::from_storage)
    }

    pub fn add_comment(
        &self,
        id: &DocumentId,
        new: NewComment,
        now: DateTime<Utc>,
    ) -> Result<DocumentComment, StoreError> {
        let Versioned {
            record: mut document,
            revision,
        } = self.get(id)?;

        if let Some(reply_to) = &new.reply_to {
            if document.comment(reply_to).is_none() {
                return Err(StoreError::UnknownComment(reply_to.clone()));
            }
        }

        let comment = DocumentComment {
            id: CommentId(token("cmt")),
            author: new.author,
            body: new.body,
            kind: new.kind,
            anchor: new.anchor,
            reply_to: new.reply_to,
            created_at: now,
            resolved: false,
            resolved_by: None,
            resolved_at: None,
        };
        document.comments.push(comment.clone());

        self.repository
            .update(document, revision)
            .map_err(StoreError::from_storage)?;
        Ok(comment)
    }

    /// Marks a comment resolved. Resolution never reverses; resolving an
    /// already-resolved comment is rejected to keep the trail honest.
    pub fn resolve_comment(
        &self,
        id: &DocumentId,
        comment_id: &CommentId,
        resolved_by: &str,
        now: DateTime<Utc>,
    ) -> Result<DocumentComment, StoreError> {
        let Versioned {
            record: mut document,
            revision,
        } = self.get(id)?;

        let comment = document
            .comments
            .iter_mut()
            .find(|comment| &comment.id == comment_id)
            .ok_or_else(|| StoreError::UnknownComment(comment_id.clone()))?;

        if comment.resolved {
            return Err(StoreError::CommentAlreadyResolved(comment_id.clone()));
        }
        comment.resolved = true;
        comment.resolved_by = Some(resolved_by.to_string());
        comment.resolved_at = Some(now);
        let resolved = comment.clone();

        self.repository
            .update(document, revision)
            .map_err(StoreError::from_storage)?;
        Ok(resolved)
    }

    fn build_version(
        &self,
        number: u32,
        new: NewVersion,
        now: DateTime<Utc>,
    ) -> Result<DocumentVersion, StoreError> {
        Ok(DocumentVersion {
            id: VersionId(token("ver")),
            number,
            content_reference: new.content_reference,
            content_type: checked_content_type(&new.content_type)?,
            uploaded_by: new.uploaded_by,
            uploaded_at: now,
            notes: new.notes,
        })
    }
}
