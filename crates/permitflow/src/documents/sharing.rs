use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::storage::{StorageError, Versioned};

use super::domain::{DocumentId, DocumentShare, NewShare, ShareAccess, ShareId, ShareState};
use super::repository::ShareRepository;

/// Error raised by the share manager.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("share not found")]
    UnknownShare,
    #[error("share has been revoked")]
    Revoked,
    #[error("share has expired")]
    Expired,
    #[error("share requires the correct password")]
    PasswordRequired,
    #[error("share was modified concurrently")]
    ConcurrentModification,
    #[error(transparent)]
    Storage(StorageError),
}

impl ShareError {
    fn from_storage(error: StorageError) -> Self {
        match error {
            StorageError::RevisionConflict => Self::ConcurrentModification,
            StorageError::NotFound => Self::UnknownShare,
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

fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Service owning document shares. Each grant is an independent record with
/// its own revocation, expiry, and optional password; passwords are digested
/// before storage and never kept in cleartext.
pub struct ShareManager<R> {
    repository: Arc<R>,
}

impl<R> ShareManager<R>
where
    R: ShareRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Grants access to a document. Granting the same document to the same
    /// recipient twice leaves two independently revocable shares.
    pub fn grant(
        &self,
        document: &DocumentId,
        new: NewShare,
        now: DateTime<Utc>,
    ) -> Result<Versioned<DocumentShare>, ShareError> {
        let share = DocumentShare {
            id: ShareId(token("shr")),
            document_id: document.clone(),
            recipient: new.recipient,
            level: new.level,
            granted_by: new.granted_by,
            created_at: now,
            expires_at: new.expires_at,
            password_digest: new.password.as_deref().map(password_digest),
            state: ShareState::Active,
        };

        self.repository
            .insert(share)
            .map_err(ShareError::from_storage)
    }

    pub fn get(&self, id: &ShareId) -> Result<Versioned<DocumentShare>, ShareError> {
        self.repository
            .fetch(id)
            .map_err(ShareError::from_storage)?
            .ok_or(ShareError::UnknownShare)
    }

    /// Every share ever granted on the document, revoked ones included.
    pub fn list_for_document(
        &self,
        document: &DocumentId,
    ) -> Result<Vec<Versioned<DocumentShare>>, ShareError> {
        self.repository
            .list_for_document(document)
            .map_err(ShareError::from_storage)
    }

    /// Permanently revokes a grant. Revoking an already-revoked share is a
    /// no-op, so cleanup jobs can re-run safely.
    pub fn revoke(
        &self,
        id: &ShareId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Versioned<DocumentShare>, ShareError> {
        let versioned = self.get(id)?;
        if versioned.record.is_revoked() {
            return Ok(versioned);
        }

        let Versioned {
            record: mut share,
            revision,
        } = versioned;
        share.state = ShareState::Revoked {
            reason,
            revoked_at: now,
        };

        self.repository
            .update(share, revision)
            .map_err(ShareError::from_storage)
    }

    /// Validates a bearer's access. Revocation is checked before expiry and
    /// expiry before the password; a bad password and a missing one read the
    /// same, so the bearer learns nothing about the stored secret.
    pub fn check_access(
        &self,
        id: &ShareId,
        password: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ShareAccess, ShareError> {
        let share = self.get(id)?.record;

        if share.is_revoked() {
            return Err(ShareError::Revoked);
        }
        if share.is_expired(now) {
            return Err(ShareError::Expired);
        }
        if let Some(digest) = &share.password_digest {
            match password {
                Some(supplied) if &password_digest(supplied) == digest => {}
                _ => return Err(ShareError::PasswordRequired),
            }
        }

        Ok(ShareAccess {
            document_id: share.document_id,
            level: share.level,
        })
    }
}
