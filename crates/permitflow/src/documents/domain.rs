use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::DocumentKind;
use crate::submissions::domain::{ProjectId, SubmissionId};

/// Identifier wrapper for logical documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for immutable document versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionId(pub String);

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for document comments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentId(pub String);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for document shares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShareId(pub String);

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entity a document belongs to. Submission-owned documents count toward
/// the owning submission's required-document check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DocumentOwner {
    Submission(SubmissionId),
    Project(ProjectId),
    Standalone,
}

/// Soft lifecycle flag. Archiving blocks new versions but never deletes
/// history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Active,
    Archived,
}

impl DocumentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentStatus::Active => "active",
            DocumentStatus::Archived => "archived",
        }
    }
}

/// Immutable snapshot of uploaded content. The content reference points
/// into the external blob store; this record never carries bytes. Once
/// written, neither the reference nor the version number changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: VersionId,
    pub number: u32,
    pub content_reference: String,
    pub content_type: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Comment classification used by review tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    General,
    Markup,
    ChangeRequest,
}

/// Optional page/position anchor for drawing markups. Coordinates are
/// percentages of the rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommentAnchor {
    pub page: u32,
    pub x_pct: f32,
    pub y_pct: f32,
}

/// Threaded annotation on a document. Resolution is monotonic: a resolved
/// comment stays resolved; follow-up concerns get a new comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentComment {
    pub id: CommentId,
    pub author: String,
    pub body: String,
    pub kind: CommentKind,
    pub anchor: Option<CommentAnchor>,
    pub reply_to: Option<CommentId>,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// A logical file resource owning its append-only version chain. The
/// aggregate (document, versions, comments) is stored and updated as one
/// record so a version append is a single write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub kind: DocumentKind,
    pub owner: DocumentOwner,
    pub status: DocumentStatus,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub current_version: VersionId,
    pub versions: Vec<DocumentVersion>,
    pub comments: Vec<DocumentComment>,
}

impl Document {
    pub fn version(&self, id: &VersionId) -> Option<&DocumentVersion> {
        self.versions.iter().find(|version| &version.id == id)
    }

    /// The version the current-version pointer names.
    pub fn head(&self) -> Option<&DocumentVersion> {
        self.version(&self.current_version)
    }

    /// Next label in the monotonic revision sequence.
    pub fn next_version_number(&self) -> u32 {
        self.versions
            .iter()
            .map(|version| version.number)
            .max()
            .unwrap_or(0)
            + 1
    }

    pub fn comment(&self, id: &CommentId) -> Option<&DocumentComment> {
        self.comments.iter().find(|comment| &comment.id == id)
    }

    pub fn is_archived(&self) -> bool {
        self.status == DocumentStatus::Archived
    }
}

/// Caller input for a version append (and for the initial version).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVersion {
    pub content_reference: String,
    pub content_type: String,
    pub uploaded_by: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Caller input for creating a document with its first version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub kind: DocumentKind,
    pub owner: DocumentOwner,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: NewVersion,
}

/// Caller input for a new comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub author: String,
    pub body: String,
    pub kind: CommentKind,
    #[serde(default)]
    pub anchor: Option<CommentAnchor>,
    #[serde(default)]
    pub reply_to: Option<CommentId>,
}

/// Who a share is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ShareRecipient {
    User(String),
    Email(String),
}

impl fmt::Display for ShareRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareRecipient::User(id) => write!(f, "user:{id}"),
            ShareRecipient::Email(address) => write!(f, "email:{address}"),
        }
    }
}

/// Access level granted by a share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    View,
    Comment,
    Edit,
}

impl PermissionLevel {
    pub const fn label(self) -> &'static str {
        match self {
            PermissionLevel::View => "view",
            PermissionLevel::Comment => "comment",
            PermissionLevel::Edit => "edit",
        }
    }
}

/// Revocation is permanent; a revoked share is never reactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ShareState {
    Active,
    Revoked {
        reason: Option<String>,
        revoked_at: DateTime<Utc>,
    },
}

/// A grant of access to one document for one recipient. Concurrent grants
/// to the same recipient stay independent so revoking one never silently
/// affects another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentShare {
    pub id: ShareId,
    pub document_id: DocumentId,
    pub recipient: ShareRecipient,
    pub level: PermissionLevel,
    pub granted_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub password_digest: Option<String>,
    pub state: ShareState,
}

impl DocumentShare {
    pub fn is_revoked(&self) -> bool {
        matches!(self.state, ShareState::Revoked { .. })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }
}

/// Caller input for granting a share. The password, when present, is
/// digested before storage and never kept in cleartext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShare {
    pub recipient: ShareRecipient,
    pub level: PermissionLevel,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub password: Option<String>,
    pub granted_by: String,
}

/// What a successful access check discloses to the bearer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareAccess {
    pub document_id: DocumentId,
    pub level: PermissionLevel,
}

/// Sanitized share representation for API responses. The password digest
/// never leaves storage; only its presence is disclosed.
#[derive(Debug, Clone, Serialize)]
pub struct ShareView {
    pub id: ShareId,
    pub document_id: DocumentId,
    pub recipient: ShareRecipient,
    pub level: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub password_protected: bool,
    pub revoked: bool,
}

impl ShareView {
    pub fn of(share: &DocumentShare) -> Self {
        Self {
            id: share.id.clone(),
            document_id: share.document_id.clone(),
            recipient: share.recipient.clone(),
            level: share.level.label(),
            expires_at: share.expires_at,
            password_protected: share.password_digest.is_some(),
            revoked: share.is_revoked(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).single().expect("valid instant")
    }

    fn share(expires_at: Option<DateTime<Utc>>) -> DocumentShare {
        DocumentShare {
            id: ShareId("shr-1".to_string()),
            document_id: DocumentId("doc-1".to_string()),
            recipient: ShareRecipient::Email("client@example.com".to_string()),
            level: PermissionLevel::View,
            granted_by: "arch.lee".to_string(),
            created_at: instant(8),
            expires_at,
            password_digest: None,
            state: ShareState::Active,
        }
    }

    #[test]
    fn share_without_expiry_never_expires() {
        assert!(!share(None).is_expired(instant(23)));
    }

    #[test]
    fn share_expires_at_the_exact_instant() {
        let share = share(Some(instant(12)));
        assert!(!share.is_expired(instant(11)));
        assert!(share.is_expired(instant(12)));
        assert!(share.is_expired(instant(13)));
    }

    #[test]
    fn version_numbers_continue_the_sequence() {
        let first = DocumentVersion {
            id: VersionId("ver-1".to_string()),
            number: 1,
            content_reference: "blob://plans/rev-a".to_string(),
            content_type: "application/pdf".to_string(),
            uploaded_by: "arch.lee".to_string(),
            uploaded_at: instant(8),
            notes: None,
        };
        let document = Document {
            id: DocumentId("doc-1".to_string()),
            title: "Tower A plans".to_string(),
            kind: crate::directory::DocumentKind::ArchitecturalPlan,
            owner: DocumentOwner::Standalone,
            status: DocumentStatus::Active,
            tags: Vec::new(),
            created_at: instant(8),
            current_version: first.id.clone(),
            versions: vec![first],
            comments: Vec::new(),
        };

        assert_eq!(document.next_version_number(), 2);
        assert_eq!(document.head().map(|version| version.number), Some(1));
    }
}
