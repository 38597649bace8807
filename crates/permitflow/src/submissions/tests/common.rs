use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::approvals::{Workflow, WorkflowId, WorkflowRepository, WorkflowTarget};
use crate::approvals::domain::StepId;
use crate::directory::{AuthorityDirectory, AuthorityId, CategoryId, DocumentKind};
use crate::documents::domain::{
    Document, DocumentId, DocumentOwner, DocumentStatus, DocumentVersion, VersionId,
};
use crate::documents::repository::DocumentRepository;
use crate::storage::{StorageError, Versioned};
use crate::submissions::domain::{NewSubmission, ProjectId, Submission, SubmissionId};
use crate::submissions::repository::SubmissionRepository;
use crate::submissions::service::SubmissionLifecycle;

pub(super) type Lifecycle =
    SubmissionLifecycle<MemorySubmissions, MemoryDocuments, MemoryWorkflows>;

pub(super) fn build_lifecycle() -> (
    Arc<Lifecycle>,
    Arc<MemorySubmissions>,
    Arc<MemoryDocuments>,
    Arc<MemoryWorkflows>,
) {
    let submissions = Arc::new(MemorySubmissions::default());
    let documents = Arc::new(MemoryDocuments::default());
    let workflows = Arc::new(MemoryWorkflows::default());
    let service = Arc::new(SubmissionLifecycle::new(
        submissions.clone(),
        documents.clone(),
        workflows.clone(),
        Arc::new(AuthorityDirectory::builtin()),
    ));
    (service, submissions, documents, workflows)
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(day: NaiveDate, hour: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(hour, 0, 0).expect("valid time"))
}

/// Monday 2024-03-04, a plain business day.
pub(super) fn creation_day() -> NaiveDate {
    date(2024, 3, 4)
}

pub(super) fn draft_request() -> NewSubmission {
    NewSubmission {
        project_id: ProjectId("proj-riverside".to_string()),
        authority_id: AuthorityId("mbpj".to_string()),
        category_id: CategoryId("renovation-permit".to_string()),
        title: "Riverside penthouse renovation".to_string(),
        expedited: false,
        created_by: "arch.lee".to_string(),
    }
}

pub(super) fn plan_document(owner: &SubmissionId, kind: DocumentKind) -> Document {
    let version = DocumentVersion {
        id: VersionId(format!("ver-{}-{}", owner.0, kind.label())),
        number: 1,
        content_reference: format!("blob://plans/{}/{}", owner.0, kind.label()),
        content_type: "application/pdf".to_string(),
        uploaded_by: "arch.lee".to_string(),
        uploaded_at: at(creation_day(), 8),
        notes: None,
    };
    Document {
        id: DocumentId(format!("doc-{}-{}", owner.0, kind.label())),
        title: format!("{} set", kind.label()),
        kind,
        owner: DocumentOwner::Submission(owner.clone()),
        status: DocumentStatus::Active,
        tags: Vec::new(),
        created_at: at(creation_day(), 8),
        current_version: version.id.clone(),
        versions: vec![version],
        comments: Vec::new(),
    }
}

pub(super) fn attach_required_documents(
    documents: &MemoryDocuments,
    owner: &SubmissionId,
    category: &CategoryId,
) {
    let directory = AuthorityDirectory::builtin();
    let category = directory.category(category).expect("builtin category");
    for kind in &category.required_documents {
        documents
            .insert(plan_document(owner, *kind))
            .expect("document insert");
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
pub(super) struct MemorySubmissions {
    records: Mutex<HashMap<SubmissionId, Versioned<Submission>>>,
}

impl SubmissionRepository for MemorySubmissions {
    fn insert(&self, submission: Submission) -> Result<Versioned<Submission>, StorageError> {
        let mut guard = self.records.lock().expect("submission mutex poisoned");
        if guard.contains_key(&submission.id) {
            return Err(StorageError::AlreadyExists);
        }
        let versioned = Versioned {
            record: submission,
            revision: 1,
        };
        guard.insert(versioned.record.id.clone(), versioned.clone());
        Ok(versioned)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<Versioned<Submission>>, StorageError> {
        let guard = self.records.lock().expect("submission mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_for_project(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<Versioned<Submission>>, StorageError> {
        let guard = self.records.lock().expect("submission mutex poisoned");
        let mut matching: Vec<Versioned<Submission>> = guard
            .values()
            .filter(|versioned| &versioned.record.project_id == project)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.record.created_at.cmp(&b.record.created_at));
        Ok(matching)
    }

    fn update(
        &self,
        submission: Submission,
        expected_revision: u64,
    ) -> Result<Versioned<Submission>, StorageError> {
        let mut guard = self.records.lock().expect("submission mutex poisoned");
        let slot = guard
            .get_mut(&submission.id)
            .ok_or(StorageError::NotFound)?;
        if slot.revision != expected_revision {
            return Err(StorageError::RevisionConflict);
        }
        *slot = Versioned {
            record: submission,
            revision: expected_revision + 1,
        };
        Ok(slot.clone())
    }
}

#[derive(Default)]
pub(super) struct MemoryDocuments {
    records: Mutex<HashMap<DocumentId, Versioned<Document>>>,
}

impl DocumentRepository for MemoryDocuments {
    fn insert(&self, document: Document) -> Result<Versioned<Document>, StorageError> {
        let mut guard = self.records.lock().expect("document mutex poisoned");
        if guard.contains_key(&document.id) {
            return Err(StorageError::AlreadyExists);
        }
        let versioned = Versioned {
            record: document,
            revision: 1,
        };
        guard.insert(versioned.record.id.clone(), versioned.clone());
        Ok(versioned)
    }

    fn fetch(&self, id: &DocumentId) -> Result<Option<Versioned<Document>>, StorageError> {
        let guard = self.records.lock().expect("document mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_for_owner(
        &self,
        owner: &DocumentOwner,
    ) -> Result<Vec<Versioned<Document>>, StorageError> {
        let guard = self.records.lock().expect("document mutex poisoned");
        let mut matching: Vec<Versioned<Document>> = guard
            .values()
            .filter(|versioned| &versioned.record.owner == owner)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.record.id.cmp(&b.record.id));
        Ok(matching)
    }

    fn update(
        &self,
        document: Document,
        expected_revision: u64,
    ) -> Result<Versioned<Document>, StorageError> {
        let mut guard = self.records.lock().expect("document mutex poisoned");
        let slot = guard.get_mut(&document.id).ok_or(StorageError::NotFound)?;
        if slot.revision != expected_revision {
            return Err(StorageError::RevisionConflict);
        }
        *slot = Versioned {
            record: document,
            revision: expected_revision + 1,
        };
        Ok(slot.clone())
    }
}

#[derive(Default)]
pub(super) struct MemoryWorkflows {
    records: Mutex<HashMap<WorkflowId, Versioned<Workflow>>>,
}

impl WorkflowRepository for MemoryWorkflows {
    fn insert(&self, workflow: Workflow) -> Result<Versioned<Workflow>, StorageError> {
        let mut guard = self.records.lock().expect("workflow mutex poisoned");
        if guard.contains_key(&workflow.id) {
            return Err(StorageError::AlreadyExists);
        }
        let versioned = Versioned {
            record: workflow,
            revision: 1,
        };
        guard.insert(versioned.record.id.clone(), versioned.clone());
        Ok(versioned)
    }

    fn fetch(&self, id: &WorkflowId) -> Result<Option<Versioned<Workflow>>, StorageError> {
        let guard = self.records.lock().expect("workflow mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_step(&self, step: &StepId) -> Result<Option<Versioned<Workflow>>, StorageError> {
        let guard = self.records.lock().expect("workflow mutex poisoned");
        Ok(guard
            .values()
            .find(|versioned| versioned.record.step(step).is_some())
            .cloned())
    }

    fn list_for_target(
        &self,
        target: &WorkflowTarget,
    ) -> Result<Vec<Versioned<Workflow>>, StorageError> {
        let guard = self.records.lock().expect("workflow mutex poisoned");
        let mut matching: Vec<Versioned<Workflow>> = guard
            .values()
            .filter(|versioned| &versioned.record.target == target)
            .cloned()
            .collect();
        matching.sort_by_key(|versioned| versioned.record.started_at);
        Ok(matching)
    }

    fn update(
        &self,
        workflow: Workflow,
        expected_revision: u64,
    ) -> Result<Versioned<Workflow>, StorageError> {
        let mut guard = self.records.lock().expect("workflow mutex poisoned");
        let slot = guard.get_mut(&workflow.id).ok_or(StorageError::NotFound)?;
        if slot.revision != expected_revision {
            return Err(StorageError::RevisionConflict);
        }
        *slot = Versioned {
            record: workflow,
            revision: expected_revision + 1,
        };
        Ok(slot.clone())
    }
}

/// Repository whose writes always lose the compare-and-swap, for driving the
/// conflict paths deterministically. Inserts and reads pass through.
#[derive(Default)]
pub(super) struct ContestedSubmissions {
    inner: MemorySubmissions,
}

impl SubmissionRepository for ContestedSubmissions {
    fn insert(&self, submission: Submission) -> Result<Versioned<Submission>, StorageError> {
        self.inner.insert(submission)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<Versioned<Submission>>, StorageError> {
        self.inner.fetch(id)
    }

    fn list_for_project(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<Versioned<Submission>>, StorageError> {
        self.inner.list_for_project(project)
    }

    fn update(
        &self,
        _submission: Submission,
        _expected_revision: u64,
    ) -> Result<Versioned<Submission>, StorageError> {
        Err(StorageError::RevisionConflict)
    }
}

/// Repository that is offline for every call.
pub(super) struct UnavailableSubmissions;

impl SubmissionRepository for UnavailableSubmissions {
    fn insert(&self, _submission: Submission) -> Result<Versioned<Submission>, StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &SubmissionId) -> Result<Option<Versioned<Submission>>, StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }

    fn list_for_project(
        &self,
        _project: &ProjectId,
    ) -> Result<Vec<Versioned<Submission>>, StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }

    fn update(
        &self,
        _submission: Submission,
        _expected_revision: u64,
    ) -> Result<Versioned<Submission>, StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }
}
