use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use permitflow::approvals::{StepId, Workflow, WorkflowId, WorkflowRepository, WorkflowTarget};
use permitflow::documents::{
    Document, DocumentId, DocumentOwner, DocumentRepository, DocumentShare, ShareId,
    ShareRepository,
};
use permitflow::storage::{StorageError, Versioned};
use permitflow::submissions::{ProjectId, Submission, SubmissionId, SubmissionRepository};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySubmissionRepository {
    records: Arc<Mutex<HashMap<SubmissionId, Versioned<Submission>>>>,
}

impl SubmissionRepository for InMemorySubmissionRepository {
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

#[derive(Default, Clone)]
pub(crate) struct InMemoryDocumentRepository {
    records: Arc<Mutex<HashMap<DocumentId, Versioned<Document>>>>,
}

impl DocumentRepository for InMemoryDocumentRepository {
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

#[derive(Default, Clone)]
pub(crate) struct InMemoryWorkflowRepository {
    records: Arc<Mutex<HashMap<WorkflowId, Versioned<Workflow>>>>,
}

impl WorkflowRepository for InMemoryWorkflowRepository {
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

#[derive(Default, Clone)]
pub(crate) struct InMemoryShareRepository {
    records: Arc<Mutex<HashMap<ShareId, Versioned<DocumentShare>>>>,
}

impl ShareRepository for InMemoryShareRepository {
    fn insert(&self, share: DocumentShare) -> Result<Versioned<DocumentShare>, StorageError> {
        let mut guard = self.records.lock().expect("share mutex poisoned");
        if guard.contains_key(&share.id) {
            return Err(StorageError::AlreadyExists);
        }
        let versioned = Versioned {
            record: share,
            revision: 1,
        };
        guard.insert(versioned.record.id.clone(), versioned.clone());
        Ok(versioned)
    }

    fn fetch(&self, id: &ShareId) -> Result<Option<Versioned<DocumentShare>>, StorageError> {
        let guard = self.records.lock().expect("share mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_for_document(
        &self,
        document: &DocumentId,
    ) -> Result<Vec<Versioned<DocumentShare>>, StorageError> {
        let guard = self.records.lock().expect("share mutex poisoned");
        let mut matching: Vec<Versioned<DocumentShare>> = guard
            .values()
            .filter(|versioned| &versioned.record.document_id == document)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.record.id.cmp(&b.record.id));
        Ok(matching)
    }

    fn update(
        &self,
        share: DocumentShare,
        expected_revision: u64,
    ) -> Result<Versioned<DocumentShare>, StorageError> {
        let mut guard = self.records.lock().expect("share mutex poisoned");
        let slot = guard.get_mut(&share.id).ok_or(StorageError::NotFound)?;
        if slot.revision != expected_revision {
            return Err(StorageError::RevisionConflict);
        }
        *slot = Versioned {
            record: share,
            revision: expected_revision + 1,
        };
        Ok(slot.clone())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
