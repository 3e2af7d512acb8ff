#![allow(clippy::result_large_err)]

use super::{sanitize_for_write, workflow_from_payload, workflow_not_found, WorkflowStore};
use crate::core::error::AppError;
use crate::core::workflow_graph::patch::{IdGenerator, UuidIdGenerator};
use crate::core::workflow_graph::schema::Workflow;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-local store. Writes go through the same gatekeeper as a remote
/// service would apply.
pub struct InMemoryWorkflowStore {
    workflows: DashMap<String, Workflow>,
    ids: Arc<dyn IdGenerator>,
}

impl Default for InMemoryWorkflowStore {
    fn default() -> Self {
        Self::new(Arc::new(UuidIdGenerator))
    }
}

impl InMemoryWorkflowStore {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            workflows: DashMap::new(),
            ids,
        }
    }

    /// Store `workflow` as-is under its own id, bypassing the gatekeeper.
    pub fn seed(&self, workflow: Workflow) {
        self.workflows.insert(workflow.id.clone(), workflow);
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    fn set_active(&self, id: &str, active: bool) -> Result<Workflow, AppError> {
        let mut entry = self.workflows.get_mut(id).ok_or_else(|| workflow_not_found(id))?;
        entry.active = active;
        entry.updated_at = Some(Utc::now());
        Ok(entry.clone())
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn get(&self, id: &str) -> Result<Workflow, AppError> {
        self.workflows
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| workflow_not_found(id))
    }

    async fn create(&self, workflow: &Workflow) -> Result<Workflow, AppError> {
        let mut created = workflow_from_payload(sanitize_for_write(workflow)?)?;
        created.id = self.ids.next_id();
        let now = Utc::now();
        created.created_at = Some(now);
        created.updated_at = Some(now);
        self.workflows.insert(created.id.clone(), created.clone());
        tracing::info!(workflow_id = %created.id, "created workflow");
        Ok(created)
    }

    async fn update(&self, id: &str, workflow: &Workflow) -> Result<Workflow, AppError> {
        let payload = sanitize_for_write(workflow)?;
        let mut entry = self.workflows.get_mut(id).ok_or_else(|| workflow_not_found(id))?;
        let mut updated = workflow_from_payload(payload)?;
        updated.id = entry.id.clone();
        updated.active = entry.active;
        updated.created_at = entry.created_at;
        updated.updated_at = Some(Utc::now());
        *entry = updated.clone();
        tracing::info!(workflow_id = %id, "updated workflow");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.workflows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| workflow_not_found(id))
    }

    async fn activate(&self, id: &str) -> Result<Workflow, AppError> {
        self.set_active(id, true)
    }

    async fn deactivate(&self, id: &str) -> Result<Workflow, AppError> {
        self.set_active(id, false)
    }
}
