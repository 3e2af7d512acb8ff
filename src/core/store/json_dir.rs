#![allow(clippy::result_large_err)]

use super::{sanitize_for_write, workflow_from_payload, workflow_not_found, WorkflowStore};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow_graph::patch::{IdGenerator, UuidIdGenerator};
use crate::core::workflow_graph::schema::{parse_workflow_str, Workflow};
use crate::core::workflow_graph::versions::is_safe_path_component;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Workflows kept as `<root>/<id>.json`, one document per file.
pub struct JsonDirWorkflowStore {
    root: PathBuf,
    ids: Arc<dyn IdGenerator>,
}

impl JsonDirWorkflowStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_ids(root, Arc::new(UuidIdGenerator))
    }

    pub fn with_ids(root: impl Into<PathBuf>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            root: root.into(),
            ids,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, AppError> {
        if !is_safe_path_component(id) {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("workflow id '{}' contains invalid characters for filesystem use", id),
            )
            .with_code("FG-STORE-003"));
        }
        Ok(self.root.join(format!("{}.json", id)))
    }

    async fn read(&self, id: &str) -> Result<Workflow, AppError> {
        let path = self.path_for(id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(workflow_not_found(id));
            }
            Err(err) => {
                return Err(AppError::new(
                    ErrorCategory::IoError,
                    format!("failed to read {}: {}", path.display(), err),
                ))
            }
        };
        let mut workflow = parse_workflow_str(&content)?;
        if workflow.id.is_empty() {
            workflow.id = id.to_string();
        }
        Ok(workflow)
    }

    async fn write(&self, workflow: &Workflow) -> Result<(), AppError> {
        let path = self.path_for(&workflow.id)?;
        tokio::fs::create_dir_all(&self.root).await.map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to create {}: {}", self.root.display(), err),
            )
        })?;
        let content = serde_json::to_vec_pretty(workflow)?;
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, content).await.map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to write {}: {}", tmp_path.display(), err),
            )
        })?;
        tokio::fs::rename(&tmp_path, &path).await.map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to rename {} -> {}: {}", tmp_path.display(), path.display(), err),
            )
        })?;
        Ok(())
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<Workflow, AppError> {
        let mut workflow = self.read(id).await?;
        workflow.active = active;
        workflow.updated_at = Some(Utc::now());
        self.write(&workflow).await?;
        Ok(workflow)
    }
}

#[async_trait]
impl WorkflowStore for JsonDirWorkflowStore {
    async fn get(&self, id: &str) -> Result<Workflow, AppError> {
        self.read(id).await
    }

    async fn create(&self, workflow: &Workflow) -> Result<Workflow, AppError> {
        let mut created = workflow_from_payload(sanitize_for_write(workflow)?)?;
        created.id = self.ids.next_id();
        let now = Utc::now();
        created.created_at = Some(now);
        created.updated_at = Some(now);
        self.write(&created).await?;
        tracing::info!(workflow_id = %created.id, root = %self.root.display(), "created workflow");
        Ok(created)
    }

    async fn update(&self, id: &str, workflow: &Workflow) -> Result<Workflow, AppError> {
        let existing = self.read(id).await?;
        let mut updated = workflow_from_payload(sanitize_for_write(workflow)?)?;
        updated.id = existing.id;
        updated.active = existing.active;
        updated.created_at = existing.created_at;
        updated.updated_at = Some(Utc::now());
        self.write(&updated).await?;
        tracing::info!(workflow_id = %id, "updated workflow");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(workflow_not_found(id)),
            Err(err) => Err(AppError::new(
                ErrorCategory::IoError,
                format!("failed to delete {}: {}", path.display(), err),
            )),
        }
    }

    async fn activate(&self, id: &str) -> Result<Workflow, AppError> {
        self.set_active(id, true).await
    }

    async fn deactivate(&self, id: &str) -> Result<Workflow, AppError> {
        self.set_active(id, false).await
    }
}
