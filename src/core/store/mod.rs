#![allow(clippy::result_large_err)] // Store trait returns AppError directly for structured diagnostics without boxing.

//! Collaborators the workflow pipeline reads from and writes through.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow_graph::schema::Workflow;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub mod json_dir;
pub mod memory;
pub mod node_types;

pub use json_dir::JsonDirWorkflowStore;
pub use memory::InMemoryWorkflowStore;
pub use node_types::{NodeTypeInfo, NodeTypeRegistry, StaticNodeTypeRegistry};

/// Top-level fields a write request may carry.
pub const WRITABLE_FIELDS: &[&str] = &["name", "nodes", "connections", "settings", "staticData"];

/// Settings keys the remote service accepts.
pub const WRITABLE_SETTINGS: &[&str] = &[
    "executionOrder",
    "saveExecutionProgress",
    "saveManualExecutions",
    "saveDataErrorExecution",
    "saveDataSuccessExecution",
    "executionTimeout",
    "errorWorkflow",
    "timezone",
    "callerPolicy",
    "callerIds",
];

/// Remote workflow store, addressed by workflow id.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Workflow, AppError>;
    async fn create(&self, workflow: &Workflow) -> Result<Workflow, AppError>;
    async fn update(&self, id: &str, workflow: &Workflow) -> Result<Workflow, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
    async fn activate(&self, id: &str) -> Result<Workflow, AppError>;
    async fn deactivate(&self, id: &str) -> Result<Workflow, AppError>;
}

/// Copy of `workflow` restricted to the writable allow-lists. Unknown
/// top-level fields and settings keys are dropped silently.
pub fn sanitize_for_write(workflow: &Workflow) -> Result<Map<String, Value>, AppError> {
    let Value::Object(full) = serde_json::to_value(workflow)? else {
        return Err(AppError::new(
            ErrorCategory::InternalError,
            "workflow did not serialize to an object",
        ));
    };

    let mut payload: Map<String, Value> = full
        .into_iter()
        .filter(|(key, _)| WRITABLE_FIELDS.contains(&key.as_str()))
        .collect();
    if let Some(Value::Object(settings)) = payload.get_mut("settings") {
        let before = settings.len();
        settings.retain(|key, _| WRITABLE_SETTINGS.contains(&key.as_str()));
        if settings.len() < before {
            tracing::debug!(dropped = before - settings.len(), "dropped unknown settings keys");
        }
    }
    Ok(payload)
}

/// Rebuild a workflow from a sanitized payload.
pub(crate) fn workflow_from_payload(payload: Map<String, Value>) -> Result<Workflow, AppError> {
    serde_json::from_value(Value::Object(payload)).map_err(|err| {
        AppError::new(
            ErrorCategory::SerializationError,
            format!("sanitized workflow payload is not a valid workflow: {}", err),
        )
        .with_code("FG-STORE-002")
    })
}

pub(crate) fn workflow_not_found(id: &str) -> AppError {
    AppError::new(ErrorCategory::NotFound, format!("workflow '{}' not found", id))
        .with_code("FG-STORE-001")
}
