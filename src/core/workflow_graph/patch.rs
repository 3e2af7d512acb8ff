#![allow(clippy::result_large_err)] // Patch parsing returns AppError for structured diagnostics.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow_graph::schema::{
    dropped_parameter_keys, ConnectionTarget, Node, Workflow, MAIN_CONNECTION,
};
use crate::core::workflow_graph::transform::rename_node;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

fn default_connection_kind() -> String {
    MAIN_CONNECTION.to_string()
}

fn default_type_version() -> f64 {
    1.0
}

/// One typed mutation of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PatchOperation {
    AddNode { node: NewNode },
    RemoveNode { name: String },
    UpdateNode { name: String, properties: NodeUpdate },
    AddConnection(ConnectionSpec),
    RemoveConnection(ConnectionSpec),
    UpdateSettings { settings: Map<String, Value> },
    UpdateName { name: String },
    Activate,
    Deactivate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default = "default_type_version")]
    pub type_version: f64,
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub credentials: Option<Map<String, Value>>,
    #[serde(default)]
    pub disabled: Option<bool>,
    /// Any other node property (`notes`, `onError`, `webhookId`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Properties shallow-merged onto an existing node; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_version: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSpec {
    pub source: String,
    pub target: String,
    #[serde(default = "default_connection_kind")]
    pub source_output: String,
    #[serde(default = "default_connection_kind")]
    pub target_input: String,
    #[serde(default)]
    pub source_index: usize,
    #[serde(default)]
    pub target_index: usize,
}

impl ConnectionSpec {
    pub fn main(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_output: default_connection_kind(),
            target_input: default_connection_kind(),
            source_index: 0,
            target_index: 0,
        }
    }

    fn target_entry(&self) -> ConnectionTarget {
        ConnectionTarget::new(&self.target, &self.target_input, self.target_index)
    }
}

/// Source of ids for nodes added without one.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic `<prefix>-<n>` ids for tests and reproducible runs.
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicUsize,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicUsize::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchResult {
    pub workflow: Workflow,
    pub warnings: Vec<String>,
}

/// Applies operation lists to copies of workflows.
pub struct PatchEngine {
    ids: Box<dyn IdGenerator>,
}

impl Default for PatchEngine {
    fn default() -> Self {
        Self::new(Box::new(UuidIdGenerator))
    }
}

impl PatchEngine {
    pub fn new(ids: Box<dyn IdGenerator>) -> Self {
        Self { ids }
    }

    /// Apply `operations` in order to a copy of `workflow`. Missing targets
    /// become warnings, never errors.
    pub fn apply(&self, workflow: &Workflow, operations: &[PatchOperation]) -> PatchResult {
        let mut working = workflow.clone();
        let mut warnings = Vec::new();
        for operation in operations {
            self.apply_one(&mut working, operation, &mut warnings);
        }
        PatchResult {
            workflow: working,
            warnings,
        }
    }

    fn apply_one(&self, workflow: &mut Workflow, operation: &PatchOperation, warnings: &mut Vec<String>) {
        tracing::debug!(?operation, "applying patch operation");
        match operation {
            PatchOperation::AddNode { node } => self.add_node(workflow, node, warnings),
            PatchOperation::RemoveNode { name } => {
                let before = workflow.nodes.len();
                workflow.nodes.retain(|node| node.name != *name);
                if workflow.nodes.len() == before {
                    warnings.push(format!("removeNode: node '{}' not found", name));
                    return;
                }
                workflow.purge_connections_for(name);
            }
            PatchOperation::UpdateNode { name, properties } => {
                update_node(workflow, name, properties, warnings)
            }
            PatchOperation::AddConnection(spec) => {
                for endpoint in [&spec.source, &spec.target] {
                    if !workflow.has_node(endpoint) {
                        warnings.push(format!("addConnection: node '{}' does not exist", endpoint));
                    }
                }
                workflow.connect(&spec.source, &spec.source_output, spec.source_index, spec.target_entry());
            }
            PatchOperation::RemoveConnection(spec) => {
                workflow.disconnect(&spec.source, &spec.source_output, spec.source_index, &spec.target_entry());
            }
            PatchOperation::UpdateSettings { settings } => {
                let merged = workflow.settings.get_or_insert_with(Map::new);
                for (key, value) in settings {
                    merged.insert(key.clone(), value.clone());
                }
            }
            PatchOperation::UpdateName { name } => workflow.name = name.clone(),
            PatchOperation::Activate => workflow.active = true,
            PatchOperation::Deactivate => workflow.active = false,
        }
    }

    fn add_node(&self, workflow: &mut Workflow, spec: &NewNode, warnings: &mut Vec<String>) {
        if workflow.has_node(&spec.name) {
            warnings.push(format!("addNode: a node named '{}' already exists; skipped", spec.name));
            return;
        }
        let id = match &spec.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => self.ids.next_id(),
        };
        let mut node = Node::new(&spec.name, &spec.node_type).with_id(id);
        node.type_version = spec.type_version;
        node.position = spec.position;
        if let Some(parameters) = &spec.parameters {
            node.parameters = parameters.clone();
        }
        node.credentials = spec.credentials.clone();
        node.disabled = spec.disabled;
        node.extra = spec.extra.clone();
        workflow.nodes.push(node);
    }
}

fn update_node(workflow: &mut Workflow, name: &str, properties: &NodeUpdate, warnings: &mut Vec<String>) {
    let Some(node) = workflow.node_mut(name) else {
        warnings.push(format!("updateNode: node '{}' not found", name));
        return;
    };

    if let Some(parameters) = &properties.parameters {
        let dropped = dropped_parameter_keys(&node.parameters, parameters);
        if !dropped.is_empty() {
            warnings.push(format!(
                "updateNode: parameters of '{}' are replaced in full; dropping keys: {}",
                name,
                dropped.join(", ")
            ));
        }
        node.parameters = parameters.clone();
    }
    if let Some(node_type) = &properties.node_type {
        node.node_type = node_type.clone();
    }
    if let Some(type_version) = properties.type_version {
        node.type_version = type_version;
    }
    if let Some(position) = properties.position {
        node.position = position;
    }
    if let Some(credentials) = &properties.credentials {
        node.credentials = Some(credentials.clone());
    }
    if let Some(disabled) = properties.disabled {
        node.disabled = Some(disabled);
    }
    for (key, value) in &properties.extra {
        if key == "id" {
            warnings.push(format!("updateNode: the id of '{}' cannot be changed", name));
            continue;
        }
        node.extra.insert(key.clone(), value.clone());
    }

    if let Some(new_name) = &properties.name {
        if let Err(err) = rename_node(workflow, name, new_name) {
            warnings.push(format!("updateNode: cannot rename '{}': {}", name, err));
        }
    }
}

/// Apply operations with freshly generated uuids for new nodes.
pub fn apply_patch(workflow: &Workflow, operations: &[PatchOperation]) -> PatchResult {
    PatchEngine::default().apply(workflow, operations)
}

/// Parse a JSON array of operations, rejecting malformed entries up front.
pub fn parse_operations(value: Value) -> Result<Vec<PatchOperation>, AppError> {
    let operations: Vec<PatchOperation> = serde_json::from_value(value).map_err(|err| {
        AppError::new(
            ErrorCategory::ValidationError,
            format!("malformed patch operation: {}", err),
        )
        .with_code("FG-PATCH-001")
    })?;
    for (index, operation) in operations.iter().enumerate() {
        let name = match operation {
            PatchOperation::AddNode { node } => Some(&node.name),
            PatchOperation::RemoveNode { name }
            | PatchOperation::UpdateNode { name, .. }
            | PatchOperation::UpdateName { name } => Some(name),
            _ => None,
        };
        if name.is_some_and(|name| name.trim().is_empty()) {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("patch operation {} has an empty name", index),
            )
            .with_code("FG-PATCH-001"));
        }
    }
    Ok(operations)
}
