#![allow(clippy::result_large_err)] // Workflow schema APIs return AppError to preserve structured validation context without boxing.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Default output/input port label.
pub const MAIN_CONNECTION: &str = "main";

fn default_parameters() -> Value {
    Value::Object(Map::new())
}

fn default_type_version() -> f64 {
    1.0
}

/// A workflow document as returned by the remote store.
///
/// Unknown top-level fields (tags, pin data, version ids) are carried in
/// `extra` so a fetch/modify/write cycle never drops them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Connections,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default = "default_type_version")]
    pub type_version: f64,
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default = "default_parameters")]
    pub parameters: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Target end of a connection: `{ node, type, index }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionTarget {
    pub node: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub index: usize,
}

impl ConnectionTarget {
    pub fn new(node: impl Into<String>, kind: impl Into<String>, index: usize) -> Self {
        Self {
            node: node.into(),
            kind: kind.into(),
            index,
        }
    }
}

/// Output label -> output slots (by index) -> targets.
pub type NodeConnections = IndexMap<String, Vec<Vec<ConnectionTarget>>>;

/// Source node name -> outgoing connections.
pub type Connections = IndexMap<String, NodeConnections>;

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            active: false,
            nodes: Vec::new(),
            connections: Connections::new(),
            settings: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.name == name)
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.node(name).is_some()
    }

    /// Iterate every `(source, output label, slot index, target)` edge.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, usize, &ConnectionTarget)> {
        self.connections.iter().flat_map(|(source, outputs)| {
            outputs.iter().flat_map(move |(label, slots)| {
                slots.iter().enumerate().flat_map(move |(slot, targets)| {
                    targets
                        .iter()
                        .map(move |target| (source.as_str(), label.as_str(), slot, target))
                })
            })
        })
    }

    /// Total number of connection target entries.
    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Append a connection entry, padding the slot array as needed.
    /// Returns false when an identical entry already exists.
    pub fn connect(&mut self, source: &str, output: &str, slot: usize, target: ConnectionTarget) -> bool {
        let slots = self
            .connections
            .entry(source.to_string())
            .or_default()
            .entry(output.to_string())
            .or_default();
        if slots.len() <= slot {
            slots.resize_with(slot + 1, Vec::new);
        }
        if slots[slot].contains(&target) {
            return false;
        }
        slots[slot].push(target);
        true
    }

    /// Remove a single matching connection entry. Returns whether one was removed.
    pub fn disconnect(&mut self, source: &str, output: &str, slot: usize, target: &ConnectionTarget) -> bool {
        let Some(targets) = self
            .connections
            .get_mut(source)
            .and_then(|outputs| outputs.get_mut(output))
            .and_then(|slots| slots.get_mut(slot))
        else {
            return false;
        };
        match targets.iter().position(|existing| existing == target) {
            Some(position) => {
                targets.remove(position);
                true
            }
            None => false,
        }
    }

    /// Drop every connection where `name` is the source key or any target.
    pub fn purge_connections_for(&mut self, name: &str) {
        self.connections.shift_remove(name);
        for outputs in self.connections.values_mut() {
            for slots in outputs.values_mut() {
                for targets in slots.iter_mut() {
                    targets.retain(|target| target.node != name);
                }
            }
        }
    }

    /// Rename every connection reference (source key and target entries),
    /// keeping the position of the renamed source key.
    pub fn rename_in_connections(&mut self, old: &str, new: &str) {
        if let Some(index) = self.connections.get_index_of(old) {
            if let Some((_, outputs)) = self.connections.shift_remove_index(index) {
                let (inserted, _) = self.connections.insert_full(new.to_string(), outputs);
                let last = self.connections.len() - 1;
                if inserted == last && index < last {
                    self.connections.move_index(last, index);
                }
            }
        }
        for outputs in self.connections.values_mut() {
            for slots in outputs.values_mut() {
                for targets in slots.iter_mut() {
                    for target in targets.iter_mut() {
                        if target.node == old {
                            target.node = new.to_string();
                        }
                    }
                }
            }
        }
    }

    /// Names of nodes wired directly into `name`, in connection-map order.
    pub fn upstream_of(&self, name: &str) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        for (source, _, _, target) in self.edges() {
            if target.node == name && !sources.contains(&source) {
                sources.push(source);
            }
        }
        sources
    }
}

impl Node {
    pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            node_type: node_type.into(),
            type_version: default_type_version(),
            position: [0.0, 0.0],
            parameters: default_parameters(),
            credentials: None,
            disabled: None,
            extra: Map::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Top-level parameter keys, in document order.
    pub fn parameter_keys(&self) -> Vec<&str> {
        parameter_keys(&self.parameters)
    }
}

pub fn parameter_keys(parameters: &Value) -> Vec<&str> {
    match parameters {
        Value::Object(map) => map.keys().map(String::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Keys present in `current` but absent from `replacement`.
pub fn dropped_parameter_keys(current: &Value, replacement: &Value) -> Vec<String> {
    let kept = parameter_keys(replacement);
    parameter_keys(current)
        .into_iter()
        .filter(|key| !kept.contains(key))
        .map(ToOwned::to_owned)
        .collect()
}

/// Parse a workflow document from JSON text.
pub fn parse_workflow_str(content: &str) -> Result<Workflow, AppError> {
    serde_json::from_str(content).map_err(|err| {
        AppError::new(
            ErrorCategory::SerializationError,
            format!("failed to parse workflow JSON: {}", err),
        )
        .with_code("FG-SCHEMA-001")
    })
}

/// Read and parse a workflow document from disk.
pub fn parse_workflow(path: &Path) -> Result<Workflow, AppError> {
    let content = fs::read_to_string(path).map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to read workflow {}: {}", path.display(), err),
        )
    })?;
    parse_workflow_str(&content)
        .map_err(|err| err.with_context(path.display().to_string()))
}
