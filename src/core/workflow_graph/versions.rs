#![allow(clippy::result_large_err)] // Version store returns AppError to preserve structured diagnostic context.

use crate::core::config::VersionControlConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow_graph::schema::Workflow;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Version embedded in persisted snapshot files.
pub const SNAPSHOT_FORMAT_VERSION: &str = "1";

const HASH_PREFIX_LEN: usize = 12;

/// Metadata stored alongside every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMetadata {
    pub id: String,
    pub workflow_id: String,
    pub workflow_name: String,
    pub created_at: DateTime<Utc>,
    pub reason: String,
    pub node_count: usize,
    pub content_hash: String,
}

/// A snapshot file: metadata plus the full workflow at that point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    pub format_version: String,
    pub metadata: VersionMetadata,
    pub workflow: Workflow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub nodes_added: Vec<String>,
    pub nodes_removed: Vec<String>,
    pub nodes_modified: Vec<String>,
    pub connections_changed: bool,
    pub settings_changed: bool,
    pub summary: String,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.nodes_added.is_empty()
            && self.nodes_removed.is_empty()
            && self.nodes_modified.is_empty()
            && !self.connections_changed
            && !self.settings_changed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub enabled: bool,
    pub workflows: usize,
    pub snapshots: usize,
    pub total_bytes: u64,
    pub max_versions: usize,
}

/// Compute the SHA-256 hash encoded as lowercase hex.
pub fn compute_sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Stable hash over nodes, connections and settings. Name, id, active flag
/// and timestamps do not contribute.
pub fn content_hash(workflow: &Workflow) -> String {
    let canonical = json!({
        "nodes": workflow.nodes,
        "connections": workflow.connections,
        "settings": workflow.settings,
    });
    let mut bytes = Vec::new();
    write_canonical(&canonical, &mut bytes);
    compute_sha256_hex(&bytes)
}

/// JSON with object keys sorted at every level, independent of map ordering.
fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(Value::String((*key).clone()).to_string().as_bytes());
                out.push(b':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        other => out.extend_from_slice(other.to_string().as_bytes()),
    }
}

/// Compare two workflow payloads node-by-node (keyed by name).
pub fn diff(old: &Workflow, new: &Workflow) -> DiffResult {
    let old_nodes: HashMap<&str, &Value> = old
        .nodes
        .iter()
        .map(|node| (node.name.as_str(), &node.parameters))
        .collect();
    let new_names: HashSet<&str> = new.nodes.iter().map(|node| node.name.as_str()).collect();

    let nodes_added: Vec<String> = new
        .nodes
        .iter()
        .filter(|node| !old_nodes.contains_key(node.name.as_str()))
        .map(|node| node.name.clone())
        .collect();
    let nodes_removed: Vec<String> = old
        .nodes
        .iter()
        .filter(|node| !new_names.contains(node.name.as_str()))
        .map(|node| node.name.clone())
        .collect();
    let nodes_modified: Vec<String> = new
        .nodes
        .iter()
        .filter(|node| {
            old_nodes
                .get(node.name.as_str())
                .is_some_and(|parameters| **parameters != node.parameters)
        })
        .map(|node| node.name.clone())
        .collect();
    let connections_changed = old.connections != new.connections;
    let settings_changed = old.settings != new.settings;

    let mut parts = Vec::new();
    if !nodes_added.is_empty() {
        parts.push(format!("+{} nodes", nodes_added.len()));
    }
    if !nodes_removed.is_empty() {
        parts.push(format!("-{} nodes", nodes_removed.len()));
    }
    if !nodes_modified.is_empty() {
        parts.push(format!("~{} modified", nodes_modified.len()));
    }
    if connections_changed {
        parts.push("connections changed".to_string());
    }
    if settings_changed {
        parts.push("settings changed".to_string());
    }
    let summary = if parts.is_empty() {
        "no changes".to_string()
    } else {
        parts.join(", ")
    };

    DiffResult {
        nodes_added,
        nodes_removed,
        nodes_modified,
        connections_changed,
        settings_changed,
        summary,
    }
}

/// True when `value` can be used as a single file-system name without
/// escaping its parent directory.
pub fn is_safe_path_component(value: &str) -> bool {
    !value.is_empty()
        && !value.contains("..")
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

fn validate_path_component(kind: &str, value: &str) -> Result<(), AppError> {
    if is_safe_path_component(value) {
        Ok(())
    } else {
        Err(AppError::new(
            ErrorCategory::ValidationError,
            format!("{} '{}' contains invalid characters for filesystem use", kind, value),
        )
        .with_code("FG-VER-001"))
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to create directory {}: {}", parent.display(), err),
            )
        })?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data).map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to write {}: {}", tmp_path.display(), err),
        )
    })?;
    fs::rename(&tmp_path, path).map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!(
                "failed to rename {} -> {}: {}",
                tmp_path.display(),
                path.display(),
                err
            ),
        )
    })?;
    Ok(())
}

/// Content-addressed snapshot store: `<root>/<workflow_id>/<version_id>.json`.
///
/// Operations on one workflow id must be serialized by the caller; the store
/// takes no locks.
pub struct VersionStore {
    config: VersionControlConfig,
}

impl VersionStore {
    pub fn new(config: VersionControlConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VersionControlConfig {
        &self.config
    }

    fn workflow_dir(&self, workflow_id: &str) -> Result<PathBuf, AppError> {
        validate_path_component("workflow id", workflow_id)?;
        Ok(self.config.root.join(workflow_id))
    }

    /// Snapshot `workflow` unless its content hash matches the newest stored
    /// snapshot. Prunes down to `max_versions` afterwards.
    pub fn save(&self, workflow: &Workflow, reason: &str) -> Result<Option<VersionMetadata>, AppError> {
        if !self.config.enabled {
            return Ok(None);
        }
        let dir = self.workflow_dir(&workflow.id)?;
        let hash = content_hash(workflow);
        let latest = self.latest_metadata(&workflow.id)?;
        if let Some(latest) = &latest {
            if latest.content_hash == hash {
                tracing::debug!(workflow_id = %workflow.id, "snapshot skipped; content unchanged");
                return Ok(None);
            }
        }

        let mut created_at = Utc::now();
        if let Some(latest) = &latest {
            if created_at <= latest.created_at {
                created_at = latest.created_at + Duration::milliseconds(1);
            }
        }
        let id = format!(
            "{}-{}",
            created_at.format("%Y%m%dT%H%M%S%3fZ"),
            &hash[..HASH_PREFIX_LEN]
        );
        let metadata = VersionMetadata {
            id: id.clone(),
            workflow_id: workflow.id.clone(),
            workflow_name: workflow.name.clone(),
            created_at,
            reason: reason.to_string(),
            node_count: workflow.nodes.len(),
            content_hash: hash,
        };
        let snapshot = VersionSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION.to_string(),
            metadata: metadata.clone(),
            workflow: workflow.clone(),
        };
        let content = serde_json::to_vec_pretty(&snapshot).map_err(|err| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!("failed to serialize snapshot: {}", err),
            )
        })?;
        atomic_write(&dir.join(format!("{}.json", id)), &content)?;
        tracing::info!(workflow_id = %workflow.id, version_id = %id, reason, "saved workflow snapshot");

        self.prune(&workflow.id)?;
        Ok(Some(metadata))
    }

    fn read_snapshot(&self, path: &Path) -> Result<VersionSnapshot, AppError> {
        let bytes = fs::read(path).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to read {}: {}", path.display(), err),
            )
        })?;
        serde_json::from_slice(&bytes).map_err(|err| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!("failed to deserialize snapshot {}: {}", path.display(), err),
            )
        })
    }

    fn snapshot_files(&self, workflow_id: &str) -> Result<Vec<PathBuf>, AppError> {
        let dir = self.workflow_dir(workflow_id)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::IoError,
                    format!("failed to list snapshots in {}: {}", dir.display(), err),
                )
            })?
            .flatten()
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn load_all(&self, workflow_id: &str) -> Result<Vec<(PathBuf, VersionSnapshot)>, AppError> {
        let mut snapshots = Vec::new();
        for path in self.snapshot_files(workflow_id)? {
            let snapshot = self.read_snapshot(&path)?;
            snapshots.push((path, snapshot));
        }
        snapshots.sort_by(|(_, a), (_, b)| {
            b.metadata
                .created_at
                .cmp(&a.metadata.created_at)
                .then_with(|| b.metadata.id.cmp(&a.metadata.id))
        });
        Ok(snapshots)
    }

    /// Metadata for every snapshot of `workflow_id`, newest first.
    pub fn list(&self, workflow_id: &str) -> Result<Vec<VersionMetadata>, AppError> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }
        Ok(self
            .load_all(workflow_id)?
            .into_iter()
            .map(|(_, snapshot)| snapshot.metadata)
            .collect())
    }

    fn latest_metadata(&self, workflow_id: &str) -> Result<Option<VersionMetadata>, AppError> {
        Ok(self.list(workflow_id)?.into_iter().next())
    }

    pub fn get(&self, workflow_id: &str, version_id: &str) -> Result<Option<VersionSnapshot>, AppError> {
        validate_path_component("version id", version_id)?;
        let path = self.workflow_dir(workflow_id)?.join(format!("{}.json", version_id));
        if !path.is_file() {
            return Ok(None);
        }
        self.read_snapshot(&path).map(Some)
    }

    /// Like [`VersionStore::get`] but a missing version is an error.
    pub fn require(&self, workflow_id: &str, version_id: &str) -> Result<VersionSnapshot, AppError> {
        self.get(workflow_id, version_id)?.ok_or_else(|| {
            AppError::new(
                ErrorCategory::NotFound,
                format!("version '{}' of workflow '{}' not found", version_id, workflow_id),
            )
            .with_code("FG-VER-002")
            .with_suggestion("run `flowguard versions list <workflow-id>` to see stored versions")
        })
    }

    pub fn latest(&self, workflow_id: &str) -> Result<Option<VersionSnapshot>, AppError> {
        if !self.config.enabled {
            return Ok(None);
        }
        Ok(self
            .load_all(workflow_id)?
            .into_iter()
            .next()
            .map(|(_, snapshot)| snapshot))
    }

    /// Diff two stored versions of the same workflow.
    pub fn diff_versions(&self, workflow_id: &str, from: &str, to: &str) -> Result<DiffResult, AppError> {
        let old = self.require(workflow_id, from)?;
        let new = self.require(workflow_id, to)?;
        Ok(diff(&old.workflow, &new.workflow))
    }

    /// Delete every snapshot of `workflow_id`, returning how many were removed.
    pub fn delete_all(&self, workflow_id: &str) -> Result<usize, AppError> {
        let files = self.snapshot_files(workflow_id)?;
        let count = files.len();
        let dir = self.workflow_dir(workflow_id)?;
        if dir.is_dir() {
            fs::remove_dir_all(&dir).map_err(|err| {
                AppError::new(
                    ErrorCategory::IoError,
                    format!("failed to delete {}: {}", dir.display(), err),
                )
            })?;
        }
        tracing::info!(workflow_id, deleted = count, "deleted workflow snapshots");
        Ok(count)
    }

    fn prune(&self, workflow_id: &str) -> Result<usize, AppError> {
        let snapshots = self.load_all(workflow_id)?;
        let mut removed = 0;
        for (path, snapshot) in snapshots.iter().skip(self.config.max_versions) {
            fs::remove_file(path).map_err(|err| {
                AppError::new(
                    ErrorCategory::IoError,
                    format!("failed to prune {}: {}", path.display(), err),
                )
            })?;
            tracing::debug!(workflow_id, version_id = %snapshot.metadata.id, "pruned snapshot");
            removed += 1;
        }
        if removed > 0 {
            tracing::info!(workflow_id, removed, "pruned old snapshots");
        }
        Ok(removed)
    }

    /// Aggregate counts across every workflow directory under the root.
    pub fn stats(&self) -> Result<StoreStats, AppError> {
        let mut stats = StoreStats {
            enabled: self.config.enabled,
            max_versions: self.config.max_versions,
            ..StoreStats::default()
        };
        let root = &self.config.root;
        if !root.is_dir() {
            return Ok(stats);
        }
        for entry in fs::read_dir(root)
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::IoError,
                    format!("failed to list {}: {}", root.display(), err),
                )
            })?
            .flatten()
        {
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let workflow_id = entry.file_name().to_string_lossy().to_string();
            let files = self.snapshot_files(&workflow_id)?;
            if files.is_empty() {
                continue;
            }
            stats.workflows += 1;
            stats.snapshots += files.len();
            for file in files {
                stats.total_bytes += fs::metadata(&file).map(|meta| meta.len()).unwrap_or(0);
            }
        }
        Ok(stats)
    }
}
