#![allow(clippy::result_large_err)] // Pipeline propagates AppError from the store collaborators unchanged.

//! Cleanup sequence: patch, validate, autofix, format, then persist only
//! when something actually changed.

use crate::core::error::AppError;
use crate::core::store::WorkflowStore;
use crate::core::workflow_graph::layout::format_workflow;
use crate::core::workflow_graph::lint::{validate, ValidationWarning};
use crate::core::workflow_graph::patch::{PatchEngine, PatchOperation};
use crate::core::workflow_graph::schema::Workflow;
use crate::core::workflow_graph::transform::{autofix, AutofixAction};
use crate::core::workflow_graph::versions::{VersionMetadata, VersionStore};
use serde::Serialize;

/// Reason recorded on the snapshot taken before a patch.
pub const PRE_PATCH_REASON: &str = "before patch";

#[derive(Debug, Clone, Serialize)]
pub struct CleanupOutcome {
    pub workflow: Workflow,
    pub fixes: Vec<AutofixAction>,
    /// Findings autofix could not repair.
    pub residual: Vec<ValidationWarning>,
    /// True when autofix or formatting altered the workflow.
    pub changed: bool,
}

/// Validate, autofix, then format. Validation always sees the pre-fix state.
pub fn cleanup(workflow: &Workflow) -> CleanupOutcome {
    let report = validate(workflow);
    let fixed = autofix(workflow, &report.warnings);
    let formatted = format_workflow(&fixed.workflow);
    let changed = !fixed.fixes.is_empty() || formatted != *workflow;
    tracing::debug!(
        warnings = report.warnings.len(),
        fixes = fixed.fixes.len(),
        residual = fixed.unfixable.len(),
        changed,
        "cleanup finished"
    );
    CleanupOutcome {
        workflow: formatted,
        fixes: fixed.fixes,
        residual: fixed.unfixable,
        changed,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOutcome {
    pub workflow: Workflow,
    pub snapshot: Option<VersionMetadata>,
    pub persisted: bool,
    pub patch_warnings: Vec<String>,
    pub fixes: Vec<AutofixAction>,
    pub residual: Vec<ValidationWarning>,
}

/// Patch a stored workflow with freshly generated ids for new nodes.
pub async fn apply_patch_and_persist(
    store: &dyn WorkflowStore,
    versions: &VersionStore,
    id: &str,
    operations: &[PatchOperation],
) -> Result<PatchOutcome, AppError> {
    apply_patch_and_persist_with(&PatchEngine::default(), store, versions, id, operations).await
}

/// Fetch, snapshot, patch, clean up, and write back if the result differs
/// from what was fetched.
pub async fn apply_patch_and_persist_with(
    engine: &PatchEngine,
    store: &dyn WorkflowStore,
    versions: &VersionStore,
    id: &str,
    operations: &[PatchOperation],
) -> Result<PatchOutcome, AppError> {
    let mut fetched = store.get(id).await?;
    if fetched.id.is_empty() {
        fetched.id = id.to_string();
    }

    let snapshot = versions.save(&fetched, PRE_PATCH_REASON)?;
    let patched = engine.apply(&fetched, operations);
    let cleaned = cleanup(&patched.workflow);

    let (workflow, persisted) = if cleaned.workflow != fetched {
        let written = store.update(id, &cleaned.workflow).await?;
        tracing::info!(
            workflow_id = %id,
            operations = operations.len(),
            fixes = cleaned.fixes.len(),
            "persisted patched workflow"
        );
        (written, true)
    } else {
        tracing::info!(workflow_id = %id, "patch produced no changes; skipping write");
        (cleaned.workflow, false)
    };

    Ok(PatchOutcome {
        workflow,
        snapshot,
        persisted,
        patch_warnings: patched.warnings,
        fixes: cleaned.fixes,
        residual: cleaned.residual,
    })
}
