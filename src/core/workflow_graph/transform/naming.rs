use super::{AutofixAction, FixKind, FixOutcome, WorkflowFix};
use crate::core::workflow_graph::lint::{normalize_name, RuleId, ValidationWarning};
use crate::core::workflow_graph::patterns;
use crate::core::workflow_graph::schema::Workflow;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenameError {
    #[error("node '{0}' not found")]
    NotFound(String),
    #[error("a node named '{0}' already exists")]
    Conflict(String),
}

/// Rename node `old` to `new`, rewriting every connection entry and every
/// expression reference to it.
pub fn rename_node(workflow: &mut Workflow, old: &str, new: &str) -> Result<(), RenameError> {
    if old == new {
        return Ok(());
    }
    if workflow.has_node(new) {
        return Err(RenameError::Conflict(new.to_string()));
    }
    let node = workflow
        .node_mut(old)
        .ok_or_else(|| RenameError::NotFound(old.to_string()))?;
    node.name = new.to_string();
    workflow.rename_in_connections(old, new);
    for node in &mut workflow.nodes {
        patterns::rewrite_strings(&mut node.parameters, &mut |text: &str| {
            patterns::rename_references(text, old, new)
        });
    }
    Ok(())
}

pub struct SnakeCaseNamingFix;

impl WorkflowFix for SnakeCaseNamingFix {
    fn rule(&self) -> RuleId {
        RuleId::SnakeCaseNaming
    }

    fn apply(&self, workflow: &mut Workflow, warning: &ValidationWarning) -> FixOutcome {
        match &warning.node {
            None => {
                let normalized = normalize_name(&workflow.name);
                if normalized == workflow.name {
                    return FixOutcome::NothingToFix;
                }
                if normalized.is_empty() {
                    return FixOutcome::Unfixable;
                }
                let before = std::mem::replace(&mut workflow.name, normalized.clone());
                FixOutcome::Fixed(AutofixAction {
                    kind: FixKind::RenameWorkflow,
                    target: "workflow".to_string(),
                    before: Some(Value::String(before)),
                    after: Some(Value::String(normalized)),
                })
            }
            Some(old) => {
                let normalized = normalize_name(old);
                if normalized == *old {
                    return FixOutcome::NothingToFix;
                }
                if normalized.is_empty() {
                    tracing::warn!(node = %old, "name has no letters or digits to keep");
                    return FixOutcome::Unfixable;
                }
                match rename_node(workflow, old, &normalized) {
                    Ok(()) => FixOutcome::Fixed(AutofixAction {
                        kind: FixKind::RenameNode,
                        target: old.clone(),
                        before: Some(Value::String(old.clone())),
                        after: Some(Value::String(normalized)),
                    }),
                    Err(err) => {
                        tracing::warn!(node = %old, error = %err, "cannot rename node");
                        FixOutcome::Unfixable
                    }
                }
            }
        }
    }
}
