use super::{RuleId, Severity, ValidationWarning};
use crate::core::workflow_graph::schema::{dropped_parameter_keys, Workflow};
use serde_json::Value;

/// Check a proposed parameter replacement for `node_name` before it is sent.
///
/// Parameter updates replace the whole bag, so every current key missing from
/// `new_parameters` would be lost.
pub fn validate_partial_update(
    workflow: &Workflow,
    node_name: &str,
    new_parameters: &Value,
) -> Vec<ValidationWarning> {
    let Some(node) = workflow.node(node_name) else {
        return vec![ValidationWarning::new(
            RuleId::NodeNotFound,
            Severity::Error,
            Some(node_name.to_string()),
            format!("node '{}' not found in workflow", node_name),
            None,
        )];
    };

    let dropped = dropped_parameter_keys(&node.parameters, new_parameters);
    if dropped.is_empty() {
        return Vec::new();
    }
    vec![ValidationWarning::new(
        RuleId::ParameterLoss,
        Severity::Error,
        Some(node_name.to_string()),
        format!(
            "update of node '{}' would remove parameters: {}",
            node_name,
            dropped.join(", ")
        ),
        Some("include every existing parameter in the update".to_string()),
    )]
}
