//! Auto-fix transforms for the subset of validation findings that can be
//! repaired deterministically.

use crate::core::workflow_graph::lint::{RuleId, ValidationWarning};
use crate::core::workflow_graph::schema::Workflow;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

mod explicit_reference;
mod naming;
mod structured_output;

pub use explicit_reference::ExplicitReferenceFix;
pub use naming::{rename_node, RenameError, SnakeCaseNamingFix};
pub use structured_output::StructuredOutputFix;

/// Kind of repair that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    RenameWorkflow,
    RenameNode,
    ExplicitReference,
    StructuredOutput,
}

/// Record of one applied repair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutofixAction {
    pub kind: FixKind,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    Fixed(AutofixAction),
    /// The warning turned out to need no change.
    NothingToFix,
    Unfixable,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutofixResult {
    pub workflow: Workflow,
    pub fixes: Vec<AutofixAction>,
    pub unfixable: Vec<ValidationWarning>,
}

/// A repair for the findings of one rule.
pub trait WorkflowFix {
    fn rule(&self) -> RuleId;
    fn apply(&self, workflow: &mut Workflow, warning: &ValidationWarning) -> FixOutcome;
}

fn fix_for(rule: RuleId) -> Option<&'static dyn WorkflowFix> {
    match rule {
        RuleId::SnakeCaseNaming => Some(&SnakeCaseNamingFix),
        RuleId::ExplicitReference => Some(&ExplicitReferenceFix),
        RuleId::AiStructuredOutput => Some(&StructuredOutputFix),
        _ => None,
    }
}

/// Apply the available fixes one warning at a time to a copy of `workflow`.
/// Later fixes see the effects of earlier ones, including node renames.
pub fn autofix(workflow: &Workflow, warnings: &[ValidationWarning]) -> AutofixResult {
    let mut working = workflow.clone();
    let mut fixes = Vec::new();
    let mut unfixable = Vec::new();
    let mut renamed: HashMap<String, String> = HashMap::new();

    for original in warnings {
        let mut warning = original.clone();
        if let Some(current) = warning.node.as_ref().and_then(|node| renamed.get(node)) {
            warning.node = Some(current.clone());
        }
        let Some(fix) = fix_for(warning.rule) else {
            unfixable.push(warning);
            continue;
        };
        match fix.apply(&mut working, &warning) {
            FixOutcome::Fixed(action) => {
                tracing::debug!(rule = %fix.rule(), target = %action.target, "applied fix");
                if let (FixKind::RenameNode, Some(Value::String(new_name))) = (action.kind, &action.after) {
                    renamed.insert(action.target.clone(), new_name.clone());
                }
                fixes.push(action);
            }
            FixOutcome::NothingToFix => {
                tracing::debug!(rule = %fix.rule(), "warning needed no change");
            }
            FixOutcome::Unfixable => unfixable.push(warning),
        }
    }

    AutofixResult {
        workflow: working,
        fixes,
        unfixable,
    }
}
