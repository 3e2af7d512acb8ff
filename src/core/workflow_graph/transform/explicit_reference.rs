use super::{AutofixAction, FixKind, FixOutcome, WorkflowFix};
use crate::core::workflow_graph::lint::{RuleId, ValidationWarning};
use crate::core::workflow_graph::patterns;
use crate::core::workflow_graph::schema::Workflow;

/// Binds implicit `$json` reads to the node wired directly upstream.
pub struct ExplicitReferenceFix;

impl WorkflowFix for ExplicitReferenceFix {
    fn rule(&self) -> RuleId {
        RuleId::ExplicitReference
    }

    fn apply(&self, workflow: &mut Workflow, warning: &ValidationWarning) -> FixOutcome {
        let Some(name) = warning.node.as_deref() else {
            return FixOutcome::Unfixable;
        };
        let Some(upstream) = workflow.upstream_of(name).first().map(|s| s.to_string()) else {
            return FixOutcome::Unfixable;
        };
        let Some(node) = workflow.node_mut(name) else {
            return FixOutcome::Unfixable;
        };

        let before = node.parameters.clone();
        let changed = patterns::rewrite_strings(&mut node.parameters, &mut |text: &str| {
            patterns::bind_implicit_json(text, &upstream)
        });
        if !changed {
            return FixOutcome::Unfixable;
        }
        FixOutcome::Fixed(AutofixAction {
            kind: FixKind::ExplicitReference,
            target: name.to_string(),
            before: Some(before),
            after: Some(node.parameters.clone()),
        })
    }
}
