use super::{AutofixAction, FixKind, FixOutcome, WorkflowFix};
use crate::core::workflow_graph::lint::rules::{
    structured_output_flags, HAS_OUTPUT_PARSER_KEY, PROMPT_TYPE_DEFINE, PROMPT_TYPE_KEY,
};
use crate::core::workflow_graph::lint::{RuleId, ValidationWarning};
use crate::core::workflow_graph::schema::Workflow;
use serde_json::{Map, Value};

/// Sets the two structured-output companion flags, leaving every other
/// parameter untouched.
pub struct StructuredOutputFix;

impl WorkflowFix for StructuredOutputFix {
    fn rule(&self) -> RuleId {
        RuleId::AiStructuredOutput
    }

    fn apply(&self, workflow: &mut Workflow, warning: &ValidationWarning) -> FixOutcome {
        let Some(node) = warning.node.as_deref().and_then(|name| workflow.node_mut(name)) else {
            return FixOutcome::Unfixable;
        };
        let (has_parser, prompt_defined) = structured_output_flags(&node.parameters);
        if has_parser && prompt_defined {
            return FixOutcome::Unfixable;
        }

        let before = node.parameters.clone();
        if !node.parameters.is_object() {
            node.parameters = Value::Object(Map::new());
        }
        let Some(parameters) = node.parameters.as_object_mut() else {
            return FixOutcome::Unfixable;
        };
        if !has_parser {
            parameters.insert(HAS_OUTPUT_PARSER_KEY.to_string(), Value::Bool(true));
        }
        if !prompt_defined {
            parameters.insert(
                PROMPT_TYPE_KEY.to_string(),
                Value::String(PROMPT_TYPE_DEFINE.to_string()),
            );
        }

        FixOutcome::Fixed(AutofixAction {
            kind: FixKind::StructuredOutput,
            target: node.name.clone(),
            before: Some(before),
            after: Some(node.parameters.clone()),
        })
    }
}
