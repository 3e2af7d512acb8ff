use super::naming::needs_rename;
use super::{RuleId, Severity, ValidationWarning, WorkflowRule};
use crate::core::workflow_graph::patterns;
use crate::core::workflow_graph::schema::{Node, Workflow};
use serde_json::Value;
use std::collections::HashSet;

/// Node types that run arbitrary user code.
pub const CODE_NODE_TYPES: &[&str] = &[
    "n8n-nodes-base.code",
    "n8n-nodes-base.function",
    "n8n-nodes-base.functionItem",
    "n8n-nodes-base.executeCommand",
];

/// Agent/chain node types that support structured output parsing.
pub const AI_AGENT_TYPES: &[&str] = &[
    "@n8n/n8n-nodes-langchain.agent",
    "@n8n/n8n-nodes-langchain.chainLlm",
    "@n8n/n8n-nodes-langchain.chainRetrievalQa",
    "@n8n/n8n-nodes-langchain.openAi",
];

/// Memory and vector stores that lose their contents on restart.
pub const EPHEMERAL_STORAGE_TYPES: &[&str] = &[
    "@n8n/n8n-nodes-langchain.memoryBufferWindow",
    "@n8n/n8n-nodes-langchain.vectorStoreInMemory",
    "@n8n/n8n-nodes-langchain.vectorStoreInMemoryInsert",
    "@n8n/n8n-nodes-langchain.vectorStoreInMemoryLoad",
];

/// Entry-point types that legitimately have no inbound connection.
pub const TRIGGER_TYPES: &[&str] = &[
    "n8n-nodes-base.webhook",
    "n8n-nodes-base.cron",
    "n8n-nodes-base.start",
    "n8n-nodes-base.interval",
    "n8n-nodes-base.formTrigger",
    "@n8n/n8n-nodes-langchain.chatTrigger",
    "@n8n/n8n-nodes-langchain.mcpTrigger",
];

/// Canvas annotations that never take part in the data flow.
pub const ANNOTATION_TYPES: &[&str] = &["n8n-nodes-base.stickyNote"];

/// Parameters that configure an output parser on an agent node.
pub const OUTPUT_PARSER_KEYS: &[&str] = &[
    "outputParser",
    "schemaType",
    "jsonSchemaExample",
    "inputSchema",
];

/// Companion flag `hasOutputParser` and its canonical value.
pub const HAS_OUTPUT_PARSER_KEY: &str = "hasOutputParser";
/// Companion flag `promptType` and its canonical value.
pub const PROMPT_TYPE_KEY: &str = "promptType";
pub const PROMPT_TYPE_DEFINE: &str = "define";

pub fn built_in_rules() -> Vec<Box<dyn WorkflowRule>> {
    vec![
        Box::new(SnakeCaseNamingRule),
        Box::new(ExplicitReferenceRule),
        Box::new(HardcodedIdRule),
        Box::new(HardcodedSecretRule),
        Box::new(CodeNodeUsageRule),
        Box::new(AiStructuredOutputRule),
        Box::new(InMemoryStorageRule),
        Box::new(OrphanedNodeRule),
    ]
}

pub fn is_trigger_type(node_type: &str) -> bool {
    TRIGGER_TYPES.contains(&node_type) || node_type.to_ascii_lowercase().ends_with("trigger")
}

pub fn is_ai_agent_type(node_type: &str) -> bool {
    AI_AGENT_TYPES.contains(&node_type)
}

/// Parameters serialized to compact JSON text for pattern scans.
fn parameter_text(node: &Node) -> String {
    serde_json::to_string(&node.parameters).unwrap_or_default()
}

pub struct SnakeCaseNamingRule;

impl WorkflowRule for SnakeCaseNamingRule {
    fn id(&self) -> RuleId {
        RuleId::SnakeCaseNaming
    }

    fn validate(&self, workflow: &Workflow) -> Vec<ValidationWarning> {
        let mut out = Vec::new();
        if let Some(suggested) = needs_rename(&workflow.name) {
            out.push(ValidationWarning::new(
                RuleId::SnakeCaseNaming,
                Severity::Warning,
                None,
                format!("workflow name '{}' is not snake_case", workflow.name),
                Some(suggested),
            ));
        }
        for node in &workflow.nodes {
            if let Some(suggested) = needs_rename(&node.name) {
                out.push(ValidationWarning::new(
                    RuleId::SnakeCaseNaming,
                    Severity::Warning,
                    Some(node.name.clone()),
                    format!("node name '{}' is not snake_case", node.name),
                    Some(suggested),
                ));
            }
        }
        out
    }
}

pub struct ExplicitReferenceRule;

impl WorkflowRule for ExplicitReferenceRule {
    fn id(&self) -> RuleId {
        RuleId::ExplicitReference
    }

    fn validate(&self, workflow: &Workflow) -> Vec<ValidationWarning> {
        workflow
            .nodes
            .iter()
            .filter(|node| patterns::has_implicit_json(&parameter_text(node)))
            .map(|node| {
                ValidationWarning::new(
                    RuleId::ExplicitReference,
                    Severity::Warning,
                    Some(node.name.clone()),
                    format!(
                        "node '{}' reads $json implicitly and depends on whichever node is wired upstream",
                        node.name
                    ),
                    Some("reference the source node explicitly: $('node_name').item.json.field".to_string()),
                )
            })
            .collect()
    }
}

pub struct HardcodedIdRule;

impl WorkflowRule for HardcodedIdRule {
    fn id(&self) -> RuleId {
        RuleId::HardcodedId
    }

    fn validate(&self, workflow: &Workflow) -> Vec<ValidationWarning> {
        workflow
            .nodes
            .iter()
            .filter(|node| patterns::hardcoded_identifier().is_match(&parameter_text(node)))
            .map(|node| {
                ValidationWarning::new(
                    RuleId::HardcodedId,
                    Severity::Info,
                    Some(node.name.clone()),
                    format!("node '{}' contains a hardcoded resource identifier", node.name),
                    Some("move identifiers into workflow variables or upstream data".to_string()),
                )
            })
            .collect()
    }
}

pub struct HardcodedSecretRule;

impl WorkflowRule for HardcodedSecretRule {
    fn id(&self) -> RuleId {
        RuleId::HardcodedSecret
    }

    fn validate(&self, workflow: &Workflow) -> Vec<ValidationWarning> {
        let mut out = Vec::new();
        for node in &workflow.nodes {
            let text = parameter_text(node);
            let literal_secret = patterns::secret_assignment()
                .captures_iter(&text)
                .filter_map(|caps| caps.get(2))
                .any(|value| {
                    let value = value.as_str();
                    !value.starts_with('=') && !value.contains("{{")
                });
            if literal_secret {
                out.push(ValidationWarning::new(
                    RuleId::HardcodedSecret,
                    Severity::Info,
                    Some(node.name.clone()),
                    format!("node '{}' appears to embed a literal secret", node.name),
                    Some("store secrets in credentials or read them via {{ $env.NAME }}".to_string()),
                ));
            }
        }
        out
    }
}

pub struct CodeNodeUsageRule;

impl WorkflowRule for CodeNodeUsageRule {
    fn id(&self) -> RuleId {
        RuleId::CodeNodeUsage
    }

    fn validate(&self, workflow: &Workflow) -> Vec<ValidationWarning> {
        workflow
            .nodes
            .iter()
            .filter(|node| CODE_NODE_TYPES.contains(&node.node_type.as_str()))
            .map(|node| {
                ValidationWarning::new(
                    RuleId::CodeNodeUsage,
                    Severity::Info,
                    Some(node.name.clone()),
                    format!("node '{}' runs custom code ({})", node.name, node.node_type),
                    Some("prefer a built-in node when one covers the transformation".to_string()),
                )
            })
            .collect()
    }
}

/// Companion flag state on an agent node: (hasOutputParser ok, promptType ok).
pub fn structured_output_flags(parameters: &Value) -> (bool, bool) {
    let has_parser = parameters.get(HAS_OUTPUT_PARSER_KEY) == Some(&Value::Bool(true));
    let prompt_defined = parameters.get(PROMPT_TYPE_KEY).and_then(Value::as_str) == Some(PROMPT_TYPE_DEFINE);
    (has_parser, prompt_defined)
}

pub fn configures_output_parser(parameters: &Value) -> bool {
    OUTPUT_PARSER_KEYS
        .iter()
        .any(|key| parameters.get(*key).is_some_and(|value| !value.is_null()))
}

pub struct AiStructuredOutputRule;

impl WorkflowRule for AiStructuredOutputRule {
    fn id(&self) -> RuleId {
        RuleId::AiStructuredOutput
    }

    fn validate(&self, workflow: &Workflow) -> Vec<ValidationWarning> {
        let mut out = Vec::new();
        for node in &workflow.nodes {
            if !is_ai_agent_type(&node.node_type) || !configures_output_parser(&node.parameters) {
                continue;
            }
            let (has_parser, prompt_defined) = structured_output_flags(&node.parameters);
            if has_parser && prompt_defined {
                continue;
            }
            out.push(ValidationWarning::new(
                RuleId::AiStructuredOutput,
                Severity::Warning,
                Some(node.name.clone()),
                format!(
                    "node '{}' configures an output parser but is not set up for structured output",
                    node.name
                ),
                Some(format!(
                    "set {}=true and {}=\"{}\"",
                    HAS_OUTPUT_PARSER_KEY, PROMPT_TYPE_KEY, PROMPT_TYPE_DEFINE
                )),
            ));
        }
        out
    }
}

pub struct InMemoryStorageRule;

impl WorkflowRule for InMemoryStorageRule {
    fn id(&self) -> RuleId {
        RuleId::InMemoryStorage
    }

    fn validate(&self, workflow: &Workflow) -> Vec<ValidationWarning> {
        workflow
            .nodes
            .iter()
            .filter(|node| EPHEMERAL_STORAGE_TYPES.contains(&node.node_type.as_str()))
            .map(|node| {
                ValidationWarning::new(
                    RuleId::InMemoryStorage,
                    Severity::Warning,
                    Some(node.name.clone()),
                    format!("node '{}' keeps its data in process memory and loses it on restart", node.name),
                    Some("use a persistent memory or vector store backend".to_string()),
                )
            })
            .collect()
    }
}

pub struct OrphanedNodeRule;

impl WorkflowRule for OrphanedNodeRule {
    fn id(&self) -> RuleId {
        RuleId::OrphanedNode
    }

    fn validate(&self, workflow: &Workflow) -> Vec<ValidationWarning> {
        let mut connected: HashSet<&str> = HashSet::new();
        for (source, _, _, target) in workflow.edges() {
            connected.insert(source);
            connected.insert(target.node.as_str());
        }

        workflow
            .nodes
            .iter()
            .filter(|node| !connected.contains(node.name.as_str()))
            .filter(|node| !is_trigger_type(&node.node_type))
            .filter(|node| !ANNOTATION_TYPES.contains(&node.node_type.as_str()))
            .map(|node| {
                ValidationWarning::new(
                    RuleId::OrphanedNode,
                    Severity::Warning,
                    Some(node.name.clone()),
                    format!("node '{}' is not connected to any other node", node.name),
                    Some("connect the node or remove it".to_string()),
                )
            })
            .collect()
    }
}
