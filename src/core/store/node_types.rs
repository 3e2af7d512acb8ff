use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeInfo {
    pub name: String,
    pub display_name: String,
}

/// Catalogue of node types known to the automation service.
pub trait NodeTypeRegistry: Send + Sync {
    fn known_types(&self) -> BTreeSet<String>;
    fn describe(&self, node_type: &str) -> Option<NodeTypeInfo>;
}

const BUILT_IN_TYPES: &[(&str, &str)] = &[
    ("n8n-nodes-base.webhook", "Webhook"),
    ("n8n-nodes-base.scheduleTrigger", "Schedule Trigger"),
    ("n8n-nodes-base.manualTrigger", "Manual Trigger"),
    ("n8n-nodes-base.cron", "Cron"),
    ("n8n-nodes-base.start", "Start"),
    ("n8n-nodes-base.formTrigger", "Form Trigger"),
    ("n8n-nodes-base.httpRequest", "HTTP Request"),
    ("n8n-nodes-base.set", "Edit Fields (Set)"),
    ("n8n-nodes-base.if", "If"),
    ("n8n-nodes-base.switch", "Switch"),
    ("n8n-nodes-base.merge", "Merge"),
    ("n8n-nodes-base.filter", "Filter"),
    ("n8n-nodes-base.splitInBatches", "Loop Over Items"),
    ("n8n-nodes-base.noOp", "No Operation"),
    ("n8n-nodes-base.wait", "Wait"),
    ("n8n-nodes-base.code", "Code"),
    ("n8n-nodes-base.function", "Function"),
    ("n8n-nodes-base.executeWorkflow", "Execute Workflow"),
    ("n8n-nodes-base.respondToWebhook", "Respond to Webhook"),
    ("n8n-nodes-base.stickyNote", "Sticky Note"),
    ("n8n-nodes-base.slack", "Slack"),
    ("n8n-nodes-base.gmail", "Gmail"),
    ("n8n-nodes-base.googleSheets", "Google Sheets"),
    ("n8n-nodes-base.postgres", "Postgres"),
    ("@n8n/n8n-nodes-langchain.agent", "AI Agent"),
    ("@n8n/n8n-nodes-langchain.chainLlm", "Basic LLM Chain"),
    ("@n8n/n8n-nodes-langchain.chatTrigger", "Chat Trigger"),
    ("@n8n/n8n-nodes-langchain.lmChatOpenAi", "OpenAI Chat Model"),
    ("@n8n/n8n-nodes-langchain.outputParserStructured", "Structured Output Parser"),
    ("@n8n/n8n-nodes-langchain.memoryBufferWindow", "Window Buffer Memory"),
    ("@n8n/n8n-nodes-langchain.memoryPostgresChat", "Postgres Chat Memory"),
];

/// Fixed in-process catalogue.
#[derive(Debug, Clone)]
pub struct StaticNodeTypeRegistry {
    types: Vec<NodeTypeInfo>,
}

impl StaticNodeTypeRegistry {
    pub fn new(types: Vec<NodeTypeInfo>) -> Self {
        Self { types }
    }

    pub fn built_in() -> Self {
        Self::new(
            BUILT_IN_TYPES
                .iter()
                .map(|(name, display_name)| NodeTypeInfo {
                    name: name.to_string(),
                    display_name: display_name.to_string(),
                })
                .collect(),
        )
    }
}

impl Default for StaticNodeTypeRegistry {
    fn default() -> Self {
        Self::built_in()
    }
}

impl NodeTypeRegistry for StaticNodeTypeRegistry {
    fn known_types(&self) -> BTreeSet<String> {
        self.types.iter().map(|info| info.name.clone()).collect()
    }

    fn describe(&self, node_type: &str) -> Option<NodeTypeInfo> {
        self.types.iter().find(|info| info.name == node_type).cloned()
    }
}
