use crate::core::workflow_graph::schema::Workflow;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod naming;
pub mod node_types;
pub mod partial;
pub mod rules;

pub use naming::{is_snake_case, normalize_name};
pub use node_types::validate_node_types;
pub use partial::validate_partial_update;
pub use rules::*;

/// Diagnostic severity levels emitted by validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    fn rank(&self) -> u8 {
        match self {
            Severity::Error => 3,
            Severity::Warning => 2,
            Severity::Info => 1,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Identifier of the rule that produced a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    SnakeCaseNaming,
    ExplicitReference,
    HardcodedId,
    HardcodedSecret,
    CodeNodeUsage,
    AiStructuredOutput,
    InMemoryStorage,
    OrphanedNode,
    NodeNotFound,
    ParameterLoss,
    UnknownNodeType,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::SnakeCaseNaming => "snake_case_naming",
            RuleId::ExplicitReference => "explicit_reference",
            RuleId::HardcodedId => "hardcoded_id",
            RuleId::HardcodedSecret => "hardcoded_secret",
            RuleId::CodeNodeUsage => "code_node_usage",
            RuleId::AiStructuredOutput => "ai_structured_output",
            RuleId::InMemoryStorage => "in_memory_storage",
            RuleId::OrphanedNode => "orphaned_node",
            RuleId::NodeNotFound => "node_not_found",
            RuleId::ParameterLoss => "parameter_loss",
            RuleId::UnknownNodeType => "unknown_node_type",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Individual finding emitted by a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationWarning {
    pub rule: RuleId,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationWarning {
    pub fn new(
        rule: RuleId,
        severity: Severity,
        node: Option<String>,
        message: impl Into<String>,
        suggestion: Option<String>,
    ) -> Self {
        Self {
            rule,
            severity,
            node,
            message: message.into(),
            suggestion,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Outcome of running every rule over a workflow.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub warnings: Vec<ValidationWarning>,
}

/// Trait implemented by workflow validation rules.
pub trait WorkflowRule: Send + Sync {
    fn id(&self) -> RuleId;
    fn validate(&self, workflow: &Workflow) -> Vec<ValidationWarning>;
}

/// Registry that runs all built-in workflow rules.
pub struct RuleRegistry {
    rules: Vec<Box<dyn WorkflowRule>>,
}

impl RuleRegistry {
    /// Construct a registry populated with the built-in rules.
    pub fn new() -> Self {
        Self {
            rules: built_in_rules(),
        }
    }

    /// Run all registered rules against the workflow.
    /// The results are sorted by `(severity desc, rule asc, node asc)`.
    pub fn run(&self, workflow: &Workflow) -> Vec<ValidationWarning> {
        let mut results = Vec::new();
        for rule in &self.rules {
            let found = rule.validate(workflow);
            tracing::debug!(rule = %rule.id(), findings = found.len(), "validation rule finished");
            results.extend(found);
        }
        sort_warnings(&mut results);
        results
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn sort_warnings(warnings: &mut [ValidationWarning]) {
    warnings.sort_by(|a, b| {
        b.severity
            .rank()
            .cmp(&a.severity.rank())
            .then(a.rule.cmp(&b.rule))
            .then(a.node.cmp(&b.node))
    });
}

/// Validate a workflow with the built-in rules. `valid` is false when any
/// warning has error severity.
pub fn validate(workflow: &Workflow) -> ValidationReport {
    let warnings = RuleRegistry::new().run(workflow);
    let valid = !warnings.iter().any(ValidationWarning::is_error);
    ValidationReport { valid, warnings }
}
