//! Static analysis of the `{{ ... }}` template expressions embedded in node
//! parameters.
//!
//! Extraction is pattern based (see [`patterns`]); nested braces or brace
//! characters inside expression string literals are not understood and may
//! yield spurious or missed findings.

use crate::core::workflow_graph::lint::Severity;
use crate::core::workflow_graph::patterns;
use crate::core::workflow_graph::schema::Workflow;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Category of an expression finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionIssueKind {
    ImplicitContext,
    ExecutionContext,
    UnresolvedReference,
    UnclosedExpression,
    UnbalancedParentheses,
    UnbalancedBrackets,
    DeprecatedNodeAccessor,
    DeepPropertyAccess,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionIssue {
    pub node: String,
    pub path: String,
    pub expression: String,
    pub kind: ExpressionIssueKind,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// An expression found in a node's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedExpression {
    pub node: String,
    pub path: String,
    pub raw: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpressionReport {
    pub issues: Vec<ExpressionIssue>,
    pub cycles: Vec<Vec<String>>,
}

/// Collect every expression in every node, in node then document order.
pub fn extract_expressions(workflow: &Workflow) -> Vec<ExtractedExpression> {
    let mut out = Vec::new();
    for node in &workflow.nodes {
        collect(&node.parameters, "", &node.name, &mut out);
    }
    out
}

fn collect(value: &Value, path: &str, node: &str, out: &mut Vec<ExtractedExpression>) {
    match value {
        Value::String(text) => {
            for raw in expressions_in(text) {
                out.push(ExtractedExpression {
                    node: node.to_string(),
                    path: path.to_string(),
                    raw,
                });
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect(item, &format!("{}[{}]", path, index), node, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                collect(item, &child, node, out);
            }
        }
        _ => {}
    }
}

/// Expressions within one string. A string starting with `={` is a single
/// expression as a whole; otherwise each `{{ ... }}` marker is one, plus a
/// trailing `{{` that never closes.
fn expressions_in(text: &str) -> Vec<String> {
    if text.starts_with("={") {
        return vec![text.to_string()];
    }
    let mut out = Vec::new();
    let mut tail_start = 0;
    for found in patterns::template_marker().find_iter(text) {
        out.push(found.as_str().to_string());
        tail_start = found.end();
    }
    if let Some(open) = text[tail_start..].find("{{") {
        out.push(text[tail_start + open..].to_string());
    }
    out
}

/// Strip the `=` prefix and the outer `{{ }}` pair.
fn strip_wrapper(raw: &str) -> &str {
    let inner = raw.strip_prefix('=').unwrap_or(raw).trim();
    let inner = inner.strip_prefix("{{").unwrap_or(inner);
    let inner = inner.strip_suffix("}}").unwrap_or(inner);
    inner.trim()
}

fn count(text: &str, c: char) -> usize {
    text.chars().filter(|candidate| *candidate == c).count()
}

/// Run every per-expression check.
pub fn validate_expressions(workflow: &Workflow) -> Vec<ExpressionIssue> {
    let node_names: HashSet<&str> = workflow.nodes.iter().map(|node| node.name.as_str()).collect();
    let mut issues = Vec::new();
    for extracted in extract_expressions(workflow) {
        check_expression(&extracted, &node_names, &mut issues);
    }
    tracing::debug!(issues = issues.len(), "expression validation finished");
    issues
}

fn check_expression(
    extracted: &ExtractedExpression,
    node_names: &HashSet<&str>,
    issues: &mut Vec<ExpressionIssue>,
) {
    let raw = extracted.raw.as_str();
    let inner = strip_wrapper(raw);
    let mut push = |kind, severity, message: String, suggestion: Option<String>| {
        issues.push(ExpressionIssue {
            node: extracted.node.clone(),
            path: extracted.path.clone(),
            expression: raw.to_string(),
            kind,
            severity,
            message,
            suggestion,
        });
    };

    if patterns::has_implicit_json(inner) {
        push(
            ExpressionIssueKind::ImplicitContext,
            Severity::Warning,
            "$json depends on the node wired upstream".to_string(),
            Some("use $('node_name').item.json instead".to_string()),
        );
    }
    if patterns::execution_input_token().is_match(inner) {
        push(
            ExpressionIssueKind::ExecutionContext,
            Severity::Info,
            "$input reads the current execution input; ensure this is intentional".to_string(),
            None,
        );
    }
    for name in patterns::explicit_reference_names(inner) {
        if !node_names.contains(name.as_str()) {
            push(
                ExpressionIssueKind::UnresolvedReference,
                Severity::Error,
                format!("referenced node '{}' does not exist", name),
                None,
            );
        }
    }
    if raw.matches("{{").count() > raw.matches("}}").count() {
        push(
            ExpressionIssueKind::UnclosedExpression,
            Severity::Error,
            "expression is missing its closing }}".to_string(),
            None,
        );
    }
    if count(inner, '(') != count(inner, ')') {
        push(
            ExpressionIssueKind::UnbalancedParentheses,
            Severity::Error,
            "unbalanced parentheses".to_string(),
            None,
        );
    }
    if count(inner, '[') != count(inner, ']') {
        push(
            ExpressionIssueKind::UnbalancedBrackets,
            Severity::Error,
            "unbalanced brackets".to_string(),
            None,
        );
    }
    for caps in patterns::deprecated_node_accessor().captures_iter(inner) {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        push(
            ExpressionIssueKind::DeprecatedNodeAccessor,
            Severity::Warning,
            format!("$node[\"{}\"] is deprecated", name),
            Some(format!("{}.item.json", patterns::explicit_call(name))),
        );
    }
    if patterns::deep_json_chain().is_match(inner) && !inner.contains("?.") {
        push(
            ExpressionIssueKind::DeepPropertyAccess,
            Severity::Info,
            "deep property access fails when an intermediate field is missing".to_string(),
            Some("use optional chaining (?.) for nested fields".to_string()),
        );
    }
}

/// Map each node to the node names it references explicitly.
pub fn reference_graph(workflow: &Workflow) -> IndexMap<String, IndexSet<String>> {
    let mut graph: IndexMap<String, IndexSet<String>> = IndexMap::new();
    for extracted in extract_expressions(workflow) {
        for name in patterns::explicit_reference_names(&extracted.raw) {
            graph.entry(extracted.node.clone()).or_default().insert(name);
        }
    }
    graph
}

/// Find reference cycles between nodes. Each cycle ends with the node that
/// closed it; cycles over the same set of nodes are reported once.
pub fn check_circular_references(workflow: &Workflow) -> Vec<Vec<String>> {
    let graph = reference_graph(workflow);
    let mut found = Vec::new();
    for start in graph.keys() {
        let mut path = Vec::new();
        walk(start, &graph, &mut path, &mut found);
    }

    let mut seen: Vec<Vec<String>> = Vec::new();
    let mut cycles = Vec::new();
    for cycle in found {
        let mut key = cycle.clone();
        key.sort();
        key.dedup();
        if !seen.contains(&key) {
            seen.push(key);
            cycles.push(cycle);
        }
    }
    cycles
}

fn walk(
    node: &str,
    graph: &IndexMap<String, IndexSet<String>>,
    path: &mut Vec<String>,
    found: &mut Vec<Vec<String>>,
) {
    if let Some(position) = path.iter().position(|visited| visited == node) {
        let mut cycle = path[position..].to_vec();
        cycle.push(node.to_string());
        found.push(cycle);
        return;
    }
    path.push(node.to_string());
    if let Some(targets) = graph.get(node) {
        for target in targets {
            walk(target, graph, path, found);
        }
    }
    path.pop();
}

/// Issues and reference cycles in one pass.
pub struct ExpressionAnalyzer;

impl ExpressionAnalyzer {
    pub fn analyze(workflow: &Workflow) -> ExpressionReport {
        ExpressionReport {
            issues: validate_expressions(workflow),
            cycles: check_circular_references(workflow),
        }
    }
}
