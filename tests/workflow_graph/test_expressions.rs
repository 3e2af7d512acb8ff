use flowguard::core::workflow_graph::expression::{
    check_circular_references, extract_expressions, validate_expressions, ExpressionAnalyzer,
    ExpressionIssueKind,
};
use flowguard::core::workflow_graph::lint::Severity;
use flowguard::core::workflow_graph::schema::{Node, Workflow};
use serde_json::{json, Value};

fn single(parameters: Value) -> Workflow {
    let mut workflow = Workflow::new("expressions");
    workflow.nodes.push(Node::new("fetch", "n8n-nodes-base.httpRequest"));
    workflow
        .nodes
        .push(Node::new("use", "n8n-nodes-base.set").with_parameters(parameters));
    workflow
}

fn kinds(workflow: &Workflow) -> Vec<ExpressionIssueKind> {
    validate_expressions(workflow).iter().map(|i| i.kind).collect()
}

#[test]
fn reference_to_missing_node_is_an_error() {
    let workflow = single(json!({"url": "={{ $('missing').item.json.url }}"}));
    let issues = validate_expressions(&workflow);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, ExpressionIssueKind::UnresolvedReference);
    assert_eq!(issues[0].severity, Severity::Error);
    assert_eq!(issues[0].node, "use");
    assert_eq!(issues[0].path, "url");
    assert!(issues[0].message.contains("'missing'"));

    let resolved = single(json!({"url": "={{ $('fetch').item.json.url }}"}));
    assert!(validate_expressions(&resolved).is_empty());
}

#[test]
fn deprecated_accessor_suggests_explicit_call() {
    let workflow = single(json!({"text": "status: {{ $node[\"fetch\"].json.status }}"}));
    let issues = validate_expressions(&workflow);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, ExpressionIssueKind::DeprecatedNodeAccessor);
    assert_eq!(issues[0].suggestion.as_deref(), Some("$('fetch').item.json"));
    assert_eq!(issues[0].expression, "{{ $node[\"fetch\"].json.status }}");
}

#[test]
fn implicit_and_execution_context_accessors() {
    let workflow = single(json!({
        "a": "={{ $json.name }}",
        "b": "={{ $input.first().json.name }}"
    }));
    let issues = validate_expressions(&workflow);
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].kind, ExpressionIssueKind::ImplicitContext);
    assert_eq!(issues[0].severity, Severity::Warning);
    assert_eq!(issues[1].kind, ExpressionIssueKind::ExecutionContext);
    assert_eq!(issues[1].severity, Severity::Info);
}

#[test]
fn structural_problems_are_errors() {
    assert_eq!(
        kinds(&single(json!({"t": "Hello {{ $('fetch').item.json.name"}))),
        vec![ExpressionIssueKind::UnclosedExpression]
    );
    assert_eq!(
        kinds(&single(json!({"t": "={{ Math.max(1, 2 }}"}))),
        vec![ExpressionIssueKind::UnbalancedParentheses]
    );
    assert_eq!(
        kinds(&single(json!({"t": "={{ $('fetch').all()[0 }}"}))),
        vec![ExpressionIssueKind::UnbalancedBrackets]
    );
}

#[test]
fn deep_access_without_optional_chaining_is_informational() {
    let plain = single(json!({"t": "={{ $('fetch').item.json.user.address }}"}));
    assert_eq!(kinds(&plain), vec![ExpressionIssueKind::DeepPropertyAccess]);

    let guarded = single(json!({"t": "={{ $('fetch').item.json.user?.address }}"}));
    assert!(validate_expressions(&guarded).is_empty());
}

#[test]
fn extraction_walks_nested_parameters() {
    let workflow = single(json!({
        "options": {"headers": [{"value": "{{ 1 }} and {{ 2 }}"}]},
        "plain": "no expression here",
        "count": 4
    }));
    let found: Vec<(String, String)> = extract_expressions(&workflow)
        .into_iter()
        .map(|e| (e.path, e.raw))
        .collect();
    assert_eq!(
        found,
        vec![
            ("options.headers[0].value".to_string(), "{{ 1 }}".to_string()),
            ("options.headers[0].value".to_string(), "{{ 2 }}".to_string()),
        ]
    );
}

#[test]
fn mutual_references_form_one_cycle() {
    let mut workflow = Workflow::new("cycles");
    workflow.nodes.push(
        Node::new("a", "n8n-nodes-base.set").with_parameters(json!({"v": "={{ $('b').item.json.x }}"})),
    );
    workflow.nodes.push(
        Node::new("b", "n8n-nodes-base.set").with_parameters(json!({"v": "={{ $('a').item.json.x }}"})),
    );
    workflow.nodes.push(
        Node::new("c", "n8n-nodes-base.set").with_parameters(json!({"v": "={{ $('a').item.json.x }}"})),
    );

    assert_eq!(
        check_circular_references(&workflow),
        vec![vec!["a".to_string(), "b".to_string(), "a".to_string()]]
    );
}

#[test]
fn self_reference_is_a_cycle() {
    let mut workflow = Workflow::new("self");
    workflow.nodes.push(
        Node::new("loop", "n8n-nodes-base.set").with_parameters(json!({"v": "={{ $('loop').item.json.x }}"})),
    );
    let report = ExpressionAnalyzer::analyze(&workflow);
    assert!(report.issues.is_empty());
    assert_eq!(report.cycles, vec![vec!["loop".to_string(), "loop".to_string()]]);
}

#[test]
fn acyclic_references_report_no_cycles() {
    let workflow = single(json!({"v": "={{ $('fetch').item.json.x }}"}));
    assert!(check_circular_references(&workflow).is_empty());
}
