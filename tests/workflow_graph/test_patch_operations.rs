use flowguard::core::workflow_graph::patch::{
    parse_operations, ConnectionSpec, NewNode, NodeUpdate, PatchEngine, PatchOperation,
    SequentialIdGenerator,
};
use flowguard::core::workflow_graph::schema::{ConnectionTarget, Node, Workflow};
use serde_json::{json, Map};

fn engine() -> PatchEngine {
    PatchEngine::new(Box::new(SequentialIdGenerator::new("node")))
}

fn sample() -> Workflow {
    let mut workflow = Workflow::new("sample");
    workflow.id = "wf-1".to_string();
    workflow.nodes.push(Node::new("hook", "n8n-nodes-base.webhook").with_id("a"));
    workflow.nodes.push(
        Node::new("http", "n8n-nodes-base.httpRequest")
            .with_id("b")
            .with_parameters(json!({"url": "https://api", "method": "POST", "body": "{}"})),
    );
    workflow.nodes.push(Node::new("notify", "n8n-nodes-base.slack").with_id("c"));
    workflow.connect("hook", "main", 0, ConnectionTarget::new("http", "main", 0));
    workflow.connect("http", "main", 0, ConnectionTarget::new("notify", "main", 0));
    workflow.connect("hook", "main", 0, ConnectionTarget::new("notify", "main", 0));
    workflow
}

fn new_node(name: &str, node_type: &str) -> NewNode {
    NewNode {
        id: None,
        name: name.to_string(),
        node_type: node_type.to_string(),
        type_version: 1.0,
        position: [0.0, 0.0],
        parameters: None,
        credentials: None,
        disabled: None,
        extra: Map::new(),
    }
}

#[test]
fn parameter_replacement_warns_about_every_dropped_key() {
    let workflow = sample();
    let operations = vec![PatchOperation::UpdateNode {
        name: "http".to_string(),
        properties: NodeUpdate {
            parameters: Some(json!({"url": "https://other"})),
            ..NodeUpdate::default()
        },
    }];

    let result = engine().apply(&workflow, &operations);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("method"));
    assert!(result.warnings[0].contains("body"));
    assert_eq!(
        result.workflow.node("http").unwrap().parameters,
        json!({"url": "https://other"})
    );
    // the input is never mutated
    assert_eq!(workflow.node("http").unwrap().parameters["method"], json!("POST"));
}

#[test]
fn remove_node_leaves_no_dangling_connections() {
    let workflow = sample();
    for name in ["hook", "http", "notify"] {
        let result = engine().apply(
            &workflow,
            &[PatchOperation::RemoveNode {
                name: name.to_string(),
            }],
        );
        assert!(result.warnings.is_empty());
        assert!(!result.workflow.has_node(name));
        assert!(!result.workflow.connections.contains_key(name));
        assert!(result
            .workflow
            .edges()
            .all(|(source, _, _, target)| source != name && target.node != name));
    }
}

#[test]
fn add_node_uses_injected_ids_and_skips_duplicates() {
    let workflow = sample();
    let mut explicit = new_node("log", "n8n-nodes-base.noOp");
    explicit.id = Some("given".to_string());
    let operations = vec![
        PatchOperation::AddNode {
            node: new_node("set_fields", "n8n-nodes-base.set"),
        },
        PatchOperation::AddNode { node: explicit },
        PatchOperation::AddNode {
            node: new_node("http", "n8n-nodes-base.code"),
        },
        PatchOperation::AddNode {
            node: new_node("wait", "n8n-nodes-base.wait"),
        },
    ];

    let result = engine().apply(&workflow, &operations);
    let ids: Vec<(&str, &str)> = result
        .workflow
        .nodes
        .iter()
        .skip(3)
        .map(|n| (n.name.as_str(), n.id.as_str()))
        .collect();
    assert_eq!(ids, vec![("set_fields", "node-1"), ("log", "given"), ("wait", "node-2")]);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("'http' already exists"));
    assert_eq!(result.workflow.node("http").unwrap().node_type, "n8n-nodes-base.httpRequest");
}

#[test]
fn connections_are_added_once_and_removed_precisely() {
    let workflow = sample();
    let result = engine().apply(
        &workflow,
        &[
            PatchOperation::AddConnection(ConnectionSpec::main("hook", "http")),
            PatchOperation::AddConnection(ConnectionSpec {
                source_index: 1,
                ..ConnectionSpec::main("http", "ghost")
            }),
            PatchOperation::RemoveConnection(ConnectionSpec::main("hook", "notify")),
        ],
    );

    assert_eq!(result.warnings, vec!["addConnection: node 'ghost' does not exist".to_string()]);
    let hook_targets = &result.workflow.connections["hook"]["main"][0];
    assert_eq!(hook_targets, &vec![ConnectionTarget::new("http", "main", 0)]);
    let http_slots = &result.workflow.connections["http"]["main"];
    assert_eq!(http_slots.len(), 2);
    assert_eq!(http_slots[1], vec![ConnectionTarget::new("ghost", "main", 0)]);
}

#[test]
fn rename_through_update_node_rewrites_connections() {
    let workflow = sample();
    let result = engine().apply(
        &workflow,
        &[PatchOperation::UpdateNode {
            name: "http".to_string(),
            properties: NodeUpdate {
                name: Some("call_api".to_string()),
                disabled: Some(true),
                ..NodeUpdate::default()
            },
        }],
    );
    assert!(result.warnings.is_empty());
    let renamed = result.workflow.node("call_api").unwrap();
    assert_eq!(renamed.disabled, Some(true));
    assert!(result.workflow.connections.contains_key("call_api"));
    assert_eq!(result.workflow.upstream_of("call_api"), vec!["hook"]);
    assert_eq!(result.workflow.edge_count(), workflow.edge_count());
}

#[test]
fn missing_targets_become_warnings() {
    let workflow = sample();
    let result = engine().apply(
        &workflow,
        &[
            PatchOperation::RemoveNode {
                name: "ghost".to_string(),
            },
            PatchOperation::UpdateNode {
                name: "ghost".to_string(),
                properties: NodeUpdate::default(),
            },
        ],
    );
    assert_eq!(result.warnings.len(), 2);
    assert_eq!(result.workflow, workflow);
}

#[test]
fn workflow_level_operations() {
    let mut workflow = sample();
    let mut existing = Map::new();
    existing.insert("timezone".to_string(), json!("UTC"));
    existing.insert("executionOrder".to_string(), json!("v0"));
    workflow.settings = Some(existing);

    let operations = parse_operations(json!([
        {"type": "updateSettings", "settings": {"executionOrder": "v1", "saveManualExecutions": true}},
        {"type": "updateName", "name": "renamed_flow"},
        {"type": "activate"}
    ]))
    .unwrap();
    let result = engine().apply(&workflow, &operations);

    let settings = result.workflow.settings.as_ref().unwrap();
    assert_eq!(settings["timezone"], json!("UTC"));
    assert_eq!(settings["executionOrder"], json!("v1"));
    assert_eq!(settings["saveManualExecutions"], json!(true));
    assert_eq!(result.workflow.name, "renamed_flow");
    assert!(result.workflow.active);

    let deactivated = engine().apply(&result.workflow, &[PatchOperation::Deactivate]);
    assert!(!deactivated.workflow.active);
}

#[test]
fn malformed_operations_are_rejected_up_front() {
    let err = parse_operations(json!([
        {"type": "addNode", "node": {"name": "x", "type": "n8n-nodes-base.set"}},
        {"type": "addConnection", "source": "x"}
    ]))
    .unwrap_err();
    assert_eq!(err.code, "FG-PATCH-001");

    let parsed = parse_operations(json!([
        {"type": "addNode", "node": {"name": "x", "type": "n8n-nodes-base.set", "parameters": {"a": 1}}}
    ]))
    .unwrap();
    match &parsed[0] {
        PatchOperation::AddNode { node } => {
            assert_eq!(node.type_version, 1.0);
            assert_eq!(node.parameters, Some(json!({"a": 1})));
        }
        other => panic!("unexpected operation {:?}", other),
    }
}

#[test]
fn untyped_node_properties_are_carried_through() {
    let workflow = sample();
    let operations = parse_operations(json!([
        {"type": "updateNode", "name": "http", "properties": {
            "notes": "hello",
            "onError": "continueRegularOutput",
            "id": "hijack"
        }},
        {"type": "addNode", "node": {
            "name": "inbound",
            "type": "n8n-nodes-base.webhook",
            "webhookId": "abc",
            "retryOnFail": true
        }}
    ]))
    .unwrap();
    let result = engine().apply(&workflow, &operations);

    assert_eq!(result.warnings, vec!["updateNode: the id of 'http' cannot be changed".to_string()]);
    let http = result.workflow.node("http").unwrap();
    assert_eq!(http.id, "b");
    assert_eq!(http.extra["notes"], json!("hello"));
    assert_eq!(http.extra["onError"], json!("continueRegularOutput"));
    assert_eq!(http.parameters["method"], json!("POST"));

    let inbound = result.workflow.node("inbound").unwrap();
    assert_eq!(inbound.extra["webhookId"], json!("abc"));
    assert_eq!(inbound.extra["retryOnFail"], json!(true));
    assert_eq!(inbound.id, "node-1");

    let stored = serde_json::to_value(inbound).unwrap();
    assert_eq!(stored["webhookId"], json!("abc"));
}
