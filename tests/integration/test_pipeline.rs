use flowguard::core::config::VersionControlConfig;
use flowguard::core::store::{InMemoryWorkflowStore, WorkflowStore};
use flowguard::core::workflow_graph::patch::{
    ConnectionSpec, NewNode, NodeUpdate, PatchEngine, PatchOperation, SequentialIdGenerator,
};
use flowguard::core::workflow_graph::pipeline::{
    apply_patch_and_persist, apply_patch_and_persist_with, cleanup, PRE_PATCH_REASON,
};
use flowguard::core::workflow_graph::schema::{ConnectionTarget, Node, Workflow};
use flowguard::core::workflow_graph::transform::FixKind;
use flowguard::core::workflow_graph::versions::VersionStore;
use serde_json::{json, Map};
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    store: InMemoryWorkflowStore,
    versions: VersionStore,
    engine: PatchEngine,
}

/// A store seeded with an already cleaned-up two node workflow under `wf-1`.
fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let versions = VersionStore::new(VersionControlConfig::at(dir.path().join("versions")));

    let mut raw = Workflow::new("orders_sync");
    raw.id = "wf-1".to_string();
    raw.nodes.push(Node::new("hook", "n8n-nodes-base.webhook").with_id("n-hook"));
    raw.nodes.push(
        Node::new("save", "n8n-nodes-base.postgres")
            .with_id("n-save")
            .with_parameters(json!({"table": "orders", "schema": "public"})),
    );
    raw.connect("hook", "main", 0, ConnectionTarget::new("save", "main", 0));

    let store = InMemoryWorkflowStore::new(Arc::new(SequentialIdGenerator::new("wf")));
    store.seed(cleanup(&raw).workflow);

    Harness {
        _dir: dir,
        store,
        versions,
        engine: PatchEngine::new(Box::new(SequentialIdGenerator::new("node"))),
    }
}

#[tokio::test]
async fn no_op_patch_snapshots_but_does_not_write() {
    let h = harness();
    let before = h.store.get("wf-1").await.unwrap();

    let outcome = apply_patch_and_persist_with(&h.engine, &h.store, &h.versions, "wf-1", &[])
        .await
        .unwrap();

    assert!(!outcome.persisted);
    assert!(outcome.fixes.is_empty());
    let snapshot = outcome.snapshot.expect("first patch takes a snapshot");
    assert_eq!(snapshot.reason, PRE_PATCH_REASON);
    assert_eq!(h.store.get("wf-1").await.unwrap(), before);

    // unchanged content is not snapshotted twice
    let again = apply_patch_and_persist_with(&h.engine, &h.store, &h.versions, "wf-1", &[])
        .await
        .unwrap();
    assert!(again.snapshot.is_none());
    assert_eq!(h.versions.list("wf-1").unwrap().len(), 1);
}

#[tokio::test]
async fn added_node_is_cleaned_up_and_persisted() {
    let h = harness();
    let operations = vec![
        PatchOperation::AddNode {
            node: NewNode {
                id: None,
                name: "Notify Team".to_string(),
                node_type: "n8n-nodes-base.slack".to_string(),
                type_version: 2.0,
                position: [0.0, 0.0],
                parameters: Some(json!({"channel": "#orders"})),
                credentials: None,
                disabled: None,
                extra: Map::new(),
            },
        },
        PatchOperation::AddConnection(ConnectionSpec::main("save", "Notify Team")),
    ];

    let outcome = apply_patch_and_persist_with(&h.engine, &h.store, &h.versions, "wf-1", &operations)
        .await
        .unwrap();

    assert!(outcome.persisted);
    assert!(outcome.patch_warnings.is_empty());
    assert!(outcome.residual.is_empty(), "{:?}", outcome.residual);
    assert_eq!(outcome.fixes.len(), 1);
    assert_eq!(outcome.fixes[0].kind, FixKind::RenameNode);

    let stored = h.store.get("wf-1").await.unwrap();
    let notify = stored.node("notify_team").expect("renamed node is stored");
    assert_eq!(notify.id, "node-1");
    assert_eq!(stored.upstream_of("notify_team"), vec!["save"]);
    assert!(stored.updated_at.is_some());

    // the snapshot holds the state before the patch
    let snapshot = outcome.snapshot.unwrap();
    assert_eq!(snapshot.node_count, 2);
    let saved = h.versions.require("wf-1", &snapshot.id).unwrap();
    assert!(!saved.workflow.has_node("Notify Team"));
    assert!(!saved.workflow.has_node("notify_team"));
}

#[tokio::test]
async fn parameter_replacement_warnings_are_reported() {
    let h = harness();
    let operations = vec![PatchOperation::UpdateNode {
        name: "save".to_string(),
        properties: NodeUpdate {
            parameters: Some(json!({"table": "orders_v2"})),
            ..NodeUpdate::default()
        },
    }];

    let outcome = apply_patch_and_persist(&h.store, &h.versions, "wf-1", &operations)
        .await
        .unwrap();

    assert!(outcome.persisted);
    assert_eq!(outcome.patch_warnings.len(), 1);
    assert!(outcome.patch_warnings[0].contains("schema"));
    let stored = h.store.get("wf-1").await.unwrap();
    assert_eq!(stored.node("save").unwrap().parameters, json!({"table": "orders_v2"}));
}

#[tokio::test]
async fn missing_workflow_fails_before_any_snapshot() {
    let h = harness();
    let err = apply_patch_and_persist(&h.store, &h.versions, "wf-404", &[PatchOperation::Activate])
        .await
        .unwrap_err();
    assert_eq!(err.code, "FG-STORE-001");
    assert!(h.versions.list("wf-404").unwrap().is_empty());
    assert_eq!(h.versions.stats().unwrap().snapshots, 0);
}

#[test]
fn cleanup_repairs_and_formats_in_one_pass() {
    let mut workflow = Workflow::new("Lead Intake");
    workflow.nodes.push(Node::new("Form", "n8n-nodes-base.formTrigger"));
    workflow.nodes.push(
        Node::new("Enrich", "n8n-nodes-base.set")
            .with_parameters(json!({"email": "={{ $json.email }}", "unused": null})),
    );
    workflow.connect("Form", "main", 0, ConnectionTarget::new("Enrich", "main", 0));

    let outcome = cleanup(&workflow);
    assert!(outcome.changed);
    assert!(outcome.residual.is_empty(), "{:?}", outcome.residual);
    assert_eq!(outcome.workflow.name, "lead_intake");
    assert_eq!(
        outcome.workflow.node("enrich").unwrap().parameters,
        json!({"email": "={{ $('form').item.json.email }}"})
    );
    assert_eq!(outcome.workflow.nodes[0].name, "form");
}
