use flowguard::core::config::VersionControlConfig;
use flowguard::core::workflow_graph::schema::{ConnectionTarget, Node, Workflow};
use flowguard::core::workflow_graph::versions::VersionStore;
use serde_json::json;
use tempfile::TempDir;

fn store(dir: &TempDir, max_versions: usize) -> VersionStore {
    VersionStore::new(VersionControlConfig {
        max_versions,
        ..VersionControlConfig::at(dir.path())
    })
}

fn workflow(revision: u32) -> Workflow {
    let mut workflow = Workflow::new("orders");
    workflow.id = "wf-orders".to_string();
    workflow.nodes.push(Node::new("hook", "n8n-nodes-base.webhook"));
    workflow.nodes.push(
        Node::new("save", "n8n-nodes-base.postgres").with_parameters(json!({"revision": revision})),
    );
    workflow.connect("hook", "main", 0, ConnectionTarget::new("save", "main", 0));
    workflow
}

#[test]
fn identical_content_is_saved_once() {
    let dir = TempDir::new().unwrap();
    let versions = store(&dir, 20);

    let first = versions.save(&workflow(1), "before patch").unwrap();
    assert!(first.is_some());

    let mut renamed = workflow(1);
    renamed.name = "orders_renamed".to_string();
    renamed.active = true;
    assert!(versions.save(&renamed, "before patch").unwrap().is_none());

    assert_eq!(versions.list("wf-orders").unwrap().len(), 1);
}

#[test]
fn retention_keeps_the_newest_snapshots() {
    let dir = TempDir::new().unwrap();
    let versions = store(&dir, 20);

    let mut saved = Vec::new();
    for revision in 0..25 {
        let metadata = versions.save(&workflow(revision), "edit").unwrap().unwrap();
        saved.push(metadata.id);
    }

    let listed = versions.list("wf-orders").unwrap();
    assert_eq!(listed.len(), 20);
    let listed_ids: Vec<&str> = listed.iter().map(|m| m.id.as_str()).collect();
    let expected: Vec<&str> = saved[5..].iter().rev().map(String::as_str).collect();
    assert_eq!(listed_ids, expected);
    for pruned in &saved[..5] {
        assert!(versions.get("wf-orders", pruned).unwrap().is_none());
    }
}

#[test]
fn list_is_newest_first_with_metadata() {
    let dir = TempDir::new().unwrap();
    let versions = store(&dir, 20);
    versions.save(&workflow(1), "first").unwrap();
    versions.save(&workflow(2), "second").unwrap();

    let listed = versions.list("wf-orders").unwrap();
    assert_eq!(listed[0].reason, "second");
    assert_eq!(listed[1].reason, "first");
    assert!(listed[0].created_at > listed[1].created_at);
    assert_eq!(listed[0].node_count, 2);
    assert_eq!(listed[0].workflow_name, "orders");
    assert!(listed[0].id.ends_with(&listed[0].content_hash[..12]));

    let latest = versions.latest("wf-orders").unwrap().unwrap();
    assert_eq!(latest.metadata, listed[0]);
    assert_eq!(latest.workflow, workflow(2));
}

#[test]
fn diff_between_stored_versions() {
    let dir = TempDir::new().unwrap();
    let versions = store(&dir, 20);
    let old = versions.save(&workflow(1), "old").unwrap().unwrap();

    let mut changed = workflow(2);
    changed.nodes.push(Node::new("notify", "n8n-nodes-base.slack"));
    changed.connect("save", "main", 0, ConnectionTarget::new("notify", "main", 0));
    let new = versions.save(&changed, "new").unwrap().unwrap();

    let result = versions.diff_versions("wf-orders", &old.id, &new.id).unwrap();
    assert_eq!(result.nodes_added, vec!["notify"]);
    assert!(result.nodes_removed.is_empty());
    assert_eq!(result.nodes_modified, vec!["save"]);
    assert!(result.connections_changed);
    assert!(!result.settings_changed);
    assert_eq!(result.summary, "+1 nodes, ~1 modified, connections changed");

    let same = versions.diff_versions("wf-orders", &old.id, &old.id).unwrap();
    assert!(same.is_empty());
    assert_eq!(same.summary, "no changes");
}

#[test]
fn missing_version_is_a_not_found_error() {
    let dir = TempDir::new().unwrap();
    let versions = store(&dir, 20);
    versions.save(&workflow(1), "only").unwrap();

    assert!(versions.get("wf-orders", "20240101T000000000Z-abc").unwrap().is_none());
    let err = versions.require("wf-orders", "20240101T000000000Z-abc").unwrap_err();
    assert_eq!(err.code, "FG-VER-002");
}

#[test]
fn unsafe_identifiers_are_rejected() {
    let dir = TempDir::new().unwrap();
    let versions = store(&dir, 20);

    for bad in ["../escape", "a/b", "", "x\\y"] {
        let err = versions.list(bad).unwrap_err();
        assert_eq!(err.code, "FG-VER-001", "id {:?}", bad);
    }
    assert_eq!(versions.get("wf-orders", "../../etc/passwd").unwrap_err().code, "FG-VER-001");

    let mut hostile = workflow(1);
    hostile.id = "../outside".to_string();
    assert_eq!(versions.save(&hostile, "x").unwrap_err().code, "FG-VER-001");
}

#[test]
fn delete_all_and_stats() {
    let dir = TempDir::new().unwrap();
    let versions = store(&dir, 20);
    versions.save(&workflow(1), "a").unwrap();
    versions.save(&workflow(2), "b").unwrap();
    let mut other = workflow(1);
    other.id = "wf-other".to_string();
    versions.save(&other, "c").unwrap();

    let stats = versions.stats().unwrap();
    assert!(stats.enabled);
    assert_eq!(stats.workflows, 2);
    assert_eq!(stats.snapshots, 3);
    assert!(stats.total_bytes > 0);
    assert_eq!(stats.max_versions, 20);

    assert_eq!(versions.delete_all("wf-orders").unwrap(), 2);
    assert!(versions.list("wf-orders").unwrap().is_empty());
    assert_eq!(versions.delete_all("wf-orders").unwrap(), 0);
    assert_eq!(versions.stats().unwrap().snapshots, 1);
}

#[test]
fn disabled_store_records_nothing() {
    let dir = TempDir::new().unwrap();
    let versions = VersionStore::new(VersionControlConfig {
        enabled: false,
        ..VersionControlConfig::at(dir.path())
    });

    assert!(versions.save(&workflow(1), "ignored").unwrap().is_none());
    assert!(versions.list("wf-orders").unwrap().is_empty());
    assert!(versions.latest("wf-orders").unwrap().is_none());
    assert!(!versions.stats().unwrap().enabled);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
