use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Binary under test, isolated to `workspace` for config, logs and snapshots.
fn flowguard(workspace: &Path) -> Command {
    let mut cmd = Command::cargo_bin("flowguard").unwrap();
    cmd.current_dir(workspace)
        .env("FLOWGUARD_LOG_DIR", workspace.join("logs"))
        .env("FLOWGUARD_VERSIONS_DIR", workspace.join("versions"))
        .env_remove("FLOWGUARD_VERSIONS_ENABLED")
        .env_remove("FLOWGUARD_MAX_VERSIONS")
        .env_remove("RUST_LOG");
    cmd
}

fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn scenario_a(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("workflow.json");
    write_json(
        &path,
        &json!({
            "name": "My-Workflow",
            "nodes": [{"name": "MyTrigger", "type": "n8n-nodes-base.webhook", "parameters": {}}],
            "connections": {}
        }),
    );
    path
}

#[test]
fn test_help_lists_workflow_commands() {
    let dir = TempDir::new().unwrap();
    flowguard(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("WORKFLOW COMMANDS"))
        .stdout(predicate::str::contains("Inspect and manage workflow snapshots"))
        .stdout(predicate::str::contains("autofix"));
}

#[test]
fn test_validate_reports_naming_findings() {
    let dir = TempDir::new().unwrap();
    let file = scenario_a(dir.path());
    flowguard(dir.path())
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("warning[snake_case_naming] MyTrigger"))
        .stdout(predicate::str::contains("suggestion: my_trigger"))
        .stdout(predicate::str::contains("2 finding(s); workflow is valid"));
}

#[test]
fn test_validate_json_output() {
    let dir = TempDir::new().unwrap();
    let file = scenario_a(dir.path());
    let output = flowguard(dir.path())
        .args(["validate", "--json"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], json!(true));
    assert_eq!(report["warnings"].as_array().unwrap().len(), 2);
}

#[test]
fn test_validate_fails_on_unknown_node_type() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("typo.json");
    write_json(
        &file,
        &json!({
            "name": "typo",
            "nodes": [{"name": "call", "type": "n8n-nodes-base.httpRequst"}],
            "connections": {}
        }),
    );
    flowguard(dir.path())
        .args(["validate", "--check-types"])
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("unknown_node_type"))
        .stderr(predicate::str::contains("error-severity"));
}

#[test]
fn test_validate_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    flowguard(dir.path())
        .args(["validate", "absent.json"])
        .assert()
        .failure();
}

#[test]
fn test_autofix_write_repairs_file() {
    let dir = TempDir::new().unwrap();
    let file = scenario_a(dir.path());
    flowguard(dir.path())
        .args(["autofix", "--write"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 fix(es) applied, 0 unfixable"));

    let repaired: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(repaired["name"], json!("my_workflow"));
    assert_eq!(repaired["nodes"][0]["name"], json!("my_trigger"));
}

#[test]
fn test_format_prints_laid_out_workflow() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("flow.json");
    write_json(
        &file,
        &json!({
            "name": "flow",
            "nodes": [
                {"name": "save", "type": "n8n-nodes-base.postgres", "position": [900, 900], "parameters": {"query": null}},
                {"name": "hook", "type": "n8n-nodes-base.webhook", "position": [10, 700]}
            ],
            "connections": {"hook": {"main": [[{"node": "save", "type": "main", "index": 0}]]}}
        }),
    );
    let output = flowguard(dir.path()).arg("format").arg(&file).output().unwrap();
    assert!(output.status.success());
    let formatted: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(formatted["nodes"][0]["name"], json!("hook"));
    assert_eq!(formatted["nodes"][0]["position"], json!([50.0, 50.0]));
    assert_eq!(formatted["nodes"][1]["parameters"], json!({}));

    flowguard(dir.path())
        .args(["format", "--write"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("formatted"));
    flowguard(dir.path())
        .args(["format", "--write"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("already formatted"));
}

#[test]
fn test_expressions_json_report() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("refs.json");
    write_json(
        &file,
        &json!({
            "name": "refs",
            "nodes": [
                {"name": "a", "type": "n8n-nodes-base.set", "parameters": {"v": "={{ $('b').item.json.x }}"}},
                {"name": "b", "type": "n8n-nodes-base.set", "parameters": {"v": "={{ $('a').item.json.x }}"}},
                {"name": "c", "type": "n8n-nodes-base.set", "parameters": {"v": "={{ $('ghost').item.json.x }}"}}
            ],
            "connections": {}
        }),
    );
    let output = flowguard(dir.path())
        .args(["expressions", "--json"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["issues"].as_array().unwrap().len(), 1);
    assert_eq!(report["issues"][0]["kind"], json!("unresolved_reference"));
    assert_eq!(report["cycles"], json!([["a", "b", "a"]]));
}

#[test]
fn test_patch_then_inspect_versions() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("workflows");
    fs::create_dir_all(&store).unwrap();
    write_json(
        &store.join("wf-1.json"),
        &json!({
            "id": "wf-1",
            "name": "orders",
            "nodes": [
                {"id": "n1", "name": "hook", "type": "n8n-nodes-base.webhook"},
                {"id": "n2", "name": "save", "type": "n8n-nodes-base.postgres", "parameters": {"table": "orders"}}
            ],
            "connections": {"hook": {"main": [[{"node": "save", "type": "main", "index": 0}]]}}
        }),
    );
    let ops = dir.path().join("ops.json");
    write_json(
        &ops,
        &json!([
            {"type": "addNode", "node": {"name": "Notify Team", "type": "n8n-nodes-base.slack"}},
            {"type": "addConnection", "source": "save", "target": "Notify Team"}
        ]),
    );

    flowguard(dir.path())
        .args(["patch", "--store"])
        .arg(&store)
        .arg("wf-1")
        .arg(&ops)
        .assert()
        .success()
        .stdout(predicate::str::contains("snapshot"))
        .stdout(predicate::str::contains("2 operation(s) applied, 1 fix(es); workflow updated"));

    let stored: Value =
        serde_json::from_str(&fs::read_to_string(store.join("wf-1.json")).unwrap()).unwrap();
    let names: Vec<&str> = stored["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["name"].as_str())
        .collect();
    assert!(names.contains(&"notify_team"));

    flowguard(dir.path())
        .args(["versions", "list", "wf-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("before patch"))
        .stdout(predicate::str::contains("1 version(s)"));

    flowguard(dir.path())
        .args(["versions", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("snapshots: 1"));

    flowguard(dir.path())
        .args(["versions", "show", "wf-1", "20000101T000000000Z-000000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FG-VER-002"));

    flowguard(dir.path())
        .args(["versions", "delete", "wf-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted 1 version(s) of wf-1"));
}

#[test]
fn test_versions_rejects_path_traversal() {
    let dir = TempDir::new().unwrap();
    flowguard(dir.path())
        .args(["versions", "list", "../etc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FG-VER-001"));
}

#[test]
fn test_logs_go_to_file_and_stderr_in_interactive_mode() {
    let dir = TempDir::new().unwrap();
    let file = scenario_a(dir.path());
    flowguard(dir.path())
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("validated workflow"));

    let log = fs::read_to_string(dir.path().join("logs").join("flowguard.log")).unwrap();
    assert!(log.contains("validated workflow"));
}

#[test]
fn test_json_output_keeps_console_quiet() {
    let dir = TempDir::new().unwrap();
    let file = scenario_a(dir.path());
    flowguard(dir.path())
        .args(["validate", "--json"])
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    let log = fs::read_to_string(dir.path().join("logs").join("flowguard.log")).unwrap();
    assert!(log.contains("validated workflow"));
}
