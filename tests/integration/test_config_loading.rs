use flowguard::core::config::ConfigLoader;
use flowguard::core::workflow_graph::versions::VersionStore;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_flowguard_env() {
    for v in &[
        "FLOWGUARD_VERSIONS_ENABLED",
        "FLOWGUARD_VERSIONS_DIR",
        "FLOWGUARD_MAX_VERSIONS",
    ] {
        env::remove_var(v);
    }
}

/// Test integration of config loading with environment variables
#[test]
#[serial]
fn test_config_file_with_env_overrides() {
    clear_flowguard_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("flowguard.toml"),
        r#"
[versions]
enabled = true
root = "/srv/flowguard/versions"
max_versions = 7
"#,
    )
    .unwrap();

    let from_file = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    assert_eq!(from_file.versions.root, PathBuf::from("/srv/flowguard/versions"));
    assert_eq!(from_file.versions.max_versions, 7);

    env::set_var("FLOWGUARD_MAX_VERSIONS", "3");
    env::set_var("FLOWGUARD_VERSIONS_ENABLED", "false");
    env::set_var("FLOWGUARD_VERSIONS_DIR", "/tmp/elsewhere");
    let overridden = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    assert_eq!(overridden.versions.max_versions, 3);
    assert!(!overridden.versions.enabled);
    assert_eq!(overridden.versions.root, PathBuf::from("/tmp/elsewhere"));

    clear_flowguard_env();
}

#[test]
#[serial]
fn test_zero_retention_is_rejected() {
    clear_flowguard_env();
    let temp_dir = TempDir::new().unwrap();

    env::set_var("FLOWGUARD_MAX_VERSIONS", "0");
    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();
    assert_eq!(err.code, "FG-CFG-001");

    clear_flowguard_env();
}

#[test]
#[serial]
fn test_loaded_config_drives_the_version_store() {
    clear_flowguard_env();
    let temp_dir = TempDir::new().unwrap();
    let snapshots = temp_dir.path().join("snapshots");
    env::set_var("FLOWGUARD_VERSIONS_DIR", &snapshots);
    env::set_var("FLOWGUARD_MAX_VERSIONS", "2");

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    let store = VersionStore::new(config.versions);
    let stats = store.stats().unwrap();
    assert_eq!(stats.max_versions, 2);
    assert_eq!(store.config().root, snapshots);

    clear_flowguard_env();
}

#[test]
#[serial]
fn test_mistyped_value_is_a_parse_error() {
    clear_flowguard_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("flowguard.toml"),
        "[versions]\nmax_versions = \"many\"\n",
    )
    .unwrap();

    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();
    assert_eq!(err.code, "FG-CFG-002");
}
