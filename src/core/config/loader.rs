#![allow(clippy::result_large_err)]

use super::{ConfigValidator, FlowguardConfig};
use crate::core::error::AppError;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "flowguard.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/flowguard.toml)
    /// Environment variables override config file values
    pub fn load_from_workspace(workspace_path: &Path) -> Result<FlowguardConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let config_file = Self::load_from_file(&config_path)?;

        let mut config = config_file.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<FlowguardConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                crate::core::types::ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: FlowguardConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                crate::core::types::ErrorCategory::ConfigError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("FG-CFG-002")
        })?;

        Ok(Some(config))
    }

    /// Environment variables take precedence over config file values.
    /// Unparseable values are ignored.
    fn apply_env_overrides(config: &mut FlowguardConfig) {
        if let Ok(enabled_str) = env::var("FLOWGUARD_VERSIONS_ENABLED") {
            if let Ok(enabled) = enabled_str.parse::<bool>() {
                config.versions.enabled = enabled;
            } else {
                tracing::warn!(value = %enabled_str, "ignoring invalid FLOWGUARD_VERSIONS_ENABLED");
            }
        }

        if let Ok(dir) = env::var("FLOWGUARD_VERSIONS_DIR") {
            if !dir.is_empty() {
                config.versions.root = PathBuf::from(dir);
            }
        }

        if let Ok(max_str) = env::var("FLOWGUARD_MAX_VERSIONS") {
            if let Ok(max_versions) = max_str.parse::<usize>() {
                config.versions.max_versions = max_versions;
            } else {
                tracing::warn!(value = %max_str, "ignoring invalid FLOWGUARD_MAX_VERSIONS");
            }
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "FLOWGUARD_VERSIONS_ENABLED - Enable or disable snapshots (true/false, default: true)",
            "FLOWGUARD_VERSIONS_DIR - Snapshot root directory (default: ~/.flowguard/versions)",
            "FLOWGUARD_MAX_VERSIONS - Snapshots retained per workflow (default: 20)",
            "FLOWGUARD_LOG_DIR - Override the log directory",
        ]
    }
}
