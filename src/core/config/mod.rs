use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main flowguard configuration loaded from flowguard.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FlowguardConfig {
    /// Snapshot store configuration
    #[serde(default)]
    pub versions: VersionControlConfig,
}

/// Version control store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionControlConfig {
    /// Take snapshots at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Directory holding one sub-directory per workflow id
    #[serde(default = "default_versions_root")]
    pub root: PathBuf,

    /// Snapshots retained per workflow
    #[serde(default = "default_max_versions")]
    pub max_versions: usize,
}

impl VersionControlConfig {
    /// Enabled store rooted at `root` with the default retention ceiling.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

impl Default for VersionControlConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            root: default_versions_root(),
            max_versions: default_max_versions(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_versions_root() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".flowguard")
        .join("versions")
}

fn default_max_versions() -> usize {
    20
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
