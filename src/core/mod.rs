pub mod config;
pub mod error;
pub mod store;
pub mod types;
pub mod workflow_graph;

pub use config::{ConfigLoader, FlowguardConfig, VersionControlConfig};
pub use error::AppError;
pub use types::*;
pub use workflow_graph::patch::{apply_patch, PatchEngine, PatchOperation};
pub use workflow_graph::pipeline::{apply_patch_and_persist, cleanup};
pub use workflow_graph::schema::{Node, Workflow};
pub use workflow_graph::versions::VersionStore;
