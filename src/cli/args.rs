use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Workflow JSON document to inspect
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Also flag node types missing from the built-in catalogue
    #[arg(long)]
    pub check_types: bool,

    /// Print the report as JSON
    #[arg(long, help_heading = "Output Options")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AutofixArgs {
    /// Workflow JSON document to repair
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Overwrite FILE with the repaired workflow
    #[arg(long)]
    pub write: bool,

    /// Print applied fixes and residual warnings as JSON
    #[arg(long, help_heading = "Output Options")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FormatArgs {
    /// Workflow JSON document to lay out
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Overwrite FILE instead of printing the formatted workflow
    #[arg(long)]
    pub write: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExpressionsArgs {
    /// Workflow JSON document to analyze
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print issues and cycles as JSON
    #[arg(long, help_heading = "Output Options")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PatchArgs {
    /// Directory holding one `<id>.json` file per workflow
    #[arg(long, value_name = "DIR")]
    pub store: PathBuf,

    /// Id of the workflow to patch
    #[arg(value_name = "ID")]
    pub id: String,

    /// JSON file containing an array of patch operations
    #[arg(value_name = "OPS")]
    pub operations: PathBuf,

    /// Print the outcome as JSON
    #[arg(long, help_heading = "Output Options")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct VersionsArgs {
    #[command(subcommand)]
    pub command: VersionsCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum VersionsCommand {
    /// List snapshots of a workflow, newest first
    List {
        #[arg(value_name = "WORKFLOW_ID")]
        workflow_id: String,

        #[arg(long)]
        json: bool,
    },
    /// Print one stored snapshot
    Show {
        #[arg(value_name = "WORKFLOW_ID")]
        workflow_id: String,

        #[arg(value_name = "VERSION_ID")]
        version_id: String,
    },
    /// Compare two stored snapshots
    Diff {
        #[arg(value_name = "WORKFLOW_ID")]
        workflow_id: String,

        #[arg(value_name = "FROM")]
        from: String,

        #[arg(value_name = "TO")]
        to: String,

        #[arg(long)]
        json: bool,
    },
    /// Delete every snapshot of a workflow
    Delete {
        #[arg(value_name = "WORKFLOW_ID")]
        workflow_id: String,
    },
    /// Aggregate counts across the snapshot store
    Stats {
        #[arg(long)]
        json: bool,
    },
}
