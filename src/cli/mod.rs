pub mod args;
pub mod commands;

pub use args::{
    AutofixArgs, ExpressionsArgs, FormatArgs, PatchArgs, ValidateArgs, VersionsArgs,
    VersionsCommand,
};
use clap::{Parser, Subcommand};

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
WORKFLOW COMMANDS:\n{subcommands}\n";

#[derive(Parser, Debug)]
#[command(name = "flowguard")]
#[command(version = crate::VERSION)]
#[command(about = "Validate, repair, lay out and patch automation workflows")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: validate a workflow, autofix what can be fixed, format it, and keep snapshots of every patch."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(
        about = "Check a workflow against the built-in rules",
        long_about = "Validate runs every rule over the workflow and prints findings ordered by severity. Exits non-zero when any error-severity finding is present.",
        after_help = "Example:\n    flowguard validate ./workflow.json --check-types"
    )]
    Validate(ValidateArgs),
    #[command(
        about = "Repair fixable rule findings",
        long_about = "Autofix renames non-snake_case names, binds implicit context reads to their upstream node, and completes structured-output flags on AI nodes.",
        after_help = "Example:\n    flowguard autofix ./workflow.json --write"
    )]
    Autofix(AutofixArgs),
    #[command(
        about = "Recompute node positions with a layered layout",
        long_about = "Format places triggers on the left, orders nodes to reduce crossing edges, and drops null-valued parameters.",
        after_help = "Example:\n    flowguard format ./workflow.json --write"
    )]
    Format(FormatArgs),
    #[command(
        about = "Analyze embedded template expressions",
        long_about = "Expressions extracts every {{ ... }} expression, reports malformed or risky ones, and lists circular node references.",
        after_help = "Example:\n    flowguard expressions ./workflow.json --json"
    )]
    Expressions(ExpressionsArgs),
    #[command(
        about = "Apply patch operations to a stored workflow",
        long_about = "Patch snapshots the stored workflow, applies the operations, runs validate/autofix/format, and writes the result back only when it changed.",
        after_help = "Example:\n    flowguard patch --store ./workflows wf-1 ./ops.json"
    )]
    Patch(PatchArgs),
    #[command(
        about = "Inspect and manage workflow snapshots",
        after_help = "Examples:\n    flowguard versions list wf-1\n    flowguard versions diff wf-1 <from> <to>"
    )]
    Versions(VersionsArgs),
}

impl Command {
    /// True when the command prints machine-readable output on stdout.
    pub fn emits_json(&self) -> bool {
        match self {
            Command::Validate(args) => args.json,
            Command::Autofix(args) => args.json,
            Command::Format(args) => !args.write,
            Command::Expressions(args) => args.json,
            Command::Patch(args) => args.json,
            Command::Versions(args) => match &args.command {
                VersionsCommand::List { json, .. }
                | VersionsCommand::Diff { json, .. }
                | VersionsCommand::Stats { json } => *json,
                VersionsCommand::Show { .. } => true,
                VersionsCommand::Delete { .. } => false,
            },
        }
    }
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Validate(validate_args) => commands::validate(validate_args),
        Command::Autofix(autofix_args) => commands::autofix(autofix_args),
        Command::Format(format_args) => commands::format(format_args),
        Command::Expressions(expression_args) => commands::expressions(expression_args),
        Command::Patch(patch_args) => commands::patch(patch_args).await,
        Command::Versions(versions_args) => commands::versions(versions_args),
    }
}
