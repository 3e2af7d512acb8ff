use crate::{
    cli::args::{
        AutofixArgs, ExpressionsArgs, FormatArgs, PatchArgs, ValidateArgs, VersionsArgs,
        VersionsCommand,
    },
    core::{
        store::{JsonDirWorkflowStore, NodeTypeRegistry, StaticNodeTypeRegistry},
        workflow_graph::{
            expression::ExpressionAnalyzer,
            layout::format_workflow,
            lint::{sort_warnings, validate as validate_workflow, validate_node_types, ValidationWarning},
            patch::parse_operations,
            pipeline::apply_patch_and_persist,
            schema::{parse_workflow, Workflow},
            transform::autofix as autofix_workflow,
            versions::VersionStore,
        },
        ConfigLoader,
    },
    Result,
};
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::Path;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_workflow(path: &Path, workflow: &Workflow) -> Result<()> {
    let content = serde_json::to_string_pretty(workflow)?;
    fs::write(path, format!("{}\n", content))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn print_warnings(warnings: &[ValidationWarning]) {
    for warning in warnings {
        match &warning.node {
            Some(node) => println!("{}[{}] {}: {}", warning.severity, warning.rule, node, warning.message),
            None => println!("{}[{}] {}", warning.severity, warning.rule, warning.message),
        }
        if let Some(suggestion) = &warning.suggestion {
            println!("    suggestion: {}", suggestion);
        }
    }
}

fn version_store() -> Result<VersionStore> {
    let workspace = env::current_dir().context("failed to resolve current directory")?;
    let config = ConfigLoader::load_from_workspace(&workspace)?;
    Ok(VersionStore::new(config.versions))
}

pub fn validate(args: ValidateArgs) -> Result<()> {
    let workflow = parse_workflow(&args.file)?;
    let mut report = validate_workflow(&workflow);
    if args.check_types {
        let registry = StaticNodeTypeRegistry::built_in();
        report
            .warnings
            .extend(validate_node_types(&workflow.nodes, &registry.known_types()));
        sort_warnings(&mut report.warnings);
        report.valid = !report.warnings.iter().any(ValidationWarning::is_error);
    }
    tracing::info!(file = %args.file.display(), findings = report.warnings.len(), valid = report.valid, "validated workflow");

    if args.json {
        print_json(&report)?;
    } else {
        print_warnings(&report.warnings);
        println!(
            "{} finding(s); workflow is {}",
            report.warnings.len(),
            if report.valid { "valid" } else { "invalid" }
        );
    }

    if report.valid {
        Ok(())
    } else {
        let errors = report.warnings.iter().filter(|w| w.is_error()).count();
        Err(anyhow!("{} error-severity finding(s) in {}", errors, args.file.display()))
    }
}

pub fn autofix(args: AutofixArgs) -> Result<()> {
    let workflow = parse_workflow(&args.file)?;
    let report = validate_workflow(&workflow);
    let result = autofix_workflow(&workflow, &report.warnings);
    tracing::info!(
        file = %args.file.display(),
        fixes = result.fixes.len(),
        unfixable = result.unfixable.len(),
        "autofix finished"
    );

    if args.write && !result.fixes.is_empty() {
        write_workflow(&args.file, &result.workflow)?;
    }

    if args.json {
        #[derive(Serialize)]
        struct AutofixSummary<'a> {
            fixes: &'a [crate::core::workflow_graph::transform::AutofixAction],
            unfixable: &'a [ValidationWarning],
        }
        return print_json(&AutofixSummary {
            fixes: &result.fixes,
            unfixable: &result.unfixable,
        });
    }

    for fix in &result.fixes {
        println!("fixed {:?}: {}", fix.kind, fix.target);
    }
    print_warnings(&result.unfixable);
    println!(
        "{} fix(es) applied, {} unfixable",
        result.fixes.len(),
        result.unfixable.len()
    );
    if !args.write && !result.fixes.is_empty() {
        println!("run again with --write to save the repaired workflow");
    }
    Ok(())
}

pub fn format(args: FormatArgs) -> Result<()> {
    let workflow = parse_workflow(&args.file)?;
    let formatted = format_workflow(&workflow);
    if args.write {
        if formatted != workflow {
            write_workflow(&args.file, &formatted)?;
            println!("formatted {}", args.file.display());
        } else {
            println!("{} already formatted", args.file.display());
        }
        Ok(())
    } else {
        print_json(&formatted)
    }
}

pub fn expressions(args: ExpressionsArgs) -> Result<()> {
    let workflow = parse_workflow(&args.file)?;
    let report = ExpressionAnalyzer::analyze(&workflow);
    if args.json {
        return print_json(&report);
    }

    for issue in &report.issues {
        println!(
            "{} {}.{}: {} ({})",
            issue.severity, issue.node, issue.path, issue.message, issue.expression
        );
        if let Some(suggestion) = &issue.suggestion {
            println!("    suggestion: {}", suggestion);
        }
    }
    for cycle in &report.cycles {
        println!("circular reference: {}", cycle.join(" -> "));
    }
    println!(
        "{} issue(s), {} cycle(s)",
        report.issues.len(),
        report.cycles.len()
    );
    Ok(())
}

pub async fn patch(args: PatchArgs) -> Result<()> {
    let content = fs::read_to_string(&args.operations)
        .with_context(|| format!("failed to read {}", args.operations.display()))?;
    let raw: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", args.operations.display()))?;
    let operations = parse_operations(raw)?;

    let store = JsonDirWorkflowStore::new(&args.store);
    let versions = version_store()?;
    let outcome = apply_patch_and_persist(&store, &versions, &args.id, &operations).await?;

    if args.json {
        return print_json(&outcome);
    }

    if let Some(snapshot) = &outcome.snapshot {
        println!("snapshot {} saved", snapshot.id);
    }
    for warning in &outcome.patch_warnings {
        println!("warning: {}", warning);
    }
    print_warnings(&outcome.residual);
    println!(
        "{} operation(s) applied, {} fix(es); workflow {}",
        operations.len(),
        outcome.fixes.len(),
        if outcome.persisted { "updated" } else { "unchanged" }
    );
    Ok(())
}

pub fn versions(args: VersionsArgs) -> Result<()> {
    let store = version_store()?;
    match args.command {
        VersionsCommand::List { workflow_id, json } => {
            let versions = store.list(&workflow_id)?;
            if json {
                return print_json(&versions);
            }
            for version in &versions {
                println!(
                    "{}  {}  {} node(s)  {}",
                    version.id,
                    version.created_at.to_rfc3339(),
                    version.node_count,
                    version.reason
                );
            }
            println!("{} version(s)", versions.len());
        }
        VersionsCommand::Show {
            workflow_id,
            version_id,
        } => {
            let snapshot = store.require(&workflow_id, &version_id)?;
            print_json(&snapshot)?;
        }
        VersionsCommand::Diff {
            workflow_id,
            from,
            to,
            json,
        } => {
            let diff = store.diff_versions(&workflow_id, &from, &to)?;
            if json {
                return print_json(&diff);
            }
            println!("{}", diff.summary);
            for name in &diff.nodes_added {
                println!("+ {}", name);
            }
            for name in &diff.nodes_removed {
                println!("- {}", name);
            }
            for name in &diff.nodes_modified {
                println!("~ {}", name);
            }
        }
        VersionsCommand::Delete { workflow_id } => {
            let deleted = store.delete_all(&workflow_id)?;
            println!("deleted {} version(s) of {}", deleted, workflow_id);
        }
        VersionsCommand::Stats { json } => {
            let stats = store.stats()?;
            if json {
                return print_json(&stats);
            }
            println!("enabled: {}", stats.enabled);
            println!("workflows: {}", stats.workflows);
            println!("snapshots: {}", stats.snapshots);
            println!("total bytes: {}", stats.total_bytes);
            println!("max versions per workflow: {}", stats.max_versions);
        }
    }
    Ok(())
}
