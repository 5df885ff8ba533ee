//! Projects command - list projects or show one in detail

use anyhow::{bail, Result};
use clap::Args;

use super::open_workspace;
use crate::progress;
use crate::GlobalOptions;

/// List workspace projects
#[derive(Args, Debug)]
pub struct ProjectsArgs {
    /// Show the details of one project
    name: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Order projects so dependencies come first
    #[arg(long, conflicts_with = "name")]
    topo: bool,
}

/// Execute the projects command
pub async fn execute(args: ProjectsArgs, global: GlobalOptions) -> Result<()> {
    let workspace = open_workspace(&global)?;

    let pb = progress::spinner("Resolving project graph...", global.quiet || args.json);
    let snapshot = workspace.snapshot(false).await;
    progress::finish_resolution(
        pb,
        snapshot.is_valid,
        snapshot.has_errors(),
        &format!("Resolved {} projects", snapshot.graph.len()),
    );

    if !snapshot.is_valid {
        bail!("{} is not a valid Nx workspace", workspace.root().display());
    }

    if let Some(ref name) = args.name {
        let details = workspace.project(name).await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&details)?);
            return Ok(());
        }

        let config = &details.configuration;
        println!("{}", details.name);
        println!("  root:         {}", config.root);
        if let Some(ref project_type) = config.project_type {
            println!("  type:         {}", project_type);
        }
        if !config.tags.is_empty() {
            println!("  tags:         {}", config.tags.join(", "));
        }
        println!("  dependencies: {}", list_or_none(&details.dependencies));
        println!("  dependents:   {}", list_or_none(&details.dependents));
        if !config.targets.is_empty() {
            println!("  targets:");
            for (target, definition) in &config.targets {
                let executor = definition
                    .executor
                    .as_deref()
                    .or(definition.command.as_deref().map(|_| "nx:run-commands"))
                    .unwrap_or("-");
                println!("    {:<20} {}", target, executor);
            }
        }
        return Ok(());
    }

    let mut summaries = snapshot.project_summaries();
    if args.topo {
        let Some(order) = snapshot.graph.topological_order() else {
            bail!("project graph contains a dependency cycle");
        };
        summaries.sort_by_key(|s| order.iter().position(|n| *n == s.name));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    for summary in &summaries {
        let kind = summary.project_type.as_deref().unwrap_or("-");
        println!("{:<32} {:<12} {}", summary.name, kind, summary.root);
    }
    Ok(())
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
