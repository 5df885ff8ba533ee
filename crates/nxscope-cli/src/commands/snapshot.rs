//! Snapshot command - resolve the workspace and summarize it

use anyhow::{bail, Result};
use clap::Args;

use super::{open_workspace, print_info, print_warning};
use crate::progress;
use crate::GlobalOptions;

/// Resolve the workspace configuration snapshot
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Output the full snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Discard any cached snapshot before resolving
    #[arg(long)]
    force: bool,
}

/// Execute the snapshot command
pub async fn execute(args: SnapshotArgs, global: GlobalOptions) -> Result<()> {
    let workspace = open_workspace(&global)?;

    let pb = progress::spinner("Resolving project graph...", global.quiet || args.json);
    let snapshot = workspace.snapshot(args.force).await;
    progress::finish_resolution(
        pb,
        snapshot.is_valid,
        snapshot.has_errors(),
        &format!("Resolved {} projects", snapshot.graph.len()),
    );

    if !snapshot.is_valid {
        let reason = snapshot
            .errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(|e| e.summary())
            .unwrap_or_else(|| "unknown error".to_string());
        bail!(
            "{} is not a valid Nx workspace: {}",
            workspace.root().display(),
            reason
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
        return Ok(());
    }

    println!("Workspace:   {}", snapshot.workspace_root.display());
    println!("Nx version:  {}", snapshot.tool_version.full);
    println!("Projects:    {}", snapshot.graph.len());
    println!("Fingerprint: {}", snapshot.fingerprint());
    if let Some(enabled) = snapshot.daemon_enabled {
        println!("Daemon:      {}", if enabled { "enabled" } else { "disabled" });
    }

    if snapshot.is_partial {
        print_warning("graph is partial; some projects could not be processed");
    }
    for error in snapshot.errors.iter().flatten() {
        eprintln!("  - {}", error.summary());
    }
    if snapshot.graph.is_empty() && !snapshot.has_errors() {
        print_info("No projects found", global.quiet);
    }

    Ok(())
}
