//! Package manager command

use anyhow::Result;
use clap::Args;
use nxscope_core::detect_package_manager;

use super::resolve_workspace;
use crate::GlobalOptions;

/// Detect the workspace package manager
#[derive(Args, Debug)]
pub struct PmArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the pm command
pub async fn execute(args: PmArgs, global: GlobalOptions) -> Result<()> {
    let root = resolve_workspace(&global)?;
    let detected = detect_package_manager(&root).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&detected)?);
        return Ok(());
    }

    match detected.corepack {
        Some(ref pin) => println!("{} (pinned: {})", detected.manager, pin),
        None => println!("{}", detected.manager),
    }
    println!("  install: {}", detected.command.install);
    println!("  exec:    {}", detected.command.exec);
    println!("  add:     {}", detected.command.add);
    println!("  add-dev: {}", detected.command.add_dev);
    println!("  list:    {}", detected.command.list);
    Ok(())
}
