//! Locate command - find a file inside an installed package

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use nxscope_core::locate;
use serde_json::json;

use super::resolve_workspace;
use crate::GlobalOptions;

/// Locate a file inside an installed dependency
#[derive(Args, Debug)]
pub struct LocateArgs {
    /// Package name, or a path relative to the workspace root
    dependency: String,

    /// File inside the package
    #[arg(default_value = "package.json")]
    file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the locate command
pub async fn execute(args: LocateArgs, global: GlobalOptions) -> Result<()> {
    let root = resolve_workspace(&global)?;

    let Some(found) = locate(&root, &args.dependency, &args.file).await else {
        bail!(
            "{} not found in {} (looked for {})",
            args.dependency,
            root.display(),
            args.file.display()
        );
    };

    if args.json {
        let output = json!({
            "dependency": args.dependency,
            "file": args.file,
            "path": found,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", found.display());
    }
    Ok(())
}
