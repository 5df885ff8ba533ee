//! Version command - installed Nx version and its capabilities

use anyhow::{bail, Result};
use clap::Args;
use nxscope_core::version::read_installed_version;
use nxscope_core::ToolVersion;
use serde::Serialize;

use super::resolve_workspace;
use crate::GlobalOptions;

/// Show the installed Nx version
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// What the installed version can do
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionReport {
    version: ToolVersion,
    project_graph: bool,
    async_graph: bool,
    source_maps: bool,
    file_map: bool,
    package: &'static str,
}

impl From<ToolVersion> for VersionReport {
    fn from(version: ToolVersion) -> Self {
        Self {
            project_graph: version.supports_project_graph(),
            async_graph: version.supports_async_graph(),
            source_maps: version.supports_source_maps(),
            file_map: version.supports_file_map_utils(),
            package: if version.uses_nx_package() {
                "nx"
            } else {
                "@nrwl/workspace"
            },
            version,
        }
    }
}

/// Execute the version command
pub async fn execute(args: VersionArgs, global: GlobalOptions) -> Result<()> {
    let root = resolve_workspace(&global)?;

    let Some(version) = read_installed_version(&root).await else {
        bail!("Nx is not installed in {}", root.display());
    };
    let report = VersionReport::from(version);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let yes_no = |b: bool| if b { "yes" } else { "no" };
    println!("Nx {}", report.version.full);
    println!("  package:       {}", report.package);
    println!("  project graph: {}", yes_no(report.project_graph));
    println!("  async graph:   {}", yes_no(report.async_graph));
    println!("  source maps:   {}", yes_no(report.source_maps));
    println!("  file map:      {}", yes_no(report.file_map));
    Ok(())
}
