//! `fleetctl package build` — assemble a deployable agent package.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::application::ports::SilentReporter;
use crate::domain::{PackageBound, PackageRequest, PushTarget};
use crate::output::TerminalReporter;

/// Package subcommands.
#[derive(Subcommand)]
pub enum PackageCommand {
    /// Build an agent package
    Build(BuildArgs),
}

/// Arguments for `package build`.
#[derive(Args)]
pub struct BuildArgs {
    /// Candidate artifact file (repeatable)
    #[arg(long = "artifact", value_name = "PATH")]
    pub artifacts: Vec<PathBuf>,
    /// Directory whose files are all candidate artifacts
    #[arg(long, value_name = "DIR")]
    pub artifact_dir: Option<PathBuf>,
    /// Maximum uncompressed payload in bytes
    #[arg(long)]
    pub max_bytes: Option<u64>,
    /// Package version (semver)
    #[arg(long)]
    pub version: Option<String>,
    /// Region the agent will register in
    #[arg(long)]
    pub region: Option<String>,
    /// Owner recorded in the agent's config
    #[arg(long)]
    pub owner: Option<String>,
    /// Host to push the package to
    #[arg(long, requires = "port")]
    pub host: Option<String>,
    /// Port to push the package to
    #[arg(long, requires = "host")]
    pub port: Option<u16>,
    /// Output directory
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

/// Run a package subcommand.
///
/// # Errors
///
/// Returns `BuildError` if the package cannot be assembled, or an I/O error
/// if the artifact directory cannot be listed or the package written.
pub async fn run(app: &AppContext, cmd: PackageCommand) -> Result<()> {
    match cmd {
        PackageCommand::Build(args) => build(app, args).await,
    }
}

async fn build(app: &AppContext, args: BuildArgs) -> Result<()> {
    let mut artifacts = args.artifacts;
    if let Some(dir) = &args.artifact_dir {
        artifacts.extend(app.fs.list_files(dir)?);
    }
    anyhow::ensure!(
        !artifacts.is_empty(),
        "no artifacts given; use --artifact or --artifact-dir"
    );

    let default = app.packager.default_bound();
    let bound = PackageBound {
        max_bytes: args.max_bytes.unwrap_or(default.max_bytes),
        version: args.version.unwrap_or(default.version),
    };
    let target = match (args.host, args.port) {
        (Some(host), Some(port)) => Some(PushTarget { host, port }),
        _ => None,
    };
    let request = PackageRequest {
        artifacts,
        target,
        bound,
        region: args.region,
        owner: args.owner,
    };

    // Progress lines would corrupt JSON on stdout.
    let artifact = if app.is_json() {
        app.packager.build(&app.fs, &SilentReporter, &request).await?
    } else {
        let reporter = TerminalReporter::new(&app.output);
        app.packager.build(&app.fs, &reporter, &request).await?
    };
    let path = app.fs.write_package(&args.out, &artifact)?;
    app.renderer().render_package(&artifact, &path)
}
