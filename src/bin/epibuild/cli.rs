//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// epibuild - download, synchronize, and build EPICS module trees
#[derive(Parser)]
#[command(name = "epibuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Specification files to load (may be repeated)
    #[arg(short, long, global = true, env = "EPIBUILD_SPECS", value_delimiter = ':')]
    pub spec: Vec<PathBuf>,

    /// Site configuration file (YAML or JSON)
    #[arg(long, global = true, env = "EPIBUILD_SITE")]
    pub site: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse the specification files and print the merged workspace
    Parse(ParseArgs),

    /// Download declared modules to their install paths
    Download(DownloadArgs),

    /// Synchronize build descriptors with the specification
    Sync(SyncArgs),

    /// Apply declared patches to downloaded modules
    Patch(PatchArgs),

    /// Build declared modules in dependency order
    Build(BuildArgs),

    /// Inspect a dependency tree without modifying anything
    Inspect(InspectArgs),

    /// Show system-package install commands for the workspace
    Requirements(RequirementsArgs),

    /// Write a RELEASE_SITE file for an application tree
    ReleaseSite(ReleaseSiteArgs),

    /// Download, synchronize, and build everything an application needs
    Please(PleaseArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct ParseArgs {
    /// Emit JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DownloadArgs {
    /// Restrict to the named modules
    #[arg(long)]
    pub only: Vec<String>,

    /// Skip the named modules
    #[arg(long)]
    pub skip: Vec<String>,

    /// Reuse existing module directories instead of failing
    #[arg(long)]
    pub exist_ok: bool,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Application tree to synchronize (defaults to all declared modules)
    pub path: Option<PathBuf>,

    /// Insert bindings that are missing from the release files
    #[arg(long)]
    pub add_missing: bool,

    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Restrict to the named modules
    #[arg(long)]
    pub only: Vec<String>,

    /// Skip the named modules
    #[arg(long)]
    pub skip: Vec<String>,
}

#[derive(Args)]
pub struct PatchArgs {
    /// Restrict to the named modules
    #[arg(long)]
    pub only: Vec<String>,

    /// Skip the named modules
    #[arg(long)]
    pub skip: Vec<String>,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Application tree to build after the modules
    pub path: Option<PathBuf>,

    /// Restrict to the named modules
    #[arg(long)]
    pub only: Vec<String>,

    /// Skip the named modules
    #[arg(long)]
    pub skip: Vec<String>,

    /// Abort at the first failing module
    #[arg(long)]
    pub stop_on_failure: bool,

    /// Run the clean target before building
    #[arg(long)]
    pub clean: bool,

    /// Per-module build timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Application or module tree to inspect
    pub path: PathBuf,

    /// Emit JSON instead of YAML
    #[arg(long)]
    pub json: bool,

    /// Emit a starting-point specification file instead of the report
    #[arg(long, conflicts_with = "json")]
    pub emit_spec: bool,
}

#[derive(Args)]
pub struct RequirementsArgs {
    /// Package manager to report for (yum, apt, conda; defaults to all)
    #[arg(long)]
    pub manager: Option<String>,

    /// Detect the host's package manager
    #[arg(long, conflicts_with = "manager")]
    pub detect: bool,
}

#[derive(Args)]
pub struct ReleaseSiteArgs {
    /// Application tree (or file) to write RELEASE_SITE to
    pub path: PathBuf,
}

#[derive(Args)]
pub struct PleaseArgs {
    /// Application tree to set up and build
    pub path: PathBuf,

    /// Abort at the first failing module
    #[arg(long)]
    pub stop_on_failure: bool,

    /// Per-module build timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
