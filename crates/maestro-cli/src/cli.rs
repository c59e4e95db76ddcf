use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// maestro: release orchestration for multi-repository package ecosystems
///
/// Maestro analyzes the projects of a workspace, plans coordinated releases
/// across their dependency graph and drives every release through branch,
/// pull request, tag and registry publication.
#[derive(Parser, Debug)]
#[command(name = "maestro", version, about, long_about = None)]
pub struct Cli {
    /// Workspace directory (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Repository profile to operate on
    #[arg(short, long, global = true, default_value = "all")]
    pub profile: String,

    /// Number of parallel analysis jobs
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Seed the repository manifest from a GitHub organization
    Bootstrap(crate::commands::bootstrap::BootstrapArgs),

    /// Clone missing repositories and refresh existing ones
    Sync(crate::commands::sync::SyncArgs),

    /// List projects (or repositories) of the current profile
    Ls(crate::commands::ls::LsArgs),

    /// Analyze the workspace and show the dependency graph
    Graph(crate::commands::graph::GraphArgs),

    /// Prepare and execute release plans
    Release(crate::commands::release::ReleaseArgs),

    /// Run a shell command in every repository, opening pull requests with
    /// the changes
    Foreach(crate::commands::foreach::ForeachArgs),

    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
