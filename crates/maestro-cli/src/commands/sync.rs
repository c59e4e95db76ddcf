use clap::Args;

use maestro_core::Context;
use maestro_core::config::{Manifest, profile};
use maestro_core::error::Result;
use maestro_core::log;
use maestro_core::process;
use maestro_core::vcs::{GitVcs, Vcs};

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Do not clone repositories that are missing locally
    #[arg(long)]
    pub no_clone: bool,

    /// Pull the current branch instead of only fetching
    #[arg(long)]
    pub pull: bool,
}

pub fn run(ctx: &Context, args: SyncArgs) -> Result<()> {
    let manifest = Manifest::open(ctx)?;
    let repositories = profile::current_repositories(ctx, &manifest)?;

    for repo in repositories {
        let location = ctx.repo_path(&repo.name);

        if !location.join(".git").exists() {
            if args.no_clone {
                log::warn(&format!("{} is not cloned, skipping", repo.name));
                continue;
            }
            log::operation(&format!("Cloning {}", repo.name), || {
                process::run(
                    "git",
                    &["clone", &repo.remote_url, &repo.name],
                    &ctx.workspace_path,
                )
            })?;
            continue;
        }

        let vcs = GitVcs::open(ctx, repo)?;
        if args.pull {
            log::operation(&format!("Pulling {}", repo.name), || vcs.pull())?;
        } else {
            log::operation(&format!("Fetching {}", repo.name), || vcs.fetch())?;
        }
    }

    Ok(())
}
