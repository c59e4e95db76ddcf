use clap::Args;

use maestro_core::Context;
use maestro_core::config::{Manifest, profile};
use maestro_core::error::Result;

#[derive(Args, Debug)]
pub struct LsArgs {
    /// List repositories instead of projects
    #[arg(long)]
    pub repos: bool,
}

pub fn run(ctx: &Context, args: LsArgs) -> Result<()> {
    let manifest = Manifest::open(ctx)?;

    if args.repos {
        for repo in profile::current_repository_handles(ctx, &manifest)? {
            println!("{repo}");
        }
    } else {
        for project in profile::current_project_handles(ctx, &manifest)? {
            println!("{project}");
        }
    }

    Ok(())
}
