use clap::Args;
use serde::Deserialize;

use maestro_core::Context;
use maestro_core::config::{Manifest, ProjectManifest, RepositoryManifest};
use maestro_core::error::{Error, Result};
use maestro_core::log;
use maestro_core::process;

#[derive(Args, Debug)]
pub struct BootstrapArgs {
    /// GitHub organization to pull repositories from
    #[arg(short, long)]
    pub org: String,

    /// Maximum number of repositories to fetch
    #[arg(long, default_value_t = 500)]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRepoListing {
    name: String,
    ssh_url: String,
    default_branch_ref: Option<RawBranchRef>,
}

#[derive(Debug, Deserialize)]
struct RawBranchRef {
    name: String,
}

pub fn run(ctx: &Context, args: BootstrapArgs) -> Result<()> {
    let limit = args.limit.to_string();
    let out = process::run(
        "gh",
        &[
            "repo",
            "list",
            &args.org,
            "--limit",
            &limit,
            "--json",
            "name,sshUrl,defaultBranchRef",
        ],
        &ctx.workspace_path,
    )?;

    let listings: Vec<RawRepoListing> = serde_json::from_str(&out.stdout)?;
    if listings.is_empty() {
        return Err(Error::Other(anyhow::anyhow!(
            "organization {} has no visible repositories",
            args.org
        )));
    }

    let mut manifest = Manifest::open(ctx)?;
    let count = listings.len();

    for listing in listings {
        // Keep local knowledge (projects, force-publish) when re-running
        // bootstrap over an existing manifest.
        let (force_publish, projects) = manifest
            .find_repository(&listing.name)
            .map(|existing| (existing.force_publish, existing.projects.clone()))
            .unwrap_or((false, vec![ProjectManifest::root()]));

        manifest.upsert_repository(RepositoryManifest {
            name: listing.name,
            remote_url: listing.ssh_url,
            default_branch: listing
                .default_branch_ref
                .map(|r| r.name)
                .unwrap_or_else(|| "master".to_string()),
            force_publish,
            projects,
        });
    }

    manifest.sort_repositories();
    manifest.save(ctx)?;

    log::success(&format!(
        "Bootstrapped manifest with {count} repositories from {}",
        args.org
    ));
    Ok(())
}
