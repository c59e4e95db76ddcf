use clap::Args;

use maestro_core::Context;
use maestro_core::checksum::Checksum;
use maestro_core::config::{Manifest, profile};
use maestro_core::error::Result;
use maestro_core::log;
use maestro_core::process;
use maestro_core::vcs::{GitVcs, Vcs};

#[derive(Args, Debug)]
pub struct ForeachArgs {
    /// Shell command to run in every repository
    pub command: String,

    /// Do not open pull requests with the resulting changes
    #[arg(short = 'P', long)]
    pub no_pr: bool,

    /// Pull request title (a codename is generated when omitted)
    #[arg(short, long)]
    pub title: Option<String>,

    /// Pull request body
    #[arg(short, long, default_value = "")]
    pub body: String,
}

pub fn run(ctx: &Context, args: ForeachArgs) -> Result<()> {
    let title = args
        .title
        .clone()
        .unwrap_or_else(|| Checksum::of(args.command.as_str()).petname());
    let branch = branch_slug(&title);

    let manifest = Manifest::open(ctx)?;
    for repo in profile::current_repositories(ctx, &manifest)? {
        log::log(&format!("== {}", repo.name));
        let vcs = GitVcs::open(ctx, repo)?;

        if vcs.is_dirty()? {
            log::error_line("Repository is not in a clean state! Ignoring.");
            continue;
        }

        let base = vcs.active_branch()?;
        process::run_logged("sh", &["-c", &args.command], &ctx.repo_path(&repo.name))?;

        if args.no_pr {
            continue;
        }

        if !vcs.is_dirty()? {
            log::log("No changes were made.");
            continue;
        }

        vcs.checkout_new(&branch, false, false)?;
        vcs.commit(&title, &[])?;
        vcs.push_branch(&branch, false)?;
        let url = vcs.open_pull_request(&title, &args.body, &branch, &base)?;
        log::log(&format!("Pull request opened: {url}"));
        vcs.checkout(&base)?;
    }

    Ok(())
}

/// Derive a branch name from the pull request title: lowercase, hyphenated,
/// at most 16 characters.
fn branch_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || " -_".contains(*c))
        .collect();

    let mut slug = String::new();
    let mut last_was_dash = false;
    for c in cleaned.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
            last_was_dash = false;
        } else if !last_was_dash && !slug.is_empty() {
            slug.push('-');
            last_was_dash = true;
        }
    }

    let mut slug: String = slug.chars().take(16).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_slug_basic() {
        assert_eq!(branch_slug("Duly Up Pup"), "duly-up-pup");
    }

    #[test]
    fn test_branch_slug_strips_punctuation() {
        assert_eq!(branch_slug("Fix: the thing!"), "fix-the-thing");
    }

    #[test]
    fn test_branch_slug_truncates() {
        let slug = branch_slug("a very long pull request title indeed");
        assert!(slug.len() <= 16);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_branch_slug_collapses_separators() {
        assert_eq!(branch_slug("one -- two__three"), "one-two-three");
    }
}
