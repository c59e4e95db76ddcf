//! Repository profiles: named subsets of the manifest.
//!
//! A profile file (`profiles/<name>.txt`) lists repository-name globs, one
//! per line; a `!`-prefixed glob excludes matches again. The built-in `all`
//! profile selects every repository.

use glob::Pattern;

use crate::config::file;
use crate::config::manifest::{Manifest, ProjectHandle, RepositoryHandle, RepositoryManifest};
use crate::context::Context;
use crate::error::{Error, Result};

pub const PROFILE_PREFIX: &str = "profiles/";
pub const ALL_PROFILE: &str = "all";

#[derive(Debug)]
struct ProfilePattern {
    negated: bool,
    pattern: Pattern,
}

/// A selection of repositories by name.
#[derive(Debug)]
pub struct Profile {
    kind: ProfileKind,
}

#[derive(Debug)]
enum ProfileKind {
    All,
    Named { patterns: Vec<ProfilePattern> },
}

impl Profile {
    /// Load the context's active profile.
    pub fn current(ctx: &Context) -> Result<Profile> {
        Self::by_name(ctx, &ctx.profile_name)
    }

    pub fn by_name(ctx: &Context, name: &str) -> Result<Profile> {
        if name == ALL_PROFILE {
            return Ok(Profile {
                kind: ProfileKind::All,
            });
        }

        let file_name = format!("{PROFILE_PREFIX}{name}");
        let lines = file::load_lines(ctx, &file_name)?.ok_or_else(|| {
            Error::Other(anyhow::anyhow!(
                "profile \"{name}\" not found, expected {}",
                file::lines_path(ctx, &file_name).display()
            ))
        })?;

        let patterns = lines
            .iter()
            .map(|line| {
                let (negated, glob_str) = match line.strip_prefix('!') {
                    Some(rest) => (true, rest.trim()),
                    None => (false, line.as_str()),
                };
                let pattern = Pattern::new(glob_str).map_err(|e| {
                    Error::Other(anyhow::anyhow!(
                        "invalid glob \"{glob_str}\" in profile \"{name}\": {e}"
                    ))
                })?;
                Ok(ProfilePattern { negated, pattern })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Profile {
            kind: ProfileKind::Named { patterns },
        })
    }

    /// Does the profile select this repository name?
    ///
    /// A repository is selected when it matches at least one positive glob
    /// (or the profile has none) and matches no negated glob.
    pub fn matches(&self, repo_name: &str) -> bool {
        match &self.kind {
            ProfileKind::All => true,
            ProfileKind::Named { patterns } => {
                let mut any_positive = false;
                let mut included = false;
                let mut excluded = false;
                for p in patterns {
                    let hit = p.pattern.matches(repo_name);
                    if p.negated {
                        excluded |= hit;
                    } else {
                        any_positive = true;
                        included |= hit;
                    }
                }
                (included || !any_positive) && !excluded
            }
        }
    }
}

/// Repositories of the manifest selected by the active profile.
pub fn current_repositories<'a>(
    ctx: &Context,
    manifest: &'a Manifest,
) -> Result<Vec<&'a RepositoryManifest>> {
    let profile = Profile::current(ctx)?;
    Ok(manifest
        .iter_repositories()
        .filter(|repo| profile.matches(&repo.name))
        .collect())
}

pub fn current_repository_handles(
    ctx: &Context,
    manifest: &Manifest,
) -> Result<Vec<RepositoryHandle>> {
    Ok(current_repositories(ctx, manifest)?
        .into_iter()
        .map(|repo| repo.handle())
        .collect())
}

pub fn current_project_handles(ctx: &Context, manifest: &Manifest) -> Result<Vec<ProjectHandle>> {
    Ok(current_repositories(ctx, manifest)?
        .into_iter()
        .flat_map(|repo| repo.project_handles().collect::<Vec<_>>())
        .collect())
}
