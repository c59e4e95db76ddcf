//! Version-control operations, abstracted behind the [`Vcs`] trait so the
//! executor can run against fakes in tests.
//!
//! [`GitVcs`] drives plain `git` for repository operations and the `gh` CLI
//! for everything GitHub-side (pull requests, releases), parsing its JSON
//! output.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::manifest::RepositoryManifest;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::log;
use crate::process;

/// Outcome of a branch deletion: deleting something that is already gone is
/// not an error, the executor reruns tasks after interruptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDeletion {
    Deleted,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestState {
    Open,
    Closed,
}

/// Combined status of a pull request's checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksStatus {
    Passing,
    Pending,
    Failing,
    /// No checks configured.
    Absent,
}

#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
    pub state: PullRequestState,
    pub merged: bool,
    /// `None` while the forge is still computing mergeability.
    pub mergeable: Option<bool>,
    pub checks: ChecksStatus,
    pub changes_requested: bool,
}

pub trait Vcs {
    fn default_branch(&self) -> &str;
    fn active_branch(&self) -> Result<String>;
    fn is_dirty(&self) -> Result<bool>;
    fn is_tracked(&self, path: &Path) -> Result<bool>;
    fn is_changed(&self, path: &Path) -> Result<bool>;
    fn branch_exists(&self, branch: &str) -> Result<bool>;
    fn branch_tracks_remote(&self, branch: &str) -> Result<bool>;
    fn checkout(&self, branch: &str) -> Result<()>;
    fn checkout_new_branch(&self, branch: &str) -> Result<()>;
    fn delete_local_branch(&self, branch: &str) -> Result<BranchDeletion>;
    fn delete_remote_branch(&self, branch: &str) -> Result<BranchDeletion>;
    fn commit(&self, message: &str, files: &[PathBuf]) -> Result<()>;
    fn tag(&self, name: &str, message: Option<&str>) -> Result<()>;
    /// Fails with [`Error::VcsPushRejected`] when the remote rejects a
    /// non-forced push; the caller decides whether to retry with `force`.
    fn push_branch(&self, branch: &str, force: bool) -> Result<()>;
    fn push_tag(&self, tag: &str) -> Result<()>;
    fn fetch(&self) -> Result<()>;
    fn pull(&self) -> Result<()>;
    fn find_pull_request(&self, branch: &str, include_closed: bool)
    -> Result<Option<PullRequest>>;
    /// Open a pull request and return its URL.
    fn open_pull_request(&self, title: &str, body: &str, branch: &str, base: &str)
    -> Result<String>;
    fn merge_pull_request(&self, number: u64) -> Result<()>;
    fn create_release(&self, tag: &str, message: &str) -> Result<()>;

    /// Create and check out a fresh branch.
    ///
    /// With `delete_existing`, a stale local branch of the same name is
    /// removed first; a branch tracking a remote is refused because deleting
    /// it silently would lose someone's pushed work. With `ensure_clean`,
    /// uncommitted changes abort the checkout.
    fn checkout_new(&self, branch: &str, ensure_clean: bool, delete_existing: bool) -> Result<()> {
        if delete_existing && self.branch_exists(branch)? {
            if self.branch_tracks_remote(branch)? {
                return Err(Error::StateConflict(format!(
                    "branch {branch} already exists and tracks a remote branch; \
                     remove both branches before proceeding"
                )));
            }
            if self.active_branch()? == branch {
                let default = self.default_branch().to_string();
                log::warn(&format!(
                    "Checking out {default} before deleting branch {branch}"
                ));
                self.checkout(&default)?;
            }
            log::warn(&format!("Deleting existing branch {branch}"));
            self.delete_local_branch(branch)?;
        }

        if ensure_clean && self.is_dirty()? {
            return Err(Error::VcsNotClean(self.active_branch()?));
        }

        self.checkout_new_branch(branch)
    }
}

// ---------------------------------------------------------------------------
// git + gh implementation
// ---------------------------------------------------------------------------

pub struct GitVcs {
    location: PathBuf,
    default_branch: String,
    remote: String,
}

impl GitVcs {
    pub fn open(ctx: &Context, manifest: &RepositoryManifest) -> Result<GitVcs> {
        let location = ctx.repo_path(&manifest.name);
        if !location.join(".git").exists() {
            return Err(Error::Other(anyhow::anyhow!(
                "repository {} is not cloned at {}",
                manifest.name,
                location.display()
            )));
        }
        Ok(GitVcs {
            location,
            default_branch: manifest.default_branch.clone(),
            remote: "origin".to_string(),
        })
    }

    fn git(&self, args: &[&str]) -> Result<process::ProcessOutput> {
        process::run("git", args, &self.location)
    }

    fn git_unchecked(&self, args: &[&str]) -> Result<process::ProcessOutput> {
        process::run_unchecked("git", args, &self.location)
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.location).unwrap_or(path)
    }
}

impl Vcs for GitVcs {
    fn default_branch(&self) -> &str {
        &self.default_branch
    }

    fn active_branch(&self) -> Result<String> {
        Ok(self
            .git(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .stdout
            .trim()
            .to_string())
    }

    fn is_dirty(&self) -> Result<bool> {
        Ok(!self.git(&["status", "--porcelain"])?.stdout.trim().is_empty())
    }

    fn is_tracked(&self, path: &Path) -> Result<bool> {
        let rel = self.relative(path).to_string_lossy().into_owned();
        Ok(self
            .git_unchecked(&["ls-files", "--error-unmatch", &rel])?
            .success())
    }

    fn is_changed(&self, path: &Path) -> Result<bool> {
        let rel = self.relative(path).to_string_lossy().into_owned();
        let out = self.git(&["diff", "--name-only"])?;
        Ok(out.stdout.lines().any(|line| line.trim() == rel))
    }

    fn branch_exists(&self, branch: &str) -> Result<bool> {
        let reference = format!("refs/heads/{branch}");
        Ok(self
            .git_unchecked(&["show-ref", "--verify", "--quiet", &reference])?
            .success())
    }

    fn branch_tracks_remote(&self, branch: &str) -> Result<bool> {
        let upstream = format!("{branch}@{{upstream}}");
        Ok(self
            .git_unchecked(&["rev-parse", "--abbrev-ref", &upstream])?
            .success())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.git(&["checkout", branch])?;
        Ok(())
    }

    fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        self.git(&["checkout", "-b", branch])?;
        Ok(())
    }

    fn delete_local_branch(&self, branch: &str) -> Result<BranchDeletion> {
        if !self.branch_exists(branch)? {
            return Ok(BranchDeletion::Skipped);
        }
        self.git(&["branch", "-D", branch])?;
        Ok(BranchDeletion::Deleted)
    }

    fn delete_remote_branch(&self, branch: &str) -> Result<BranchDeletion> {
        let out = self.git_unchecked(&["push", &self.remote, "--delete", branch])?;
        if out.success() {
            Ok(BranchDeletion::Deleted)
        } else if out.stderr.contains("remote ref does not exist") {
            Ok(BranchDeletion::Skipped)
        } else {
            Err(Error::Subprocess {
                command: format!("git push {} --delete {branch}", self.remote),
                status: "failed".to_string(),
                stderr: out.stderr.trim().to_string(),
            })
        }
    }

    fn commit(&self, message: &str, files: &[PathBuf]) -> Result<()> {
        log::log(&format!("Commit: {message}"));
        if files.is_empty() {
            self.git(&["add", "."])?;
        } else {
            let mut args = vec!["add".to_string(), "--".to_string()];
            args.extend(
                files
                    .iter()
                    .map(|f| self.relative(f).to_string_lossy().into_owned()),
            );
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            self.git(&arg_refs)?;
        }
        self.git(&["commit", "-m", message])?;
        Ok(())
    }

    fn tag(&self, name: &str, message: Option<&str>) -> Result<()> {
        let message = message.unwrap_or(name);
        let out = self.git_unchecked(&["tag", "-a", name, "-m", message])?;
        // Rerunning after an interruption may find the tag already in place.
        if out.success() || out.stderr.contains("already exists") {
            Ok(())
        } else {
            Err(Error::Subprocess {
                command: format!("git tag -a {name}"),
                status: "failed".to_string(),
                stderr: out.stderr.trim().to_string(),
            })
        }
    }

    fn push_branch(&self, branch: &str, force: bool) -> Result<()> {
        let out = if force {
            self.git_unchecked(&["push", "-f", "-u", &self.remote, branch])?
        } else {
            self.git_unchecked(&["push", "-u", &self.remote, branch])?
        };
        if out.success() {
            Ok(())
        } else if out.stderr.contains("[rejected]") {
            Err(Error::VcsPushRejected(branch.to_string()))
        } else {
            Err(Error::Subprocess {
                command: format!("git push -u {} {branch}", self.remote),
                status: "failed".to_string(),
                stderr: out.stderr.trim().to_string(),
            })
        }
    }

    fn push_tag(&self, tag: &str) -> Result<()> {
        self.git(&["push", &self.remote, tag])?;
        Ok(())
    }

    fn fetch(&self) -> Result<()> {
        self.git(&["fetch", "--tags", &self.remote])?;
        Ok(())
    }

    fn pull(&self) -> Result<()> {
        let out = self.git_unchecked(&["pull", &self.remote])?;
        if out.success() {
            Ok(())
        } else if out.stderr.contains("couldn't find remote ref") {
            Err(Error::VcsRefNotFound(out.stderr.trim().to_string()))
        } else {
            Err(Error::Subprocess {
                command: format!("git pull {}", self.remote),
                status: "failed".to_string(),
                stderr: out.stderr.trim().to_string(),
            })
        }
    }

    fn find_pull_request(
        &self,
        branch: &str,
        include_closed: bool,
    ) -> Result<Option<PullRequest>> {
        let state = if include_closed { "all" } else { "open" };
        let out = process::run(
            "gh",
            &[
                "pr",
                "list",
                "--head",
                branch,
                "--state",
                state,
                "--limit",
                "1",
                "--json",
                PR_JSON_FIELDS,
            ],
            &self.location,
        )?;
        Ok(parse_pull_requests(&out.stdout)?.into_iter().next())
    }

    fn open_pull_request(
        &self,
        title: &str,
        body: &str,
        branch: &str,
        base: &str,
    ) -> Result<String> {
        let out = process::run(
            "gh",
            &[
                "pr", "create", "--title", title, "--body", body, "--head", branch, "--base", base,
            ],
            &self.location,
        )?;
        Ok(out.stdout.trim().to_string())
    }

    fn merge_pull_request(&self, number: u64) -> Result<()> {
        let number = number.to_string();
        process::run("gh", &["pr", "merge", &number, "--merge"], &self.location)?;
        Ok(())
    }

    fn create_release(&self, tag: &str, message: &str) -> Result<()> {
        let out = process::run_unchecked(
            "gh",
            &[
                "release", "create", tag, "--title", tag, "--notes", message, "--verify-tag",
            ],
            &self.location,
        )?;
        if out.success() || out.stderr.contains("already exists") {
            Ok(())
        } else {
            Err(Error::Subprocess {
                command: format!("gh release create {tag}"),
                status: "failed".to_string(),
                stderr: out.stderr.trim().to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// gh JSON parsing
// ---------------------------------------------------------------------------

const PR_JSON_FIELDS: &str = "number,url,state,mergedAt,mergeable,reviewDecision,statusCheckRollup";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPullRequest {
    number: u64,
    url: String,
    state: String,
    #[serde(default)]
    merged_at: Option<String>,
    #[serde(default)]
    mergeable: Option<String>,
    #[serde(default)]
    review_decision: Option<String>,
    #[serde(default)]
    status_check_rollup: Vec<RawCheck>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCheck {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

fn parse_pull_requests(json: &str) -> Result<Vec<PullRequest>> {
    let raw: Vec<RawPullRequest> = serde_json::from_str(json)?;
    Ok(raw
        .into_iter()
        .map(|pr| {
            let state = match pr.state.as_str() {
                "OPEN" => PullRequestState::Open,
                _ => PullRequestState::Closed,
            };
            PullRequest {
                number: pr.number,
                url: pr.url,
                merged: pr.state == "MERGED" || pr.merged_at.is_some(),
                state,
                mergeable: match pr.mergeable.as_deref() {
                    Some("MERGEABLE") => Some(true),
                    Some("CONFLICTING") => Some(false),
                    _ => None,
                },
                checks: combined_checks(&pr.status_check_rollup),
                changes_requested: pr.review_decision.as_deref() == Some("CHANGES_REQUESTED"),
            }
        })
        .collect())
}

fn combined_checks(checks: &[RawCheck]) -> ChecksStatus {
    if checks.is_empty() {
        return ChecksStatus::Absent;
    }

    let mut pending = false;
    for check in checks {
        // Status checks report `state`, check runs report status/conclusion.
        let outcome = check
            .conclusion
            .as_deref()
            .or(check.state.as_deref())
            .unwrap_or("");
        match outcome {
            "FAILURE" | "ERROR" | "TIMED_OUT" | "CANCELLED" | "ACTION_REQUIRED" => {
                return ChecksStatus::Failing;
            }
            "SUCCESS" | "NEUTRAL" | "SKIPPED" => {}
            _ => pending = true,
        }
        if check.status.as_deref() == Some("IN_PROGRESS")
            || check.status.as_deref() == Some("QUEUED")
        {
            pending = true;
        }
    }

    if pending {
        ChecksStatus::Pending
    } else {
        ChecksStatus::Passing
    }
}
