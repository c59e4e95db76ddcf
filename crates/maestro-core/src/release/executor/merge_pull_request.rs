use crate::error::Result;
use crate::log;
use crate::release::executor::git::release_branch_name;
use crate::release::executor::{Action, Driver, ReleaseOverview, Task};
use crate::release::state::{ProjectState, ReleaseStage};
use crate::vcs::{ChecksStatus, PullRequestState};

/// Wait for, or perform, the merge of the release pull request.
///
/// An already-merged pull request proceeds immediately, which is what makes
/// rerunning after a manual merge (or an interruption) converge. Anything
/// that needs a human stops the project at a breakpoint.
pub(crate) struct MergePullRequest;

impl Task for MergePullRequest {
    fn target_stage(&self) -> ReleaseStage {
        ReleaseStage::PullRequestMerged
    }

    fn name(&self) -> &'static str {
        "Merge pull request"
    }

    fn run(
        &self,
        project: &mut ProjectState,
        _overview: &ReleaseOverview,
        driver: &dyn Driver,
    ) -> Result<Action> {
        let vcs = driver.vcs(&project.project.repo)?;
        let branch = release_branch_name(project);

        let Some(pr) = vcs.find_pull_request(&branch, true)? else {
            log::warn(&format!(
                "No pull request found for branch {branch}. \
                 Open it (or rerun the previous stage) and run again."
            ));
            return Ok(Action::Breakpoint);
        };

        if pr.merged {
            return Ok(Action::Proceed);
        }

        if pr.state == PullRequestState::Closed {
            log::warn(&format!(
                "Pull request {} was closed without merging. \
                 Reopen and merge it manually, then rerun.",
                pr.url
            ));
            return Ok(Action::Breakpoint);
        }

        let mergeable = pr.mergeable == Some(true)
            && !matches!(pr.checks, ChecksStatus::Failing | ChecksStatus::Pending)
            && !pr.changes_requested;

        if mergeable
            && driver
                .prompter()
                .confirm(&format!("Merge pull request {}?", pr.url))
        {
            vcs.merge_pull_request(pr.number)?;
            return Ok(Action::Proceed);
        }

        log::warn(&format!(
            "Pull request {} is not ready to merge. \
             Get it green and merged, then rerun.",
            pr.url
        ));
        Ok(Action::Breakpoint)
    }
}
