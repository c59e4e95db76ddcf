use crate::error::{Error, Result};
use crate::log;
use crate::release::executor::git::{pull_request_title, release_branch_name};
use crate::release::executor::{Action, Driver, ReleaseOverview, Task};
use crate::release::state::{ProjectState, ReleaseStage};

/// Push the release branch and open its pull request.
///
/// Idempotent: pushing an already-pushed branch is a no-op, and an existing
/// open pull request for the branch is reused.
pub(crate) struct OpenPullRequest;

impl Task for OpenPullRequest {
    fn target_stage(&self) -> ReleaseStage {
        ReleaseStage::PullRequestOpened
    }

    fn name(&self) -> &'static str {
        "Open pull request"
    }

    fn run(
        &self,
        project: &mut ProjectState,
        overview: &ReleaseOverview,
        driver: &dyn Driver,
    ) -> Result<Action> {
        let vcs = driver.vcs(&project.project.repo)?;
        let branch = release_branch_name(project);

        match vcs.push_branch(&branch, false) {
            Ok(()) => {}
            Err(Error::VcsPushRejected(_))
                if driver
                    .prompter()
                    .confirm("Push was rejected, try to force push?") =>
            {
                vcs.push_branch(&branch, true)?;
            }
            Err(e) => return Err(e),
        }

        match vcs.find_pull_request(&branch, false)? {
            Some(pr) => log::log(&format!("Pull request already opened: {}", pr.url)),
            None => {
                let url = vcs.open_pull_request(
                    &pull_request_title(project),
                    &overview.pull_request_body(),
                    &branch,
                    vcs.default_branch(),
                )?;
                log::log(&format!("Pull request opened: {url}"));
            }
        }

        Ok(Action::Proceed)
    }
}
