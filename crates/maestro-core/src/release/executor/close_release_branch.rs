use crate::error::Result;
use crate::release::executor::git::{release_branch_name, release_tag_name};
use crate::release::executor::{Action, Driver, ReleaseOverview, Task};
use crate::release::state::{ProjectState, ReleaseStage};

/// Retire the release branch and pin the release with an annotated tag.
///
/// Idempotent: branch deletions skip when the branch is already gone, tag
/// creation tolerates an existing identical tag.
pub(crate) struct CloseReleaseBranch;

impl Task for CloseReleaseBranch {
    fn target_stage(&self) -> ReleaseStage {
        ReleaseStage::BranchClosed
    }

    fn name(&self) -> &'static str {
        "Close release branch"
    }

    fn run(
        &self,
        project: &mut ProjectState,
        _overview: &ReleaseOverview,
        driver: &dyn Driver,
    ) -> Result<Action> {
        let vcs = driver.vcs(&project.project.repo)?;
        let branch = release_branch_name(project);
        let tag = release_tag_name(project);

        let default = vcs.default_branch().to_string();
        vcs.checkout(&default)?;
        vcs.fetch()?;
        vcs.pull()?;

        vcs.delete_remote_branch(&branch)?;
        vcs.delete_local_branch(&branch)?;

        vcs.tag(&tag, Some(&tag))?;
        vcs.push_tag(&tag)?;

        Ok(Action::Proceed)
    }
}
