use crate::error::Result;
use crate::release::executor::git::release_branch_name;
use crate::release::executor::{Action, Driver, ReleaseOverview, Task};
use crate::release::state::{ProjectState, ReleaseStage};

/// Open the release branch and write the version bump into the project
/// manifest.
///
/// Idempotent: a stale local release branch from a previous attempt is
/// deleted before the fresh one is created.
pub(crate) struct OpenReleaseBranch;

impl Task for OpenReleaseBranch {
    fn target_stage(&self) -> ReleaseStage {
        ReleaseStage::BranchOpened
    }

    fn name(&self) -> &'static str {
        "Open release branch"
    }

    fn run(
        &self,
        project: &mut ProjectState,
        _overview: &ReleaseOverview,
        driver: &dyn Driver,
    ) -> Result<Action> {
        let vcs = driver.vcs(&project.project.repo)?;
        let branch = release_branch_name(project);

        vcs.checkout_new(&branch, true, true)?;

        let language = driver.language(project.language)?;
        language.write_release(
            driver.context(),
            vcs.as_ref(),
            driver.prompter(),
            &project.project,
            &project.to_version,
            project.version_span,
            &project.dependency_updates,
        )?;

        Ok(Action::Proceed)
    }
}
