use crate::error::Result;
use crate::release::executor::git::release_tag_name;
use crate::release::executor::{Action, Driver, ReleaseOverview, Task};
use crate::release::state::{ProjectState, ReleaseStage};

/// Final stage: publish the forge-side release for the tag.
pub(crate) struct Cleanup;

impl Task for Cleanup {
    fn target_stage(&self) -> ReleaseStage {
        ReleaseStage::Done
    }

    fn name(&self) -> &'static str {
        "Cleanup"
    }

    fn run(
        &self,
        project: &mut ProjectState,
        _overview: &ReleaseOverview,
        driver: &dyn Driver,
    ) -> Result<Action> {
        let vcs = driver.vcs(&project.project.repo)?;
        let tag = release_tag_name(project);
        vcs.create_release(&tag, &tag)?;
        Ok(Action::Proceed)
    }
}
