use crate::error::{Error, Result};
use crate::log;
use crate::release::executor::{Action, Driver, ReleaseOverview, Task};
use crate::release::state::{ProjectState, ReleaseStage};

/// Publish the project to its package registry, or skip when the package is
/// not published at all.
///
/// Registry failures and an operator backing out of the dry-run review are
/// breakpoints, not errors: the release stays resumable.
pub(crate) struct PublishPackage;

impl Task for PublishPackage {
    fn target_stage(&self) -> ReleaseStage {
        ReleaseStage::Published
    }

    fn name(&self) -> &'static str {
        "Publish package"
    }

    fn run(
        &self,
        project: &mut ProjectState,
        _overview: &ReleaseOverview,
        driver: &dyn Driver,
    ) -> Result<Action> {
        if !project.publish {
            return Ok(Action::Skip);
        }

        let language = driver.language(project.language)?;
        match language.publish(
            driver.context(),
            driver.prompter(),
            &project.project,
            driver.replace_on_publish(),
        ) {
            Ok(true) => Ok(Action::Proceed),
            Ok(false) => {
                log::warn("Publishing was not confirmed, stopping here. Rerun to retry.");
                Ok(Action::Breakpoint)
            }
            Err(Error::PublishFailure(name)) => {
                log::warn(&format!(
                    "Failed to publish {name}. Inspect the registry output above and rerun."
                ));
                Ok(Action::Breakpoint)
            }
            Err(e) => Err(e),
        }
    }
}
