//! Stage-by-stage execution of a release plan.
//!
//! One task exists per lifecycle stage. The loop walks the projects of the
//! current phase and pushes each one through its remaining stages, saving
//! the release document after every transition: killing the process at any
//! point and rerunning continues exactly where it stopped, because every
//! task is idempotent. A task may end the round for its project with a
//! breakpoint (operator intervention required) without blocking the other
//! projects of the phase.

mod cleanup;
mod close_release_branch;
pub mod git;
mod merge_pull_request;
mod open_pull_request;
mod open_release_branch;
mod publish_package;

use std::fmt;

use colored::Colorize;
use semver::Version;

use crate::analysis::model::Language;
use crate::config::manifest::{ProjectHandle, RepositoryHandle};
use crate::context::Context;
use crate::error::Result;
use crate::language::LanguageSupport;
use crate::log;
use crate::prompt::Prompter;
use crate::release::state::{ProjectState, ReleaseStage, ReleaseState};
use crate::vcs::Vcs;

use cleanup::Cleanup;
use close_release_branch::CloseReleaseBranch;
use merge_pull_request::MergePullRequest;
use open_pull_request::OpenPullRequest;
use open_release_branch::OpenReleaseBranch;
use publish_package::PublishPackage;

/// Outcome of a task, or of a whole `proceed` round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Proceed,
    /// The stage does not apply to this project; keep going.
    Skip,
    /// Manual intervention needed; state is preserved, rerun resumes.
    Breakpoint,
    /// The round ran out of work.
    Finish,
}

impl Action {
    pub fn report(self) -> Option<String> {
        match self {
            Action::Proceed => None,
            Action::Skip => Some("SKIPPED".yellow().to_string()),
            Action::Breakpoint => Some("BREAKPOINT".yellow().to_string()),
            Action::Finish => Some("FINISHED".cyan().to_string()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Proceed => "proceed",
            Action::Skip => "skip",
            Action::Breakpoint => "breakpoint",
            Action::Finish => "finish",
        };
        f.write_str(name)
    }
}

/// External collaborators the executor needs. The CLI wires the real
/// adapters; tests substitute fakes.
pub trait Driver {
    fn context(&self) -> &Context;
    fn vcs(&self, repo: &RepositoryHandle) -> Result<Box<dyn Vcs + '_>>;
    fn language(&self, language: Language) -> Result<&dyn LanguageSupport>;
    fn prompter(&self) -> &dyn Prompter;
    /// Whether the registry may replace an existing version on publish.
    fn replace_on_publish(&self) -> bool {
        false
    }
    /// Persist the release document. Called after every stage transition.
    fn persist(&mut self, release: &ReleaseState) -> Result<()>;
}

/// Release facts a task may want beyond its own project: the codename and
/// the source table for pull-request bodies.
pub struct ReleaseOverview {
    pub codename: String,
    pub sources: Vec<(ProjectHandle, Version, Version)>,
}

impl ReleaseOverview {
    pub fn of(release: &ReleaseState) -> ReleaseOverview {
        let sources = release
            .sources
            .iter()
            .map(|(project, target)| {
                let from = release
                    .get_project(project)
                    .map(|prs| prs.from_version.clone())
                    .unwrap_or_else(|| target.clone());
                (project.clone(), from, target.clone())
            })
            .collect();
        ReleaseOverview {
            codename: release.codename(),
            sources,
        }
    }

    /// Markdown body for release pull requests.
    pub fn pull_request_body(&self) -> String {
        let mut body = format!(
            "This pull request is part of the release \"{}\".\n\n\
             | Source | From | To |\n|---|---|---|\n",
            self.codename
        );
        for (project, from, to) in &self.sources {
            body.push_str(&format!("| {project} | {from} | {to} |\n"));
        }
        body
    }
}

pub(crate) trait Task: Sync {
    /// The stage the project enters once this task completes.
    fn target_stage(&self) -> ReleaseStage;
    fn name(&self) -> &'static str;
    fn run(
        &self,
        project: &mut ProjectState,
        overview: &ReleaseOverview,
        driver: &dyn Driver,
    ) -> Result<Action>;
}

static TASKS: [&dyn Task; 6] = [
    &OpenReleaseBranch,
    &OpenPullRequest,
    &MergePullRequest,
    &CloseReleaseBranch,
    &PublishPackage,
    &Cleanup,
];

pub(crate) fn task_for(stage: ReleaseStage) -> Option<&'static dyn Task> {
    TASKS.into_iter().find(|task| task.target_stage() == stage)
}

/// The tasks the next `proceed` round would run, one per unfinished project
/// of the current phase.
pub fn plan_preview(release: &ReleaseState) -> Vec<(ProjectHandle, &'static str)> {
    let Some(phase) = release.current_phase() else {
        return vec![];
    };
    phase
        .projects()
        .iter()
        .filter(|prs| !prs.is_done())
        .filter_map(|prs| {
            let next = prs.stage.next()?;
            Some((prs.project.clone(), task_for(next)?.name()))
        })
        .collect()
}

/// Run the current phase until every project is done or hits a breakpoint.
///
/// Projects of later phases are never touched while an earlier phase has
/// unfinished work; that gating comes from operating on the current phase
/// only, and from the CLI rerunning `proceed` once per phase.
pub fn proceed(release: &mut ReleaseState, driver: &mut dyn Driver) -> Result<Action> {
    let overview = ReleaseOverview::of(release);

    let Some(phase_index) = release.current_phase_index() else {
        return Ok(Action::Finish);
    };

    let mut hit_breakpoint = false;

    for slot in 0..release.phases[phase_index].len() {
        let (label, stage) = {
            let prs = &release.phases[phase_index].projects()[slot];
            (prs.project.to_string(), prs.stage)
        };
        if stage == ReleaseStage::Done {
            continue;
        }

        for next_stage in stage.following() {
            let Some(task) = task_for(next_stage) else {
                continue;
            };
            let step = format!("{label}: {}", task.name());
            log::log(&format!("{step} ..."));

            let action = {
                let prs = &mut release.phases[phase_index].projects_mut()[slot];
                match task.run(prs, &overview, driver) {
                    Ok(action) => {
                        // Advance on every non-error outcome, breakpoints
                        // included: the task's stage is complete, the next
                        // round starts after it.
                        prs.stage = next_stage;
                        action
                    }
                    Err(e) => {
                        log::log(&format!("{step} {}", "ERROR".red()));
                        return Err(e);
                    }
                }
            };

            driver.persist(release)?;

            match action.report() {
                Some(report) => log::log(&format!("{step} {report}")),
                None => log::log(&format!("{step} {}", "OK".green())),
            }

            if action == Action::Breakpoint {
                hit_breakpoint = true;
                break;
            }
        }
    }

    Ok(if hit_breakpoint {
        Action::Breakpoint
    } else {
        Action::Finish
    })
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests {
    use super::testing::{MockDriver, project_at, single_project_release};
    use super::*;
    use crate::vcs::{ChecksStatus, PullRequest, PullRequestState};

    fn merged_pr() -> PullRequest {
        PullRequest {
            number: 12,
            url: "https://example.com/pull/12".to_string(),
            state: PullRequestState::Closed,
            merged: true,
            mergeable: None,
            checks: ChecksStatus::Absent,
            changes_requested: false,
        }
    }

    fn open_pr(checks: ChecksStatus, mergeable: Option<bool>, changes: bool) -> PullRequest {
        PullRequest {
            number: 12,
            url: "https://example.com/pull/12".to_string(),
            state: PullRequestState::Open,
            merged: false,
            mergeable,
            checks,
            changes_requested: changes,
        }
    }

    #[test]
    fn test_resume_from_merged_pull_request_to_done() {
        let mut release = single_project_release(ReleaseStage::PullRequestMerged, true);
        let mut driver = MockDriver::default();

        let action = proceed(&mut release, &mut driver).unwrap();

        assert_eq!(action, Action::Finish);
        assert!(release.is_done());
        // One save per transition, each reflecting the stage just entered.
        assert_eq!(
            driver.persisted_stages(),
            vec![
                vec![ReleaseStage::BranchClosed],
                vec![ReleaseStage::Published],
                vec![ReleaseStage::Done],
            ]
        );
        // Closing ran the branch/tag dance, publishing reached the registry.
        assert!(driver.vcs_ops().iter().any(|op| op == "tag v1.1.0"));
        assert!(driver.vcs_ops().iter().any(|op| op == "push-tag v1.1.0"));
        assert_eq!(driver.published(), vec!["core".to_string()]);
        // The registry-side release is created by the final cleanup.
        assert!(driver.vcs_ops().iter().any(|op| op == "create-release v1.1.0"));
    }

    #[test]
    fn test_rerun_after_interruption_reaches_same_state() {
        let mut release = single_project_release(ReleaseStage::PullRequestOpened, false);
        let mut driver = MockDriver::default();
        driver.pull_request = Some(open_pr(ChecksStatus::Passing, Some(true), false));

        let action = proceed(&mut release, &mut driver).unwrap();
        assert_eq!(action, Action::Finish);
        assert!(release.is_done());

        // Second run over the final document is a no-op with no side
        // effects: the terminal state is stable.
        let mut driver2 = MockDriver::default();
        let action = proceed(&mut release, &mut driver2).unwrap();
        assert_eq!(action, Action::Finish);
        assert!(driver2.persisted_stages().is_empty());
        assert!(driver2.vcs_ops().is_empty());
    }

    #[test]
    fn test_publish_skipped_for_unpublished_project() {
        let mut release = single_project_release(ReleaseStage::BranchClosed, false);
        let mut driver = MockDriver::default();

        let action = proceed(&mut release, &mut driver).unwrap();

        assert_eq!(action, Action::Finish);
        assert!(release.is_done());
        assert!(driver.published().is_empty());
        // SKIP still advances and persists, then execution continues to the
        // next stage in the same round.
        assert_eq!(
            driver.persisted_stages(),
            vec![vec![ReleaseStage::Published], vec![ReleaseStage::Done]]
        );
    }

    #[test]
    fn test_closed_unmerged_pull_request_breaks() {
        let mut release = single_project_release(ReleaseStage::PullRequestOpened, false);
        let mut driver = MockDriver::default();
        driver.pull_request = Some(PullRequest {
            state: PullRequestState::Closed,
            merged: false,
            ..merged_pr()
        });

        let action = proceed(&mut release, &mut driver).unwrap();

        assert_eq!(action, Action::Breakpoint);
        // The merge stage itself completed (with a breakpoint), so the
        // project rests at PullRequestMerged and the rerun starts after it.
        assert_eq!(
            release.all_projects().next().unwrap().stage,
            ReleaseStage::PullRequestMerged
        );
        assert_eq!(
            driver.persisted_stages(),
            vec![vec![ReleaseStage::PullRequestMerged]]
        );
    }

    #[test]
    fn test_pending_checks_break_without_merging() {
        let mut release = single_project_release(ReleaseStage::PullRequestOpened, false);
        let mut driver = MockDriver::default();
        driver.pull_request = Some(open_pr(ChecksStatus::Pending, Some(true), false));

        let action = proceed(&mut release, &mut driver).unwrap();
        assert_eq!(action, Action::Breakpoint);
        assert!(driver.vcs_ops().iter().all(|op| !op.starts_with("merge-pr")));
    }

    #[test]
    fn test_changes_requested_break_without_merging() {
        let mut release = single_project_release(ReleaseStage::PullRequestOpened, false);
        let mut driver = MockDriver::default();
        driver.pull_request = Some(open_pr(ChecksStatus::Passing, Some(true), true));

        let action = proceed(&mut release, &mut driver).unwrap();
        assert_eq!(action, Action::Breakpoint);
        assert!(driver.vcs_ops().iter().all(|op| !op.starts_with("merge-pr")));
    }

    #[test]
    fn test_green_pull_request_is_merged() {
        let mut release = single_project_release(ReleaseStage::PullRequestOpened, false);
        let mut driver = MockDriver::default();
        driver.pull_request = Some(open_pr(ChecksStatus::Passing, Some(true), false));

        let action = proceed(&mut release, &mut driver).unwrap();
        assert_eq!(action, Action::Finish);
        assert!(driver.vcs_ops().iter().any(|op| op == "merge-pr 12"));
        assert!(release.is_done());
    }

    #[test]
    fn test_earlier_phase_gates_later_phase() {
        let mut release = ReleaseState {
            sources: Default::default(),
            phases: vec![
                crate::release::state::PhaseState::new(vec![project_at(
                    "core",
                    ReleaseStage::PullRequestOpened,
                    false,
                )]),
                crate::release::state::PhaseState::new(vec![project_at(
                    "web",
                    ReleaseStage::Clean,
                    false,
                )]),
            ],
        };
        let mut driver = MockDriver::default();
        // The core PR is not mergeable yet: phase 1 cannot finish.
        driver.pull_request = Some(open_pr(ChecksStatus::Pending, Some(true), false));

        let action = proceed(&mut release, &mut driver).unwrap();
        assert_eq!(action, Action::Breakpoint);

        // Nothing at all happened to the second phase.
        let web = release.get_project(&ProjectHandle::parse("web").unwrap()).unwrap();
        assert_eq!(web.stage, ReleaseStage::Clean);
    }

    #[test]
    fn test_breakpoint_does_not_block_phase_siblings() {
        let mut release = ReleaseState {
            sources: Default::default(),
            phases: vec![crate::release::state::PhaseState::new(vec![
                project_at("core", ReleaseStage::PullRequestOpened, false),
                project_at("web", ReleaseStage::BranchClosed, false),
            ])],
        };
        let mut driver = MockDriver::default();
        driver.pull_request = Some(open_pr(ChecksStatus::Pending, Some(true), false));

        let action = proceed(&mut release, &mut driver).unwrap();
        assert_eq!(action, Action::Breakpoint);

        // core stopped at its breakpoint, web still ran to completion.
        let core = release.get_project(&ProjectHandle::parse("core").unwrap()).unwrap();
        assert_eq!(core.stage, ReleaseStage::PullRequestMerged);
        let web = release.get_project(&ProjectHandle::parse("web").unwrap()).unwrap();
        assert_eq!(web.stage, ReleaseStage::Done);
    }

    #[test]
    fn test_plan_preview_names_next_tasks() {
        let release = single_project_release(ReleaseStage::PullRequestMerged, false);
        let preview = plan_preview(&release);
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].1, "Close release branch");
    }

    #[test]
    fn test_proceed_on_empty_release_finishes() {
        let mut release = ReleaseState::default();
        let mut driver = MockDriver::default();
        assert_eq!(proceed(&mut release, &mut driver).unwrap(), Action::Finish);
    }

    #[test]
    fn test_pull_request_body_lists_sources() {
        let release = single_project_release(ReleaseStage::Clean, false);
        let overview = ReleaseOverview::of(&release);
        let body = overview.pull_request_body();
        assert!(body.contains(&overview.codename));
        assert!(body.contains("| core | 1.0.0 | 1.1.0 |"));
    }
}
