//! Fakes for executor tests: an in-memory VCS, language support and driver
//! that record every side effect instead of performing it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use semver::Version;

use crate::analysis::model::{AnalysisEntry, DependencyUpdate, Language};
use crate::config::manifest::{ProjectHandle, RepositoryHandle};
use crate::context::Context;
use crate::edit::Span;
use crate::error::Result;
use crate::language::LanguageSupport;
use crate::prompt::{AssumeYes, Prompter};
use crate::release::executor::Driver;
use crate::release::state::{PhaseState, ProjectState, ReleaseStage, ReleaseState};
use crate::vcs::{BranchDeletion, PullRequest, PullRequestState, Vcs};

pub(crate) fn project_at(name: &str, stage: ReleaseStage, publish: bool) -> ProjectState {
    ProjectState {
        project: ProjectHandle::parse(name).unwrap(),
        from_version: Version::parse("1.0.0").unwrap(),
        to_version: Version::parse("1.1.0").unwrap(),
        version_span: Span::new(3, 14, 3, 21),
        language: Language::Elixir,
        publish,
        dependency_updates: vec![],
        stage,
    }
}

pub(crate) fn single_project_release(stage: ReleaseStage, publish: bool) -> ReleaseState {
    let sources: BTreeMap<ProjectHandle, Version> = [(
        ProjectHandle::parse("core").unwrap(),
        Version::parse("1.1.0").unwrap(),
    )]
    .into_iter()
    .collect();
    ReleaseState {
        sources,
        phases: vec![PhaseState::new(vec![project_at("core", stage, publish)])],
    }
}

type OpLog = Arc<Mutex<Vec<String>>>;

struct MockVcs {
    ops: OpLog,
    pull_request: Option<PullRequest>,
    default_branch: String,
}

impl MockVcs {
    fn record(&self, op: String) {
        self.ops.lock().unwrap().push(op);
    }
}

impl Vcs for MockVcs {
    fn default_branch(&self) -> &str {
        &self.default_branch
    }

    fn active_branch(&self) -> Result<String> {
        Ok(self.default_branch.clone())
    }

    fn is_dirty(&self) -> Result<bool> {
        Ok(false)
    }

    fn is_tracked(&self, _path: &Path) -> Result<bool> {
        Ok(false)
    }

    fn is_changed(&self, _path: &Path) -> Result<bool> {
        Ok(false)
    }

    fn branch_exists(&self, _branch: &str) -> Result<bool> {
        Ok(false)
    }

    fn branch_tracks_remote(&self, _branch: &str) -> Result<bool> {
        Ok(false)
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.record(format!("checkout {branch}"));
        Ok(())
    }

    fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        self.record(format!("checkout-new {branch}"));
        Ok(())
    }

    fn delete_local_branch(&self, branch: &str) -> Result<BranchDeletion> {
        self.record(format!("delete-local {branch}"));
        Ok(BranchDeletion::Skipped)
    }

    fn delete_remote_branch(&self, branch: &str) -> Result<BranchDeletion> {
        self.record(format!("delete-remote {branch}"));
        Ok(BranchDeletion::Skipped)
    }

    fn commit(&self, message: &str, _files: &[PathBuf]) -> Result<()> {
        self.record(format!("commit {message}"));
        Ok(())
    }

    fn tag(&self, name: &str, _message: Option<&str>) -> Result<()> {
        self.record(format!("tag {name}"));
        Ok(())
    }

    fn push_branch(&self, branch: &str, force: bool) -> Result<()> {
        self.record(format!(
            "push-branch {branch}{}",
            if force { " (force)" } else { "" }
        ));
        Ok(())
    }

    fn push_tag(&self, tag: &str) -> Result<()> {
        self.record(format!("push-tag {tag}"));
        Ok(())
    }

    fn fetch(&self) -> Result<()> {
        self.record("fetch".to_string());
        Ok(())
    }

    fn pull(&self) -> Result<()> {
        self.record("pull".to_string());
        Ok(())
    }

    fn find_pull_request(
        &self,
        _branch: &str,
        include_closed: bool,
    ) -> Result<Option<PullRequest>> {
        Ok(self.pull_request.clone().filter(|pr| {
            include_closed || (pr.state == PullRequestState::Open && !pr.merged)
        }))
    }

    fn open_pull_request(
        &self,
        _title: &str,
        _body: &str,
        branch: &str,
        base: &str,
    ) -> Result<String> {
        self.record(format!("open-pr {branch} -> {base}"));
        Ok("https://example.com/pull/99".to_string())
    }

    fn merge_pull_request(&self, number: u64) -> Result<()> {
        self.record(format!("merge-pr {number}"));
        Ok(())
    }

    fn create_release(&self, tag: &str, _message: &str) -> Result<()> {
        self.record(format!("create-release {tag}"));
        Ok(())
    }
}

struct MockLanguage {
    ops: OpLog,
    published: OpLog,
}

impl LanguageSupport for MockLanguage {
    fn language(&self) -> Language {
        Language::Elixir
    }

    fn test_project(&self, _location: &Path) -> bool {
        false
    }

    fn analyze(&self, _ctx: &Context, project: &ProjectHandle) -> Result<AnalysisEntry> {
        Err(crate::error::Error::Analysis {
            project: project.to_string(),
            reason: "mock language cannot analyze".to_string(),
        })
    }

    fn write_release(
        &self,
        _ctx: &Context,
        _vcs: &dyn Vcs,
        _prompter: &dyn Prompter,
        project: &ProjectHandle,
        to_version: &Version,
        _version_span: Span,
        _dependency_updates: &[DependencyUpdate],
    ) -> Result<()> {
        self.ops
            .lock()
            .unwrap()
            .push(format!("write-release {project} {to_version}"));
        Ok(())
    }

    fn publish(
        &self,
        _ctx: &Context,
        _prompter: &dyn Prompter,
        project: &ProjectHandle,
        _replace: bool,
    ) -> Result<bool> {
        self.published.lock().unwrap().push(project.to_string());
        Ok(true)
    }
}

pub(crate) struct MockDriver {
    ctx: Context,
    ops: OpLog,
    published_log: OpLog,
    persisted: Vec<Vec<ReleaseStage>>,
    language: MockLanguage,
    prompter: AssumeYes,
    /// The pull request every repository reports, if any.
    pub pull_request: Option<PullRequest>,
}

impl Default for MockDriver {
    fn default() -> Self {
        let ops: OpLog = Arc::new(Mutex::new(Vec::new()));
        let published_log: OpLog = Arc::new(Mutex::new(Vec::new()));
        Self {
            ctx: Context::new(
                PathBuf::from("/mock-workspace"),
                "all".to_string(),
                Some(1),
                None,
                true,
            ),
            language: MockLanguage {
                ops: Arc::clone(&ops),
                published: Arc::clone(&published_log),
            },
            ops,
            published_log,
            persisted: Vec::new(),
            prompter: AssumeYes,
            pull_request: None,
        }
    }
}

impl MockDriver {
    pub fn vcs_ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<String> {
        self.published_log.lock().unwrap().clone()
    }

    /// Stage snapshot of every project, one entry per persist call.
    pub fn persisted_stages(&self) -> Vec<Vec<ReleaseStage>> {
        self.persisted.clone()
    }
}

impl Driver for MockDriver {
    fn context(&self) -> &Context {
        &self.ctx
    }

    fn vcs(&self, _repo: &RepositoryHandle) -> Result<Box<dyn Vcs + '_>> {
        Ok(Box::new(MockVcs {
            ops: Arc::clone(&self.ops),
            pull_request: self.pull_request.clone(),
            default_branch: "master".to_string(),
        }))
    }

    fn language(&self, _language: Language) -> Result<&dyn LanguageSupport> {
        Ok(&self.language)
    }

    fn prompter(&self) -> &dyn Prompter {
        &self.prompter
    }

    fn persist(&mut self, release: &ReleaseState) -> Result<()> {
        self.persisted
            .push(release.all_projects().map(|prs| prs.stage).collect());
        Ok(())
    }
}
