//! The release state: the planned work, each project's position in the
//! release lifecycle, and the document persisting both across runs.

use std::collections::BTreeMap;
use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::analysis::database::AnalysisDatabase;
use crate::analysis::model::{DependencyUpdate, Language};
use crate::checksum::{Checksum, Checksumable};
use crate::config::file;
use crate::config::manifest::ProjectHandle;
use crate::context::Context;
use crate::edit::Span;
use crate::error::{Error, Result};
use crate::version::{VersionSpec, parse_version};

pub const RELEASE_DOCUMENT_NAME: &str = "release";

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// A project's position in the release lifecycle. Stages only ever advance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStage {
    #[default]
    Clean,
    BranchOpened,
    PullRequestOpened,
    PullRequestMerged,
    BranchClosed,
    Published,
    Done,
}

impl ReleaseStage {
    pub const ALL: [ReleaseStage; 7] = [
        ReleaseStage::Clean,
        ReleaseStage::BranchOpened,
        ReleaseStage::PullRequestOpened,
        ReleaseStage::PullRequestMerged,
        ReleaseStage::BranchClosed,
        ReleaseStage::Published,
        ReleaseStage::Done,
    ];

    pub fn next(self) -> Option<ReleaseStage> {
        let index = Self::ALL.iter().position(|&s| s == self)?;
        Self::ALL.get(index + 1).copied()
    }

    /// Every stage strictly after this one, in order.
    pub fn following(self) -> impl Iterator<Item = ReleaseStage> {
        Self::ALL.into_iter().filter(move |&s| s > self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseStage::Clean => "clean",
            ReleaseStage::BranchOpened => "branch opened",
            ReleaseStage::PullRequestOpened => "pull request opened",
            ReleaseStage::PullRequestMerged => "pull request merged",
            ReleaseStage::BranchClosed => "branch closed",
            ReleaseStage::Published => "published",
            ReleaseStage::Done => "done",
        }
    }
}

impl fmt::Display for ReleaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Checksumable for ReleaseStage {
    fn checksum(&self, hasher: &mut Sha1) {
        self.as_str().checksum(hasher);
    }
}

// ---------------------------------------------------------------------------
// Project / phase / release state
// ---------------------------------------------------------------------------

/// Planned and ongoing release work for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectState {
    pub project: ProjectHandle,
    pub from_version: Version,
    pub to_version: Version,
    pub version_span: Span,
    pub language: Language,
    pub publish: bool,
    pub dependency_updates: Vec<DependencyUpdate>,
    pub stage: ReleaseStage,
}

impl ProjectState {
    /// A clean entry: nothing planned yet, target equals the current version.
    pub fn clean(project: ProjectHandle, db: &AnalysisDatabase, publish: bool) -> Result<Self> {
        let about = db.about(&project)?;
        let language = db.language(&project)?;
        Ok(Self {
            project,
            from_version: about.version.clone(),
            to_version: about.version.clone(),
            version_span: about.version_span,
            language,
            publish,
            dependency_updates: vec![],
            stage: ReleaseStage::Clean,
        })
    }

    pub fn is_done(&self) -> bool {
        self.stage == ReleaseStage::Done
    }
}

impl Checksumable for ProjectState {
    fn checksum(&self, hasher: &mut Sha1) {
        self.project.checksum(hasher);
        self.from_version.checksum(hasher);
        self.to_version.checksum(hasher);
        self.version_span.checksum(hasher);
        self.language.checksum(hasher);
        self.publish.checksum(hasher);
        self.dependency_updates.checksum(hasher);
        self.stage.checksum(hasher);
    }
}

/// Projects released together: none of them depends on another one's release.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhaseState {
    projects: Vec<ProjectState>,
}

impl PhaseState {
    pub fn new(projects: Vec<ProjectState>) -> Self {
        Self { projects }
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn projects(&self) -> &[ProjectState] {
        &self.projects
    }

    pub fn projects_mut(&mut self) -> &mut [ProjectState] {
        &mut self.projects
    }

    pub fn retain(&mut self, keep: impl FnMut(&ProjectState) -> bool) {
        self.projects.retain(keep);
    }

    pub fn has_project(&self, project: &ProjectHandle) -> bool {
        self.projects.iter().any(|p| p.project == *project)
    }

    pub fn get_project(&self, project: &ProjectHandle) -> Option<&ProjectState> {
        self.projects.iter().find(|p| p.project == *project)
    }

    pub fn get_project_mut(&mut self, project: &ProjectHandle) -> Option<&mut ProjectState> {
        self.projects.iter_mut().find(|p| p.project == *project)
    }

    pub fn is_clean(&self) -> bool {
        self.projects.iter().all(|p| p.stage == ReleaseStage::Clean)
    }

    pub fn is_done(&self) -> bool {
        self.projects.iter().all(ProjectState::is_done)
    }

    pub fn is_in_progress(&self) -> bool {
        !self.is_clean() && !self.is_done()
    }

    pub fn codename(&self) -> String {
        Checksum::of(self).petname()
    }
}

impl Checksumable for PhaseState {
    fn checksum(&self, hasher: &mut Sha1) {
        self.projects.checksum(hasher);
    }
}

/// The whole release: the explicitly targeted sources and the phased plan
/// derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReleaseState {
    pub sources: BTreeMap<ProjectHandle, Version>,
    pub phases: Vec<PhaseState>,
}

impl ReleaseState {
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn all_projects(&self) -> impl Iterator<Item = &ProjectState> {
        self.phases.iter().flat_map(|phase| phase.projects.iter())
    }

    /// The phase the executor is working on: the first that is not all-done,
    /// or the last one once the release is complete.
    pub fn current_phase_index(&self) -> Option<usize> {
        if self.phases.is_empty() {
            return None;
        }
        Some(
            self.phases
                .iter()
                .position(|phase| !phase.is_done())
                .unwrap_or(self.phases.len() - 1),
        )
    }

    pub fn current_phase(&self) -> Option<&PhaseState> {
        self.current_phase_index().map(|i| &self.phases[i])
    }

    pub fn is_clean(&self) -> bool {
        self.phases.iter().all(PhaseState::is_clean)
    }

    pub fn is_done(&self) -> bool {
        self.phases.iter().all(PhaseState::is_done)
    }

    pub fn is_in_progress(&self) -> bool {
        !self.is_clean() && !self.is_done()
    }

    /// Find a project anywhere in the plan. Projects appear at most once.
    pub fn get_project(&self, project: &ProjectHandle) -> Option<&ProjectState> {
        self.phases.iter().find_map(|phase| phase.get_project(project))
    }

    pub fn get_project_mut(&mut self, project: &ProjectHandle) -> Option<&mut ProjectState> {
        self.phases
            .iter_mut()
            .find_map(|phase| phase.get_project_mut(project))
    }

    /// The release's human identifier, derived from the plan digest.
    pub fn codename(&self) -> String {
        Checksum::of(self).petname()
    }

    /// Multi-line human description of the plan and its progress.
    pub fn describe(&self) -> String {
        let mut out = format!("Release \"{}\"\n", self.codename());

        if !self.sources.is_empty() {
            out.push_str("\nSources:\n");
            for (project, version) in &self.sources {
                out.push_str(&format!("  {project} -> {version}\n"));
            }
        }

        for (index, phase) in self.phases.iter().enumerate() {
            out.push_str(&format!("\nPhase {}:\n", index + 1));
            for project in phase.projects() {
                out.push_str(&format!(
                    "  {} {} -> {} ({})\n",
                    project.project, project.from_version, project.to_version, project.stage
                ));
                for update in &project.dependency_updates {
                    out.push_str(&format!(
                        "    {}: \"{}\" -> \"{}\"\n",
                        update.name, update.from_spec, update.to_spec
                    ));
                }
            }
        }

        out
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn exists(ctx: &Context) -> bool {
        file::yaml_exists(ctx, RELEASE_DOCUMENT_NAME)
    }

    pub fn open(ctx: &Context) -> Result<ReleaseState> {
        let raw: RawReleaseDocument = file::load_yaml(ctx, RELEASE_DOCUMENT_NAME)?
            .ok_or_else(|| {
                Error::Other(anyhow::anyhow!(
                    "there is no release pending at this moment"
                ))
            })?;
        Self::from_raw(raw)
    }

    pub fn save(&self, ctx: &Context) -> Result<()> {
        file::save_yaml(ctx, RELEASE_DOCUMENT_NAME, &self.to_raw())
    }

    pub fn delete(ctx: &Context) -> Result<()> {
        file::delete_yaml(ctx, RELEASE_DOCUMENT_NAME)
    }

    fn to_raw(&self) -> RawReleaseDocument {
        RawReleaseDocument {
            release: self
                .sources
                .iter()
                .map(|(project, version)| (project.to_string(), version.to_string()))
                .collect(),
            phases: self
                .phases
                .iter()
                .map(|phase| RawPhase {
                    projects: phase
                        .projects()
                        .iter()
                        .map(|project| RawProjectState {
                            project: project.project.to_string(),
                            language: project.language,
                            stage: project.stage,
                            from_version: project.from_version.to_string(),
                            to_version: project.to_version.to_string(),
                            version_span: project.version_span,
                            publish: project.publish,
                            dependency_updates: project
                                .dependency_updates
                                .iter()
                                .map(|update| RawDependencyUpdate {
                                    name: update.name.clone(),
                                    from_spec: update.from_spec.to_string(),
                                    to_spec: update.to_spec.to_string(),
                                    to_spec_span: update.to_spec_span,
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    fn from_raw(raw: RawReleaseDocument) -> Result<ReleaseState> {
        let sources = raw
            .release
            .iter()
            .map(|(project, version)| {
                Ok((ProjectHandle::parse(project)?, parse_version(version)?))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        let phases = raw
            .phases
            .into_iter()
            .map(|phase| {
                let projects = phase
                    .projects
                    .into_iter()
                    .map(|project| {
                        Ok(ProjectState {
                            project: ProjectHandle::parse(&project.project)?,
                            from_version: parse_version(&project.from_version)?,
                            to_version: parse_version(&project.to_version)?,
                            version_span: project.version_span,
                            language: project.language,
                            publish: project.publish,
                            dependency_updates: project
                                .dependency_updates
                                .into_iter()
                                .map(|update| {
                                    Ok(DependencyUpdate {
                                        name: update.name,
                                        from_spec: VersionSpec::parse(&update.from_spec)?,
                                        to_spec: VersionSpec::parse(&update.to_spec)?,
                                        to_spec_span: update.to_spec_span,
                                    })
                                })
                                .collect::<Result<Vec<_>>>()?,
                            stage: project.stage,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(PhaseState::new(projects))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ReleaseState { sources, phases })
    }
}

impl Checksumable for ReleaseState {
    fn checksum(&self, hasher: &mut Sha1) {
        self.sources.checksum(hasher);
        self.phases.checksum(hasher);
    }
}

// ---------------------------------------------------------------------------
// Document schema
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct RawReleaseDocument {
    release: BTreeMap<String, String>,
    #[serde(default)]
    phases: Vec<RawPhase>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawPhase {
    projects: Vec<RawProjectState>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawProjectState {
    project: String,
    language: Language,
    stage: ReleaseStage,
    from_version: String,
    to_version: String,
    version_span: Span,
    publish: bool,
    #[serde(default)]
    dependency_updates: Vec<RawDependencyUpdate>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawDependencyUpdate {
    name: String,
    from_spec: String,
    to_spec: String,
    to_spec_span: Span,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
