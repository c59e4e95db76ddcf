//! The repository manifest: which repositories the workspace manages, where
//! they come from and which buildable projects they contain.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::checksum::Checksumable;
use crate::config::file;
use crate::context::Context;
use crate::error::{Error, Result};

pub const MANIFEST_DOCUMENT_NAME: &str = "manifest";

const ROOT_PROJECT_PATH: &str = ".";

fn default_branch() -> String {
    "master".to_string()
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Names one managed repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepositoryHandle {
    pub name: String,
}

impl RepositoryHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn location(&self, ctx: &Context) -> PathBuf {
        ctx.repo_path(&self.name)
    }

    pub fn exists(&self, ctx: &Context) -> bool {
        self.location(ctx).exists()
    }
}

impl fmt::Display for RepositoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Names one buildable project: `repo` for a repository-root project, or
/// `repo:subpath` for a nested one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectHandle {
    pub repo: RepositoryHandle,
    pub path: String,
}

impl ProjectHandle {
    pub fn root(repo: impl Into<String>) -> Self {
        Self {
            repo: RepositoryHandle::new(repo),
            path: ROOT_PROJECT_PATH.to_string(),
        }
    }

    pub fn nested(repo: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            repo: RepositoryHandle::new(repo),
            path: path.into(),
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            None if !s.is_empty() => Ok(Self::root(s)),
            Some((repo, path)) if !repo.is_empty() && !path.is_empty() => {
                Ok(Self::nested(repo, path))
            }
            _ => Err(Error::HandleParse(s.to_string())),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path == ROOT_PROJECT_PATH
    }

    pub fn location(&self, ctx: &Context) -> PathBuf {
        if self.is_root() {
            self.repo.location(ctx)
        } else {
            self.repo.location(ctx).join(&self.path)
        }
    }
}

impl fmt::Display for ProjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            self.repo.fmt(f)
        } else {
            write!(f, "{}:{}", self.repo, self.path)
        }
    }
}

impl Checksumable for ProjectHandle {
    fn checksum(&self, hasher: &mut Sha1) {
        self.to_string().checksum(hasher);
    }
}

// ---------------------------------------------------------------------------
// Manifest entries
// ---------------------------------------------------------------------------

/// One buildable project inside a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub path: String,
}

impl ProjectManifest {
    pub fn root() -> Self {
        Self {
            path: ROOT_PROJECT_PATH.to_string(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path == ROOT_PROJECT_PATH
    }
}

/// One managed repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryManifest {
    pub name: String,
    pub remote_url: String,
    pub default_branch: String,
    /// Publish this repository's packages even if the registry has never
    /// seen them before.
    pub force_publish: bool,
    pub projects: Vec<ProjectManifest>,
}

impl RepositoryManifest {
    pub fn new(name: impl Into<String>, remote_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote_url: remote_url.into(),
            default_branch: default_branch(),
            force_publish: false,
            projects: vec![ProjectManifest::root()],
        }
    }

    pub fn handle(&self) -> RepositoryHandle {
        RepositoryHandle::new(self.name.clone())
    }

    pub fn project_handles(&self) -> impl Iterator<Item = ProjectHandle> + '_ {
        self.projects.iter().map(|project| {
            if project.is_root() {
                ProjectHandle::root(self.name.clone())
            } else {
                ProjectHandle::nested(self.name.clone(), project.path.clone())
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Document schema
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawManifest {
    #[serde(default)]
    repositories: Vec<RawRepository>,
    #[serde(default)]
    config: RawWorkspaceConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawRepository {
    name: String,
    remote_url: String,
    #[serde(default = "default_branch")]
    default_branch: String,
    #[serde(default)]
    force_publish: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    projects: Option<Vec<ProjectManifest>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawWorkspaceConfig {
    #[serde(default)]
    hex: RawHexConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawHexConfig {
    #[serde(default)]
    allow_replace_on_publish: bool,
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// The parsed repository manifest, indexed by repository name.
#[derive(Debug, Default)]
pub struct Manifest {
    repositories: Vec<RepositoryManifest>,
    index: BTreeMap<String, usize>,
    pub allow_replace_on_publish: bool,
}

impl Manifest {
    /// Load the manifest, falling back to an empty one when the file does
    /// not exist yet.
    pub fn open(ctx: &Context) -> Result<Self> {
        let raw: RawManifest =
            file::load_yaml(ctx, MANIFEST_DOCUMENT_NAME)?.unwrap_or_default();

        let repositories: Vec<RepositoryManifest> = raw
            .repositories
            .into_iter()
            .map(|repo| RepositoryManifest {
                name: repo.name,
                remote_url: repo.remote_url,
                default_branch: repo.default_branch,
                force_publish: repo.force_publish,
                projects: repo
                    .projects
                    .unwrap_or_else(|| vec![ProjectManifest::root()]),
            })
            .collect();

        let index = repositories
            .iter()
            .enumerate()
            .map(|(i, repo)| (repo.name.clone(), i))
            .collect();

        Ok(Self {
            repositories,
            index,
            allow_replace_on_publish: raw.config.hex.allow_replace_on_publish,
        })
    }

    pub fn save(&self, ctx: &Context) -> Result<()> {
        let raw = RawManifest {
            repositories: self
                .repositories
                .iter()
                .map(|repo| RawRepository {
                    name: repo.name.clone(),
                    remote_url: repo.remote_url.clone(),
                    default_branch: repo.default_branch.clone(),
                    force_publish: repo.force_publish,
                    // The single-root-project shape is the default and is
                    // kept implicit in the document.
                    projects: if repo.projects.len() == 1 && repo.projects[0].is_root() {
                        None
                    } else {
                        Some(repo.projects.clone())
                    },
                })
                .collect(),
            config: RawWorkspaceConfig {
                hex: RawHexConfig {
                    allow_replace_on_publish: self.allow_replace_on_publish,
                },
            },
        };
        file::save_yaml(ctx, MANIFEST_DOCUMENT_NAME, &raw)
    }

    pub fn iter_repositories(&self) -> impl Iterator<Item = &RepositoryManifest> {
        self.repositories.iter()
    }

    pub fn find_repository(&self, name: &str) -> Option<&RepositoryManifest> {
        self.index.get(name).map(|&i| &self.repositories[i])
    }

    pub fn get_repository(&self, handle: &RepositoryHandle) -> Result<&RepositoryManifest> {
        self.find_repository(&handle.name)
            .ok_or_else(|| Error::UnknownRepository(handle.name.clone()))
    }

    pub fn force_publish(&self, name: &str) -> bool {
        self.find_repository(name)
            .map(|repo| repo.force_publish)
            .unwrap_or(false)
    }

    /// Insert or replace a repository entry.
    pub fn upsert_repository(&mut self, repo: RepositoryManifest) {
        match self.index.get(&repo.name) {
            Some(&i) => self.repositories[i] = repo,
            None => {
                self.index.insert(repo.name.clone(), self.repositories.len());
                self.repositories.push(repo);
            }
        }
    }

    /// Sort entries by name so the saved document is reproducible.
    pub fn sort_repositories(&mut self) {
        self.repositories.sort_by(|a, b| a.name.cmp(&b.name));
        self.index = self
            .repositories
            .iter()
            .enumerate()
            .map(|(i, repo)| (repo.name.clone(), i))
            .collect();
    }

    /// Does any repository of the manifest contain this project?
    pub fn has_project(&self, handle: &ProjectHandle) -> bool {
        self.find_repository(&handle.repo.name)
            .is_some_and(|repo| repo.project_handles().any(|p| p == *handle))
    }
}
