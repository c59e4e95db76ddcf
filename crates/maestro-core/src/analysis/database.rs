//! The analysis database: every analyzed project with its language and
//! facts, plus the unique package-name index the planner navigates by.

use std::collections::BTreeMap;

use crate::analysis::model::{AnalysisEntry, Language};
use crate::config::manifest::ProjectHandle;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::jobs;
use crate::language;
use crate::log;

#[derive(Debug)]
pub struct AnalysisDatabase {
    projects: BTreeMap<ProjectHandle, (Language, AnalysisEntry)>,
    package_index: BTreeMap<String, ProjectHandle>,
}

impl AnalysisDatabase {
    /// Build a database from already-collected entries.
    ///
    /// Package names must be unique across the whole set; a duplicate is a
    /// construction error because the planner addresses projects by package.
    pub fn new(projects: BTreeMap<ProjectHandle, (Language, AnalysisEntry)>) -> Result<Self> {
        let mut package_index = BTreeMap::new();
        for (handle, (_, entry)) in &projects {
            if let Some(existing) = package_index.insert(entry.package.clone(), handle.clone()) {
                return Err(Error::DuplicatePackage {
                    package: entry.package.clone(),
                    existing: existing.to_string(),
                    duplicate: handle.to_string(),
                });
            }
        }
        Ok(Self {
            projects,
            package_index,
        })
    }

    /// Analyze every given project on the worker pool and build the database.
    pub fn collect(ctx: &Context, handles: Vec<ProjectHandle>) -> Result<Self> {
        let entries = jobs::for_each(ctx.jobs, handles.clone(), "Analyzing", |handle| {
            log::log(&format!("Analyzing {handle}"));
            let support = language::detect(ctx, handle)?;
            let entry = support.analyze(ctx, handle)?;
            log::success(&format!("Analyzed {handle}"));
            Ok((support.language(), entry))
        })?;

        Self::new(handles.into_iter().zip(entries).collect())
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn projects(&self) -> impl Iterator<Item = &ProjectHandle> {
        self.projects.keys()
    }

    pub fn about(&self, project: &ProjectHandle) -> Result<&AnalysisEntry> {
        self.projects
            .get(project)
            .map(|(_, entry)| entry)
            .ok_or_else(|| Error::UnknownProject(project.to_string()))
    }

    pub fn language(&self, project: &ProjectHandle) -> Result<Language> {
        self.projects
            .get(project)
            .map(|(language, _)| *language)
            .ok_or_else(|| Error::UnknownProject(project.to_string()))
    }

    pub fn has_project(&self, project: &ProjectHandle) -> bool {
        self.projects.contains_key(project)
    }

    /// Is this package produced by one of the analyzed projects?
    pub fn is_package_managed(&self, package: &str) -> bool {
        self.package_index.contains_key(package)
    }

    pub fn project_by_package(&self, package: &str) -> Result<&ProjectHandle> {
        self.package_index
            .get(package)
            .ok_or_else(|| Error::UnknownPackage(package.to_string()))
    }
}
