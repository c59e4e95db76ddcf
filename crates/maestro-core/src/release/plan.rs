//! The release planner: from a set of source projects and target versions to
//! a phased, persisted-ready [`ReleaseState`].
//!
//! Planning walks the dependents graph in phase order and propagates version
//! bumps along each dependency relation. A dependent whose requirement
//! covered the released package before the release follows with the derived
//! bump; when its requirement no longer covers the new version, the planner
//! also emits a [`DependencyUpdate`] re-targeting the requirement at the
//! exact manifest span. Projects the release leaves untouched are pruned at
//! the end.

use std::collections::{BTreeMap, BTreeSet};

use semver::Version;

use crate::analysis::database::AnalysisDatabase;
use crate::analysis::graph::DependentsGraph;
use crate::analysis::model::DependencyUpdate;
use crate::config::manifest::ProjectHandle;
use crate::error::{Error, Result};
use crate::log;
use crate::release::state::{PhaseState, ProjectState, ReleaseState};
use crate::version::{Bump, VersionSpec, previous_version};

#[derive(Debug, Default)]
pub struct PlanOptions {
    /// Also re-target dependents whose requirement did not even cover the
    /// version being replaced.
    pub update_obsolete: bool,
    /// Repositories whose packages are published even when the registry has
    /// never seen them.
    pub force_publish: BTreeSet<String>,
}

impl ReleaseState {
    /// Construct the release plan for the given sources.
    pub fn plan(
        sources: BTreeMap<ProjectHandle, Version>,
        db: &AnalysisDatabase,
        graph: &DependentsGraph,
        options: &PlanOptions,
    ) -> Result<ReleaseState> {
        log::operation("Constructing release plan", || {
            Self::plan_inner(sources, db, graph, options)
        })
    }

    fn plan_inner(
        sources: BTreeMap<ProjectHandle, Version>,
        db: &AnalysisDatabase,
        graph: &DependentsGraph,
        options: &PlanOptions,
    ) -> Result<ReleaseState> {
        // Downgrades would need a backport workflow this tool does not have.
        for (project, target) in &sources {
            let about = db.about(project)?;
            if about.version > *target {
                return Err(Error::BackportNotImplemented {
                    project: project.to_string(),
                    current: about.version.to_string(),
                    target: target.to_string(),
                });
            }
        }

        // Seed the phases of every source, in source order. A project that a
        // later source reaches again moves to the later group: all of its
        // transitive dependents are reachable from that source too and move
        // with it, so every project still releases after its dependencies.
        let mut groups: Vec<Vec<ProjectHandle>> = Vec::new();
        let mut placed: BTreeMap<ProjectHandle, usize> = BTreeMap::new();
        for project in sources.keys() {
            let package = db.about(project)?.package.clone();
            for group in graph.upgrade_phases(&package)? {
                let index = groups.len();
                let mut members = Vec::new();
                for member in group {
                    let handle = db.project_by_package(&member)?.clone();
                    if let Some(&previous) = placed.get(&handle) {
                        groups[previous].retain(|h| h != &handle);
                    }
                    placed.insert(handle.clone(), index);
                    members.push(handle);
                }
                groups.push(members);
            }
        }

        let mut phases: Vec<PhaseState> = Vec::new();
        for group in groups {
            if group.is_empty() {
                continue;
            }
            let projects = group
                .into_iter()
                .map(|handle| {
                    let publish = db.about(&handle)?.is_published()
                        || options.force_publish.contains(&handle.repo.name);
                    ProjectState::clean(handle, db, publish)
                })
                .collect::<Result<Vec<_>>>()?;
            phases.push(PhaseState::new(projects));
        }

        let mut release = ReleaseState { sources, phases };
        let source_list: Vec<(ProjectHandle, Version)> = release
            .sources
            .iter()
            .map(|(p, v)| (p.clone(), v.clone()))
            .collect();

        for (project, target) in &source_list {
            release
                .get_project_mut(project)
                .ok_or_else(|| Error::UnknownProject(project.to_string()))?
                .to_version = target.clone();
        }

        // A source already at its target only exists to push its effects to
        // dependents: plan it as if it had been at the predecessor version,
        // and drop it from the final plan.
        let mut ignore: BTreeSet<ProjectHandle> = BTreeSet::new();
        for (project, target) in &source_list {
            let prs = release
                .get_project_mut(project)
                .ok_or_else(|| Error::UnknownProject(project.to_string()))?;
            if prs.from_version == *target {
                prs.from_version = previous_version(target);
                ignore.insert(project.clone());
            }
        }

        release.build_plan(db, graph, options)?;

        // Stable update order makes manifest patches byte-reproducible.
        for phase in &mut release.phases {
            for prs in phase.projects_mut() {
                prs.dependency_updates.sort_by(|a, b| a.name.cmp(&b.name));
            }
        }

        for phase in &mut release.phases {
            phase.retain(|prs| prs.from_version != prs.to_version && !ignore.contains(&prs.project));
        }
        release.phases.retain(|phase| !phase.is_empty());

        Ok(release)
    }

    /// Propagate bumps across the dependency relations, phase by phase.
    fn build_plan(
        &mut self,
        db: &AnalysisDatabase,
        graph: &DependentsGraph,
        options: &PlanOptions,
    ) -> Result<()> {
        let mut bumps: BTreeMap<ProjectHandle, Bump> = self
            .all_projects()
            .map(|prs| (prs.project.clone(), Bump::StayAsIs))
            .collect();

        for (project, _) in self.sources.clone() {
            if let Some(prs) = self.get_project(&project) {
                bumps.insert(
                    project,
                    Bump::between(&prs.from_version, &prs.to_version),
                );
            }
        }

        let order: Vec<ProjectHandle> = self
            .all_projects()
            .map(|prs| prs.project.clone())
            .collect();

        for this_project in order {
            let this_bump = bumps[&this_project];
            if this_bump == Bump::StayAsIs {
                continue;
            }

            let (this_package, this_from, this_to) = {
                let prs = self
                    .get_project(&this_project)
                    .ok_or_else(|| Error::UnknownProject(this_project.to_string()))?;
                (
                    db.about(&this_project)?.package.clone(),
                    prs.from_version.clone(),
                    prs.to_version.clone(),
                )
            };
            let before_target = previous_version(&this_to);

            for (dependent_package, relations) in graph.dependents_of(&this_package)? {
                let dependent_project = db.project_by_package(dependent_package)?.clone();
                let dependent_from = {
                    let prs = self
                        .get_project(&dependent_project)
                        .ok_or_else(|| Error::UnknownProject(dependent_project.to_string()))?;
                    prs.from_version.clone()
                };

                // Alpha and beta packages version themselves by hand.
                if !dependent_from.pre.is_empty() {
                    continue;
                }

                let mut dependent_bump = bumps[&dependent_project];
                let mut new_updates: Vec<DependencyUpdate> = Vec::new();

                for relation in relations {
                    let Some(req) = relation.version_spec.requirement() else {
                        log::warn(&format!(
                            "{dependent_project} depends on {} via {}, cannot retarget it",
                            relation.name, relation.version_spec
                        ));
                        continue;
                    };

                    // The dependent tracked the dependency before this
                    // release if its requirement covered the version being
                    // replaced (or, for a re-release, the simulated
                    // predecessor).
                    let affected =
                        req.matches(&this_from) || req.matches(&before_target);
                    let covers_target = req.matches(&this_to);
                    let release_new_version = affected && !covers_target;
                    let dependent_is_obsolete = !req.matches(&this_from) && !covers_target;
                    let update_dependent = options.update_obsolete && dependent_is_obsolete;

                    if affected || update_dependent {
                        let floor = if update_dependent {
                            Bump::Minor
                        } else {
                            Bump::StayAsIs
                        };
                        dependent_bump =
                            dependent_bump.max(floor.max(this_bump.derive(&dependent_from)));
                    }

                    if release_new_version || update_dependent {
                        new_updates
                            .push(relation.prepare_update(VersionSpec::targeting(&this_to)));
                    } else if dependent_is_obsolete {
                        log::warn(&format!(
                            "{dependent_project} depends on an obsolete {} ({}), leaving it alone",
                            relation.name, relation.version_spec
                        ));
                    }
                }

                if dependent_bump != bumps[&dependent_project] || !new_updates.is_empty() {
                    bumps.insert(dependent_project.clone(), dependent_bump);
                    let to_version = match self.sources.get(&dependent_project) {
                        Some(target) => target.clone(),
                        None => dependent_bump
                            .apply(&dependent_from)
                            .map_err(|_| Error::UnsolvableBump(dependent_project.to_string()))?,
                    };
                    let prs = self
                        .get_project_mut(&dependent_project)
                        .ok_or_else(|| Error::UnknownProject(dependent_project.to_string()))?;
                    prs.to_version = to_version;
                    prs.dependency_updates.extend(new_updates);
                }
            }
        }

        for (project, bump) in &bumps {
            if *bump == Bump::Unsolvable {
                return Err(Error::UnsolvableBump(project.to_string()));
            }
        }

        Ok(())
    }
}
