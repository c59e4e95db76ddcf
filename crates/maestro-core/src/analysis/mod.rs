//! Project analysis: per-project facts, the analysis database and the
//! dependents graph derived from it.

pub mod database;
pub mod graph;
pub mod model;

pub use database::AnalysisDatabase;
pub use graph::DependentsGraph;
pub use model::{AnalysisEntry, Dependency, DependencyUpdate, Language, Release};

use crate::config::{Manifest, profile};
use crate::context::Context;
use crate::error::Result;

/// Analyze every project of the active profile and build the graph.
pub fn analyze(ctx: &Context) -> Result<(AnalysisDatabase, DependentsGraph)> {
    let manifest = Manifest::open(ctx)?;
    let handles = profile::current_project_handles(ctx, &manifest)?;
    let database = AnalysisDatabase::collect(ctx, handles)?;
    let graph = DependentsGraph::build(&database)?;
    Ok((database, graph))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Hand-built databases for graph and planner tests.

    use std::collections::BTreeMap;

    use semver::Version;

    use super::database::AnalysisDatabase;
    use super::model::{AnalysisEntry, Dependency, Language, Release};
    use crate::config::manifest::ProjectHandle;
    use crate::edit::Span;
    use crate::version::VersionSpec;

    /// An entry for a root project whose handle equals its package name.
    /// Dependencies are `(name, requirement)` pairs at [`Span::ZERO`].
    pub fn entry(package: &str, version: &str, deps: &[(&str, &str)]) -> AnalysisEntry {
        entry_with_spans(
            package,
            version,
            Span::ZERO,
            &deps
                .iter()
                .map(|&(name, spec)| (name, spec, Span::ZERO))
                .collect::<Vec<_>>(),
        )
    }

    /// Like [`entry`], with explicit manifest spans.
    pub fn entry_with_spans(
        package: &str,
        version: &str,
        version_span: Span,
        deps: &[(&str, &str, Span)],
    ) -> AnalysisEntry {
        AnalysisEntry {
            package: package.to_string(),
            version: Version::parse(version).unwrap(),
            version_span,
            dependencies: deps
                .iter()
                .map(|(name, spec, span)| Dependency {
                    name: name.to_string(),
                    defined_in: package.to_string(),
                    version_spec: VersionSpec::parse(spec).unwrap(),
                    version_spec_span: *span,
                })
                .collect(),
            releases: vec![],
        }
    }

    pub fn published(mut entry: AnalysisEntry) -> AnalysisEntry {
        let version = entry.version.clone();
        entry.releases.push(Release {
            version,
            retired: false,
        });
        entry
    }

    pub fn mock_db(entries: Vec<(&str, AnalysisEntry)>) -> AnalysisDatabase {
        let projects: BTreeMap<_, _> = entries
            .into_iter()
            .map(|(handle, entry)| {
                (
                    ProjectHandle::parse(handle).unwrap(),
                    (Language::Elixir, entry),
                )
            })
            .collect();
        AnalysisDatabase::new(projects).unwrap()
    }

    /// `a` depends on `b` and `c`, `b` depends on `c`.
    pub fn triangle_db() -> AnalysisDatabase {
        mock_db(vec![
            (
                "a",
                entry("a", "1.0.0", &[("b", "~> 1.0"), ("c", "~> 1.0")]),
            ),
            ("b", entry("b", "1.0.0", &[("c", "~> 1.0")])),
            ("c", entry("c", "1.0.0", &[])),
        ])
    }

    /// A denser fixture exercising max-depth phase placement:
    /// `b`, `c`, `f` depend on `a`; `b` also on `f`; `c` and `d` on `b`;
    /// `g` on `f`; `e` stands alone.
    pub fn stupid_db() -> AnalysisDatabase {
        mock_db(vec![
            ("a", entry("a", "1.0.0", &[])),
            (
                "b",
                entry("b", "1.0.0", &[("a", "~> 1.0"), ("f", "~> 1.0")]),
            ),
            (
                "c",
                entry("c", "1.0.0", &[("a", "~> 1.0"), ("b", "~> 1.0")]),
            ),
            ("d", entry("d", "1.0.0", &[("b", "~> 1.0")])),
            ("e", entry("e", "1.0.0", &[])),
            ("f", entry("f", "1.0.0", &[("a", "~> 1.0")])),
            ("g", entry("g", "1.0.0", &[("f", "~> 1.0")])),
        ])
    }
}
