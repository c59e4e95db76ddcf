//! The dependents graph: the dependency relation restricted to managed
//! packages, inverted so the planner can walk from a released package to
//! everything that must follow it.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::database::AnalysisDatabase;
use crate::analysis::model::Dependency;
use crate::error::{Error, Result};
use crate::log;

type Edges = BTreeMap<String, Dependency>;
type DirectGraph = BTreeMap<String, Edges>;

/// Adjacency from a package to the packages depending on it, with the
/// dependency records describing each edge.
pub struct DependentsGraph {
    graph: BTreeMap<String, BTreeMap<String, BTreeSet<Dependency>>>,
}

impl DependentsGraph {
    /// Build the graph from the database, failing on dependency cycles.
    pub fn build(db: &AnalysisDatabase) -> Result<DependentsGraph> {
        log::operation("Building dependency graph", || {
            let mut direct: DirectGraph = BTreeMap::new();
            for project in db.projects() {
                let entry = db.about(project)?;
                let edges: Edges = entry
                    .dependencies
                    .iter()
                    .filter(|dep| db.is_package_managed(&dep.name))
                    .map(|dep| (dep.name.clone(), dep.clone()))
                    .collect();
                direct.insert(entry.package.clone(), edges);
            }

            if let Some(cycle) = detect_cycle(&direct) {
                return Err(Error::GraphCycle(cycle.join("->")));
            }

            Ok(DependentsGraph {
                graph: invert(direct),
            })
        })
    }

    /// Number of packages in the graph.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn packages(&self) -> impl Iterator<Item = &String> {
        self.graph.keys()
    }

    /// Everything depending on `package` directly, with the dependency
    /// records carrying the spans the planner will patch.
    pub fn dependents_of(
        &self,
        package: &str,
    ) -> Result<&BTreeMap<String, BTreeSet<Dependency>>> {
        self.graph
            .get(package)
            .ok_or_else(|| Error::UnknownPackage(package.to_string()))
    }

    /// Partition everything reachable from `package` into release phases.
    ///
    /// Each dependent is placed at the *maximum* depth it is reachable at,
    /// so a package only shows up once all of its upgraded dependencies sit
    /// in earlier phases. Phase zero is the package itself.
    pub fn upgrade_phases(&self, package: &str) -> Result<Vec<BTreeSet<String>>> {
        if !self.graph.contains_key(package) {
            return Err(Error::UnknownPackage(package.to_string()));
        }

        let mut depths: BTreeMap<String, usize> = BTreeMap::new();
        depths.insert(package.to_string(), 0);
        let mut stack: Vec<(String, usize)> = vec![(package.to_string(), 0)];

        while let Some((current, depth)) = stack.pop() {
            for dependent in self.graph[&current].keys() {
                let next = depth + 1;
                if depths.get(dependent).is_none_or(|&d| d < next) {
                    depths.insert(dependent.clone(), next);
                    stack.push((dependent.clone(), next));
                }
            }
        }

        let mut phases: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
        for (package, depth) in depths {
            phases.entry(depth).or_default().insert(package);
        }
        Ok(phases.into_values().collect())
    }

    /// Render the graph in DOT form, edges pointing from dependent to
    /// dependency, labeled with the dependent's requirement.
    pub fn dot(&self, db: &AnalysisDatabase) -> Result<String> {
        let mut out = String::from("digraph dependencies {\n");
        for package in self.graph.keys() {
            let project = db.project_by_package(package)?;
            let about = db.about(project)?;
            out.push_str(&format!(
                "    \"{package}\" [label=\"{project} ({})\"];\n",
                about.version
            ));
        }
        for (package, dependents) in &self.graph {
            for (dependent, deps) in dependents {
                for dep in deps {
                    out.push_str(&format!(
                        "    \"{dependent}\" -> \"{package}\" [label=\"{}\"];\n",
                        dep.version_str()
                    ));
                }
            }
        }
        out.push_str("}\n");
        Ok(out)
    }
}

fn invert(direct: DirectGraph) -> BTreeMap<String, BTreeMap<String, BTreeSet<Dependency>>> {
    let mut inverted: BTreeMap<String, BTreeMap<String, BTreeSet<Dependency>>> = direct
        .keys()
        .map(|package| (package.clone(), BTreeMap::new()))
        .collect();

    for (package, edges) in direct {
        for (dep_name, dep) in edges {
            inverted
                .entry(dep_name)
                .or_default()
                .entry(package.clone())
                .or_default()
                .insert(dep);
        }
    }

    inverted
}

/// Depth-first search with an explicit stack; returns the first cycle found
/// as a path whose endpoints are equal.
fn detect_cycle(graph: &DirectGraph) -> Option<Vec<String>> {
    for start in graph.keys() {
        let mut path: Vec<String> = vec![start.clone()];
        let mut pending: Vec<Vec<String>> = vec![children(graph, start)];

        while let Some(frontier) = pending.last_mut() {
            match frontier.pop() {
                Some(next) => {
                    if let Some(pos) = path.iter().position(|p| p == &next) {
                        let mut cycle: Vec<String> = path[pos..].to_vec();
                        cycle.push(next);
                        return Some(cycle);
                    }
                    path.push(next.clone());
                    pending.push(children(graph, &next));
                }
                None => {
                    pending.pop();
                    path.pop();
                }
            }
        }
    }
    None
}

fn children(graph: &DirectGraph, package: &str) -> Vec<String> {
    graph
        .get(package)
        .map(|edges| edges.keys().rev().cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{entry, mock_db, stupid_db, triangle_db};
    use crate::edit::Span;
    use crate::version::VersionSpec;

    #[test]
    fn test_builds_empty_database() {
        let db = mock_db(vec![]);
        let graph = DependentsGraph::build(&db).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_builds_triangle() {
        // a depends on b and c, b depends on c.
        let graph = DependentsGraph::build(&triangle_db()).unwrap();

        assert_eq!(graph.len(), 3);
        assert!(graph.dependents_of("a").unwrap().is_empty());
        assert_eq!(
            graph.dependents_of("b").unwrap().keys().collect::<Vec<_>>(),
            vec!["a"]
        );
        assert_eq!(
            graph.dependents_of("c").unwrap().keys().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_build_detects_cycles() {
        let db = mock_db(vec![
            ("a", entry("a", "1.0.0", &[("b", "~> 1.0")])),
            ("b", entry("b", "1.0.0", &[("c", "~> 1.0")])),
            ("c", entry("c", "1.0.0", &[("a", "~> 1.0")])),
        ]);

        match DependentsGraph::build(&db) {
            Err(Error::GraphCycle(path)) => assert_eq!(path, "a->b->c->a"),
            other => panic!("expected cycle error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_cycle_path_endpoints_are_equal() {
        // The cycle does not pass through the lexicographically first node.
        let db = mock_db(vec![
            ("a", entry("a", "1.0.0", &[("x", "~> 1.0")])),
            ("x", entry("x", "1.0.0", &[("y", "~> 1.0")])),
            ("y", entry("y", "1.0.0", &[("x", "~> 1.0")])),
        ]);

        match DependentsGraph::build(&db) {
            Err(Error::GraphCycle(path)) => {
                let nodes: Vec<&str> = path.split("->").collect();
                assert_eq!(nodes.first(), nodes.last());
                assert!(nodes.len() >= 3);
            }
            other => panic!("expected cycle error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_inversion_mirrors_direct_edges() {
        let db = stupid_db();
        let graph = DependentsGraph::build(&db).unwrap();

        // Every direct edge (dependent depends on dependency) appears as
        // dependent ∈ graph[dependency], and nothing else does.
        for project in db.projects() {
            let about = db.about(project).unwrap();
            for dep in &about.dependencies {
                assert!(
                    graph
                        .dependents_of(&dep.name)
                        .unwrap()
                        .contains_key(&about.package),
                    "{} should list {}",
                    dep.name,
                    about.package
                );
            }
        }

        let total_edges: usize = graph
            .packages()
            .map(|p| graph.dependents_of(p).unwrap().len())
            .sum();
        let total_deps: usize = db
            .projects()
            .map(|p| db.about(p).unwrap().dependencies.len())
            .sum();
        assert_eq!(total_edges, total_deps);
    }

    #[test]
    fn test_dependents_of_carries_dependency_records() {
        let graph = DependentsGraph::build(&stupid_db()).unwrap();
        let dependents = graph.dependents_of("a").unwrap();
        assert_eq!(dependents.keys().collect::<Vec<_>>(), vec!["b", "c", "f"]);

        let record = dependents["b"].iter().next().unwrap();
        assert_eq!(record.name, "a");
        assert_eq!(record.defined_in, "b");
        assert_eq!(record.version_spec, VersionSpec::parse("~> 1.0").unwrap());
        assert_eq!(record.version_spec_span, Span::ZERO);
    }

    #[test]
    fn test_upgrade_phases() {
        // b, c, f depend on a; b on f; c on b; d on b; g on f.
        let graph = DependentsGraph::build(&stupid_db()).unwrap();

        let phases = |pkg: &str| -> Vec<Vec<String>> {
            graph
                .upgrade_phases(pkg)
                .unwrap()
                .into_iter()
                .map(|set| set.into_iter().collect())
                .collect()
        };

        assert_eq!(phases("e"), vec![vec!["e"]]);
        assert_eq!(phases("d"), vec![vec!["d"]]);
        assert_eq!(phases("c"), vec![vec!["c"]]);
        assert_eq!(phases("b"), vec![vec!["b"], vec!["c", "d"]]);
        assert_eq!(phases("f"), vec![vec!["f"], vec!["b", "g"], vec!["c", "d"]]);
        assert_eq!(
            phases("a"),
            vec![vec!["a"], vec!["f"], vec!["b", "g"], vec!["c", "d"]]
        );
    }

    #[test]
    fn test_phase_indices_respect_reachability() {
        let graph = DependentsGraph::build(&stupid_db()).unwrap();
        let phases = graph.upgrade_phases("a").unwrap();

        let phase_of = |pkg: &str| phases.iter().position(|p| p.contains(pkg));

        // For every edge inside the reachable set, the dependent's phase
        // comes strictly after the dependency's.
        for (index, phase) in phases.iter().enumerate() {
            for package in phase {
                for dependent in graph.dependents_of(package).unwrap().keys() {
                    if let Some(dependent_phase) = phase_of(dependent) {
                        assert!(
                            dependent_phase > index,
                            "{dependent} must come after {package}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_upgrade_phases_unknown_package() {
        let graph = DependentsGraph::build(&triangle_db()).unwrap();
        assert!(matches!(
            graph.upgrade_phases("ghost"),
            Err(Error::UnknownPackage(_))
        ));
    }

    #[test]
    fn test_dot_output() {
        let db = triangle_db();
        let graph = DependentsGraph::build(&db).unwrap();
        let dot = graph.dot(&db).unwrap();
        assert!(dot.starts_with("digraph dependencies {"));
        assert!(dot.contains("\"a\" [label=\"a (1.0.0)\"]"));
        assert!(dot.contains("\"a\" -> \"b\""));
        assert!(dot.contains("\"b\" -> \"c\""));
        assert!(dot.ends_with("}\n"));
    }
}
