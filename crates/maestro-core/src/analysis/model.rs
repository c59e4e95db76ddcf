//! Immutable per-project facts produced by the language analyzers.

use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::checksum::Checksumable;
use crate::edit::Span;
use crate::error::{Error, Result};
use crate::version::VersionSpec;

/// Implementation language of a project, deciding which adapter analyzes,
/// patches and publishes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Elixir,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Elixir => "elixir",
        }
    }

    pub fn parse(s: &str) -> Result<Language> {
        match s {
            "elixir" => Ok(Language::Elixir),
            other => Err(Error::Other(anyhow::anyhow!("unknown language \"{other}\""))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Checksumable for Language {
    fn checksum(&self, hasher: &mut Sha1) {
        self.as_str().checksum(hasher);
    }
}

/// One dependency record of a project manifest. `defined_in` names the
/// dependent package, so the record is directional: `defined_in` depends on
/// `name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dependency {
    pub name: String,
    pub defined_in: String,
    pub version_spec: VersionSpec,
    pub version_spec_span: Span,
}

impl Dependency {
    pub fn version_str(&self) -> String {
        self.version_spec.to_string()
    }

    /// The update rewriting this record's requirement to `to_spec`, at the
    /// original span.
    pub fn prepare_update(&self, to_spec: VersionSpec) -> DependencyUpdate {
        DependencyUpdate {
            name: self.name.clone(),
            from_spec: self.version_spec.clone(),
            to_spec,
            to_spec_span: self.version_spec_span,
        }
    }
}

/// A version of a package the registry already knows about.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Release {
    pub version: Version,
    pub retired: bool,
}

/// Everything the planner needs to know about one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisEntry {
    pub package: String,
    pub version: Version,
    pub version_span: Span,
    pub dependencies: Vec<Dependency>,
    pub releases: Vec<Release>,
}

impl AnalysisEntry {
    /// A package is published when the registry lists at least one release.
    pub fn is_published(&self) -> bool {
        !self.releases.is_empty()
    }
}

/// A planned rewrite of one dependency requirement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyUpdate {
    pub name: String,
    pub from_spec: VersionSpec,
    pub to_spec: VersionSpec,
    pub to_spec_span: Span,
}

impl Checksumable for DependencyUpdate {
    fn checksum(&self, hasher: &mut Sha1) {
        self.name.checksum(hasher);
        self.from_spec.to_string().checksum(hasher);
        self.to_spec.to_string().checksum(hasher);
        self.to_spec_span.checksum(hasher);
    }
}

impl Checksumable for Span {
    fn checksum(&self, hasher: &mut Sha1) {
        self.start_line.checksum(hasher);
        self.start_column.checksum(hasher);
        self.end_line.checksum(hasher);
        self.end_column.checksum(hasher);
    }
}
