//! Version algebra: requirements, pinning, bump classification and
//! requirement targeting.
//!
//! [`semver::Version`] is used as the version type so ordering and
//! prerelease handling follow SemVer exactly. Requirements are modeled after
//! hex-style specs: an operator, a base version and a [`Pin`] deciding which
//! prefix of the base is significant. The short form `M.m` pins to the major
//! release series, a full `M.m.p` base pins to the minor series.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use semver::Version;

use crate::error::{Error, Result};

/// `9999` stands in for "the highest version that came before a zero" when
/// simulating the predecessor of a version, see [`previous_version`].
const SEGMENT_SENTINEL: u64 = 9999;

fn short_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:0|[1-9][0-9]*)\.(?:0|[1-9][0-9]*)$").unwrap())
}

/// True if the version carries prerelease or build metadata.
///
/// Such versions never satisfy a stable requirement and make bump
/// classification unsolvable.
pub fn is_unstable(version: &Version) -> bool {
    !version.pre.is_empty() || !version.build.is_empty()
}

/// Simulate the version that came "just before" `version`.
///
/// The rightmost non-zero segment is decremented and every zero to its right
/// rolls over to a sentinel value. The result exists only for planning-time
/// requirement checks and never reaches a manifest.
pub fn previous_version(version: &Version) -> Version {
    if version.patch > 0 {
        Version::new(version.major, version.minor, version.patch - 1)
    } else if version.minor > 0 {
        Version::new(version.major, version.minor - 1, SEGMENT_SENTINEL)
    } else if version.major > 0 {
        Version::new(version.major - 1, SEGMENT_SENTINEL, SEGMENT_SENTINEL)
    } else {
        Version::new(0, 0, 0)
    }
}

/// Parse a version string, mapping failures onto [`Error::VersionParse`].
pub fn parse_version(s: &str) -> Result<Version> {
    Version::parse(s.trim()).map_err(|_| Error::VersionParse(s.to_string()))
}

// ---------------------------------------------------------------------------
// Operators and pins
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    /// The pessimistic operator `~>`.
    Pessimistic,
}

impl VersionOperator {
    /// Two-character operators first so `>=` is never read as `>` `=`.
    const PARSE_ORDER: &'static [VersionOperator] = &[
        VersionOperator::Eq,
        VersionOperator::Ne,
        VersionOperator::Ge,
        VersionOperator::Le,
        VersionOperator::Pessimistic,
        VersionOperator::Gt,
        VersionOperator::Lt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VersionOperator::Eq => "==",
            VersionOperator::Ne => "!=",
            VersionOperator::Gt => ">",
            VersionOperator::Lt => "<",
            VersionOperator::Ge => ">=",
            VersionOperator::Le => "<=",
            VersionOperator::Pessimistic => "~>",
        }
    }
}

impl fmt::Display for VersionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which prefix of a requirement base is significant.
///
/// `Minor < Major`: a major pin is the broader one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pin {
    Minor,
    Major,
}

impl Pin {
    /// Reduce a version to the pinned prefix for comparisons.
    pub fn truncate(self, version: &Version) -> Version {
        match self {
            // Major series: only major.minor are significant.
            Pin::Major => Version::new(version.major, version.minor, 0),
            // Minor series: the version participates as-is.
            Pin::Minor => version.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Requirements
// ---------------------------------------------------------------------------

/// A single-operator version requirement such as `~> 1.2` or `>= 0.4.1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionRequirement {
    pub operator: VersionOperator,
    pub base: Version,
    pub pin: Pin,
}

impl VersionRequirement {
    pub fn new(operator: VersionOperator, base: Version, pin: Pin) -> Self {
        Self {
            operator,
            base,
            pin,
        }
    }

    /// Parse a requirement string. A missing operator means `==`; a short
    /// `M.m` base pins to the major series with patch zero.
    pub fn parse(req_str: &str) -> Result<Self> {
        let input = req_str.trim();
        let (operator, base_str) = Self::split_operator(input);
        let base_str = base_str.trim_start();
        let (base, pin) = Self::parse_base(base_str)
            .ok_or_else(|| Error::SpecParse(req_str.to_string()))?;
        Ok(Self::new(operator, base, pin))
    }

    fn split_operator(input: &str) -> (VersionOperator, &str) {
        for &op in VersionOperator::PARSE_ORDER {
            if let Some(rest) = input.strip_prefix(op.as_str()) {
                return (op, rest);
            }
        }
        (VersionOperator::Eq, input)
    }

    fn parse_base(base_str: &str) -> Option<(Version, Pin)> {
        if short_version_regex().is_match(base_str) {
            let mut parts = base_str.split('.');
            let major: u64 = parts.next()?.parse().ok()?;
            let minor: u64 = parts.next()?.parse().ok()?;
            return Some((Version::new(major, minor, 0), Pin::Major));
        }
        Version::parse(base_str).ok().map(|v| (v, Pin::Minor))
    }

    /// Does `version` satisfy this requirement?
    ///
    /// A version carrying prerelease or build metadata only matches when the
    /// requirement base carries such metadata itself.
    pub fn matches(&self, version: &Version) -> bool {
        if is_unstable(version) && !is_unstable(&self.base) {
            return false;
        }

        let v = self.pin.truncate(version);
        let base = self.pin.truncate(&self.base);

        match self.operator {
            VersionOperator::Eq => v == base,
            VersionOperator::Ne => v != base,
            VersionOperator::Gt => v > base,
            VersionOperator::Lt => v < base,
            VersionOperator::Ge => v >= base,
            VersionOperator::Le => v <= base,
            VersionOperator::Pessimistic => base <= v && v < self.next_incompatible(),
        }
    }

    /// First version outside the compatible range of a pessimistic
    /// requirement: the next major for a major pin, the next minor otherwise.
    pub fn next_incompatible(&self) -> Version {
        match self.pin {
            Pin::Major => Version::new(self.base.major + 1, 0, 0),
            Pin::Minor => Version::new(self.base.major, self.base.minor + 1, 0),
        }
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pin {
            Pin::Major => write!(f, "{} {}.{}", self.operator, self.base.major, self.base.minor),
            Pin::Minor => write!(f, "{} {}", self.operator, self.base),
        }
    }
}

// ---------------------------------------------------------------------------
// Version specs
// ---------------------------------------------------------------------------

/// A dependency on a git source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GitRequirement {
    pub repository: String,
    pub reference: Option<String>,
}

/// A dependency on a local path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathRequirement {
    pub path: String,
}

/// How a dependency is specified in a project manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionSpec {
    Version(VersionRequirement),
    Git(GitRequirement),
    Path(PathRequirement),
}

impl VersionSpec {
    pub fn is_version(&self) -> bool {
        matches!(self, VersionSpec::Version(_))
    }

    /// Git and path dependencies are external: the planner cannot retarget
    /// them and leaves them alone with a warning.
    pub fn is_external(&self) -> bool {
        !self.is_version()
    }

    pub fn requirement(&self) -> Option<&VersionRequirement> {
        match self {
            VersionSpec::Version(req) => Some(req),
            _ => None,
        }
    }

    /// Parse a spec from its string form (used by the release document).
    pub fn parse(s: &str) -> Result<Self> {
        Ok(VersionSpec::Version(VersionRequirement::parse(s)?))
    }

    /// Parse a spec from an analyzer report value: a string is a version
    /// requirement, a map is a git or path dependency.
    pub fn parse_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Object(map) => {
                if let Some(repository) = map.get("git").and_then(|v| v.as_str()) {
                    let reference = ["ref", "tag", "branch"]
                        .iter()
                        .find_map(|k| map.get(*k))
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string());
                    Ok(VersionSpec::Git(GitRequirement {
                        repository: repository.to_string(),
                        reference,
                    }))
                } else if let Some(path) = map.get("path").and_then(|v| v.as_str()) {
                    Ok(VersionSpec::Path(PathRequirement {
                        path: path.to_string(),
                    }))
                } else {
                    Err(Error::SpecParse(value.to_string()))
                }
            }
            other => Err(Error::SpecParse(other.to_string())),
        }
    }

    /// The canonical requirement for a freshly released `version`.
    ///
    /// Prereleases are pinned exactly. A stable `M.m.0` with `M > 0` targets
    /// the whole major series (`~> M.m`), anything else the minor series
    /// (`~> M.m.p`).
    pub fn targeting(version: &Version) -> VersionSpec {
        let req = if is_unstable(version) {
            VersionRequirement::new(VersionOperator::Eq, version.clone(), Pin::Minor)
        } else if version.major > 0 && version.patch == 0 {
            VersionRequirement::new(VersionOperator::Pessimistic, version.clone(), Pin::Major)
        } else {
            VersionRequirement::new(VersionOperator::Pessimistic, version.clone(), Pin::Minor)
        };
        VersionSpec::Version(req)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Version(req) => req.fmt(f),
            VersionSpec::Git(git) => match &git.reference {
                Some(reference) => write!(f, "git: {} @ {}", git.repository, reference),
                None => write!(f, "git: {}", git.repository),
            },
            VersionSpec::Path(path) => write!(f, "path: {}", path.path),
        }
    }
}

// ---------------------------------------------------------------------------
// Bumps
// ---------------------------------------------------------------------------

/// The SemVer-level delta between two versions, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bump {
    StayAsIs,
    Patch,
    Minor,
    Major,
    Unsolvable,
}

impl Bump {
    /// Classify the delta between two stable versions.
    pub fn between(from: &Version, to: &Version) -> Bump {
        if from > to || is_unstable(from) || is_unstable(to) {
            Bump::Unsolvable
        } else if from == to {
            Bump::StayAsIs
        } else if from.major != to.major {
            Bump::Major
        } else if from.minor != to.minor {
            Bump::Minor
        } else {
            Bump::Patch
        }
    }

    /// Translate this bump of a package into the bump induced on a dependent
    /// currently at `dependent_version`.
    ///
    /// In the `0.x` series the minor position is the breaking level, so minor
    /// changes stay minor there while they soften to patches for `>= 1.0`
    /// dependents, and major changes induce a minor bump everywhere.
    pub fn derive(self, dependent_version: &Version) -> Bump {
        match self {
            Bump::Patch => Bump::Patch,
            Bump::Minor => {
                if dependent_version.major == 0 {
                    Bump::Minor
                } else {
                    Bump::Patch
                }
            }
            Bump::Major => Bump::Minor,
            Bump::StayAsIs | Bump::Unsolvable => self,
        }
    }

    /// Produce the bumped version.
    pub fn apply(self, version: &Version) -> Result<Version> {
        match self {
            Bump::StayAsIs => Ok(version.clone()),
            Bump::Patch => Ok(Version::new(
                version.major,
                version.minor,
                version.patch + 1,
            )),
            Bump::Minor => Ok(Version::new(version.major, version.minor + 1, 0)),
            Bump::Major => Ok(Version::new(version.major + 1, 0, 0)),
            Bump::Unsolvable => Err(Error::UnsolvableBump(version.to_string())),
        }
    }
}

impl fmt::Display for Bump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Bump::StayAsIs => "none",
            Bump::Patch => "patch",
            Bump::Minor => "minor",
            Bump::Major => "major",
            Bump::Unsolvable => "unsolvable",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
