//! Elixir/Hex support.
//!
//! Analysis shells out to the `maestro-elixir-analyzer` escript, which
//! evaluates the project's `mix.exs` and prints a JSON report between
//! `<MAESTRO_ELIXIR_REPORT>` markers (mix itself is free to print anything
//! else around them). Releases are written by span-patching `mix.exs`, and
//! publishing goes through `mix hex.publish`.

use std::path::{Path, PathBuf};

use semver::Version;

use crate::analysis::model::{AnalysisEntry, Dependency, DependencyUpdate, Language, Release};
use crate::config::manifest::ProjectHandle;
use crate::context::Context;
use crate::edit::{self, Span};
use crate::error::{Error, Result};
use crate::log;
use crate::process;
use crate::prompt::Prompter;
use crate::vcs::Vcs;
use crate::version::{VersionSpec, parse_version};

pub const ANALYZER_EXECUTABLE: &str = "maestro-elixir-analyzer";

const REPORT_START: &str = "<MAESTRO_ELIXIR_REPORT>";
const REPORT_END: &str = "</MAESTRO_ELIXIR_REPORT>";

const PUBLISHED_MARKER: &str = "Package published to ";
const ALREADY_PUBLISHED_MARKER: &str = "already been published";

pub struct ElixirSupport;

fn mix_file(location: &Path) -> PathBuf {
    location.join("mix.exs")
}

fn mix_lock(location: &Path) -> PathBuf {
    location.join("mix.lock")
}

impl super::LanguageSupport for ElixirSupport {
    fn language(&self) -> Language {
        Language::Elixir
    }

    fn test_project(&self, location: &Path) -> bool {
        mix_file(location).exists()
    }

    fn analyze(&self, ctx: &Context, project: &ProjectHandle) -> Result<AnalysisEntry> {
        let location = project.location(ctx);
        let mix = mix_file(&location);
        let mix_arg = mix.to_string_lossy().into_owned();

        let out = process::run(ANALYZER_EXECUTABLE, &["--mix", &mix_arg], &location).map_err(
            |e| Error::Analysis {
                project: project.to_string(),
                reason: e.to_string(),
            },
        )?;

        let report = extract_report(&out.stdout).ok_or_else(|| Error::Analysis {
            project: project.to_string(),
            reason: "analyzer produced no report".to_string(),
        })?;

        parse_report(report).map_err(|e| Error::Analysis {
            project: project.to_string(),
            reason: e.to_string(),
        })
    }

    fn write_release(
        &self,
        ctx: &Context,
        vcs: &dyn Vcs,
        prompter: &dyn Prompter,
        project: &ProjectHandle,
        to_version: &Version,
        version_span: Span,
        dependency_updates: &[DependencyUpdate],
    ) -> Result<()> {
        let location = project.location(ctx);
        let mix = mix_file(&location);

        log::operation("Update mix.exs", || {
            let mut patches = vec![(version_span, format!("\"{to_version}\""))];
            for update in dependency_updates {
                patches.push((update.to_spec_span, render_spec(&update.to_spec)?));
            }
            edit::patch_file(&mix, &patches)?;
            vcs.commit(&format!("bump to {to_version}"), &[mix.clone()])
        })?;

        let lock = mix_lock(&location);
        if vcs.is_tracked(&lock)? {
            log::operation("Update lockfile", || {
                let out = process::run_unchecked("mix", &["deps.update", "--all"], &location)?;
                for line in out.stdout.lines() {
                    log::log(line);
                }
                if !out.success()
                    && !prompter.confirm(
                        "There was an error updating dependencies, that will have to be \
                         resolved manually. Continue anyway?",
                    )
                {
                    return Err(Error::Other(anyhow::anyhow!("error updating lockfile")));
                }
                if vcs.is_changed(&lock)? {
                    vcs.commit("update lockfile", &[lock.clone()])?;
                }
                Ok(())
            })?;
        }

        Ok(())
    }

    fn publish(
        &self,
        ctx: &Context,
        prompter: &dyn Prompter,
        project: &ProjectHandle,
        replace: bool,
    ) -> Result<bool> {
        if std::env::var("HEX_API_KEY").is_err() {
            log::warn(
                "The HEX_API_KEY environment variable seems not to be set. \
                 Mix will probably be unable to authenticate and will fail. \
                 To generate an API key, run: mix hex.user key generate",
            );
        }

        let location = project.location(ctx);

        log::operation("Dry run", || {
            process::run_logged("mix", &["deps.get"], &location)?;
            process::run_logged("mix", &["hex.publish", "--yes", "--dry-run"], &location)?;
            Ok::<_, Error>(())
        })?;

        if !prompter.confirm("Please review the dry run logs above. Proceed?") {
            return Ok(false);
        }

        log::operation("Publishing", || {
            let mut args = vec!["hex.publish", "--yes"];
            if replace {
                args.push("--replace");
            }
            let out = process::run_unchecked("mix", &args, &location)?;
            for line in out.stdout.lines() {
                log::log(line);
            }

            let output = format!("{}\n{}", out.stdout, out.stderr);
            if output.contains(PUBLISHED_MARKER) {
                Ok(true)
            } else if output.contains(ALREADY_PUBLISHED_MARKER) {
                // Rerun after an interruption: the registry already has this
                // version, which is exactly the desired end state.
                log::warn("This version is already published, treating as success");
                Ok(true)
            } else {
                Err(Error::PublishFailure(project.to_string()))
            }
        })
    }
}

fn render_spec(spec: &VersionSpec) -> Result<String> {
    match spec.requirement() {
        Some(req) => Ok(format!("\"{req}\"")),
        None => Err(Error::Other(anyhow::anyhow!(
            "cannot render external dependency spec into mix.exs"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Analyzer report
// ---------------------------------------------------------------------------

fn extract_report(stdout: &str) -> Option<&str> {
    let start = stdout.find(REPORT_START)? + REPORT_START.len();
    let end = stdout[start..].find(REPORT_END)? + start;
    Some(&stdout[start..end])
}

fn parse_report(report: &str) -> Result<AnalysisEntry> {
    #[derive(serde::Deserialize)]
    struct RawReport {
        package: String,
        version: String,
        version_span: Span,
        #[serde(default)]
        dependencies: Vec<RawDependency>,
        hex: RawHexInfo,
    }

    #[derive(serde::Deserialize)]
    struct RawDependency {
        name: String,
        version_spec: serde_json::Value,
        version_spec_span: Span,
    }

    #[derive(serde::Deserialize)]
    struct RawHexInfo {
        published: bool,
        #[serde(default)]
        versions: Vec<RawRelease>,
    }

    #[derive(serde::Deserialize)]
    struct RawRelease {
        version: String,
        #[serde(default)]
        retired: bool,
    }

    let raw: RawReport = serde_json::from_str(report)?;

    let dependencies = raw
        .dependencies
        .iter()
        .map(|dep| {
            Ok(Dependency {
                name: dep.name.clone(),
                defined_in: raw.package.clone(),
                version_spec: VersionSpec::parse_json(&dep.version_spec)?,
                version_spec_span: dep.version_spec_span,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let releases = if raw.hex.published {
        raw.hex
            .versions
            .iter()
            .map(|release| {
                Ok(Release {
                    version: parse_version(&release.version)?,
                    retired: release.retired,
                })
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        vec![]
    };

    Ok(AnalysisEntry {
        package: raw.package,
        version: parse_version(&raw.version)?,
        version_span: raw.version_span,
        dependencies,
        releases,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_REPORT: &str = r#"{
        "package": "core",
        "version": "1.4.0",
        "version_span": {"start_line": 7, "start_column": 16, "end_line": 7, "end_column": 23},
        "dependencies": [
            {
                "name": "util",
                "version_spec": "~> 0.4.1",
                "version_spec_span": {"start_line": 21, "start_column": 16, "end_line": 21, "end_column": 26}
            },
            {
                "name": "vendored",
                "version_spec": {"git": "https://example.com/vendored.git", "tag": "v3"},
                "version_spec_span": {"start_line": 22, "start_column": 18, "end_line": 22, "end_column": 60}
            }
        ],
        "hex": {
            "published": true,
            "versions": [
                {"version": "1.3.0"},
                {"version": "1.2.0", "retired": true}
            ]
        }
    }"#;

    #[test]
    fn test_extract_report_between_markers() {
        let stdout = format!(
            "Compiling 3 files (.ex)\n{REPORT_START}{{\"x\": 1}}{REPORT_END}\ndone\n"
        );
        assert_eq!(extract_report(&stdout), Some("{\"x\": 1}"));
    }

    #[test]
    fn test_extract_report_missing_markers() {
        assert!(extract_report("no report here").is_none());
    }

    #[test]
    fn test_parse_report() {
        let entry = parse_report(SAMPLE_REPORT).unwrap();
        assert_eq!(entry.package, "core");
        assert_eq!(entry.version, Version::parse("1.4.0").unwrap());
        assert_eq!(entry.version_span, Span::new(7, 16, 7, 23));

        assert_eq!(entry.dependencies.len(), 2);
        let util = &entry.dependencies[0];
        assert_eq!(util.name, "util");
        assert_eq!(util.defined_in, "core");
        assert!(util.version_spec.is_version());
        let vendored = &entry.dependencies[1];
        assert!(vendored.version_spec.is_external());

        assert!(entry.is_published());
        assert_eq!(entry.releases.len(), 2);
        assert!(entry.releases[1].retired);
    }

    #[test]
    fn test_parse_report_unpublished_ignores_versions() {
        let report = r#"{
            "package": "fresh",
            "version": "0.1.0",
            "version_span": {"start_line": 1, "start_column": 1, "end_line": 1, "end_column": 2},
            "dependencies": [],
            "hex": {"published": false, "versions": [{"version": "9.9.9"}]}
        }"#;
        let entry = parse_report(report).unwrap();
        assert!(!entry.is_published());
        assert!(entry.releases.is_empty());
    }

    #[test]
    fn test_parse_report_rejects_bad_version() {
        let report = r#"{
            "package": "bad",
            "version": "not-a-version",
            "version_span": {"start_line": 1, "start_column": 1, "end_line": 1, "end_column": 2},
            "dependencies": [],
            "hex": {"published": false, "versions": []}
        }"#;
        assert!(parse_report(report).is_err());
    }

    #[test]
    fn test_render_spec() {
        let spec = VersionSpec::parse("~> 2.0").unwrap();
        assert_eq!(render_spec(&spec).unwrap(), "\"~> 2.0\"");

        let git = VersionSpec::parse_json(&serde_json::json!({"git": "url"})).unwrap();
        assert!(render_spec(&git).is_err());
    }
}
