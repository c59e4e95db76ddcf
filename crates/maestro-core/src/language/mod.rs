//! Language adapters: everything maestro knows about a concrete package
//! ecosystem goes through [`LanguageSupport`].

pub mod elixir;

use semver::Version;

use crate::analysis::model::{AnalysisEntry, DependencyUpdate, Language};
use crate::config::manifest::ProjectHandle;
use crate::context::Context;
use crate::edit::Span;
use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::vcs::Vcs;

pub trait LanguageSupport: Sync {
    fn language(&self) -> Language;

    /// Does the directory look like a project of this language?
    fn test_project(&self, location: &std::path::Path) -> bool;

    /// Collect the project's analysis facts.
    fn analyze(&self, ctx: &Context, project: &ProjectHandle) -> Result<AnalysisEntry>;

    /// Write the release into the project manifest: patch the version span
    /// and every dependency-update span, commit, and refresh the lockfile if
    /// one is tracked.
    fn write_release(
        &self,
        ctx: &Context,
        vcs: &dyn Vcs,
        prompter: &dyn Prompter,
        project: &ProjectHandle,
        to_version: &Version,
        version_span: Span,
        dependency_updates: &[DependencyUpdate],
    ) -> Result<()>;

    /// Publish the project to the package registry. Returns `false` when the
    /// operator backed out; registry failures surface as
    /// [`Error::PublishFailure`].
    fn publish(
        &self,
        ctx: &Context,
        prompter: &dyn Prompter,
        project: &ProjectHandle,
        replace: bool,
    ) -> Result<bool>;
}

static ELIXIR: elixir::ElixirSupport = elixir::ElixirSupport;

fn registry() -> [&'static dyn LanguageSupport; 1] {
    [&ELIXIR]
}

/// The adapter for a known language.
pub fn support_for(language: Language) -> Result<&'static dyn LanguageSupport> {
    registry()
        .into_iter()
        .find(|support| support.language() == language)
        .ok_or_else(|| Error::Other(anyhow::anyhow!("no support for language {language}")))
}

/// Detect which language a project is written in.
pub fn detect(ctx: &Context, project: &ProjectHandle) -> Result<&'static dyn LanguageSupport> {
    let location = project.location(ctx);
    registry()
        .into_iter()
        .find(|support| support.test_project(&location))
        .ok_or_else(|| Error::Analysis {
            project: project.to_string(),
            reason: format!("unable to detect project language at {}", location.display()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_for_elixir() {
        let support = support_for(Language::Elixir).unwrap();
        assert_eq!(support.language(), Language::Elixir);
    }

    #[test]
    fn test_detect_elixir_project() {
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = Context::new(
            dir.path().to_path_buf(),
            "all".to_string(),
            Some(1),
            None,
            true,
        );
        let repo = dir.path().join("core");
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::write(repo.join("mix.exs"), "defmodule Core.MixProject do\nend\n").unwrap();

        let handle = ProjectHandle::parse("core").unwrap();
        let support = detect(&ctx, &handle).unwrap();
        assert_eq!(support.language(), Language::Elixir);
    }

    #[test]
    fn test_detect_fails_without_manifest() {
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = Context::new(
            dir.path().to_path_buf(),
            "all".to_string(),
            Some(1),
            None,
            true,
        );
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        let handle = ProjectHandle::parse("empty").unwrap();
        assert!(matches!(
            detect(&ctx, &handle),
            Err(Error::Analysis { .. })
        ));
    }
}
