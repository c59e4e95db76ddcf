//! The real executor driver: git/GitHub, the language adapters and the
//! on-disk release document.

use maestro_core::Context;
use maestro_core::analysis::Language;
use maestro_core::config::{Manifest, RepositoryHandle};
use maestro_core::error::Result;
use maestro_core::language::{self, LanguageSupport};
use maestro_core::prompt::{AssumeYes, Prompter, TerminalPrompter};
use maestro_core::release::executor::Driver;
use maestro_core::release::state::ReleaseState;
use maestro_core::vcs::{GitVcs, Vcs};

pub struct WorkspaceDriver<'a> {
    ctx: &'a Context,
    manifest: &'a Manifest,
    prompter: Box<dyn Prompter>,
}

impl<'a> WorkspaceDriver<'a> {
    pub fn new(ctx: &'a Context, manifest: &'a Manifest) -> Self {
        let prompter: Box<dyn Prompter> = if ctx.assume_yes {
            Box::new(AssumeYes)
        } else {
            Box::new(TerminalPrompter)
        };
        Self {
            ctx,
            manifest,
            prompter,
        }
    }
}

impl Driver for WorkspaceDriver<'_> {
    fn context(&self) -> &Context {
        self.ctx
    }

    fn vcs(&self, repo: &RepositoryHandle) -> Result<Box<dyn Vcs + '_>> {
        let manifest = self.manifest.get_repository(repo)?;
        Ok(Box::new(GitVcs::open(self.ctx, manifest)?))
    }

    fn language(&self, language: Language) -> Result<&dyn LanguageSupport> {
        language::support_for(language)
    }

    fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }

    fn replace_on_publish(&self) -> bool {
        self.manifest.allow_replace_on_publish
    }

    fn persist(&mut self, release: &ReleaseState) -> Result<()> {
        release.save(self.ctx)
    }
}
