use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use clap::{Args, Subcommand};
use colored::Colorize;
use semver::Version;

use maestro_core::Context;
use maestro_core::analysis;
use maestro_core::config::{Manifest, ProjectHandle};
use maestro_core::error::{Error, Result};
use maestro_core::log;
use maestro_core::prompt::{AssumeYes, Prompter, TerminalPrompter};
use maestro_core::release::executor::{self, Action};
use maestro_core::release::{PlanOptions, ReleaseState};
use maestro_core::version::parse_version;

use crate::driver::WorkspaceDriver;

#[derive(Args, Debug)]
pub struct ReleaseArgs {
    #[command(subcommand)]
    pub command: ReleaseCommands,
}

#[derive(Subcommand, Debug)]
pub enum ReleaseCommands {
    /// Show the status of the pending release, if any
    Status,

    /// Prepare a release plan for the given sources
    Plan(PlanArgs),

    /// Execute the saved release plan until the next breakpoint or phase end
    Proceed(ProceedArgs),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Print the plan without persisting it
    #[arg(long)]
    pub dry: bool,

    /// Source project and target version, as `<project>:<version>`
    /// (repeatable); prompted interactively when omitted
    #[arg(short, long = "source", value_name = "PROJECT:VERSION")]
    pub sources: Vec<String>,

    /// Also re-target dependents whose requirements fell behind before this
    /// release
    #[arg(long)]
    pub update_obsolete: bool,
}

#[derive(Args, Debug)]
pub struct ProceedArgs {
    /// Print the tasks the next round would run without performing them
    #[arg(long)]
    pub dry: bool,
}

pub fn run(ctx: &Context, args: ReleaseArgs) -> Result<()> {
    match args.command {
        ReleaseCommands::Status => status(ctx),
        ReleaseCommands::Plan(args) => plan(ctx, args),
        ReleaseCommands::Proceed(args) => proceed(ctx, args),
    }
}

fn status(ctx: &Context) -> Result<()> {
    if ReleaseState::exists(ctx) {
        let release = ReleaseState::open(ctx)?;
        log::log(&release.describe());
    } else {
        log::success("There is no release pending at this moment, feel free to start one.");
    }
    Ok(())
}

fn plan(ctx: &Context, args: PlanArgs) -> Result<()> {
    if !args.dry && ReleaseState::exists(ctx) {
        let pending = ReleaseState::open(ctx)?;
        return Err(Error::StateConflict(pending.codename()));
    }

    let manifest = Manifest::open(ctx)?;

    let sources = if args.sources.is_empty() {
        gather_sources(&manifest)?
    } else {
        let mut sources = BTreeMap::new();
        for source in &args.sources {
            let (project, version) = parse_source(&manifest, source)?;
            sources.insert(project, version);
        }
        sources
    };

    let options = PlanOptions {
        update_obsolete: args.update_obsolete,
        force_publish: manifest
            .iter_repositories()
            .filter(|repo| repo.force_publish)
            .map(|repo| repo.name.clone())
            .collect(),
    };

    let (database, graph) = analysis::analyze(ctx)?;
    let release = ReleaseState::plan(sources, &database, &graph, &options)?;

    if release.is_empty() {
        log::success("Everything is already released, there is nothing to do.");
        return Ok(());
    }

    log::log("");
    log::log(&release.describe());

    if !args.dry {
        let prompter = prompter(ctx);
        if prompter.confirm("Save this release?") {
            log::operation(&format!("Saving release \"{}\"", release.codename()), || {
                release.save(ctx)
            })?;
        }
    }

    Ok(())
}

fn proceed(ctx: &Context, args: ProceedArgs) -> Result<()> {
    if !ReleaseState::exists(ctx) {
        return Err(Error::Other(anyhow::anyhow!(
            "there is no release pending at this moment, create one beforehand"
        )));
    }

    let mut release = ReleaseState::open(ctx)?;

    if args.dry {
        for (project, task) in executor::plan_preview(&release) {
            log::log(&format!("{project}: {task}"));
        }
        return Ok(());
    }

    let manifest = Manifest::open(ctx)?;
    let mut driver = WorkspaceDriver::new(ctx, &manifest);
    let action = executor::proceed(&mut release, &mut driver)?;

    match action {
        Action::Finish if release.is_done() => {
            log::success("Release finished successfully!");
            log::operation("Removing release state file", || ReleaseState::delete(ctx))?;
        }
        Action::Finish => {
            let phase = release
                .current_phase()
                .map(|p| p.codename())
                .unwrap_or_default();
            log::success(&format!("The phase \"{phase}\" has finished successfully!"));
            log::warn("To proceed, rerun this command.");
        }
        Action::Breakpoint => {
            log::warn("A breakpoint has been reached!");
            log::warn("Do the necessary manual actions and rerun this command.");
        }
        Action::Proceed | Action::Skip => {}
    }

    Ok(())
}

fn prompter(ctx: &Context) -> Box<dyn Prompter> {
    if ctx.assume_yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalPrompter)
    }
}

/// Parse a `<project>:<version>` source argument. Project handles may
/// contain `:` themselves, so the version is split off the right.
fn parse_source(manifest: &Manifest, source: &str) -> Result<(ProjectHandle, Version)> {
    let (project_str, version_str) = source.rsplit_once(':').ok_or_else(|| {
        Error::Other(anyhow::anyhow!(
            "invalid source \"{source}\", expected `<project>:<version>` \
             (for example `core:1.2.0`)"
        ))
    })?;

    let project = ProjectHandle::parse(project_str)?;
    if !manifest.has_project(&project) {
        return Err(Error::Other(anyhow::anyhow!("unknown project {project}")));
    }

    let version = parse_version(version_str)?;
    Ok((project, version))
}

/// Interactively collect sources; an empty project name finishes the list.
fn gather_sources(manifest: &Manifest) -> Result<BTreeMap<ProjectHandle, Version>> {
    let mut sources = BTreeMap::new();
    log::warn("Enter projects and target versions, hit enter when done.");

    let stdin = std::io::stdin();
    loop {
        let project = match read_prompt(&stdin, "Project")? {
            answer if answer.is_empty() => {
                if sources.is_empty() {
                    log::error_line("You must provide at least one project.");
                    continue;
                }
                break;
            }
            answer => answer,
        };

        let handle = match ProjectHandle::parse(&project) {
            Ok(handle) if manifest.has_project(&handle) => handle,
            Ok(handle) => {
                log::error_line(&format!("Unknown project {handle}"));
                continue;
            }
            Err(_) => {
                log::error_line(&format!("\"{project}\" is not a valid project name"));
                continue;
            }
        };

        loop {
            let answer = read_prompt(&stdin, "Version")?;
            match parse_version(&answer) {
                Ok(version) => {
                    sources.insert(handle, version);
                    break;
                }
                Err(_) => log::error_line(&format!("\"{answer}\" is not a valid version")),
            }
        }
    }

    Ok(sources)
}

fn read_prompt(stdin: &std::io::Stdin, label: &str) -> Result<String> {
    print!("{} ", format!("{label}:").cyan());
    std::io::stdout().flush()?;
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
