mod cli;
mod commands;
mod driver;

use clap::Parser;
use colored::Colorize;
use maestro_core::Context;
use maestro_core::error::Error;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    if let Commands::Completion(args) = &cli.command {
        clap_complete::generate(
            args.shell,
            &mut <Cli as clap::CommandFactory>::command(),
            "maestro",
            &mut std::io::stdout(),
        );
        return;
    }

    let workspace = cli
        .workspace
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default();

    let ctx = Context::new(
        workspace,
        cli.profile.clone(),
        cli.jobs,
        std::env::var("GITHUB_TOKEN").ok(),
        cli.yes,
    );

    let result = match cli.command {
        Commands::Bootstrap(args) => commands::bootstrap::run(&ctx, args),
        Commands::Sync(args) => commands::sync::run(&ctx, args),
        Commands::Ls(args) => commands::ls::run(&ctx, args),
        Commands::Graph(args) => commands::graph::run(&ctx, args),
        Commands::Release(args) => commands::release::run(&ctx, args),
        Commands::Foreach(args) => commands::foreach::run(&ctx, args),
        Commands::Completion(_) => unreachable!("completion handled above"),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "FATAL:".red().bold(), e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &Error) -> i32 {
    match error {
        Error::StateConflict(_) => 2,
        _ => 1,
    }
}
