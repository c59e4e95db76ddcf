use clap::Args;

use maestro_core::Context;
use maestro_core::analysis;
use maestro_core::error::Result;

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Print the graph in DOT form instead of the plain listing
    #[arg(long)]
    pub view: bool,
}

pub fn run(ctx: &Context, args: GraphArgs) -> Result<()> {
    let (database, graph) = analysis::analyze(ctx)?;

    if args.view {
        print!("{}", graph.dot(&database)?);
        return Ok(());
    }

    for package in graph.packages() {
        let project = database.project_by_package(package)?;
        let about = database.about(project)?;
        println!("{package} ({})", about.version);
        for (dependent, relations) in graph.dependents_of(package)? {
            for relation in relations {
                println!("  <- {dependent} ({})", relation.version_str());
            }
        }
    }

    Ok(())
}
