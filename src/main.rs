// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::Parser;

use pose_paf::cli::args::{Cli, Commands};
use pose_paf::cli::assemble::run_assemble;
use pose_paf::cli::logging::init_tracing;

fn main() {
    init_tracing();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Assemble(args) => run_assemble(args),
    }
}
