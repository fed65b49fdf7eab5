//! Assay CLI entry point.

use clap::Parser;

use assay::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => assay::cli::commands::init::execute(args, cli.json).await,
        Commands::Run(args) => assay::cli::commands::run::execute(args, cli.json).await,
        Commands::Status => assay::cli::commands::status::execute(cli.json).await,
    };

    if let Err(err) = result {
        assay::cli::handle_error(err, cli.json);
    }
}
