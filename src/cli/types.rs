//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};

use crate::cli::commands::{init::InitArgs, run::RunArgs};

#[derive(Parser)]
#[command(name = "assay")]
#[command(about = "Assay - hidden-assignment discovery engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize assay configuration in the current directory
    Init(InitArgs),

    /// Run the search against the configured oracle
    Run(RunArgs),

    /// Show a read-only snapshot of the current checkpoint
    Status,
}
