//! FANTASIA CLI
//!
//! Command-line front end for the annotation-transfer pipeline.
//!
//! # Commands
//!
//! - `init-config`: write a starter configuration file
//! - `initialize`: load a reference FASTA and GO annotation table into the
//!   vector store
//! - `run`: execute a full annotation-transfer run
//!
//! Logging goes to stderr so stdout stays clean for scripted use.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod error;

pub use error::exit_code_for;

/// FANTASIA - GO annotation transfer by protein embedding similarity
#[derive(Parser)]
#[command(name = "fantasia")]
#[command(version)]
#[command(about = "GO annotation transfer by protein embedding similarity")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    InitConfig(commands::init_config::InitConfigArgs),
    /// Load reference embeddings and their GO annotations into the store
    ///
    /// Reads a reference FASTA plus a tab-separated annotation table
    /// (accession, GO term, optional evidence weight) and persists one
    /// tagged reference vector per enabled model. Runs search against the
    /// tag named by `lookup_reference_tag`.
    Initialize(commands::initialize::InitializeArgs),
    /// Execute a full annotation-transfer run
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::InitConfig(args) => commands::init_config::handle_init_config(&args),
        Commands::Initialize(args) => commands::initialize::handle_initialize(args).await,
        Commands::Run(args) => commands::run::handle_run(args).await,
    };
    std::process::exit(exit_code);
}
