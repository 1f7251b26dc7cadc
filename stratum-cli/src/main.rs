//! Stratum CLI -- container image SBOM indexing from the command line

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use cli::{Cli, Commands};
use output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Loaded once: logging needs [general], commands need the rest.
    let loaded = commands::load_config(&cli.config).await;

    let mut general = loaded
        .as_ref()
        .map(|config| config.general.clone())
        .unwrap_or_default();
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    stratum_core::metrics::describe_all();
    tracing::debug!(config = %cli.config.display(), "stratum starting");

    let writer = OutputWriter::new(cli.output);
    let result = match cli.command {
        Commands::Index(args) => match loaded {
            Ok(config) => commands::index::execute(args, config, &writer).await,
            Err(e) => Err(e),
        },
        Commands::Config(args) => {
            commands::config::execute(args, &cli.config, loaded, &writer).await
        }
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}
