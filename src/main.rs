//! tmt-web CLI entry point.

use clap::Parser;

use tmt_web::cli::commands::{job, load_config, resolve, serve};
use tmt_web::cli::{Cli, Commands};
use tmt_web::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => tmt_web::cli::handle_error(err, cli.json),
    };

    // Held for the lifetime of the process so file logs get flushed.
    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => tmt_web::cli::handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Serve(args) => serve::execute(args, config).await,
        Commands::Resolve(args) => resolve::execute(args, config).await,
        Commands::Job(args) => job::execute(args, config, cli.json).await,
    };

    if let Err(err) = result {
        tmt_web::cli::handle_error(err, cli.json);
    }
}
