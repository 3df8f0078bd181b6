//! `tmt-web serve`

use anyhow::{Context, Result};
use clap::Args;
use std::net::SocketAddr;

use crate::application::ServiceHost;
use crate::domain::models::{Config, ExecutionMode};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::http::HttpServer;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind_address)
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Execution mode (overrides execution.mode)
    #[arg(short, long, value_enum)]
    pub mode: Option<ExecutionMode>,
}

/// Apply command-line overrides and re-validate.
fn apply_overrides(mut config: Config, args: &ServeArgs) -> Result<Config> {
    if let Some(bind) = &args.bind {
        config.server.bind_address.clone_from(bind);
    }
    if let Some(mode) = args.mode {
        config.execution.mode = mode;
    }
    ConfigLoader::validate(&config)?;
    Ok(config)
}

pub async fn execute(args: ServeArgs, config: Config) -> Result<()> {
    let config = apply_overrides(config, &args)?;
    let bind: SocketAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind_address))?;

    let host = ServiceHost::start(&config).await?;
    let server = HttpServer::new(bind, host.gateway());

    let served = server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown requested");
        })
        .await;

    host.shutdown().await;
    served
}
