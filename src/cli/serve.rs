//! `solar-locate serve`

use crate::config::Config;
use crate::error::Result;
use crate::server;
use clap::Args;
use tracing::info;

#[derive(Args)]
pub struct ServeArgs {
    /// Bind address, overriding server.host
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port, overriding server.port
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
}

/// Serve the location API in the foreground until interrupted
pub async fn run(args: ServeArgs) -> Result<()> {
    let mut config = Config::load()?;
    let addr = config.override_server(args.host, args.port);
    info!("solar-locate {} listening on {}", env!("CARGO_PKG_VERSION"), addr);
    server::run(config).await
}
