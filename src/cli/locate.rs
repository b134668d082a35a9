//! Locate command handler
//!
//! Finds the machine's approximate location by IP address and resolves its
//! address.

use crate::cli::{emit, list_formats};
use crate::config::Config;
use crate::error::Result;
use crate::geo::GeocodingClient;
use crate::location::{LocationAuthority, LocationSnapshot};
use crate::position::{GeolocationRequester, IpLocator};
use clap::Args;
use std::sync::Arc;
use tracing::debug;

/// Locate command arguments
#[derive(Args)]
pub struct LocateArgs {
    /// Confirm the location, making it eligible for analysis
    #[arg(long)]
    pub confirm: bool,

    /// Output format
    #[arg(long, short = 'f', default_value = "text")]
    pub format: String,

    /// Write output to file
    #[arg(long, short = 'o')]
    pub output: Option<String>,

    /// Ignore any cached IP location
    #[arg(long)]
    pub no_cache: bool,

    /// List available formats
    #[arg(short = 'F', long = "list-formats")]
    pub list_formats: bool,
}

/// Run the locate command
pub async fn run(args: LocateArgs) -> Result<()> {
    if args.list_formats {
        list_formats();
        return Ok(());
    }

    let config = Config::load()?;
    let client = Arc::new(GeocodingClient::from_config(&config));
    let (coordinate, address) = config.default_location()?;
    let authority = LocationAuthority::new(client, LocationSnapshot::initial(coordinate, address));

    let locator = if args.no_cache {
        IpLocator::without_cache()
    } else {
        IpLocator::new()
    };
    let requester = GeolocationRequester::new(locator, config.position_options());

    let located = match requester.locate(&authority).await {
        Ok(located) => located,
        Err(failure) => {
            eprintln!("{}", failure.message);
            for suggestion in &failure.suggestions {
                eprintln!("  - {}", suggestion);
            }
            return Err(failure.into());
        }
    };

    if let Some((_, task)) = located {
        if !task.await.unwrap_or(false) {
            debug!("Address lookup did not apply");
        }
    }

    if args.confirm {
        authority.confirm();
    }

    emit(
        &authority.snapshot(),
        &args.format,
        args.output.as_deref(),
        &config,
    )
}
