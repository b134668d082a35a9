//! Search command handler
//!
//! Geocodes a place name and optionally selects one of the results.

use crate::cli::{emit, list_formats};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::geo::GeocodingClient;
use crate::location::{LocationAuthority, LocationSnapshot};
use crate::search::SearchSession;
use clap::Args;
use std::sync::Arc;

/// Search command arguments
#[derive(Args)]
pub struct SearchArgs {
    /// Place name or address
    #[arg(required_unless_present = "list_formats")]
    pub query: Option<String>,

    /// Select the Nth result (1-based) and print the resulting location
    #[arg(long, short = 's')]
    pub select: Option<usize>,

    /// Output format for the selected location
    #[arg(long, short = 'f', default_value = "text")]
    pub format: String,

    /// Write output to file
    #[arg(long, short = 'o')]
    pub output: Option<String>,

    /// List available formats
    #[arg(short = 'F', long = "list-formats")]
    pub list_formats: bool,
}

/// Run the search command
pub async fn run(args: SearchArgs) -> Result<()> {
    if args.list_formats {
        list_formats();
        return Ok(());
    }

    let query = args.query.unwrap_or_default();
    let config = Config::load()?;
    let client = Arc::new(GeocodingClient::from_config(&config));

    let mut session = SearchSession::new();
    session.set_query(&query);
    let Some(ticket) = session.issue() else {
        return Err(Error::Geocoding("Search text is empty".to_string()));
    };
    let candidates = client.search(&ticket.query).await;
    session.complete(&ticket, candidates);

    let state = session.state();
    if state.candidates.is_empty() {
        return Err(Error::Geocoding(format!(
            "No locations found for '{}'",
            query.trim()
        )));
    }

    let Some(n) = args.select else {
        for (i, candidate) in state.candidates.iter().enumerate() {
            println!("{:2}. {}", i + 1, candidate.display_name);
            println!("    {}", candidate.coordinate);
        }
        return Ok(());
    };

    let id = n
        .checked_sub(1)
        .and_then(|i| state.candidates.get(i))
        .map(|c| c.id.clone())
        .ok_or_else(|| {
            Error::Config(format!(
                "--select must be between 1 and {}",
                state.candidates.len()
            ))
        })?;

    let (coordinate, address) = config.default_location()?;
    let authority = LocationAuthority::new(client, LocationSnapshot::initial(coordinate, address));
    if let Some(candidate) = session.select(&id) {
        authority.apply_search_selection(candidate.coordinate, candidate.display_name);
    }

    emit(
        &authority.snapshot(),
        &args.format,
        args.output.as_deref(),
        &config,
    )
}
