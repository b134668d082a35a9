//! Reverse command handler
//!
//! Prints the address of a coordinate, or the coordinate itself when no
//! provider can name it.

use crate::config::Config;
use crate::coord::Coordinates;
use crate::error::Result;
use crate::geo::GeocodingClient;
use clap::Args;

/// Reverse command arguments
#[derive(Args)]
pub struct ReverseArgs {
    /// Latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,

    /// Print the lookup outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the reverse command
pub async fn run(args: ReverseArgs) -> Result<()> {
    let coordinate = Coordinates::checked(args.lat, args.lng)?;
    let config = Config::load()?;
    let client = GeocodingClient::from_config(&config);

    let outcome = client.reverse_lookup(coordinate).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if !outcome.is_resolved() {
        eprintln!("No address found; showing coordinates");
    }
    println!("{}", outcome.into_label(coordinate));
    Ok(())
}
