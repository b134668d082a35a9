//! solar-locate CLI entry point
//!
//! Property location resolution - CLI + web API

use solar_locate::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
