//! solar-locate: property location resolution for solar estimates
//!
//! Resolves where a user's property is, from device geolocation, address
//! search or a click on a satellite map, and keeps the map, the search box
//! and the downstream analysis agreeing on one authoritative location.
//!
//! ## Features
//!
//! - Single location authority with generation-tagged address lookups
//! - Debounced geocoding search with last-issued-wins results
//! - Map view synchronisation (satellite and street base layers)
//! - Geolocation with timeout and actionable failure messages
//! - Confirmation gate before analysis submission
//! - HTTP API + CLI interface
//!
//! ## Quick Start
//!
//! ```no_run
//! use solar_locate::geo::GeocodingClient;
//! use solar_locate::location::{LocationAuthority, LocationSnapshot};
//! use solar_locate::{Config, Coordinates};
//! use std::sync::Arc;
//!
//! # async fn demo() -> solar_locate::Result<()> {
//! let config = Config::default();
//! let client = Arc::new(GeocodingClient::from_config(&config));
//! let (home, address) = config.default_location()?;
//! let authority = LocationAuthority::new(Arc::clone(&client), LocationSnapshot::initial(home, address));
//!
//! // Pick the first search result for an address
//! let candidates = client.search("Bandra West Mumbai").await;
//! if let Some(candidate) = candidates.first() {
//!     authority.apply_search_selection(candidate.coordinate, candidate.display_name.clone());
//! }
//!
//! let target = authority.analysis_target()?;
//! println!("Analysing {} at {}", target.address, target.coordinate);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub mod error;
pub mod format;
pub mod geo;
pub mod location;
pub mod map;
pub mod position;
pub mod search;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use coord::Coordinates;
pub use error::{Error, Result};
pub use location::{AnalysisTarget, LocationAuthority, LocationSnapshot, LocationSource};
