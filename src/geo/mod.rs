//! Geocoding module
//!
//! Forward search (text to candidate locations) and reverse lookup
//! (coordinate to address) over external providers.

pub mod client;
pub mod nominatim;

pub use client::GeocodingClient;

use crate::coord::Coordinates;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A forward-geocoding result offered to the user for selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    /// Provider-stable identifier, used for selection
    pub id: String,
    /// Display name (formatted address)
    pub display_name: String,
    pub coordinate: Coordinates,
}

/// Why a reverse lookup produced no name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodeFailure {
    Timeout,
    NotFound,
    NetworkError,
}

impl fmt::Display for GeocodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::NotFound => write!(f, "not_found"),
            Self::NetworkError => write!(f, "network_error"),
        }
    }
}

/// Result of a reverse-lookup attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum GeocodeOutcome {
    Resolved(String),
    Failed(GeocodeFailure),
}

impl GeocodeOutcome {
    /// Address text for `coordinate`, falling back to its formatted label
    pub fn into_label(self, coordinate: Coordinates) -> String {
        match self {
            Self::Resolved(name) => name,
            Self::Failed(_) => coordinate.label(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Trait for geocoding providers
///
/// Providers report raw failures; [`GeocodingClient`] owns timeouts,
/// fallback and degradation.
pub trait GeoBackend: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Search for up to `limit` candidates matching `query`
    fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<SearchCandidate>>> + Send;

    /// Reverse geocode a coordinate to a display name
    ///
    /// Returns `Ok(None)` when the provider has no address for the point.
    fn reverse_geocode(
        &self,
        coordinate: Coordinates,
    ) -> impl std::future::Future<Output = Result<Option<String>>> + Send;
}
