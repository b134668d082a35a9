//! Location state
//!
//! The authoritative record of where the user's property is, plus the
//! [`authority::LocationAuthority`] that owns and mutates it.

pub mod authority;

#[cfg(test)]
pub(crate) mod testing;

pub use authority::{AddressResolver, AddressTask, LocationAuthority, PositionTicket};

use crate::coord::Coordinates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which interaction produced the current snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Gps,
    Search,
    Click,
    Default,
}

impl LocationSource {
    /// Short label for UI badges
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gps => "Current location",
            Self::Search => "Search result",
            Self::Click => "Selected on map",
            Self::Default => "Default location",
        }
    }
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gps => write!(f, "gps"),
            Self::Search => write!(f, "search"),
            Self::Click => write!(f, "click"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Whether the address text is a placeholder awaiting reverse lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressState {
    /// Formatted coordinate shown while a lookup is in flight
    Provisional,
    Resolved,
}

/// The authoritative record of the selected property location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub coordinate: Coordinates,
    pub address: String,
    pub address_state: AddressState,
    pub source: LocationSource,
    /// Accuracy radius in meters, GPS fixes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub confirmed: bool,
    /// Bumped on every coordinate-changing event
    pub generation: u64,
    pub updated_at: DateTime<Utc>,
}

impl LocationSnapshot {
    /// The pre-interaction snapshot
    pub fn initial(coordinate: Coordinates, address: impl Into<String>) -> Self {
        Self {
            coordinate,
            address: address.into(),
            address_state: AddressState::Resolved,
            source: LocationSource::Default,
            accuracy: None,
            confirmed: false,
            generation: 0,
            updated_at: Utc::now(),
        }
    }

    /// Whether the downstream analysis may use this snapshot
    ///
    /// The default location is never eligible, whatever its flag says.
    pub fn is_actionable(&self) -> bool {
        self.confirmed && self.source != LocationSource::Default
    }

    pub fn is_provisional(&self) -> bool {
        self.address_state == AddressState::Provisional
    }
}

/// A confirmed location handed to the downstream analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisTarget {
    pub coordinate: Coordinates,
    pub address: String,
}

impl TryFrom<&LocationSnapshot> for AnalysisTarget {
    type Error = crate::error::Error;

    fn try_from(snapshot: &LocationSnapshot) -> Result<Self, Self::Error> {
        if !snapshot.is_actionable() {
            return Err(crate::error::Error::ConfirmationRequired);
        }
        Ok(Self {
            coordinate: snapshot.coordinate,
            address: snapshot.address.clone(),
        })
    }
}
