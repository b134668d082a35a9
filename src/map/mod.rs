//! Map view
//!
//! The [`MapWidget`] trait describes what the location subsystem needs from an
//! interactive map: a camera, a single marker and swappable base layers.
//! [`adapter::MapViewAdapter`] keeps a widget in step with the location
//! authority.

pub mod adapter;
pub mod headless;

pub use adapter::{MapEvent, MapViewAdapter, MapViewHandle};
pub use headless::{HeadlessMap, MapViewState};

use crate::constants::tiles;
use crate::coord::Coordinates;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a marker placed on a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub Uuid);

impl MarkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Base tile layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseLayer {
    #[default]
    Satellite,
    Street,
}

impl BaseLayer {
    /// Tile URL template
    pub fn tile_url(&self) -> &'static str {
        match self {
            Self::Satellite => tiles::SATELLITE_URL,
            Self::Street => tiles::STREET_URL,
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            Self::Satellite => tiles::SATELLITE_ATTRIBUTION,
            Self::Street => tiles::STREET_ATTRIBUTION,
        }
    }

    pub fn max_zoom(&self) -> u8 {
        tiles::MAX_ZOOM
    }
}

impl fmt::Display for BaseLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Satellite => write!(f, "satellite"),
            Self::Street => write!(f, "street"),
        }
    }
}

impl std::str::FromStr for BaseLayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "satellite" | "imagery" => Ok(Self::Satellite),
            "street" | "streets" | "osm" => Ok(Self::Street),
            _ => Err(format!("Unknown base layer: {}", s)),
        }
    }
}

/// Operations the adapter performs on an interactive map
///
/// Implementations own the underlying map instance; the adapter is their
/// only caller.
pub trait MapWidget: Send {
    /// Move the camera
    fn set_view(&mut self, center: Coordinates, zoom: u8);

    /// Add a marker and return its id
    fn add_marker(&mut self, position: Coordinates, label: &str) -> MarkerId;

    fn remove_marker(&mut self, marker: MarkerId);

    /// Change the popup text of an existing marker
    fn set_marker_label(&mut self, marker: MarkerId, label: &str);

    /// Show `layer`, hiding the other
    fn set_base_layer(&mut self, layer: BaseLayer);
}
