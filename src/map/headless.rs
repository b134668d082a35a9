//! Headless map widget
//!
//! Applies the adapter's drawing operations to a plain state value and
//! publishes it, for clients that render the map themselves (the HTTP API
//! serves it to the browser).

use crate::coord::Coordinates;
use crate::map::{BaseLayer, MapWidget, MarkerId};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// A marker as drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerView {
    pub id: MarkerId,
    pub position: Coordinates,
    pub label: String,
}

/// Everything a renderer needs to draw the map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapViewState {
    pub center: Option<Coordinates>,
    pub zoom: Option<u8>,
    /// None until the widget has been initialised
    pub layer: Option<BaseLayer>,
    pub tile_url: Option<String>,
    pub attribution: Option<String>,
    pub markers: Vec<MarkerView>,
}

/// A [`MapWidget`] backed by a published [`MapViewState`]
#[derive(Debug)]
pub struct HeadlessMap {
    state: watch::Sender<MapViewState>,
}

impl HeadlessMap {
    /// Create the widget and a receiver for its state
    pub fn new() -> (Self, watch::Receiver<MapViewState>) {
        let (state, rx) = watch::channel(MapViewState::default());
        (Self { state }, rx)
    }

    pub fn state(&self) -> MapViewState {
        self.state.borrow().clone()
    }
}

impl MapWidget for HeadlessMap {
    fn set_view(&mut self, center: Coordinates, zoom: u8) {
        self.state.send_modify(|s| {
            s.center = Some(center);
            s.zoom = Some(zoom);
        });
    }

    fn add_marker(&mut self, position: Coordinates, label: &str) -> MarkerId {
        let id = MarkerId::new();
        self.state.send_modify(|s| {
            s.markers.push(MarkerView {
                id,
                position,
                label: label.to_string(),
            });
        });
        id
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        self.state.send_if_modified(|s| {
            let before = s.markers.len();
            s.markers.retain(|m| m.id != marker);
            s.markers.len() != before
        });
    }

    fn set_marker_label(&mut self, marker: MarkerId, label: &str) {
        self.state.send_if_modified(|s| {
            match s.markers.iter_mut().find(|m| m.id == marker) {
                Some(m) if m.label != label => {
                    m.label = label.to_string();
                    true
                }
                _ => false,
            }
        });
    }

    fn set_base_layer(&mut self, layer: BaseLayer) {
        self.state.send_modify(|s| {
            s.layer = Some(layer);
            s.tile_url = Some(layer.tile_url().to_string());
            s.attribution = Some(layer.attribution().to_string());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_lifecycle() {
        let (mut map, rx) = HeadlessMap::new();
        let coords = Coordinates::new(19.076, 72.8777);

        let id = map.add_marker(coords, "19.076000, 72.877700");
        map.set_marker_label(id, "Mumbai");
        assert_eq!(rx.borrow().markers[0].label, "Mumbai");

        map.remove_marker(id);
        assert!(map.state().markers.is_empty());
    }

    #[test]
    fn test_layer_and_view() {
        let (mut map, _rx) = HeadlessMap::new();
        assert!(map.state().layer.is_none());

        map.set_base_layer(BaseLayer::Street);
        map.set_view(Coordinates::new(18.52, 73.85), 15);

        let state = map.state();
        assert_eq!(state.layer, Some(BaseLayer::Street));
        assert!(state.tile_url.unwrap().contains("openstreetmap"));
        assert_eq!(state.zoom, Some(15));
    }
}
