//! Map view adapter
//!
//! Keeps a [`MapWidget`] consistent with the location authority: camera on
//! the current coordinate, exactly one marker labelled with the current
//! address. Clicks on the map go to the authority, which decides what they
//! mean.
//!
//! Widgets often finish loading after the first snapshot exists, so the
//! adapter remembers the latest snapshot and renders it once attached.

use crate::coord::Coordinates;
use crate::error::{Error, Result};
use crate::location::{AddressResolver, AddressTask, LocationAuthority, LocationSnapshot};
use crate::map::{BaseLayer, MapWidget, MarkerId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

const EVENT_BUFFER: usize = 64;

/// Keeps one map widget in step with the location authority
#[derive(Debug)]
pub struct MapViewAdapter<W> {
    widget: Option<W>,
    marker: Option<MarkerId>,
    layer: BaseLayer,
    zoom: u8,
    latest: Option<LocationSnapshot>,
    /// Generation the current marker was drawn for; None for a provisional marker
    rendered_generation: Option<u64>,
}

impl<W: MapWidget> MapViewAdapter<W> {
    /// Create an adapter with no widget attached yet
    pub fn new(layer: BaseLayer, zoom: u8) -> Self {
        Self {
            widget: None,
            marker: None,
            layer,
            zoom,
            latest: None,
            rendered_generation: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.widget.is_some()
    }

    pub fn layer(&self) -> BaseLayer {
        self.layer
    }

    pub fn widget(&self) -> Option<&W> {
        self.widget.as_ref()
    }

    /// The widget finished loading
    ///
    /// Applies the chosen base layer and the latest known snapshot.
    pub fn attach(&mut self, mut widget: W) {
        widget.set_base_layer(self.layer);
        self.widget = Some(widget);
        self.marker = None;
        self.rendered_generation = None;
        self.render();
    }

    /// Tear down, removing the marker and handing the widget back
    pub fn detach(&mut self) -> Option<W> {
        let mut widget = self.widget.take()?;
        if let Some(marker) = self.marker.take() {
            widget.remove_marker(marker);
        }
        self.rendered_generation = None;
        Some(widget)
    }

    /// The authority published a new snapshot
    pub fn on_snapshot(&mut self, snapshot: LocationSnapshot) {
        self.latest = Some(snapshot);
        self.render();
    }

    /// The user clicked the map surface
    ///
    /// A provisional marker goes down at once; the authority is then told
    /// about the click and its snapshot replaces the provisional marker.
    pub fn handle_click<R: AddressResolver + 'static>(
        &mut self,
        coordinate: Coordinates,
        authority: &LocationAuthority<R>,
    ) -> AddressTask {
        if let Some(widget) = self.widget.as_mut() {
            if let Some(old) = self.marker.take() {
                widget.remove_marker(old);
            }
            self.marker = Some(widget.add_marker(coordinate, &coordinate.label()));
            self.rendered_generation = None;
        }
        authority.apply_map_click(coordinate)
    }

    /// Switch between satellite and street tiles
    pub fn set_base_layer(&mut self, layer: BaseLayer) {
        self.layer = layer;
        if let Some(widget) = self.widget.as_mut() {
            widget.set_base_layer(layer);
        }
    }

    fn render(&mut self) {
        let (Some(widget), Some(snapshot)) = (self.widget.as_mut(), self.latest.as_ref()) else {
            return;
        };

        match self.marker {
            Some(marker) if self.rendered_generation == Some(snapshot.generation) => {
                widget.set_marker_label(marker, &snapshot.address);
            }
            _ => {
                widget.set_view(snapshot.coordinate, self.zoom);
                if let Some(old) = self.marker.take() {
                    widget.remove_marker(old);
                }
                self.marker = Some(widget.add_marker(snapshot.coordinate, &snapshot.address));
                self.rendered_generation = Some(snapshot.generation);
                debug!(
                    "Map recentered on {} (generation {})",
                    snapshot.coordinate, snapshot.generation
                );
            }
        }
    }
}

/// Input to a running map view
#[derive(Debug)]
pub enum MapEvent<W> {
    /// The widget finished loading
    Ready(W),
    Click(Coordinates),
    SetLayer(BaseLayer),
}

/// Sends events to a spawned [`MapViewAdapter`]
#[derive(Debug)]
pub struct MapViewHandle<W> {
    events: mpsc::Sender<MapEvent<W>>,
}

impl<W> Clone for MapViewHandle<W> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
        }
    }
}

impl<W> MapViewHandle<W> {
    pub async fn ready(&self, widget: W) -> Result<()> {
        self.send(MapEvent::Ready(widget)).await
    }

    pub async fn click(&self, coordinate: Coordinates) -> Result<()> {
        self.send(MapEvent::Click(coordinate)).await
    }

    pub async fn set_layer(&self, layer: BaseLayer) -> Result<()> {
        self.send(MapEvent::SetLayer(layer)).await
    }

    async fn send(&self, event: MapEvent<W>) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| Error::Server("Map view is no longer running".to_string()))
    }
}

impl<W: MapWidget + 'static> MapViewAdapter<W> {
    /// Run the adapter on its own task
    ///
    /// The task ends, returning the adapter, once every handle is dropped.
    pub fn spawn<R: AddressResolver + 'static>(
        self,
        authority: LocationAuthority<R>,
    ) -> (MapViewHandle<W>, JoinHandle<Self>) {
        let (events, rx) = mpsc::channel(EVENT_BUFFER);
        let task = tokio::spawn(self.run(authority, rx));
        (MapViewHandle { events }, task)
    }

    /// Drive the adapter from snapshot changes and map events
    ///
    /// Pending snapshot changes are always drawn before the next event is
    /// handled.
    pub async fn run<R: AddressResolver + 'static>(
        mut self,
        authority: LocationAuthority<R>,
        mut events: mpsc::Receiver<MapEvent<W>>,
    ) -> Self {
        let mut snapshots = authority.subscribe();
        let initial = snapshots.borrow_and_update().clone();
        self.on_snapshot(initial);

        loop {
            tokio::select! {
                biased;
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    self.on_snapshot(snapshot);
                }
                event = events.recv() => match event {
                    Some(MapEvent::Ready(widget)) => self.attach(widget),
                    Some(MapEvent::Click(coordinate)) => {
                        // Address resolution continues detached
                        drop(self.handle_click(coordinate, &authority));
                    }
                    Some(MapEvent::SetLayer(layer)) => self.set_base_layer(layer),
                    None => break,
                },
            }
        }

        self
    }
}
