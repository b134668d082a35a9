//! Server shared state
//!
//! One location session per server: the authority, the search box and the
//! map view all share it.

use crate::analysis::AnalysisClient;
use crate::config::Config;
use crate::error::Result;
use crate::geo::nominatim::NominatimBackend;
use crate::geo::GeocodingClient;
use crate::location::{LocationAuthority, LocationSnapshot};
use crate::map::{HeadlessMap, MapViewAdapter, MapViewHandle, MapViewState};
use crate::position::{GeolocationRequester, IpLocator};
use crate::search::SearchBox;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};

/// Geocoder used by the server
pub type Geocoder = GeocodingClient<NominatimBackend>;

/// Shared state for the HTTP server
pub struct AppState {
    /// Configuration
    pub config: Config,

    pub authority: LocationAuthority<Geocoder>,

    pub geocoder: Arc<Geocoder>,

    pub search: Mutex<SearchBox<NominatimBackend>>,

    pub map: MapViewHandle<HeadlessMap>,

    map_state: watch::Receiver<MapViewState>,

    pub geolocation: GeolocationRequester<IpLocator>,

    pub analysis: AnalysisClient,

    started: Instant,
}

impl AppState {
    /// Create new application state
    ///
    /// Must be called inside a tokio runtime; the map view runs as a task.
    pub async fn new(config: Config) -> Result<Self> {
        Self::with_locator(config, IpLocator::new()).await
    }

    /// Create state with a specific IP locator
    pub async fn with_locator(config: Config, locator: IpLocator) -> Result<Self> {
        let geocoder = Arc::new(GeocodingClient::from_config(&config));
        let (coordinate, address) = config.default_location()?;
        let authority = LocationAuthority::new(
            Arc::clone(&geocoder),
            LocationSnapshot::initial(coordinate, address),
        );

        let adapter: MapViewAdapter<HeadlessMap> =
            MapViewAdapter::new(config.default_layer()?, config.map.zoom);
        let (map, _task) = adapter.spawn(authority.clone());
        let (widget, map_state) = HeadlessMap::new();
        map.ready(widget).await?;

        let search = SearchBox::new(Arc::clone(&geocoder), config.debounce());
        let geolocation = GeolocationRequester::new(locator, config.position_options());
        let analysis = AnalysisClient::from_config(&config);

        Ok(Self {
            config,
            authority,
            geocoder,
            search: Mutex::new(search),
            map,
            map_state,
            geolocation,
            analysis,
            started: Instant::now(),
        })
    }

    /// What the map currently shows
    pub fn map_state(&self) -> MapViewState {
        self.map_state.borrow().clone()
    }

    /// Receiver for map changes
    pub fn map_updates(&self) -> watch::Receiver<MapViewState> {
        self.map_state.clone()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
