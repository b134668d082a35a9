//! Location authority
//!
//! Single owner of the live [`LocationSnapshot`]. Every mutation is an atomic
//! replace on a `watch` channel, so subscribers only ever see complete
//! snapshots and always the latest one.
//!
//! Reverse lookups triggered by GPS fixes and map clicks run as spawned tasks
//! tagged with the generation they were issued for. When a later event has
//! moved the location on, the late result is dropped.

use crate::coord::Coordinates;
use crate::error::Result;
use crate::location::{AddressState, AnalysisTarget, LocationSnapshot, LocationSource};
use chrono::Utc;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Turns a coordinate into display text
///
/// Implementations must not fail: when no name is available they return a
/// fallback label.
pub trait AddressResolver: Send + Sync {
    fn resolve_address(&self, coordinate: Coordinates) -> impl Future<Output = String> + Send;
}

/// Handle to a pending address resolution
///
/// Resolves to `true` if the address was applied, `false` if it arrived
/// after the location had already moved on.
pub type AddressTask = JoinHandle<bool>;

/// A position request in flight
///
/// Its fix may only be applied while the location is still at `generation`
/// and no later position request has been started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionTicket {
    generation: u64,
    request: u64,
}

struct Inner<R> {
    state: watch::Sender<LocationSnapshot>,
    resolver: Arc<R>,
    position_requests: AtomicU64,
}

/// Owner of the current location snapshot
///
/// Cloning yields another handle to the same state.
pub struct LocationAuthority<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for LocationAuthority<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: AddressResolver + 'static> LocationAuthority<R> {
    /// Create an authority seeded with the pre-interaction snapshot
    pub fn new(resolver: Arc<R>, initial: LocationSnapshot) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                state,
                resolver,
                position_requests: AtomicU64::new(0),
            }),
        }
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> LocationSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<LocationSnapshot> {
        self.inner.state.subscribe()
    }

    /// Apply a device position fix
    ///
    /// The snapshot is unconfirmed until [`confirm`](Self::confirm) is called.
    /// The address shows the formatted coordinate until the returned task
    /// resolves it.
    pub fn apply_gps_result(&self, coordinate: Coordinates, accuracy_meters: f64) -> AddressTask {
        let accuracy = gps_accuracy(accuracy_meters);
        let generation = self.replace(coordinate, LocationSource::Gps, accuracy, false, None);
        info!(
            "GPS fix at {} (±{:.0} m), awaiting confirmation",
            coordinate, accuracy_meters
        );
        self.spawn_resolution(generation, coordinate)
    }

    /// Start a position request
    ///
    /// Any earlier request that has not been applied yet is superseded.
    pub fn begin_position_request(&self) -> PositionTicket {
        PositionTicket {
            generation: self.inner.state.borrow().generation,
            request: self.inner.position_requests.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    /// Apply the fix for `ticket`, unless something has superseded it
    ///
    /// Returns `None` when the location moved on (click, search selection,
    /// another fix) or a newer position request was started meanwhile.
    pub fn apply_gps_result_for(
        &self,
        ticket: PositionTicket,
        coordinate: Coordinates,
        accuracy_meters: f64,
    ) -> Option<AddressTask> {
        let mut installed = None;
        self.inner.state.send_if_modified(|snapshot| {
            let latest = self.inner.position_requests.load(Ordering::SeqCst);
            if snapshot.generation != ticket.generation || ticket.request != latest {
                debug!(
                    "Discarding GPS fix at {} (generation {}, current {}; request {}, latest {})",
                    coordinate, ticket.generation, snapshot.generation, ticket.request, latest
                );
                return false;
            }
            *snapshot = next_snapshot(
                snapshot.generation + 1,
                coordinate,
                LocationSource::Gps,
                gps_accuracy(accuracy_meters),
                false,
                None,
            );
            installed = Some(snapshot.generation);
            true
        });

        let generation = installed?;
        info!(
            "GPS fix at {} (±{:.0} m), awaiting confirmation",
            coordinate, accuracy_meters
        );
        Some(self.spawn_resolution(generation, coordinate))
    }

    /// Apply a selected search candidate
    ///
    /// Selecting a concrete candidate is itself confirmation, and the name
    /// came with the candidate so no lookup is needed.
    pub fn apply_search_selection(&self, coordinate: Coordinates, address: impl Into<String>) {
        let address = address.into();
        info!("Search selection at {}: {}", coordinate, address);
        self.replace(coordinate, LocationSource::Search, None, true, Some(address));
    }

    /// Apply a click on the map
    ///
    /// A deliberate tap is self-confirming. The address shows the formatted
    /// coordinate until the returned task resolves it.
    pub fn apply_map_click(&self, coordinate: Coordinates) -> AddressTask {
        let generation = self.replace(coordinate, LocationSource::Click, None, true, None);
        info!("Map click at {}", coordinate);
        self.spawn_resolution(generation, coordinate)
    }

    /// Mark the current location as confirmed
    ///
    /// Idempotent. Returns whether anything changed; the default location
    /// cannot be confirmed.
    pub fn confirm(&self) -> bool {
        self.inner.state.send_if_modified(|snapshot| {
            if snapshot.source == LocationSource::Default || snapshot.confirmed {
                return false;
            }
            snapshot.confirmed = true;
            snapshot.updated_at = Utc::now();
            info!("Location confirmed at {}", snapshot.coordinate);
            true
        })
    }

    /// The confirmation gate for the downstream analysis
    pub fn analysis_target(&self) -> Result<AnalysisTarget> {
        AnalysisTarget::try_from(&*self.inner.state.borrow())
    }

    /// Apply a resolved address if the location has not moved on
    ///
    /// Both the generation and the coordinate must still match the live
    /// snapshot, otherwise the address is discarded.
    pub fn fulfil_address(
        &self,
        generation: u64,
        coordinate: Coordinates,
        address: impl Into<String>,
    ) -> bool {
        let address = address.into();
        self.inner.state.send_if_modified(|snapshot| {
            if snapshot.generation != generation
                || snapshot.coordinate != coordinate
                || snapshot.address_state != AddressState::Provisional
            {
                debug!(
                    "Discarding stale address for {} (generation {}, current {})",
                    coordinate, generation, snapshot.generation
                );
                return false;
            }
            snapshot.address = address;
            snapshot.address_state = AddressState::Resolved;
            snapshot.updated_at = Utc::now();
            true
        })
    }

    /// Atomically install a new snapshot, returning its generation
    fn replace(
        &self,
        coordinate: Coordinates,
        source: LocationSource,
        accuracy: Option<f64>,
        confirmed: bool,
        address: Option<String>,
    ) -> u64 {
        let mut generation = 0;
        self.inner.state.send_modify(|snapshot| {
            generation = snapshot.generation + 1;
            *snapshot = next_snapshot(generation, coordinate, source, accuracy, confirmed, address);
        });
        generation
    }

    fn spawn_resolution(&self, generation: u64, coordinate: Coordinates) -> AddressTask {
        let authority = self.clone();
        tokio::spawn(async move {
            let address = authority.inner.resolver.resolve_address(coordinate).await;
            authority.fulfil_address(generation, coordinate, address)
        })
    }
}

fn gps_accuracy(meters: f64) -> Option<f64> {
    Some(meters).filter(|a| a.is_finite() && *a >= 0.0)
}

/// Snapshot for a coordinate-changing event
///
/// Without an address the formatted coordinate stands in until a lookup
/// resolves it.
fn next_snapshot(
    generation: u64,
    coordinate: Coordinates,
    source: LocationSource,
    accuracy: Option<f64>,
    confirmed: bool,
    address: Option<String>,
) -> LocationSnapshot {
    let (address, address_state) = match address {
        Some(text) => (text, AddressState::Resolved),
        None => (coordinate.label(), AddressState::Provisional),
    };
    LocationSnapshot {
        coordinate,
        address,
        address_state,
        source,
        accuracy: if source == LocationSource::Gps { accuracy } else { None },
        confirmed,
        generation,
        updated_at: Utc::now(),
    }
}
