//! Address resolvers and fixtures for tests

use crate::coord::Coordinates;
use crate::location::authority::AddressResolver;
use crate::location::{AddressState, LocationSnapshot, LocationSource};
use tokio::sync::{mpsc, oneshot};

/// Resolves every coordinate to the same answer
pub struct FixedResolver {
    name: Option<String>,
}

impl FixedResolver {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
        }
    }

    /// Behaves like a provider that is down: always the coordinate label
    pub fn failing() -> Self {
        Self { name: None }
    }
}

impl AddressResolver for FixedResolver {
    async fn resolve_address(&self, coordinate: Coordinates) -> String {
        self.name.clone().unwrap_or_else(|| coordinate.label())
    }
}

pub type ResolveRequest = (Coordinates, oneshot::Sender<String>);

/// Hands every lookup to the test, which answers in whatever order it likes
pub struct ManualResolver {
    requests: mpsc::UnboundedSender<ResolveRequest>,
}

impl ManualResolver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResolveRequest>) {
        let (requests, rx) = mpsc::unbounded_channel();
        (Self { requests }, rx)
    }
}

impl AddressResolver for ManualResolver {
    async fn resolve_address(&self, coordinate: Coordinates) -> String {
        let (reply, answer) = oneshot::channel();
        if self.requests.send((coordinate, reply)).is_err() {
            return coordinate.label();
        }
        answer.await.unwrap_or_else(|_| coordinate.label())
    }
}

/// A confirmed search selection in Bandra
pub fn sample_snapshot() -> LocationSnapshot {
    LocationSnapshot {
        coordinate: Coordinates::new(19.0596, 72.8295),
        address: "Bandra West, Mumbai".to_string(),
        address_state: AddressState::Resolved,
        source: LocationSource::Search,
        accuracy: None,
        confirmed: true,
        generation: 3,
        updated_at: chrono::Utc::now(),
    }
}
