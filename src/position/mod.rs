//! Device position
//!
//! [`PositionSource`] is the platform capability that reports where the
//! device is. [`requester::GeolocationRequester`] wraps it, classifies its
//! failures and feeds fixes into the location authority.

pub mod ip_location;
pub mod requester;

pub use ip_location::IpLocator;
pub use requester::{FailureReason, GeolocationFailure, GeolocationRequester};

use crate::coord::Coordinates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// A position fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coordinate: Coordinates,
    /// Accuracy radius in meters
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

/// Options for a position request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the source may return instead of measuring again
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        use crate::config::defaults::*;
        Self {
            enable_high_accuracy: DEFAULT_HIGH_ACCURACY,
            timeout: Duration::from_secs(DEFAULT_GEOLOCATION_TIMEOUT_SECS),
            maximum_age: Duration::from_secs(DEFAULT_MAXIMUM_AGE_SECS),
        }
    }
}

/// Permission state as reported by a permission query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Prompt,
    Denied,
}

/// What a platform can do, detected once at start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCapabilities {
    pub has_geolocation: bool,
    pub has_permission_query: bool,
}

/// Platform error codes for failed position requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown,
}

impl PositionErrorCode {
    /// Map the numeric codes used by browser geolocation (1, 2, 3)
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            2 => Self::PositionUnavailable,
            3 => Self::Timeout,
            _ => Self::Unknown,
        }
    }
}

/// A failed position request as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionError {
    pub code: PositionErrorCode,
    /// Platform detail, for logs only
    pub message: String,
}

impl PositionError {
    pub fn new(code: PositionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Platform capability for obtaining the device's position
pub trait PositionSource: Send + Sync {
    fn capabilities(&self) -> PlatformCapabilities;

    /// Current permission state
    ///
    /// Only called when `capabilities().has_permission_query` is true.
    fn permission_state(&self) -> impl Future<Output = PermissionState> + Send;

    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = std::result::Result<Position, PositionError>> + Send;
}
