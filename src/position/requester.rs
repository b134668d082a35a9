//! Geolocation requester
//!
//! Turns the platform's position capability into an awaitable request with
//! an enforced timeout, and every way it can fail into a [`GeolocationFailure`]
//! the user can act on.

use crate::error::Error;
use crate::location::{AddressResolver, AddressTask, LocationAuthority};
use crate::position::{
    PermissionState, PlatformCapabilities, Position, PositionError, PositionErrorCode,
    PositionOptions, PositionSource,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::timeout;
use tracing::{info, warn};

/// Why a position request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Unsupported,
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "unsupported"),
            Self::PermissionDenied => write!(f, "permission_denied"),
            Self::PositionUnavailable => write!(f, "position_unavailable"),
            Self::Timeout => write!(f, "timeout"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

const SEARCH_INSTEAD: &str = "Search for your address or click your roof on the map instead";

/// A failed position request, ready to show the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct GeolocationFailure {
    pub reason: FailureReason,
    pub message: String,
    /// Concrete things the user can do about it
    pub suggestions: Vec<String>,
}

impl GeolocationFailure {
    fn new(reason: FailureReason, message: &str, suggestions: &[&str]) -> Self {
        Self {
            reason,
            message: message.to_string(),
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The platform has no geolocation capability at all
    pub fn unsupported() -> Self {
        Self::new(
            FailureReason::Unsupported,
            "Location detection is not supported on this device or browser.",
            &[SEARCH_INSTEAD],
        )
    }

    /// A permission query reported access as blocked before asking
    pub fn permission_blocked() -> Self {
        Self::new(
            FailureReason::PermissionDenied,
            "Location access is blocked for this site.",
            &[
                "Enable location access in your browser settings, then reload the page",
                SEARCH_INSTEAD,
            ],
        )
    }

    pub fn timeout() -> Self {
        Self::new(
            FailureReason::Timeout,
            "Finding your location took too long.",
            &[
                "Try again; a first fix can take longer indoors",
                "Move closer to a window or connect to Wi-Fi",
                SEARCH_INSTEAD,
            ],
        )
    }

    /// Classify an error reported by the platform
    pub fn from_position_error(error: &PositionError) -> Self {
        match error.code {
            PositionErrorCode::PermissionDenied => Self::new(
                FailureReason::PermissionDenied,
                "Location permission was denied.",
                &[
                    "Enable location access in your browser settings, then try again",
                    "Choose \"Allow\" when your browser asks for your location",
                    SEARCH_INSTEAD,
                ],
            ),
            PositionErrorCode::PositionUnavailable => Self::new(
                FailureReason::PositionUnavailable,
                "Your location could not be determined.",
                &[
                    "Check that location services are turned on for your device",
                    "Check your network connection and try again",
                    SEARCH_INSTEAD,
                ],
            ),
            PositionErrorCode::Timeout => Self::timeout(),
            PositionErrorCode::Unknown => Self::new(
                FailureReason::Unknown,
                "Something went wrong while finding your location.",
                &["Try again in a moment", SEARCH_INSTEAD],
            ),
        }
    }
}

impl From<GeolocationFailure> for Error {
    fn from(failure: GeolocationFailure) -> Self {
        Error::Geolocation(failure.message)
    }
}

/// Requests the device position and reports fixes to the authority
#[derive(Debug)]
pub struct GeolocationRequester<P> {
    source: P,
    capabilities: PlatformCapabilities,
    options: PositionOptions,
}

impl<P: PositionSource> GeolocationRequester<P> {
    /// Wrap a position source, detecting its capabilities once
    pub fn new(source: P, options: PositionOptions) -> Self {
        let capabilities = source.capabilities();
        Self {
            source,
            capabilities,
            options,
        }
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    pub fn options(&self) -> &PositionOptions {
        &self.options
    }

    /// Ask the platform for the current position
    ///
    /// Fails without asking when geolocation is missing or a permission
    /// query says access is denied. The platform call is raced against the
    /// configured timeout.
    pub async fn request(&self) -> Result<Position, GeolocationFailure> {
        if !self.capabilities.has_geolocation {
            warn!("Geolocation requested on a platform without it");
            return Err(GeolocationFailure::unsupported());
        }

        if self.capabilities.has_permission_query
            && self.source.permission_state().await == PermissionState::Denied
        {
            warn!("Geolocation permission is denied; not requesting a position");
            return Err(GeolocationFailure::permission_blocked());
        }

        match timeout(self.options.timeout, self.source.current_position(&self.options)).await {
            Ok(Ok(position)) => {
                if let Err(e) = position.coordinate.validate() {
                    warn!("Platform returned an unusable position: {}", e);
                    return Err(GeolocationFailure::from_position_error(&PositionError::new(
                        PositionErrorCode::PositionUnavailable,
                        e.to_string(),
                    )));
                }
                Ok(position)
            }
            Ok(Err(error)) => {
                warn!("Geolocation failed ({:?}): {}", error.code, error.message);
                Err(GeolocationFailure::from_position_error(&error))
            }
            Err(_) => {
                warn!("Geolocation timed out after {:?}", self.options.timeout);
                Err(GeolocationFailure::timeout())
            }
        }
    }

    /// Request a position and apply it to the authority
    ///
    /// On failure the authority is left untouched. If a click, a search
    /// selection or a newer position request supersedes this one while the
    /// platform is still working, the fix is dropped and `Ok(None)` is
    /// returned.
    pub async fn locate<R: AddressResolver + 'static>(
        &self,
        authority: &LocationAuthority<R>,
    ) -> Result<Option<(Position, AddressTask)>, GeolocationFailure> {
        let ticket = authority.begin_position_request();
        let position = self.request().await?;

        let Some(task) =
            authority.apply_gps_result_for(ticket, position.coordinate, position.accuracy)
        else {
            info!(
                "Device located at {} after the location moved on; ignoring",
                position.coordinate
            );
            return Ok(None);
        };
        info!(
            "Device located at {} (±{:.0} m)",
            position.coordinate, position.accuracy
        );
        Ok(Some((position, task)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinates;
    use crate::location::testing::FixedResolver;
    use crate::location::{LocationSnapshot, LocationSource};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    enum Outcome {
        Fix(Coordinates, f64),
        /// Answers with a fix after a delay
        Slow(Coordinates, Duration),
        Fails(u16),
        Hangs,
    }

    struct FakeSource {
        capabilities: PlatformCapabilities,
        permission: PermissionState,
        outcome: Outcome,
        requests: Arc<AtomicUsize>,
        seen_options: Arc<Mutex<Option<PositionOptions>>>,
    }

    impl FakeSource {
        fn new(outcome: Outcome) -> Self {
            Self {
                capabilities: PlatformCapabilities {
                    has_geolocation: true,
                    has_permission_query: true,
                },
                permission: PermissionState::Prompt,
                outcome,
                requests: Arc::new(AtomicUsize::new(0)),
                seen_options: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl PositionSource for FakeSource {
        fn capabilities(&self) -> PlatformCapabilities {
            self.capabilities
        }

        async fn permission_state(&self) -> PermissionState {
            self.permission
        }

        async fn current_position(
            &self,
            options: &PositionOptions,
        ) -> Result<Position, PositionError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            *self.seen_options.lock().unwrap() = Some(*options);
            match self.outcome {
                Outcome::Fix(coordinate, accuracy) => Ok(Position {
                    coordinate,
                    accuracy,
                    timestamp: Utc::now(),
                }),
                Outcome::Slow(coordinate, delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(Position {
                        coordinate,
                        accuracy: 30.0,
                        timestamp: Utc::now(),
                    })
                }
                Outcome::Fails(code) => Err(PositionError::new(
                    PositionErrorCode::from_code(code),
                    "platform said no",
                )),
                Outcome::Hangs => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(PositionError::new(PositionErrorCode::Unknown, "never"))
                }
            }
        }
    }

    fn authority() -> LocationAuthority<FixedResolver> {
        LocationAuthority::new(
            Arc::new(FixedResolver::named("Andheri East, Mumbai")),
            LocationSnapshot::initial(Coordinates::new(19.076, 72.8777), "Mumbai, Maharashtra"),
        )
    }

    #[tokio::test]
    async fn test_unsupported_fails_without_request() {
        let mut source = FakeSource::new(Outcome::Fix(Coordinates::new(19.1, 72.9), 10.0));
        source.capabilities.has_geolocation = false;
        let requests = Arc::clone(&source.requests);
        let requester = GeolocationRequester::new(source, PositionOptions::default());

        let failure = requester.request().await.unwrap_err();
        assert_eq!(failure.reason, FailureReason::Unsupported);
        assert!(!failure.suggestions.is_empty());
        assert_eq!(requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blocked_permission_skips_request() {
        let mut source = FakeSource::new(Outcome::Fix(Coordinates::new(19.1, 72.9), 10.0));
        source.permission = PermissionState::Denied;
        let requests = Arc::clone(&source.requests);
        let requester = GeolocationRequester::new(source, PositionOptions::default());
        let authority = authority();
        let before = authority.snapshot();

        let failure = requester.locate(&authority).await.unwrap_err();
        assert_eq!(failure.reason, FailureReason::PermissionDenied);
        assert!(failure.suggestions[0].contains("browser settings"));
        assert_eq!(requests.load(Ordering::SeqCst), 0);
        assert_eq!(authority.snapshot(), before);
    }

    #[tokio::test]
    async fn test_denied_without_permission_query() {
        let mut source = FakeSource::new(Outcome::Fails(1));
        source.capabilities.has_permission_query = false;
        source.permission = PermissionState::Denied;
        let requests = Arc::clone(&source.requests);
        let requester = GeolocationRequester::new(source, PositionOptions::default());
        let authority = authority();

        let failure = requester.locate(&authority).await.unwrap_err();
        assert_eq!(failure.reason, FailureReason::PermissionDenied);
        assert!(failure.message.contains("denied"));
        assert_eq!(requests.load(Ordering::SeqCst), 1);
        assert_eq!(authority.snapshot().source, LocationSource::Default);
    }

    #[tokio::test]
    async fn test_every_platform_error_has_guidance() {
        for (code, reason) in [
            (1, FailureReason::PermissionDenied),
            (2, FailureReason::PositionUnavailable),
            (3, FailureReason::Timeout),
            (9, FailureReason::Unknown),
        ] {
            let requester =
                GeolocationRequester::new(FakeSource::new(Outcome::Fails(code)), PositionOptions::default());
            let failure = requester.request().await.unwrap_err();
            assert_eq!(failure.reason, reason);
            assert!(!failure.message.is_empty());
            assert!(!failure.suggestions.is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_enforced() {
        let requester =
            GeolocationRequester::new(FakeSource::new(Outcome::Hangs), PositionOptions::default());
        let failure = requester.request().await.unwrap_err();
        assert_eq!(failure.reason, FailureReason::Timeout);
    }

    #[tokio::test]
    async fn test_success_applies_unconfirmed_gps() {
        let source = FakeSource::new(Outcome::Fix(Coordinates::new(19.1136, 72.8697), 18.0));
        let seen = Arc::clone(&source.seen_options);
        let requester = GeolocationRequester::new(source, PositionOptions::default());
        let authority = authority();

        let (position, task) = requester.locate(&authority).await.unwrap().unwrap();
        assert_eq!(position.accuracy, 18.0);
        assert!(task.await.unwrap());

        let snapshot = authority.snapshot();
        assert_eq!(snapshot.source, LocationSource::Gps);
        assert_eq!(snapshot.accuracy, Some(18.0));
        assert!(!snapshot.confirmed);
        assert_eq!(snapshot.address, "Andheri East, Mumbai");

        let options = seen.lock().unwrap().unwrap();
        assert!(options.enable_high_accuracy);
        assert_eq!(options.maximum_age, Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_during_request_wins_over_late_fix() {
        let source = FakeSource::new(Outcome::Slow(
            Coordinates::new(19.1, 72.9),
            Duration::from_millis(200),
        ));
        let requester = Arc::new(GeolocationRequester::new(source, PositionOptions::default()));
        let authority = authority();

        let pending = tokio::spawn({
            let requester = Arc::clone(&requester);
            let authority = authority.clone();
            async move { requester.locate(&authority).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let clicked = Coordinates::new(19.0178, 72.8478);
        let click_task = authority.apply_map_click(clicked);

        assert!(pending.await.unwrap().unwrap().is_none());
        let snapshot = authority.snapshot();
        assert_eq!(snapshot.source, LocationSource::Click);
        assert_eq!(snapshot.coordinate, clicked);
        assert!(snapshot.confirmed);
        assert!(click_task.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_request_supersedes_older() {
        let source = FakeSource::new(Outcome::Slow(
            Coordinates::new(19.1, 72.9),
            Duration::from_millis(200),
        ));
        let requester = Arc::new(GeolocationRequester::new(source, PositionOptions::default()));
        let authority = authority();

        let spawn_locate = || {
            let requester = Arc::clone(&requester);
            let authority = authority.clone();
            tokio::spawn(async move { requester.locate(&authority).await })
        };

        let first = spawn_locate();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = spawn_locate();

        assert!(first.await.unwrap().unwrap().is_none());
        let (_, task) = second.await.unwrap().unwrap().unwrap();
        assert!(task.await.unwrap());
        assert_eq!(authority.snapshot().source, LocationSource::Gps);
        assert_eq!(authority.snapshot().generation, 1);
    }

    #[tokio::test]
    async fn test_invalid_fix_is_unavailable() {
        let requester = GeolocationRequester::new(
            FakeSource::new(Outcome::Fix(Coordinates::new(123.0, 72.0), 5.0)),
            PositionOptions::default(),
        );
        let failure = requester.request().await.unwrap_err();
        assert_eq!(failure.reason, FailureReason::PositionUnavailable);
    }

    #[test]
    fn test_failure_into_error() {
        let err: Error = GeolocationFailure::unsupported().into();
        assert!(matches!(err, Error::Geolocation(_)));
    }
}
