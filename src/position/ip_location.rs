//! IP-based position source
//!
//! Uses ip-api.com to place the device at city level. Fixes are cached on
//! disk and reused while younger than the request's `maximum_age`.

use crate::config::defaults::APP_DIR_NAME;
use crate::constants::api::{IP_API_URL, USER_AGENT};
use crate::constants::ip_location::{ACCURACY_METERS, CACHE_FILE};
use crate::coord::Coordinates;
use crate::position::{
    PermissionState, PlatformCapabilities, Position, PositionError, PositionErrorCode,
    PositionOptions, PositionSource,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// IP location service with caching
#[derive(Debug)]
pub struct IpLocator {
    client: reqwest::Client,
    endpoint: String,
    cache_path: Option<PathBuf>,
}

/// ip-api.com response
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

/// Cached position
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedPosition {
    position: Position,
}

impl IpLocator {
    /// Create an IP locator with the default cache path
    pub fn new() -> Self {
        let cache_path = dirs::cache_dir().map(|p| p.join(APP_DIR_NAME).join(CACHE_FILE));
        Self::build(IP_API_URL, cache_path)
    }

    /// Create an IP locator with a specific cache path
    pub fn with_cache_path(cache_path: PathBuf) -> Self {
        Self::build(IP_API_URL, Some(cache_path))
    }

    /// Create an IP locator without caching
    pub fn without_cache() -> Self {
        Self::build(IP_API_URL, None)
    }

    /// Point at a different endpoint
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    fn build(endpoint: &str, cache_path: Option<PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.to_string(),
            cache_path,
        }
    }

    /// Fetch a fresh position from ip-api.com
    async fn fetch_position(&self, options: &PositionOptions) -> Result<Position, PositionError> {
        let unavailable = |msg: String| PositionError::new(PositionErrorCode::PositionUnavailable, msg);

        let response = self
            .client
            .get(&self.endpoint)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PositionError::new(PositionErrorCode::Timeout, e.to_string())
                } else {
                    unavailable(format!("IP location request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(unavailable(format!(
                "IP location API returned status: {}",
                response.status()
            )));
        }

        let data: IpApiResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse IP location response: {}", e)))?;

        if data.status != "success" {
            return Err(unavailable(format!(
                "IP location lookup failed: {}",
                data.message.unwrap_or_else(|| data.status.clone())
            )));
        }

        let (Some(lat), Some(lng)) = (data.lat, data.lon) else {
            return Err(unavailable("No coordinates in IP location response".to_string()));
        };

        let coordinate = Coordinates::checked(lat, lng).map_err(|e| unavailable(e.to_string()))?;

        Ok(Position {
            coordinate,
            accuracy: ACCURACY_METERS,
            timestamp: Utc::now(),
        })
    }

    /// Load the cached position if it is no older than `options.maximum_age`
    fn load_cache(&self, options: &PositionOptions, now: DateTime<Utc>) -> Option<Position> {
        let cache_path = self.cache_path.as_ref()?;
        let content = fs::read_to_string(cache_path).ok()?;
        let cached: CachedPosition = serde_json::from_str(&content).ok()?;

        let age = now.signed_duration_since(cached.position.timestamp).to_std().ok()?;
        (age <= options.maximum_age).then_some(cached.position)
    }

    /// Save position to cache
    fn save_cache(&self, position: &Position) {
        let Some(cache_path) = &self.cache_path else {
            return;
        };

        if let Some(parent) = cache_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        let cached = CachedPosition {
            position: position.clone(),
        };

        if let Ok(content) = serde_json::to_string_pretty(&cached) {
            let _ = fs::write(cache_path, content);
        }
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        if let Some(cache_path) = &self.cache_path {
            let _ = fs::remove_file(cache_path);
        }
    }
}

impl Default for IpLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSource for IpLocator {
    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities {
            has_geolocation: true,
            has_permission_query: false,
        }
    }

    async fn permission_state(&self) -> PermissionState {
        PermissionState::Granted
    }

    async fn current_position(&self, options: &PositionOptions) -> Result<Position, PositionError> {
        if let Some(cached) = self.load_cache(options, Utc::now()) {
            debug!("Using cached IP position from {}", cached.timestamp);
            return Ok(cached);
        }

        let position = self.fetch_position(options).await?;
        self.save_cache(&position);
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn position_at(timestamp: DateTime<Utc>) -> Position {
        Position {
            coordinate: Coordinates::new(19.076, 72.8777),
            accuracy: ACCURACY_METERS,
            timestamp,
        }
    }

    #[test]
    fn test_ip_locator_creation() {
        let locator = IpLocator::new();
        assert!(locator.cache_path.is_some());
        assert!(!locator.capabilities().has_permission_query);
    }

    #[test]
    fn test_ip_locator_without_cache() {
        let locator = IpLocator::without_cache();
        assert!(locator.cache_path.is_none());
    }

    #[test]
    fn test_cache_honours_maximum_age() {
        let temp_dir = TempDir::new().unwrap();
        let locator = IpLocator::with_cache_path(temp_dir.path().join("cache.json"));
        let options = PositionOptions::default();
        let now = Utc::now();

        assert!(locator.load_cache(&options, now).is_none());

        locator.save_cache(&position_at(now - chrono::Duration::seconds(60)));
        let loaded = locator.load_cache(&options, now).unwrap();
        assert_eq!(loaded.coordinate, Coordinates::new(19.076, 72.8777));

        let strict = PositionOptions {
            maximum_age: Duration::from_secs(30),
            ..options
        };
        assert!(locator.load_cache(&strict, now).is_none());

        locator.clear_cache();
        assert!(locator.load_cache(&options, now).is_none());
    }

    #[test]
    fn test_cached_position_serialization() {
        let cached = CachedPosition {
            position: position_at(Utc::now()),
        };

        let json = serde_json::to_string(&cached).unwrap();
        let parsed: CachedPosition = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.position, cached.position);
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success", "lat": 18.5204, "lon": 73.8567, "city": "Pune"
            })))
            .mount(&server)
            .await;

        let locator = IpLocator::without_cache().with_endpoint(&server.uri());
        let position = locator
            .current_position(&PositionOptions::default())
            .await
            .unwrap();
        assert_eq!(position.coordinate, Coordinates::new(18.5204, 73.8567));
        assert_eq!(position.accuracy, ACCURACY_METERS);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "fail", "message": "reserved range"
            })))
            .mount(&server)
            .await;

        let locator = IpLocator::without_cache().with_endpoint(&server.uri());
        let error = locator
            .current_position(&PositionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error.code, PositionErrorCode::PositionUnavailable);
        assert!(error.message.contains("reserved range"));
    }
}
