//! Nominatim geocoding backend (OpenStreetMap)
//!
//! Uses the free Nominatim API for forward search and reverse lookup.
//! Rate limit: 1 request per second, and a User-Agent is mandatory.

use crate::constants::api::{NOMINATIM_URL, USER_AGENT};
use crate::constants::geocoding::REVERSE_ZOOM;
use crate::coord::Coordinates;
use crate::error::{Error, Result};
use crate::geo::{GeoBackend, SearchCandidate};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Nominatim geocoding backend
#[derive(Debug, Clone)]
pub struct NominatimBackend {
    client: reqwest::Client,
    base_url: String,
    country_codes: String,
}

/// Nominatim search response item
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    place_id: Option<serde_json::Value>,
}

/// Nominatim reverse response
///
/// Unresolvable points come back as `{"error": "Unable to geocode"}` with a 200.
#[derive(Debug, Deserialize)]
struct NominatimReverse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl NominatimBackend {
    /// Create a backend against the public Nominatim instance
    pub fn new() -> Self {
        Self::with_base_url(NOMINATIM_URL, Duration::from_secs(10), "")
    }

    /// Create a backend against a specific instance
    ///
    /// `country_codes` restricts forward search; empty means worldwide.
    pub fn with_base_url(base_url: &str, timeout: Duration, country_codes: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            country_codes: country_codes.trim().to_string(),
        }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self, query: &str, limit: usize) -> String {
        let mut url = format!(
            "{}/search?q={}&format=json&limit={}&addressdetails=1",
            self.base_url,
            urlencoding::encode(query),
            limit
        );
        if !self.country_codes.is_empty() {
            url.push_str("&countrycodes=");
            url.push_str(&urlencoding::encode(&self.country_codes));
        }
        url
    }

    fn reverse_url(&self, coordinate: Coordinates) -> String {
        format!(
            "{}/reverse?lat={}&lon={}&format=json&zoom={}&addressdetails=1",
            self.base_url, coordinate.lat, coordinate.lng, REVERSE_ZOOM
        )
    }

    /// Parse lat/lng strings to validated coordinates
    fn parse_coords(lat: &str, lng: &str) -> Result<Coordinates> {
        let lat: f64 = lat
            .parse()
            .map_err(|_| Error::Geocoding(format!("Invalid latitude: {}", lat)))?;
        let lng: f64 = lng
            .parse()
            .map_err(|_| Error::Geocoding(format!("Invalid longitude: {}", lng)))?;
        Coordinates::checked(lat, lng)
    }

    /// Turn a raw search body into candidates
    ///
    /// A body that is not a JSON array counts as zero results; items with
    /// missing fields or unusable coordinates are skipped.
    fn parse_search_body(body: &str) -> Vec<SearchCandidate> {
        let items: Vec<serde_json::Value> = match serde_json::from_str(body) {
            Ok(items) => items,
            Err(e) => {
                warn!("Malformed Nominatim search response: {}", e);
                return Vec::new();
            }
        };

        items
            .into_iter()
            .filter_map(|item| {
                let place: NominatimPlace = serde_json::from_value(item).ok()?;
                let coordinate = match Self::parse_coords(&place.lat, &place.lon) {
                    Ok(c) => c,
                    Err(e) => {
                        debug!("Skipping search result: {}", e);
                        return None;
                    }
                };
                let id = match place.place_id {
                    Some(serde_json::Value::Number(n)) => n.to_string(),
                    Some(serde_json::Value::String(s)) if !s.is_empty() => s,
                    _ => coordinate.label(),
                };
                Some(SearchCandidate {
                    id,
                    display_name: place.display_name,
                    coordinate,
                })
            })
            .collect()
    }

    fn request_error(e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(format!("Nominatim request timed out: {}", e))
        } else {
            Error::Geocoding(format!("Nominatim request failed: {}", e))
        }
    }
}

impl Default for NominatimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoBackend for NominatimBackend {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
        let response = self
            .client
            .get(self.search_url(query, limit))
            .send()
            .await
            .map_err(Self::request_error)?;

        if !response.status().is_success() {
            return Err(Error::Geocoding(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(Self::request_error)?;
        let mut candidates = Self::parse_search_body(&body);
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn reverse_geocode(&self, coordinate: Coordinates) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.reverse_url(coordinate))
            .send()
            .await
            .map_err(Self::request_error)?;

        if !response.status().is_success() {
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            return Err(Error::Geocoding(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        let result: NominatimReverse = response.json().await.map_err(|e| {
            Error::Geocoding(format!("Failed to parse Nominatim response: {}", e))
        })?;

        if let Some(error) = result.error {
            debug!("Nominatim has no address for {}: {}", coordinate, error);
            return Ok(None);
        }

        Ok(result.display_name.filter(|name| !name.trim().is_empty()))
    }
}
