//! Resilient geocoding client
//!
//! Wraps one or more [`GeoBackend`] providers with a per-request timeout and
//! a fallback chain. Nothing here returns an error: search failures become an
//! empty list and reverse failures a typed [`GeocodeOutcome::Failed`].

use crate::config::Config;
use crate::constants::geocoding::MAX_RESULT_LIMIT;
use crate::coord::Coordinates;
use crate::error::Error;
use crate::geo::nominatim::NominatimBackend;
use crate::geo::{GeoBackend, GeocodeFailure, GeocodeOutcome, SearchCandidate};
use crate::location::authority::AddressResolver;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Geocoding client with provider fallback
#[derive(Debug, Clone)]
pub struct GeocodingClient<B> {
    providers: Vec<B>,
    timeout: Duration,
    result_limit: usize,
}

impl<B: GeoBackend> GeocodingClient<B> {
    /// Create a client around a primary provider
    pub fn new(primary: B) -> Self {
        Self {
            providers: vec![primary],
            timeout: Duration::from_secs(crate::config::defaults::DEFAULT_GEOCODE_TIMEOUT_SECS),
            result_limit: crate::config::defaults::DEFAULT_RESULT_LIMIT,
        }
    }

    /// Append a provider tried after every earlier one has failed
    pub fn with_fallback(mut self, provider: B) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cap the number of candidates a search returns
    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit.clamp(1, MAX_RESULT_LIMIT);
        self
    }

    pub fn result_limit(&self) -> usize {
        self.result_limit
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forward search
    ///
    /// Blank queries return immediately without touching the network.
    /// Providers are tried in order until one answers; if none does the
    /// result is empty.
    pub async fn search(&self, text: &str) -> Vec<SearchCandidate> {
        let query = text.trim();
        if query.is_empty() {
            return Vec::new();
        }

        for provider in &self.providers {
            match timeout(self.timeout, provider.search(query, self.result_limit)).await {
                Ok(Ok(mut candidates)) => {
                    candidates.truncate(self.result_limit);
                    debug!(
                        "Search '{}' via {} returned {} candidates",
                        query,
                        provider.name(),
                        candidates.len()
                    );
                    return candidates;
                }
                Ok(Err(e)) => warn!("Search via {} failed: {}", provider.name(), e),
                Err(_) => warn!(
                    "Search via {} timed out after {:?}",
                    provider.name(),
                    self.timeout
                ),
            }
        }

        Vec::new()
    }

    /// Reverse lookup with fallback
    ///
    /// A provider that answers "no address here" ends the chain; network
    /// errors and timeouts move on to the next provider.
    pub async fn reverse_lookup(&self, coordinate: Coordinates) -> GeocodeOutcome {
        let mut failure = GeocodeFailure::NetworkError;

        for provider in &self.providers {
            match timeout(self.timeout, provider.reverse_geocode(coordinate)).await {
                Ok(Ok(Some(name))) => return GeocodeOutcome::Resolved(name),
                Ok(Ok(None)) => return GeocodeOutcome::Failed(GeocodeFailure::NotFound),
                Ok(Err(Error::Timeout(msg))) => {
                    warn!("Reverse lookup via {} timed out: {}", provider.name(), msg);
                    failure = GeocodeFailure::Timeout;
                }
                Ok(Err(e)) => {
                    warn!("Reverse lookup via {} failed: {}", provider.name(), e);
                    failure = GeocodeFailure::NetworkError;
                }
                Err(_) => {
                    warn!(
                        "Reverse lookup via {} timed out after {:?}",
                        provider.name(),
                        self.timeout
                    );
                    failure = GeocodeFailure::Timeout;
                }
            }
        }

        GeocodeOutcome::Failed(failure)
    }

    /// Address label for a coordinate, never failing
    pub async fn resolve_label(&self, coordinate: Coordinates) -> String {
        self.reverse_lookup(coordinate).await.into_label(coordinate)
    }
}

impl GeocodingClient<NominatimBackend> {
    /// Build the Nominatim chain described by the configuration
    pub fn from_config(config: &Config) -> Self {
        let timeout = config.geocode_timeout();
        let mut backends = config.geocoder_urls().into_iter().map(|url| {
            NominatimBackend::with_base_url(&url, timeout, &config.geocoding.country_codes)
        });

        let primary = backends.next().unwrap_or_default();
        let client = backends.fold(Self::new(primary), |client, backend| {
            client.with_fallback(backend)
        });

        client
            .with_timeout(timeout)
            .with_result_limit(config.geocoding.result_limit)
    }
}

impl<B: GeoBackend> AddressResolver for GeocodingClient<B> {
    async fn resolve_address(&self, coordinate: Coordinates) -> String {
        self.resolve_label(coordinate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    enum Reply {
        Found(String),
        Missing,
        Fails,
        TimesOut,
        Hangs,
    }

    #[derive(Clone)]
    struct Scripted {
        name: &'static str,
        reverse: Reply,
        candidates: Option<Vec<SearchCandidate>>,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(name: &'static str, reverse: Reply) -> Self {
            Self {
                name,
                reverse,
                candidates: Some(Vec::new()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn with_candidates(mut self, count: usize) -> Self {
            self.candidates = Some(
                (0..count)
                    .map(|i| SearchCandidate {
                        id: format!("{}-{}", self.name, i),
                        display_name: format!("Place {}", i),
                        coordinate: Coordinates::new(19.0 + i as f64 * 0.01, 72.8),
                    })
                    .collect(),
            );
            self
        }

        fn failing_search(mut self) -> Self {
            self.candidates = None;
            self
        }
    }

    impl GeoBackend for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchCandidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.candidates
                .clone()
                .ok_or_else(|| Error::Geocoding("search down".to_string()))
        }

        async fn reverse_geocode(&self, _coordinate: Coordinates) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reverse {
                Reply::Found(name) => Ok(Some(name.clone())),
                Reply::Missing => Ok(None),
                Reply::Fails => Err(Error::Geocoding("503".to_string())),
                Reply::TimesOut => Err(Error::Timeout("slow".to_string())),
                Reply::Hangs => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                }
            }
        }
    }

    #[tokio::test]
    async fn test_blank_query_skips_network() {
        let backend = Scripted::new("primary", Reply::Missing).with_candidates(3);
        let calls = backend.calls.clone();
        let client = GeocodingClient::new(backend);

        assert!(client.search("").await.is_empty());
        assert!(client.search("   \t").await.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_truncates_to_limit() {
        let client = GeocodingClient::new(Scripted::new("primary", Reply::Missing).with_candidates(8))
            .with_result_limit(5);
        assert_eq!(client.search("Mumbai").await.len(), 5);
    }

    #[tokio::test]
    async fn test_search_failure_is_empty() {
        let client =
            GeocodingClient::new(Scripted::new("primary", Reply::Missing).failing_search());
        assert!(client.search("Mumbai").await.is_empty());
    }

    #[tokio::test]
    async fn test_search_uses_fallback_on_error() {
        let client = GeocodingClient::new(Scripted::new("primary", Reply::Missing).failing_search())
            .with_fallback(Scripted::new("mirror", Reply::Missing).with_candidates(2));
        let results = client.search("Thane").await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "mirror-0");
    }

    #[tokio::test]
    async fn test_reverse_primary_wins() {
        let mirror = Scripted::new("mirror", Reply::Found("Mirror".to_string()));
        let mirror_calls = mirror.calls.clone();
        let client = GeocodingClient::new(Scripted::new(
            "primary",
            Reply::Found("Bandra West".to_string()),
        ))
        .with_fallback(mirror);

        let outcome = client.reverse_lookup(Coordinates::new(19.0596, 72.8295)).await;
        assert_eq!(outcome, GeocodeOutcome::Resolved("Bandra West".to_string()));
        assert_eq!(mirror_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reverse_falls_back_after_error() {
        let client = GeocodingClient::new(Scripted::new("primary", Reply::Fails))
            .with_fallback(Scripted::new("mirror", Reply::Found("Andheri".to_string())));
        let outcome = client.reverse_lookup(Coordinates::new(19.11, 72.84)).await;
        assert_eq!(outcome, GeocodeOutcome::Resolved("Andheri".to_string()));
    }

    #[tokio::test]
    async fn test_reverse_not_found_is_final() {
        let mirror = Scripted::new("mirror", Reply::Found("Mirror".to_string()));
        let mirror_calls = mirror.calls.clone();
        let client =
            GeocodingClient::new(Scripted::new("primary", Reply::Missing)).with_fallback(mirror);

        let outcome = client.reverse_lookup(Coordinates::new(0.0, -140.0)).await;
        assert_eq!(outcome, GeocodeOutcome::Failed(GeocodeFailure::NotFound));
        assert_eq!(mirror_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reverse_reports_last_failure() {
        let client = GeocodingClient::new(Scripted::new("primary", Reply::Fails))
            .with_fallback(Scripted::new("mirror", Reply::TimesOut));
        let outcome = client.reverse_lookup(Coordinates::new(19.0, 72.0)).await;
        assert_eq!(outcome, GeocodeOutcome::Failed(GeocodeFailure::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverse_timeout_enforced() {
        let client = GeocodingClient::new(Scripted::new("primary", Reply::Hangs))
            .with_timeout(Duration::from_secs(10));

        let outcome = client.reverse_lookup(Coordinates::new(19.0760, 72.8777)).await;
        assert_eq!(outcome, GeocodeOutcome::Failed(GeocodeFailure::Timeout));
    }

    #[tokio::test]
    async fn test_failed_lookup_label_is_formatted_coordinate() {
        let client = GeocodingClient::new(Scripted::new("primary", Reply::Fails));
        let label = client
            .resolve_label(Coordinates::new(19.0760, 72.8777))
            .await;
        assert_eq!(label, "19.076000, 72.877700");
    }

    #[test]
    fn test_result_limit_clamped() {
        let client = GeocodingClient::new(Scripted::new("primary", Reply::Missing));
        assert_eq!(client.clone().with_result_limit(0).result_limit(), 1);
        assert_eq!(client.with_result_limit(50).result_limit(), MAX_RESULT_LIMIT);
    }

    #[test]
    fn test_from_config_builds_chain() {
        let mut config = Config::default();
        config.geocoding.fallback_url = "https://mirror.example.org/".to_string();
        config.geocoding.timeout_secs = 4;
        let client = GeocodingClient::from_config(&config);

        assert_eq!(client.providers.len(), 2);
        assert_eq!(client.providers[1].base_url(), "https://mirror.example.org");
        assert_eq!(client.timeout(), Duration::from_secs(4));
    }
}
