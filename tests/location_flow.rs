//! End-to-end location flows against mock providers

use serde_json::json;
use solar_locate::geo::GeocodingClient;
use solar_locate::location::AddressState;
use solar_locate::position::{
    FailureReason, GeolocationRequester, PermissionState, PlatformCapabilities, Position,
    PositionError, PositionErrorCode, PositionOptions, PositionSource,
};
use solar_locate::search::{SearchBox, SearchStatus};
use solar_locate::{Config, Coordinates, Error, LocationAuthority, LocationSnapshot, LocationSource};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Client = GeocodingClient<solar_locate::geo::nominatim::NominatimBackend>;

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.geocoding.base_url = server.uri();
    config.geocoding.timeout_secs = 5;
    config
}

fn authority_for(config: &Config) -> (Arc<Client>, LocationAuthority<Client>) {
    let client = Arc::new(GeocodingClient::from_config(config));
    let (home, address) = config.default_location().unwrap();
    let authority =
        LocationAuthority::new(Arc::clone(&client), LocationSnapshot::initial(home, address));
    (client, authority)
}

#[tokio::test]
async fn search_and_select_makes_location_actionable() {
    let server = MockServer::start().await;
    let places: Vec<_> = (0..7)
        .map(|i| {
            json!({
                "place_id": 200 + i,
                "lat": format!("19.05{}", i),
                "lon": "72.8295",
                "display_name": format!("Bandra West {}, Mumbai", i)
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Bandra West Mumbai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(places)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Bandra West Mumbai Station"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"place_id": 301, "lat": "19.0596", "lon": "72.8295", "display_name": "Bandra West, Mumbai, Maharashtra"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let (client, authority) = authority_for(&config);
    assert!(authority.analysis_target().is_err());

    let mut search = SearchBox::new(client, Duration::from_millis(20));
    let mut updates = search.subscribe();

    search.input("Bandra West Mumbai");
    let state = tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|s| !s.candidates.is_empty()),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert_eq!(state.candidates.len(), 5);

    search.input("Bandra West Mumbai Station");
    tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|s| s.candidates.len() == 1),
    )
    .await
    .unwrap()
    .unwrap();

    let selected = search.select("301", &authority).unwrap();
    assert_eq!(selected.display_name, "Bandra West, Mumbai, Maharashtra");
    assert!(search.state().candidates.is_empty());
    assert_eq!(search.state().query, "Bandra West, Mumbai, Maharashtra");

    let snapshot = authority.snapshot();
    assert_eq!(snapshot.source, LocationSource::Search);
    assert!(snapshot.confirmed);
    assert_eq!(snapshot.address_state, AddressState::Resolved);

    let target = authority.analysis_target().unwrap();
    assert_eq!(target.coordinate, Coordinates::new(19.0596, 72.8295));
    assert_eq!(target.address, "Bandra West, Mumbai, Maharashtra");
}

struct DeniedSource;

impl PositionSource for DeniedSource {
    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities {
            has_geolocation: true,
            has_permission_query: false,
        }
    }

    async fn permission_state(&self) -> PermissionState {
        PermissionState::Prompt
    }

    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, PositionError> {
        Err(PositionError::new(
            PositionErrorCode::from_code(1),
            "User denied Geolocation",
        ))
    }
}

#[tokio::test]
async fn denied_geolocation_leaves_default_location() {
    let server = MockServer::start().await;
    let config = config_for(&server);
    let (_, authority) = authority_for(&config);
    let before = authority.snapshot();

    let requester = GeolocationRequester::new(DeniedSource, config.position_options());
    let failure = requester.locate(&authority).await.unwrap_err();

    assert_eq!(failure.reason, FailureReason::PermissionDenied);
    assert!(!failure.message.is_empty());
    assert!(failure.suggestions.iter().any(|s| s.contains("Search")));

    assert_eq!(authority.snapshot(), before);
    assert!(matches!(
        authority.analysis_target(),
        Err(Error::ConfirmationRequired)
    ));
}

#[tokio::test]
async fn late_lookup_is_discarded_after_map_click() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "19.1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"display_name": "Andheri, Mumbai"}))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "19.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"display_name": "Kurla, Mumbai"})))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let (_, authority) = authority_for(&config);

    let gps = authority.apply_gps_result(Coordinates::new(19.1, 72.85), 15.0);
    let gps_snapshot = authority.snapshot();
    assert_eq!(gps_snapshot.source, LocationSource::Gps);
    assert!(!gps_snapshot.confirmed);
    assert_eq!(gps_snapshot.address, "19.100000, 72.850000");

    let click = authority.apply_map_click(Coordinates::new(19.2, 72.88));

    assert!(click.await.unwrap());
    assert!(!gps.await.unwrap());

    let snapshot = authority.snapshot();
    assert_eq!(snapshot.source, LocationSource::Click);
    assert_eq!(snapshot.coordinate, Coordinates::new(19.2, 72.88));
    assert_eq!(snapshot.address, "Kurla, Mumbai");
    assert!(snapshot.confirmed);
    assert!(snapshot.accuracy.is_none());
}

#[tokio::test]
async fn failed_lookup_falls_back_to_coordinate_label() {
    let primary = MockServer::start().await;
    let mirror = MockServer::start().await;
    for server in [&primary, &mirror] {
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(server)
            .await;
    }

    let mut config = config_for(&primary);
    config.geocoding.fallback_url = mirror.uri();
    let (_, authority) = authority_for(&config);

    let task = authority.apply_map_click(Coordinates::new(19.076, 72.8777));
    assert!(task.await.unwrap());

    let snapshot = authority.snapshot();
    assert_eq!(snapshot.address, "19.076000, 72.877700");
    assert_eq!(snapshot.address_state, AddressState::Resolved);
    assert!(authority.analysis_target().is_ok());
}

/// Answers with a fix only after the user has had time to act
struct SlowSource;

impl PositionSource for SlowSource {
    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities {
            has_geolocation: true,
            has_permission_query: false,
        }
    }

    async fn permission_state(&self) -> PermissionState {
        PermissionState::Granted
    }

    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, PositionError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(Position {
            coordinate: Coordinates::new(19.1136, 72.8697),
            accuracy: 25.0,
            timestamp: chrono::Utc::now(),
        })
    }
}

#[tokio::test]
async fn late_gps_fix_does_not_replace_map_click() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"display_name": "Dadar, Mumbai"})))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let (_, authority) = authority_for(&config);
    let requester = Arc::new(GeolocationRequester::new(SlowSource, config.position_options()));

    let pending = tokio::spawn({
        let requester = Arc::clone(&requester);
        let authority = authority.clone();
        async move { requester.locate(&authority).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let clicked = Coordinates::new(19.0178, 72.8478);
    let click = authority.apply_map_click(clicked);

    assert!(pending.await.unwrap().unwrap().is_none());
    assert!(click.await.unwrap());

    let snapshot = authority.snapshot();
    assert_eq!(snapshot.source, LocationSource::Click);
    assert_eq!(snapshot.coordinate, clicked);
    assert_eq!(snapshot.address, "Dadar, Mumbai");
    assert!(snapshot.confirmed);
    assert!(snapshot.accuracy.is_none());
}

#[tokio::test]
async fn typing_during_search_discards_its_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Powai"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    {"place_id": 401, "lat": "19.1176", "lon": "72.9060", "display_name": "Powai, Mumbai"}
                ]))
                .set_delay(Duration::from_millis(1_000)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Powai Lake"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    {"place_id": 402, "lat": "19.1273", "lon": "72.9050", "display_name": "Powai Lake, Mumbai"}
                ]))
                .set_delay(Duration::from_millis(800)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let (client, _) = authority_for(&config);
    let mut search = SearchBox::new(client, Duration::from_millis(300));
    let mut updates = search.subscribe();

    // "Powai" goes out at 300 ms and answers around 1300 ms
    search.input("Powai");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(search.state().status, SearchStatus::Searching);

    // "Powai Lake" goes out around 800 ms and answers around 1600 ms
    search.input("Powai Lake");
    tokio::time::sleep(Duration::from_millis(950)).await;
    assert!(search.state().candidates.is_empty());

    let state = tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|s| !s.candidates.is_empty()),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert_eq!(state.query, "Powai Lake");
    assert_eq!(state.candidates.len(), 1);
    assert_eq!(state.candidates[0].id, "402");
}
