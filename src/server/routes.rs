//! HTTP API routes
//!
//! Defines all REST API endpoints for the server.

use crate::coord::Coordinates;
use crate::error::Error;
use crate::location::{LocationSnapshot, LocationSource};
use crate::map::{BaseLayer, MapViewState};
use crate::position::{
    GeolocationFailure, PlatformCapabilities, PositionError, PositionErrorCode,
};
use crate::search::SearchState;
use crate::server::state::AppState;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/location", get(location_handler))
        .route("/api/location/gps", post(gps_fix_handler))
        .route("/api/location/gps/error", post(gps_error_handler))
        .route("/api/location/here", post(locate_here_handler))
        .route("/api/location/confirm", post(confirm_handler))
        .route("/api/search", get(search_state_handler).post(search_input_handler))
        .route("/api/search/select", post(search_select_handler))
        .route("/api/map", get(map_handler))
        .route("/api/map/click", post(map_click_handler))
        .route("/api/map/layer", post(map_layer_handler))
        .route("/api/analyze", post(analyze_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn new(code: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "CONFIRMATION_REQUIRED" | "NO_LOCATION_SELECTED" => StatusCode::CONFLICT,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
            "ANALYSIS_ERROR" => StatusCode::BAD_GATEWAY,
            "INTERNAL_ERROR" => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidCoordinates(_) => "INVALID_COORDINATES",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Geocoding(_) => "GEOCODING_ERROR",
            Error::Geolocation(_) => "GEOLOCATION_ERROR",
            Error::Timeout(_) => "TIMEOUT",
            Error::ConfirmationRequired => "CONFIRMATION_REQUIRED",
            Error::Analysis(_) => "ANALYSIS_ERROR",
            _ => "INTERNAL_ERROR",
        };
        ApiError::new(code, err.to_string())
    }
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server is running
    pub running: bool,
    /// Server version
    pub version: String,
    /// Source of the current location
    pub source: LocationSource,
    /// Whether the current location may be analysed
    pub actionable: bool,
    /// Server-side position capabilities
    pub capabilities: PlatformCapabilities,
    /// Uptime in seconds
    pub uptime_secs: u64,
}

/// Server status endpoint
///
/// GET /api/status
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = state.authority.snapshot();
    Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        source: snapshot.source,
        actionable: snapshot.is_actionable(),
        capabilities: state.geolocation.capabilities(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Current location snapshot
///
/// GET /api/location
async fn location_handler(State(state): State<Arc<AppState>>) -> Json<LocationSnapshot> {
    Json(state.authority.snapshot())
}

/// A position fix reported by the browser
#[derive(Debug, Deserialize)]
pub struct GpsFixRequest {
    pub lat: f64,
    pub lng: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
}

/// Apply a browser position fix
///
/// POST /api/location/gps
async fn gps_fix_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GpsFixRequest>,
) -> Result<Json<LocationSnapshot>, ApiError> {
    let coordinate = Coordinates::checked(req.lat, req.lng)?;
    // Address resolution continues in the background
    drop(state.authority.apply_gps_result(coordinate, req.accuracy));
    Ok(Json(state.authority.snapshot()))
}

/// A failed browser position request
#[derive(Debug, Deserialize)]
pub struct GpsErrorRequest {
    /// Browser geolocation error code (1, 2 or 3)
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

/// Classify a browser geolocation error
///
/// POST /api/location/gps/error
async fn gps_error_handler(Json(req): Json<GpsErrorRequest>) -> Json<GeolocationFailure> {
    let error = PositionError::new(PositionErrorCode::from_code(req.code), req.message);
    warn!("Browser geolocation failed ({:?}): {}", error.code, error.message);
    Json(GeolocationFailure::from_position_error(&error))
}

/// Locate the server by IP address
///
/// POST /api/location/here
async fn locate_here_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LocationSnapshot>, (StatusCode, Json<GeolocationFailure>)> {
    match state.geolocation.locate(&state.authority).await {
        // A superseded fix leaves whatever location replaced it in place
        Ok(_) => Ok(Json(state.authority.snapshot())),
        Err(failure) => Err((StatusCode::SERVICE_UNAVAILABLE, Json(failure))),
    }
}

/// Confirm the current location
///
/// POST /api/location/confirm
async fn confirm_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LocationSnapshot>, ApiError> {
    state.authority.confirm();
    let snapshot = state.authority.snapshot();
    if snapshot.source == LocationSource::Default {
        return Err(ApiError::new(
            "NO_LOCATION_SELECTED",
            "Choose a location before confirming",
        ));
    }
    Ok(Json(snapshot))
}

/// Search box state
///
/// GET /api/search
async fn search_state_handler(State(state): State<Arc<AppState>>) -> Json<SearchState> {
    Json(state.search.lock().await.state())
}

/// Search box input
#[derive(Debug, Deserialize)]
pub struct SearchInputRequest {
    #[serde(default)]
    pub query: String,
}

/// Feed text into the search box
///
/// POST /api/search
///
/// Results appear on GET /api/search once typing pauses. An empty query
/// clears the box.
async fn search_input_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchInputRequest>,
) -> Json<SearchState> {
    let mut search = state.search.lock().await;
    if req.query.is_empty() {
        search.clear();
    } else {
        search.input(&req.query);
    }
    Json(search.state())
}

/// Candidate selection
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub id: String,
}

/// Select a search candidate
///
/// POST /api/search/select
async fn search_select_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<LocationSnapshot>, ApiError> {
    state
        .search
        .lock()
        .await
        .select(&req.id, &state.authority)
        .ok_or_else(|| ApiError::new("NOT_FOUND", format!("No search result with id {}", req.id)))?;
    Ok(Json(state.authority.snapshot()))
}

/// Current map view
///
/// GET /api/map
async fn map_handler(State(state): State<Arc<AppState>>) -> Json<MapViewState> {
    Json(state.map_state())
}

/// A click on the map surface
#[derive(Debug, Deserialize)]
pub struct MapClickRequest {
    pub lat: f64,
    pub lng: f64,
}

/// Forward a map click to the map view
///
/// POST /api/map/click
async fn map_click_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MapClickRequest>,
) -> Result<StatusCode, ApiError> {
    let coordinate = Coordinates::checked(req.lat, req.lng)?;
    state.map.click(coordinate).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Base layer change
#[derive(Debug, Deserialize)]
pub struct LayerRequest {
    pub layer: String,
}

/// Switch the base layer
///
/// POST /api/map/layer
async fn map_layer_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LayerRequest>,
) -> Result<StatusCode, ApiError> {
    let layer: BaseLayer = req
        .layer
        .parse()
        .map_err(|e: String| ApiError::new("INVALID_LAYER", e))?;
    state.map.set_layer(layer).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Submit the confirmed location for analysis
///
/// POST /api/analyze
///
/// The body holds the form fields passed through to the analysis backend.
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<Map<String, Value>>>,
) -> Result<Json<Value>, ApiError> {
    let target = state.authority.analysis_target()?;
    let fields = body.map(|Json(fields)| fields).unwrap_or_default();
    let result = state.analysis.submit(&target, fields).await?;
    Ok(Json(result))
}
