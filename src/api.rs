use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, error, info, instrument, warn};
use utoipa::{OpenApi, ToSchema};

use crate::models::{HeaderCell, MeasurementGroup, RawTable, WeatherRecord, Wind};
use crate::scrape_error::{ErrorBody, ErrorKind, ScrapeError};
use crate::services::{
    MultiStationRequest, MultiStationResponse, RawStationTable, ScrapeService, StationOutcome,
    StationReport,
};

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AppState {
    pub scrape_service: ScrapeService,
    /// When set, every station and cache route requires a matching `x-api-key`
    pub api_key: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cached_stations: usize,
}

#[derive(Serialize, ToSchema)]
pub struct CacheClearedResponse {
    pub cleared: usize,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Weather Station Service",
        description = "Scrapes INMET automatic weather station tables into typed observations"
    ),
    paths(
        health,
        get_station,
        get_station_raw,
        scrape_stations,
        clear_cache,
    ),
    components(schemas(
        HealthResponse,
        CacheClearedResponse,
        ErrorBody,
        ErrorKind,
        StationReport,
        RawStationTable,
        MultiStationRequest,
        MultiStationResponse,
        StationOutcome,
        WeatherRecord,
        MeasurementGroup,
        Wind,
        RawTable,
        HeaderCell,
    )),
    tags((name = "stations", description = "Station table scraping"))
)]
pub struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Error response carrying the JSON error envelope
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: status_for(kind),
            body: ErrorBody {
                kind,
                message: message.into(),
            },
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidStation | ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::MissingApiKey => StatusCode::UNAUTHORIZED,
        ErrorKind::InvalidApiKey => StatusCode::FORBIDDEN,
        ErrorKind::TableNotFound | ErrorKind::UpstreamNotFound => StatusCode::NOT_FOUND,
        ErrorKind::UpstreamTimeout => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::HeaderMismatch
        | ErrorKind::EmptyResult
        | ErrorKind::InvalidSelector
        | ErrorKind::UpstreamError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ScrapeError> for ApiError {
    fn from(e: ScrapeError) -> Self {
        let body = e.to_body();
        Self {
            status: status_for(body.kind),
            body,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/stations", post(scrape_stations))
        .route("/stations/{station_id}", get(get_station))
        .route("/stations/{station_id}/raw", get(get_station_raw))
        .route("/cache", delete(clear_cache))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/docs", get(docs))
        .merge(protected)
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

/// CORS for browser clients; `*` (or an empty list) allows any origin
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    match request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        None => {
            warn!("Rejected {} without API key", request.uri().path());
            Err(ApiError::new(
                ErrorKind::MissingApiKey,
                format!("Missing {} header", API_KEY_HEADER),
            ))
        }
        Some(provided) if provided != expected => {
            warn!("Rejected {} with invalid API key", request.uri().path());
            Err(ApiError::new(ErrorKind::InvalidApiKey, "Invalid API key"))
        }
        Some(_) => Ok(next.run(request).await),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
#[instrument(skip(state))]
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_stations: state.scrape_service.cached_station_count().await,
    };
    (StatusCode::OK, Json(response))
}

async fn docs() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    get,
    path = "/api/v1/stations/{station_id}",
    tag = "stations",
    params(("station_id" = String, Path, description = "Station code, e.g. A871")),
    responses(
        (status = 200, description = "Typed observations", body = StationReport),
        (status = 400, description = "Malformed station code", body = ErrorBody),
        (status = 404, description = "No table for this station", body = ErrorBody),
        (status = 408, description = "Upstream timed out", body = ErrorBody),
        (status = 500, description = "Table could not be interpreted", body = ErrorBody),
    )
)]
#[instrument(skip(state), fields(station_id = %station_id))]
async fn get_station(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
) -> Result<Json<StationReport>, ApiError> {
    debug!("Scraping station {}", station_id);
    let report = state
        .scrape_service
        .scrape_station(&station_id)
        .await
        .map_err(|e| log_failure(&station_id, e))?;

    info!(
        "Returning {} records for station {} (cached: {})",
        report.record_count, station_id, report.cached
    );

    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/v1/stations/{station_id}/raw",
    tag = "stations",
    params(("station_id" = String, Path, description = "Station code, e.g. A871")),
    responses(
        (status = 200, description = "Header block and untyped rows", body = RawStationTable),
        (status = 400, description = "Malformed station code", body = ErrorBody),
        (status = 404, description = "No table for this station", body = ErrorBody),
    )
)]
#[instrument(skip(state), fields(station_id = %station_id))]
async fn get_station_raw(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
) -> Result<Json<RawStationTable>, ApiError> {
    debug!("Extracting raw table for station {}", station_id);
    let table = state
        .scrape_service
        .scrape_raw(&station_id)
        .await
        .map_err(|e| log_failure(&station_id, e))?;

    Ok(Json(table))
}

#[utoipa::path(
    post,
    path = "/api/v1/stations",
    tag = "stations",
    request_body = MultiStationRequest,
    responses(
        (status = 200, description = "Per-station results in request order", body = MultiStationResponse),
        (status = 400, description = "Missing or empty station list", body = ErrorBody),
    )
)]
#[instrument(skip(state, payload))]
async fn scrape_stations(
    State(state): State<AppState>,
    payload: Result<Json<MultiStationRequest>, JsonRejection>,
) -> Result<Json<MultiStationResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected multi-station request body: {}", rejection);
        ApiError::new(ErrorKind::BadRequest, rejection.body_text())
    })?;

    if request.stations.is_empty() {
        warn!("Multi-station request without stations");
        return Err(ApiError::new(
            ErrorKind::BadRequest,
            "At least one station code is required",
        ));
    }

    debug!("Scraping {} stations", request.stations.len());
    let response = state.scrape_service.scrape_many(&request.stations).await;

    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cache",
    responses((status = 200, description = "Cache emptied", body = CacheClearedResponse))
)]
#[instrument(skip(state))]
async fn clear_cache(State(state): State<AppState>) -> Json<CacheClearedResponse> {
    let cleared = state.scrape_service.clear_cache().await;
    Json(CacheClearedResponse { cleared })
}

fn log_failure(station_id: &str, e: ScrapeError) -> ApiError {
    match e.kind() {
        ErrorKind::InvalidStation | ErrorKind::TableNotFound | ErrorKind::UpstreamNotFound => {
            warn!("Station {} not served: {}", station_id, e);
        }
        _ => error!("Failed to scrape station {}: {}", station_id, e),
    }
    ApiError::from(e)
}
