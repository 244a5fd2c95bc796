//! HTTP request handlers for the connection service.
//!
//! Every `/connections` route resolves the caller from the bearer token,
//! runs the engine call on the blocking pool and maps engine errors to
//! status codes by kind.

use crate::dto::{
    ConnectionDto, ConnectionViewDto, DiscoveryItemDto, ErrorResponse, MutualDto, PageDto,
    PendingRequestsDto, RecommendationsDto, ResidentDto, StatsDto,
};
use crate::session::{Caller, SessionError, SessionManager, SessionResponse};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRef, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router as AxumRouter,
};
use hearth_domain::{ConnectionId, ConnectionType, LocationFilter, UserId};
use hearth_engine::{
    ConnectionEngine, ConnectionFilter, DiscoverOrder, DiscoverQuery, EngineError, ErrorKind,
};
use hearth_store::{ResidentRegistry, SqliteStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Engine over the concrete store and directory
pub type Engine = ConnectionEngine<SqliteStore, ResidentRegistry>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Connection engine
    pub engine: Arc<Engine>,
    /// Session manager for JWT token operations
    pub session_manager: Arc<SessionManager>,
}

impl FromRef<AppState> for Arc<SessionManager> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.session_manager)
    }
}

/// Session establishment request
#[derive(Debug, Deserialize)]
pub struct EstablishSessionRequest {
    /// Resident to issue the token for
    pub user_id: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    /// The edge store answered
    pub store_reachable: bool,
    /// Residents in the directory
    pub resident_count: usize,
}

/// Connection request body
#[derive(Debug, Deserialize)]
pub struct CreateConnectionRequest {
    /// Recipient
    pub to_user_id: String,
    /// Kind of connection, "connect" when absent
    #[serde(default)]
    pub connection_type: Option<String>,
}

/// Query string of the connections listing
#[derive(Debug, Default, Deserialize)]
pub struct ListConnectionsParams {
    /// Only this kind
    pub connection_type: Option<String>,
    /// Only partners in this neighborhood
    pub neighborhood: Option<String>,
    /// Only partners in this district
    pub district: Option<String>,
    /// Page number, from 1
    pub page: Option<usize>,
    /// Items per page
    pub page_size: Option<usize>,
}

/// Query string of the recommendations route
#[derive(Debug, Default, Deserialize)]
pub struct RecommendationParams {
    /// Number of suggestions
    pub limit: Option<usize>,
}

/// Query string of the discovery route
#[derive(Debug, Default, Deserialize)]
pub struct DiscoverParams {
    /// Look in this neighborhood
    pub neighborhood: Option<String>,
    /// Look in this district
    pub district: Option<String>,
    /// Display name contains
    pub q: Option<String>,
    /// "join_date", "name" or "score"
    pub order: Option<String>,
    /// Page number, from 1
    pub page: Option<usize>,
    /// Items per page
    pub page_size: Option<usize>,
}

/// Application error type
#[derive(Debug)]
pub enum ApiError {
    /// Engine refused or failed the operation
    Engine(EngineError),
    /// Missing, expired or invalid bearer token
    Unauthorized(SessionError),
    /// Malformed path, query or body
    BadRequest(String),
    /// Internal server error
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Engine(e) => {
                let kind = e.kind();
                let status = match kind {
                    ErrorKind::Validation => StatusCode::BAD_REQUEST,
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::Conflict => StatusCode::CONFLICT,
                    ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                    ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, kind.as_str(), e.to_string())
            }
            ApiError::Unauthorized(e) => (StatusCode::UNAUTHORIZED, "unauthorized", e.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorKind::Validation.as_str(), msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Internal.as_str(),
                msg,
            ),
        };

        if status.is_server_error() {
            error!(error = %message, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %message, "Request refused");
        }

        let body = Json(ErrorResponse {
            error: message,
            kind: kind.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

/// Run an engine call on the blocking pool
async fn run<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Engine) -> Result<T, EngineError> + Send + 'static,
    T: Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| ApiError::Internal(format!("Engine task failed: {}", e)))?
        .map_err(ApiError::from)
}

fn parse_user(raw: &str) -> Result<UserId, ApiError> {
    UserId::new(raw).map_err(ApiError::BadRequest)
}

fn parse_connection_id(raw: &str) -> Result<ConnectionId, ApiError> {
    ConnectionId::from_string(raw).map_err(ApiError::BadRequest)
}

fn location_filter(
    neighborhood: Option<String>,
    district: Option<String>,
) -> Result<Option<LocationFilter>, ApiError> {
    match (neighborhood, district) {
        (Some(_), Some(_)) => Err(ApiError::BadRequest(
            "Filter by neighborhood or district, not both".to_string(),
        )),
        (Some(n), None) => Ok(Some(LocationFilter::Neighborhood(n))),
        (None, Some(d)) => Ok(Some(LocationFilter::District(d))),
        (None, None) => Ok(None),
    }
}

/// POST /session/establish - Issue a token for a known resident
async fn establish_session(
    State(state): State<AppState>,
    payload: Result<Json<EstablishSessionRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Json(request) = payload?;
    let user = parse_user(&request.user_id)?;

    let known = user.clone();
    run(&state, move |engine| engine.resident(&known)).await?;

    let token = state
        .session_manager
        .generate_token(&user)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(user = %user, "Session established");

    Ok(Json(SessionResponse {
        token,
        user_id: user.to_string(),
        expires_in: state.session_manager.token_expiry_secs(),
    }))
}

/// GET /health - Store reachability and directory size
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let engine = Arc::clone(&state.engine);
    let probe = tokio::task::spawn_blocking(move || {
        let store_reachable = engine
            .store()
            .lock()
            .map(|store| store.ping().is_ok())
            .unwrap_or(false);
        let resident_count = engine.directory().len().unwrap_or(0);
        (store_reachable, resident_count)
    })
    .await;

    let (store_reachable, resident_count) = probe.unwrap_or((false, 0));
    let status = if store_reachable { "healthy" } else { "unhealthy" };

    Json(HealthCheckResponse {
        status: status.to_string(),
        store_reachable,
        resident_count,
    })
}

/// POST /connections - Send a connection request
async fn create_connection(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<CreateConnectionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ConnectionDto>), ApiError> {
    let Json(request) = payload?;
    let to = parse_user(&request.to_user_id)?;
    let connection_type = match request.connection_type.as_deref() {
        Some(raw) => raw.parse::<ConnectionType>().map_err(ApiError::BadRequest)?,
        None => ConnectionType::default(),
    };

    let edge = run(&state, move |engine| {
        engine.request_connection(&caller, &to, connection_type)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(edge.into())))
}

/// GET /connections - The caller's accepted connections
async fn list_connections(
    State(state): State<AppState>,
    Caller(caller): Caller,
    params: Result<Query<ListConnectionsParams>, QueryRejection>,
) -> Result<Json<PageDto<ConnectionViewDto>>, ApiError> {
    let Query(params) = params?;
    let connection_type = params
        .connection_type
        .as_deref()
        .map(str::parse::<ConnectionType>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let filter = ConnectionFilter {
        connection_type,
        location: location_filter(params.neighborhood, params.district)?.unwrap_or_default(),
    };
    let page = state.engine.page_request(params.page, params.page_size)?;

    let listing = run(&state, move |engine| {
        engine.list_connections(&caller, &filter, page)
    })
    .await?;
    Ok(Json(PageDto::from_page(listing)))
}

/// GET /connections/requests - Pending requests in both directions
async fn pending_requests(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<PendingRequestsDto>, ApiError> {
    let pending = run(&state, move |engine| engine.pending_requests(&caller)).await?;
    Ok(Json(pending.into()))
}

/// GET /connections/stats - Counts per status and type
async fn connection_stats(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<StatsDto>, ApiError> {
    let stats = run(&state, move |engine| engine.connection_stats(&caller)).await?;
    Ok(Json(stats.into()))
}

/// POST /connections/:id/accept
async fn accept_connection(
    State(state): State<AppState>,
    Caller(caller): Caller,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<ConnectionDto>, ApiError> {
    let Path(raw) = id?;
    let id = parse_connection_id(&raw)?;
    let edge = run(&state, move |engine| engine.accept_connection(&caller, id)).await?;
    Ok(Json(edge.into()))
}

/// POST /connections/:id/reject
async fn reject_connection(
    State(state): State<AppState>,
    Caller(caller): Caller,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<ConnectionDto>, ApiError> {
    let Path(raw) = id?;
    let id = parse_connection_id(&raw)?;
    let edge = run(&state, move |engine| engine.reject_connection(&caller, id)).await?;
    Ok(Json(edge.into()))
}

/// POST /connections/:id/block
async fn block_connection(
    State(state): State<AppState>,
    Caller(caller): Caller,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<ConnectionDto>, ApiError> {
    let Path(raw) = id?;
    let id = parse_connection_id(&raw)?;
    let edge = run(&state, move |engine| engine.block_connection(&caller, id)).await?;
    Ok(Json(edge.into()))
}

/// DELETE /connections/:id
async fn remove_connection(
    State(state): State<AppState>,
    Caller(caller): Caller,
    id: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(raw) = id?;
    let id = parse_connection_id(&raw)?;
    run(&state, move |engine| engine.remove_connection(&caller, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /connections/recommendations - Suggested residents
async fn recommendations(
    State(state): State<AppState>,
    Caller(caller): Caller,
    params: Result<Query<RecommendationParams>, QueryRejection>,
) -> Result<Json<RecommendationsDto>, ApiError> {
    let Query(params) = params?;
    let result = run(&state, move |engine| engine.recommend(&caller, params.limit)).await?;
    Ok(Json(result.into()))
}

/// GET /connections/discover - Browse residents not yet connected
async fn discover(
    State(state): State<AppState>,
    Caller(caller): Caller,
    params: Result<Query<DiscoverParams>, QueryRejection>,
) -> Result<Json<PageDto<DiscoveryItemDto>>, ApiError> {
    let Query(params) = params?;
    let page = state.engine.page_request(params.page, params.page_size)?;

    let mut query = DiscoverQuery::new(page);
    if let Some(filter) = location_filter(params.neighborhood, params.district)? {
        query = query.with_location(filter);
    }
    if let Some(q) = params.q {
        query = query.with_name(q);
    }
    if let Some(order) = params.order.as_deref() {
        query = query.with_order(order.parse::<DiscoverOrder>().map_err(ApiError::BadRequest)?);
    }

    let listing = run(&state, move |engine| engine.discover(&caller, &query)).await?;
    Ok(Json(PageDto::from_page(listing)))
}

/// GET /connections/mutual/:user_id - Connections shared with another resident
async fn mutual_connections(
    State(state): State<AppState>,
    Caller(caller): Caller,
    other: Result<Path<String>, PathRejection>,
) -> Result<Json<MutualDto>, ApiError> {
    let Path(raw) = other?;
    let other = parse_user(&raw)?;

    let target = other.clone();
    let residents = run(&state, move |engine| engine.mutual_residents(&caller, &target)).await?;

    Ok(Json(MutualDto {
        user_id: other.to_string(),
        count: residents.len(),
        residents: residents.into_iter().map(ResidentDto::from).collect(),
    }))
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/session/establish", post(establish_session))
        .route("/health", get(health_check))
        .route("/connections", post(create_connection).get(list_connections))
        .route("/connections/requests", get(pending_requests))
        .route("/connections/stats", get(connection_stats))
        .route("/connections/recommendations", get(recommendations))
        .route("/connections/discover", get(discover))
        .route("/connections/mutual/:user_id", get(mutual_connections))
        .route("/connections/:id", delete(remove_connection))
        .route("/connections/:id/accept", post(accept_connection))
        .route("/connections/:id/reject", post(reject_connection))
        .route("/connections/:id/block", post(block_connection))
        .with_state(state)
}
