//! Integration tests for the HTTP surface

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use hearth_server::{
    build_state,
    config::ServerConfig,
    dto::{
        ConnectionDto, ConnectionViewDto, DiscoveryItemDto, ErrorResponse, MutualDto, PageDto,
        PendingRequestsDto, RecommendationsDto, StatsDto,
    },
    handlers::{create_router, HealthCheckResponse},
    session::SessionResponse,
};
use serde::de::DeserializeOwned;
use tower::ServiceExt; // for oneshot

/// Helper to create the application over the development configuration
fn create_app() -> Router {
    create_router(build_state(&ServerConfig::default_test_config()).unwrap())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn json<T: DeserializeOwned>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap()
}

async fn login(app: &Router, user_id: &str) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/session/establish")
        .header("content-type", "application/json")
        .body(Body::from(format!(r#"{{"user_id": "{}"}}"#, user_id)))
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    json::<SessionResponse>(&body).token
}

fn authed(method: &str, uri: &str, token: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn request_connection(app: &Router, token: &str, to: &str) -> ConnectionDto {
    let body = format!(r#"{{"to_user_id": "{}"}}"#, to);
    let (status, body) = send(app, authed("POST", "/connections", token, Some(&body))).await;
    assert_eq!(status, StatusCode::CREATED);
    json(&body)
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_app();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let health: HealthCheckResponse = json(&body);
    assert_eq!(health.status, "healthy");
    assert!(health.store_reachable);
    assert_eq!(health.resident_count, 3);
}

#[tokio::test]
async fn test_establish_session() {
    let app = create_app();

    let request = Request::builder()
        .method("POST")
        .uri("/session/establish")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"user_id": "amara"}"#))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let session: SessionResponse = json(&body);
    assert!(!session.token.is_empty());
    assert_eq!(session.user_id, "amara");
    assert_eq!(session.expires_in, 3600);
}

#[tokio::test]
async fn test_establish_session_unknown_resident() {
    let app = create_app();

    let request = Request::builder()
        .method("POST")
        .uri("/session/establish")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"user_id": "zoe"}"#))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json::<ErrorResponse>(&body).kind, "not_found");
}

#[tokio::test]
async fn test_missing_and_invalid_tokens() {
    let app = create_app();

    let request = Request::builder()
        .uri("/connections/stats")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json::<ErrorResponse>(&body).kind, "unauthorized");

    let (status, _) = send(&app, authed("GET", "/connections/stats", "garbage", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_accept_and_list() {
    let app = create_app();
    let amara = login(&app, "amara").await;
    let bayo = login(&app, "bayo").await;

    let edge = request_connection(&app, &amara, "bayo").await;
    assert_eq!(edge.status, "pending");
    assert_eq!(edge.connection_type, "connect");
    assert_eq!(edge.metadata.proximity.as_deref(), Some("same_neighborhood"));

    // Bayo sees it as incoming
    let (status, body) = send(&app, authed("GET", "/connections/requests", &bayo, None)).await;
    assert_eq!(status, StatusCode::OK);
    let pending: PendingRequestsDto = json(&body);
    assert_eq!(pending.incoming.len(), 1);
    assert_eq!(pending.incoming[0].partner.id, "amara");

    // The initiator cannot answer
    let uri = format!("/connections/{}/accept", edge.id);
    let (status, body) = send(&app, authed("POST", &uri, &amara, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json::<ErrorResponse>(&body).kind, "forbidden");

    let (status, body) = send(&app, authed("POST", &uri, &bayo, None)).await;
    assert_eq!(status, StatusCode::OK);
    let accepted: ConnectionDto = json(&body);
    assert_eq!(accepted.status, "accepted");
    assert!(accepted.accepted_at.is_some());

    // Accepting twice conflicts
    let (status, body) = send(&app, authed("POST", &uri, &bayo, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json::<ErrorResponse>(&body).kind, "conflict");

    let (status, body) = send(&app, authed("GET", "/connections?page=1&page_size=10", &amara, None)).await;
    assert_eq!(status, StatusCode::OK);
    let page: PageDto<ConnectionViewDto> = json(&body);
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].partner.id, "bayo");
    assert!(!page.has_next && !page.has_prev);

    let (status, body) = send(&app, authed("GET", "/connections/stats", &bayo, None)).await;
    assert_eq!(status, StatusCode::OK);
    let stats: StatsDto = json(&body);
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.by_type.get("connect"), Some(&1));
}

#[tokio::test]
async fn test_request_errors() {
    let app = create_app();
    let amara = login(&app, "amara").await;

    let (status, body) = send(
        &app,
        authed("POST", "/connections", &amara, Some(r#"{"to_user_id": "amara"}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json::<ErrorResponse>(&body).kind, "validation");

    let (status, _) = send(
        &app,
        authed(
            "POST",
            "/connections",
            &amara,
            Some(r#"{"to_user_id": "bayo", "connection_type": "nemesis"}"#),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, authed("POST", "/connections", &amara, Some("not json"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    request_connection(&app, &amara, "bayo").await;
    let (status, _) = send(
        &app,
        authed("POST", "/connections", &amara, Some(r#"{"to_user_id": "bayo"}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, authed("POST", "/connections/not-a-uuid/accept", &amara, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_block_then_remove() {
    let app = create_app();
    let amara = login(&app, "amara").await;
    let bayo = login(&app, "bayo").await;

    let edge = request_connection(&app, &amara, "bayo").await;

    let (status, body) = send(
        &app,
        authed("POST", &format!("/connections/{}/block", edge.id), &bayo, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json::<ConnectionDto>(&body).status, "blocked");

    // Blocked pairs refuse new requests both ways
    let (status, _) = send(
        &app,
        authed("POST", "/connections", &bayo, Some(r#"{"to_user_id": "amara"}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/connections/{}", edge.id);
    let (status, _) = send(&app, authed("DELETE", &uri, &amara, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_remove_twice() {
    let app = create_app();
    let amara = login(&app, "amara").await;

    let edge = request_connection(&app, &amara, "chidi").await;
    let uri = format!("/connections/{}", edge.id);

    let (status, _) = send(&app, authed("DELETE", &uri, &amara, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, authed("DELETE", &uri, &amara, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json::<ErrorResponse>(&body).kind, "not_found");
}

#[tokio::test]
async fn test_recommendations_and_discovery() {
    let app = create_app();
    let amara = login(&app, "amara").await;

    let (status, body) = send(&app, authed("GET", "/connections/recommendations", &amara, None)).await;
    assert_eq!(status, StatusCode::OK);
    let result: RecommendationsDto = json(&body);
    assert!(!result.truncated);
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].resident.id, "bayo");
    assert_eq!(result.items[0].score, 80);
    assert_eq!(result.items[0].reasons[0].tag, "proximity");

    let (status, _) = send(
        &app,
        authed("GET", "/connections/recommendations?limit=0", &amara, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    request_connection(&app, &amara, "chidi").await;
    let (status, body) = send(
        &app,
        authed("GET", "/connections/discover?district=Mainland&order=name", &amara, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let page: PageDto<DiscoveryItemDto> = json(&body);
    let ids: Vec<&str> = page.items.iter().map(|i| i.resident.id.as_str()).collect();
    assert_eq!(ids, vec!["bayo", "chidi"]);
    assert_eq!(page.items[1].pending.as_deref(), Some("outgoing"));

    let (status, _) = send(
        &app,
        authed("GET", "/connections/discover?order=loudest", &amara, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        authed("GET", "/connections/discover?page_size=1000", &amara, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mutual_connections() {
    let app = create_app();
    let amara = login(&app, "amara").await;
    let bayo = login(&app, "bayo").await;
    let chidi = login(&app, "chidi").await;

    // amara - bayo - chidi
    let ab = request_connection(&app, &amara, "bayo").await;
    send(&app, authed("POST", &format!("/connections/{}/accept", ab.id), &bayo, None)).await;
    let cb = request_connection(&app, &chidi, "bayo").await;
    send(&app, authed("POST", &format!("/connections/{}/accept", cb.id), &bayo, None)).await;

    let (status, body) = send(&app, authed("GET", "/connections/mutual/chidi", &amara, None)).await;
    assert_eq!(status, StatusCode::OK);
    let mutual: MutualDto = json(&body);
    assert_eq!(mutual.count, 1);
    assert_eq!(mutual.residents[0].id, "bayo");

    let (status, _) = send(&app, authed("GET", "/connections/mutual/ghost", &amara, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, authed("GET", "/connections/mutual/amara", &amara, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json::<ErrorResponse>(&body).kind, "validation");
}

#[test]
fn test_server_config_from_toml() {
    let toml = r#"
        bind_address = "0.0.0.0"
        bind_port = 9000
        jwt_secret = "my-secret-key"

        [[residents]]
        id = "amara"
        display_name = "Amara"
        neighborhood = "Yaba"
    "#;

    let config: ServerConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.bind_port, 9000);
    assert_eq!(config.token_expiry_secs, 3600); // Default
    assert_eq!(config.database_path, ":memory:");
    assert_eq!(config.engine.max_page_size, 100);
    assert_eq!(config.residents.len(), 1);
}
