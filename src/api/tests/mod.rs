use super::*;
use crate::error::ApiError;
use crate::fetcher::test_helpers::{Counters, Fault, MockObject, MockStore};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;


fn shakespeare() -> Vec<MockObject> {
    vec![
        MockObject::text("shakespeare/a.txt", "foo\nbar"),
        MockObject::text("shakespeare/b.txt", "baz"),
        MockObject::text("shakespeare/c.txt", "qux\nfoo"),
    ]
}

/// Router over an in-memory store; `configure` adjusts the default config
fn test_app(objects: Vec<MockObject>, configure: impl FnOnce(&mut Config)) -> (Router, Arc<Counters>) {
    let mut config = Config::default();
    configure(&mut config);

    let (store, counters) = MockStore::new(objects).into_shared();
    let app = create_router(ConcurrentFetcher::new(store), Arc::new(config));
    (app, counters)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn error_body(response: axum::response::Response) -> ApiError {
    serde_json::from_value(json_body(response).await).unwrap()
}

#[tokio::test]
async fn api_server_serves_until_shutdown() {
    let mut config = Config::default();
    config.server.bind_address = "127.0.0.1:0".parse().unwrap();
    let (store, _counters) = MockStore::new(shakespeare()).into_shared();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(start_api_server(
        ConcurrentFetcher::new(store),
        Arc::new(config),
        async move {
            stop_rx.await.ok();
        },
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stops after shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn api_server_reports_bind_failure() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = Config::default();
    config.server.bind_address = occupied.local_addr().unwrap();
    let (store, _counters) = MockStore::new(Vec::new()).into_shared();

    let result = start_api_server(ConcurrentFetcher::new(store), Arc::new(config), async {}).await;
    assert!(matches!(result, Err(crate::Error::Io(_))));
}

#[tokio::test]
async fn cors_enabled_adds_allow_origin_header() {
    let (app, _counters) = test_app(shakespeare(), |config| {
        config.server.cors_enabled = true;
        config.server.cors_origins = vec!["*".to_string()];
    });

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn cors_specific_origin_is_echoed() {
    let (app, _counters) = test_app(shakespeare(), |config| {
        config.server.cors_enabled = true;
        config.server.cors_origins = vec!["https://reader.example.com".to_string()];
    });

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "https://reader.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://reader.example.com"
    );
}

#[tokio::test]
async fn cors_disabled_adds_no_header() {
    let (app, _counters) = test_app(shakespeare(), |_| {});

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (app, _counters) = test_app(shakespeare(), |_| {});
    let response = app.oneshot(get_request("/downloads")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_skips_unusable_origins_and_keeps_the_rest() {
    let (app, _counters) = test_app(shakespeare(), |config| {
        config.server.cors_enabled = true;
        config.server.cors_origins = vec![
            "not a header\u{7f}".to_string(),
            "https://reader.example.com".to_string(),
        ];
    });

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "https://reader.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://reader.example.com"
    );
}

#[tokio::test]
async fn cors_preflight_allows_only_get() {
    let (app, _counters) = test_app(shakespeare(), |config| {
        config.server.cors_enabled = true;
    });

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/")
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["access-control-allow-methods"], "GET");
}
