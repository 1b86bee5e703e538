use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use lanshare::config::Config;
use lanshare::middleware::{add_security_headers, reject_when_stopping};
use lanshare::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

#[tokio::test]
async fn test_add_security_headers() {
    let app = Router::new()
        .route("/", get(|| async { "hello" }))
        .layer(from_fn(add_security_headers));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers
        .get("content-security-policy")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("default-src 'self'"));
}

#[tokio::test]
async fn test_reject_when_stopping() {
    let config = Config {
        shutdown_grace: Duration::from_millis(10),
        ..Config::default()
    };
    let state = Arc::new(AppState::new(&config, "http://127.0.0.1:8000".to_string()));

    let app = Router::new()
        .route("/", get(|| async { "hello" }))
        .route("/shutdown", post(|| async { "bye" }))
        .route("/events", get(|| async { "stream" }))
        .layer(from_fn_with_state(state.clone(), reject_when_stopping));

    // business as usual
    let response = app.clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    state.shutdown.initiate();

    // Test rejected after shutdown began
    let response = app.clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // late pages still reach the event stream
    let response = app.clone()
        .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Test shutdown itself still answers
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/shutdown")
                .body(Body::empty())
                .unwrap()
            )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
