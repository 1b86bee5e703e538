use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::error::AppError;
use crate::state::AppState;

// paths still answered after shutdown begins. /events hands a late page the
// shutdown notice, /shutdown answers (and ignores) a repeated request
const OPEN_WHILE_STOPPING: [&str; 2] = ["/events", "/shutdown"];

// once shutdown has begun nothing new gets in
pub async fn reject_when_stopping(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if state.shutdown.is_stopping() && !OPEN_WHILE_STOPPING.iter().any(|open| *open == path) {
        tracing::debug!("Rejecting {} {} during shutdown", req.method(), path);
        return AppError::ShuttingDown.into_response();
    }

    next.run(req).await
}

/// headers & shit
pub async fn add_security_headers(
    req: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static("DENY"),
    );
    // the page ships its script and styles inline
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data:",
        ),
    );

    response
}
