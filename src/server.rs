use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::handlers::{
    delete_file, download_file, events, index, list_files, qr_code, shutdown, upload_chunk,
    upload_file, view_file,
};
use crate::middleware::{add_security_headers, reject_when_stopping};
use crate::shutdown::ShutdownCoordinator;
use crate::state::AppState;

/// build the router
pub fn build_router(state: Arc<AppState>, config: &Config) -> Router {
    tracing::debug!("Building router with max upload size: {} bytes", config.max_upload_size);

    Router::new()
        .route("/", get(index))
        .route("/api/files", get(list_files))
        .route("/qrcode", get(qr_code))
        .route("/upload", post(upload_file))
        .route("/upload_chunk", post(upload_chunk))
        .route("/uploads/*filename", get(download_file))
        .route("/view/*filename", get(view_file))
        .route("/delete/*filename", post(delete_file))
        .route("/shutdown", post(shutdown))
        .route("/events", get(events))
        .layer(axum::middleware::from_fn_with_state(state.clone(), reject_when_stopping))
        .layer(axum::middleware::from_fn(add_security_headers))
        // multipart has its own 2MB default, the tower-http limit is the real ceiling
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_size))
        // event streams are skipped by the default predicate
        .layer(CompressionLayer::new()
            .gzip(true)
            .br(true)
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// serve until the shutdown coordinator's grace period runs out
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: Arc<ShutdownCoordinator>,
) -> std::io::Result<()> {
    tracing::debug!("Listener bound to {}", listener.local_addr()?);

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown.terminated())
    .tcp_nodelay(true);

    tracing::info!("Server running and ready to accept connections");
    server.await
}

/// print startup banner with server info
pub fn print_startup_banner(config: &Config, public_url: &str) {
    tracing::info!("lanshare starting...");
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    tracing::info!("📡 OPEN ON YOUR LAN: {}", public_url);
    tracing::info!("🔌 Listening on: {}:{}", config.host, config.port);
    tracing::info!("📁 Sharing files from: {:?}", config.files_dir.canonicalize().unwrap_or(config.files_dir.clone()));
    tracing::info!("🧩 Chunk fragments in: {:?}", config.chunks_dir);
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if config.chunk_size_exceeds_limit() {
        tracing::warn!(
            "⚠️  CHUNK_SIZE ({}) exceeds MAX_UPLOAD_SIZE ({}), chunk uploads will be rejected",
            config.chunk_size,
            config.max_upload_size
        );
    }
}
