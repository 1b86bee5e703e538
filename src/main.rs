use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::net::SocketAddr;
use std::sync::Arc;

use lanshare::config::Config;
use lanshare::server::{build_router, print_startup_banner, serve};
use lanshare::state::AppState;
use lanshare::utils::shutdown_signal;
use lanshare::watcher::DirectoryWatcher;

// use mimalloc as the global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() {
    // load .env file if it exists (fails silently if not found)
    let _ = dotenvy::dotenv();

    // load configuration from environment variables
    let config = Config::from_env();

    // build tokio runtime with configured worker threads
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");

    runtime.block_on(async {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();

        for dir in [&config.files_dir, &config.chunks_dir] {
            if !dir.exists() {
                std::fs::create_dir_all(dir).expect("Failed to create directory");
                tracing::info!("Created directory at: {:?}", dir);
            }
        }

        let public_url = config.resolve_public_url();
        let state = Arc::new(AppState::new(&config, public_url));

        // background folder polling
        let watcher = DirectoryWatcher::new(
            config.files_dir.clone(),
            config.poll_interval,
            state.notifier.clone(),
        )
        .await;
        tokio::spawn(watcher.run(state.shutdown.clone()));

        // ctrl-c goes through the same path as the stop button
        let coordinator = state.shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            coordinator.initiate();
        });

        let app = build_router(state.clone(), &config);

        let addr = SocketAddr::from((
            config.host.parse::<std::net::IpAddr>()
                .expect("Invalid HOST"),
            config.port,
        ));

        print_startup_banner(&config, &state.public_url);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind server");

        if let Err(e) = serve(listener, app, state.shutdown.clone()).await {
            tracing::error!("Server error: {}", e);
        }

        tracing::info!("👋 Server stopped");
    });
}
