use lanshare::config::Config;
use lanshare::notifier::{ChangeNotifier, Notice};
use lanshare::server::{build_router, serve};
use lanshare::shutdown::ShutdownCoordinator;
use lanshare::state::AppState;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_initiate_is_single_fire() {
    let notifier = Arc::new(ChangeNotifier::new());
    let shutdown = ShutdownCoordinator::new(notifier.clone(), Duration::from_millis(20));
    let mut listener = notifier.subscribe();

    assert!(!shutdown.is_stopping());
    assert!(shutdown.initiate());
    assert!(shutdown.is_stopping());
    assert!(!shutdown.initiate());
    assert!(!shutdown.initiate());

    assert_eq!(listener.try_recv(), Some(Notice::Shutdown));
    assert_eq!(listener.try_recv(), None);

    tokio::time::timeout(Duration::from_secs(5), shutdown.terminated())
        .await
        .expect("never terminated");
    assert!(shutdown.is_terminated());

    // still nothing extra after the grace period
    assert_eq!(listener.try_recv(), None);
}

#[tokio::test]
async fn test_termination_waits_for_grace_period() {
    let notifier = Arc::new(ChangeNotifier::new());
    let shutdown = ShutdownCoordinator::new(notifier, Duration::from_millis(300));
    assert_eq!(shutdown.grace(), Duration::from_millis(300));

    let started = std::time::Instant::now();
    shutdown.initiate();
    assert!(!shutdown.is_terminated());

    shutdown.terminated().await;
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_shutdown_sequencing_with_live_server() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config {
        files_dir: temp_dir.path().join("shared"),
        chunks_dir: temp_dir.path().join("chunks"),
        shutdown_grace: Duration::from_millis(200),
        ..Config::default()
    };
    std::fs::create_dir_all(&config.files_dir).unwrap();
    let state = Arc::new(AppState::new(&config, "http://127.0.0.1".to_string()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state.clone(), &config);
    let server = tokio::spawn(serve(listener, app, state.shutdown.clone()));

    let mut first = state.notifier.subscribe();
    let mut second = state.notifier.subscribe();

    // both concurrent requests race for the latch, exactly one wins
    let (a, b) = tokio::join!(
        async { state.shutdown.initiate() },
        async { state.shutdown.initiate() }
    );
    assert!(a ^ b);

    // both listeners hear about it while the server is still up
    assert_eq!(first.try_recv(), Some(Notice::Shutdown));
    assert_eq!(second.try_recv(), Some(Notice::Shutdown));
    assert_eq!(first.try_recv(), None);
    assert_eq!(second.try_recv(), None);
    assert!(!server.is_finished());
    assert!(tokio::net::TcpStream::connect(addr).await.is_ok());

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
