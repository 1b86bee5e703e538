use lanshare::config::Config;
use std::env;
use std::time::Duration;

// helper to clear env vars
fn clear_env() {
    env::remove_var("FILES_DIR");
    env::remove_var("CHUNKS_DIR");
    env::remove_var("HOST");
    env::remove_var("PORT");
    env::remove_var("PUBLIC_URL");
    env::remove_var("MAX_UPLOAD_SIZE");
    env::remove_var("CHUNK_SIZE");
    env::remove_var("POLL_INTERVAL_MS");
    env::remove_var("SHUTDOWN_GRACE_MS");
    env::remove_var("WORKER_THREADS");
}

#[test]
fn test_config_behavior() {
    // Run these sequentially to avoid race conditions with environment variables

    // 1. Test Defaults
    clear_env();

    let config = Config::from_env();

    assert_eq!(config.files_dir.to_str().unwrap(), "./uploads");
    assert_eq!(config.chunks_dir, env::temp_dir().join("lanshare-chunks"));
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 8000);
    assert_eq!(config.public_url, None);
    assert_eq!(config.max_upload_size, 100 * 1024 * 1024);
    assert_eq!(config.chunk_size, 5 * 1024 * 1024);
    assert_eq!(config.poll_interval, Duration::from_secs(1));
    assert_eq!(config.shutdown_grace, Duration::from_millis(1500));
    assert_eq!(config.worker_threads, 4);

    // 2. Test From Env
    clear_env();

    env::set_var("FILES_DIR", "/tmp/test_files");
    env::set_var("CHUNKS_DIR", "/tmp/test_chunks");
    env::set_var("PORT", "9090");
    env::set_var("PUBLIC_URL", "http://192.168.1.20:9090/");
    env::set_var("CHUNK_SIZE", "1024");
    env::set_var("POLL_INTERVAL_MS", "250");
    env::set_var("SHUTDOWN_GRACE_MS", "0");
    env::set_var("WORKER_THREADS", "2");

    let config = Config::from_env();

    assert_eq!(config.files_dir.to_str().unwrap(), "/tmp/test_files");
    assert_eq!(config.chunks_dir.to_str().unwrap(), "/tmp/test_chunks");
    assert_eq!(config.port, 9090);
    assert_eq!(config.public_url.as_deref(), Some("http://192.168.1.20:9090"));
    assert_eq!(config.resolve_public_url(), "http://192.168.1.20:9090");
    assert_eq!(config.chunk_size, 1024);
    assert_eq!(config.poll_interval, Duration::from_millis(250));
    assert_eq!(config.shutdown_grace, Duration::ZERO);
    assert_eq!(config.worker_threads, 2);

    // 3. Garbage falls back to defaults
    clear_env();

    env::set_var("PORT", "not-a-port");
    env::set_var("CHUNK_SIZE", "0");
    env::set_var("POLL_INTERVAL_MS", "-5");
    env::set_var("WORKER_THREADS", "0");

    let config = Config::from_env();

    assert_eq!(config.port, 8000);
    assert_eq!(config.chunk_size, 5 * 1024 * 1024);
    assert_eq!(config.poll_interval, Duration::from_secs(1));
    assert_eq!(config.worker_threads, 4);

    // Cleanup
    clear_env();
}

#[test]
fn test_detected_public_url_uses_port() {
    let config = Config {
        port: 8123,
        public_url: None,
        ..Config::default()
    };

    let url = config.resolve_public_url();
    assert!(url.starts_with("http://"));
    assert!(url.ends_with(":8123"));
}

#[test]
fn test_chunk_size_above_upload_limit() {
    let config = Config::default();
    assert!(!config.chunk_size_exceeds_limit());

    let config = Config {
        chunk_size: 2048,
        max_upload_size: 1024,
        ..Config::default()
    };
    assert!(config.chunk_size_exceeds_limit());

    // equal is fine, the body limit is inclusive
    let config = Config {
        chunk_size: 1024,
        max_upload_size: 1024,
        ..Config::default()
    };
    assert!(!config.chunk_size_exceeds_limit());
}
