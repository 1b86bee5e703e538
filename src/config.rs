use std::path::PathBuf;
use std::time::Duration;

/// application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// the shared folder
    pub files_dir: PathBuf,
    /// where in-flight chunk fragments live, one directory per upload session
    pub chunks_dir: PathBuf,
    /// listen address
    pub host: String,
    /// listen port
    pub port: u16,
    /// url encoded into the qr code, detected from the lan ip when unset
    pub public_url: Option<String>,
    /// maximum request body size in bytes
    pub max_upload_size: usize,
    /// slice size the browser uses for chunked uploads
    pub chunk_size: usize,
    /// how often the directory watcher polls
    pub poll_interval: Duration,
    /// time between the shutdown notice and the serving loop stopping
    pub shutdown_grace: Duration,
    /// number of tokio worker threads
    pub worker_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            files_dir: PathBuf::from("./uploads"),
            chunks_dir: std::env::temp_dir().join("lanshare-chunks"),
            host: "0.0.0.0".to_string(),
            port: 8000,
            public_url: None,
            max_upload_size: 100 * 1024 * 1024, // 100MB
            chunk_size: 5 * 1024 * 1024,        // 5MB
            poll_interval: Duration::from_millis(1000),
            shutdown_grace: Duration::from_millis(1500),
            worker_threads: 4,
        }
    }
}

impl Config {
    /// load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            files_dir: std::env::var("FILES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.files_dir),
            chunks_dir: std::env::var("CHUNKS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.chunks_dir),
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT").unwrap_or(defaults.port),
            public_url: std::env::var("PUBLIC_URL")
                .ok()
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            max_upload_size: parse_var("MAX_UPLOAD_SIZE").unwrap_or(defaults.max_upload_size),
            chunk_size: parse_var("CHUNK_SIZE")
                .filter(|s: &usize| *s > 0)
                .unwrap_or(defaults.chunk_size),
            poll_interval: parse_var("POLL_INTERVAL_MS")
                .filter(|ms: &u64| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            shutdown_grace: parse_var("SHUTDOWN_GRACE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_grace),
            worker_threads: parse_var("WORKER_THREADS")
                .filter(|t: &usize| *t > 0)
                .unwrap_or(defaults.worker_threads),
        }
    }

    /// a browser slice bigger than the body ceiling can never be accepted
    pub fn chunk_size_exceeds_limit(&self) -> bool {
        self.chunk_size > self.max_upload_size
    }

    /// url other devices should open, as shown in the qr code
    pub fn resolve_public_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.clone(),
            None => format!("http://{}:{}", crate::utils::local_ip(), self.port),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
