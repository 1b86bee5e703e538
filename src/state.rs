use std::path::PathBuf;
use std::sync::Arc;

use crate::chunks::ChunkStore;
use crate::config::Config;
use crate::notifier::ChangeNotifier;
use crate::shutdown::ShutdownCoordinator;

/// shared application state, one per server instance
#[derive(Debug)]
pub struct AppState {
    pub files_dir: PathBuf,
    /// in-flight chunk fragments
    pub chunks: ChunkStore,
    /// everyone with an open `/events` stream
    pub notifier: Arc<ChangeNotifier>,
    pub shutdown: Arc<ShutdownCoordinator>,
    /// what the qr code points at
    pub public_url: String,
    /// slice size handed to the browser upload client
    pub chunk_size: usize,
}

impl AppState {
    pub fn new(config: &Config, public_url: String) -> Self {
        let notifier = Arc::new(ChangeNotifier::new());
        let shutdown = Arc::new(ShutdownCoordinator::new(
            notifier.clone(),
            config.shutdown_grace,
        ));

        Self {
            files_dir: config.files_dir.clone(),
            chunks: ChunkStore::new(config.chunks_dir.clone()),
            notifier,
            shutdown,
            public_url,
            chunk_size: config.chunk_size,
        }
    }
}
