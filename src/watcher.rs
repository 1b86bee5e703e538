//! Polls the shared folder and publishes `reload` whenever the set of visible
//! file names changes. Catches edits that never go through the http routes,
//! like someone dropping a file into the folder by hand.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs;

use crate::notifier::{ChangeNotifier, Notice};
use crate::shutdown::ShutdownCoordinator;
use crate::utils::is_visible_name;

/// names of the regular, non-hidden files directly inside `dir`
pub async fn snapshot(dir: &Path) -> std::io::Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_visible_name(&name) {
            continue;
        }
        // entries can vanish between read_dir and file_type
        match entry.file_type().await {
            Ok(ft) if ft.is_file() => {
                names.insert(name);
            }
            _ => {}
        }
    }

    Ok(names)
}

pub struct DirectoryWatcher {
    dir: PathBuf,
    interval: Duration,
    notifier: Arc<ChangeNotifier>,
    last: BTreeSet<String>,
}

impl DirectoryWatcher {
    /// takes the initial snapshot, nothing is published for it
    pub async fn new(dir: PathBuf, interval: Duration, notifier: Arc<ChangeNotifier>) -> Self {
        let last = snapshot(&dir).await.unwrap_or_else(|e| {
            tracing::warn!("Initial snapshot of {:?} failed: {}", dir, e);
            BTreeSet::new()
        });
        tracing::debug!("Watching {:?} ({} files)", dir, last.len());

        Self {
            dir,
            interval,
            notifier,
            last,
        }
    }

    pub fn current(&self) -> &BTreeSet<String> {
        &self.last
    }

    /// one poll cycle. returns true if it published a reload
    pub async fn poll_once(&mut self) -> bool {
        let current = match snapshot(&self.dir).await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("Failed to read {:?}, keeping last snapshot: {}", self.dir, e);
                return false;
            }
        };

        if current == self.last {
            return false;
        }

        tracing::debug!(
            "🔄 Folder changed ({} -> {} files)",
            self.last.len(),
            current.len()
        );
        self.last = current;
        self.notifier.publish(Notice::Reload);
        true
    }

    /// poll until shutdown begins
    pub async fn run(mut self, shutdown: Arc<ShutdownCoordinator>) {
        tracing::info!("👀 Directory watcher started (every {:?})", self.interval);
        let terminated = shutdown.terminated();
        tokio::pin!(terminated);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut terminated => break,
            }

            if shutdown.is_stopping() {
                break;
            }

            self.poll_once().await;
        }

        tracing::debug!("Directory watcher stopped");
    }
}
