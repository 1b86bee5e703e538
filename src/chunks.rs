//! On-disk store for in-flight upload fragments.
//!
//! Layout is `<root>/<session id>/chunk_<index>`. The root lives outside the
//! shared folder so fragments can never be reached through the file routes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{AppError, Result};

const MAX_SESSION_ID_LEN: usize = 128;
const FRAGMENT_PREFIX: &str = "chunk_";

/// client generated upload token. restricted to characters that are safe as a directory name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(raw: &str) -> Result<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_SESSION_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(AppError::BadRequest(format!("Invalid file_id: {:?}", raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
pub struct ChunkStore {
    root: PathBuf,
    // one lock per session with a post in flight so put + count + reassemble
    // can't interleave. entries go away once nobody holds them
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl ChunkStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.root.join(session.as_str())
    }

    pub fn fragment_path(&self, session: &SessionId, index: usize) -> PathBuf {
        self.session_dir(session)
            .join(format!("{}{}", FRAGMENT_PREFIX, index))
    }

    /// hold this while touching a session's fragments
    pub async fn lock_session(&self, session: &SessionId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(session.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// persist one fragment and report how many distinct fragments of the session are on disk.
    /// an index that was already stored gets overwritten
    pub async fn put_chunk(
        &self,
        session: &SessionId,
        chunk_index: usize,
        total_chunks: usize,
        bytes: &[u8],
    ) -> Result<usize> {
        let fragment_err = |source: std::io::Error| {
            tracing::error!(
                "❌ Failed to store chunk {} of upload {}: {}",
                chunk_index,
                session,
                source
            );
            AppError::Fragment {
                session: session.to_string(),
                index: chunk_index,
                source,
            }
        };

        let dir = self.session_dir(session);
        fs::create_dir_all(&dir).await.map_err(fragment_err)?;

        let path = self.fragment_path(session, chunk_index);
        tracing::trace!("Writing {} bytes to {:?}", bytes.len(), path);

        let mut file = fs::File::create(&path).await.map_err(fragment_err)?;
        file.write_all(bytes).await.map_err(fragment_err)?;
        file.sync_all().await.map_err(fragment_err)?;

        self.count_fragments(session, total_chunks)
            .await
            .map_err(fragment_err)
    }

    /// distinct fragment indices below `total_chunks`, read back from the directory
    pub async fn count_fragments(&self, session: &SessionId, total_chunks: usize) -> std::io::Result<usize> {
        let mut entries = match fs::read_dir(self.session_dir(session)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let index = name
                .to_str()
                .and_then(|n| n.strip_prefix(FRAGMENT_PREFIX))
                .and_then(|n| n.parse::<usize>().ok());
            if matches!(index, Some(i) if i < total_chunks) {
                count += 1;
            }
        }

        Ok(count)
    }

    /// drop the session's lock entry unless another post holds or awaits it.
    /// call after releasing the guard, otherwise the guard's own clone keeps the entry
    pub fn release_session_lock(&self, session: &SessionId) {
        // lock_session clones under the same shard lock, so a newcomer either
        // bumped the count already or will create a fresh entry
        self.locks
            .remove_if(session, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// sessions with a post in flight
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    /// delete every fragment of a session
    pub async fn remove_session(&self, session: &SessionId) -> std::io::Result<()> {
        match fs::remove_dir_all(self.session_dir(session)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
