use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::chunks::{ChunkStore, SessionId};
use crate::error::{AppError, Result};
use crate::notifier::{ChangeNotifier, Notice};

/// one posted chunk, already validated
#[derive(Debug, Clone)]
pub struct IncomingChunk {
    pub session: SessionId,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// sanitized target name inside the shared folder
    pub filename: String,
    pub bytes: axum::body::Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// stored, still waiting for more
    Pending { received: usize, total: usize },
    /// that was the last one, the file is in the shared folder
    Assembled { filename: String, size: u64 },
}

/// hidden sibling the output is written to before it is renamed into place
pub fn staging_path(files_dir: &Path, filename: &str) -> PathBuf {
    files_dir.join(format!(".{}.{}.part", filename, Uuid::new_v4().simple()))
}

/// store a chunk and, if it completes its session, reassemble the file.
/// the whole thing runs under the session lock, so exactly one post triggers reassembly
pub async fn accept_chunk(
    store: &ChunkStore,
    files_dir: &Path,
    notifier: &ChangeNotifier,
    chunk: IncomingChunk,
) -> Result<ChunkOutcome> {
    if chunk.total_chunks == 0 || chunk.chunk_index >= chunk.total_chunks {
        return Err(AppError::BadRequest(format!(
            "chunk_index {} out of range for total_chunks {}",
            chunk.chunk_index, chunk.total_chunks
        )));
    }

    let session = chunk.session.clone();
    let guard = store.lock_session(&session).await;
    let outcome = accept_locked(store, files_dir, notifier, chunk).await;
    drop(guard);
    store.release_session_lock(&session);

    outcome
}

async fn accept_locked(
    store: &ChunkStore,
    files_dir: &Path,
    notifier: &ChangeNotifier,
    chunk: IncomingChunk,
) -> Result<ChunkOutcome> {
    let received = store
        .put_chunk(&chunk.session, chunk.chunk_index, chunk.total_chunks, &chunk.bytes)
        .await?;

    tracing::debug!(
        "📦 Received chunk {} ({}/{}) for upload {}",
        chunk.chunk_index,
        received,
        chunk.total_chunks,
        chunk.session
    );

    if received < chunk.total_chunks {
        return Ok(ChunkOutcome::Pending {
            received,
            total: chunk.total_chunks,
        });
    }

    let size = reassemble(store, files_dir, &chunk.session, chunk.total_chunks, &chunk.filename).await?;
    notifier.publish(Notice::Reload);

    Ok(ChunkOutcome::Assembled {
        filename: chunk.filename,
        size,
    })
}

/// concatenate fragments `0..total_chunks` in order into `files_dir/filename`.
/// the output only appears under its real name once every byte is written
pub async fn reassemble(
    store: &ChunkStore,
    files_dir: &Path,
    session: &SessionId,
    total_chunks: usize,
    filename: &str,
) -> Result<u64> {
    let final_path = files_dir.join(filename);
    let staging = staging_path(files_dir, filename);
    tracing::debug!("Assembling {} chunks into {:?} via {:?}", total_chunks, final_path, staging);

    if let Err(e) = write_staged(store, session, total_chunks, filename, &staging).await {
        tracing::error!("❌ Reassembly of {} (upload {}) failed: {}", filename, session, e);
        // fragments stay for diagnosis, only the partial output goes
        let _ = fs::remove_file(&staging).await;
        return Err(e);
    }

    if let Err(source) = fs::rename(&staging, &final_path).await {
        tracing::error!("❌ Failed to move {:?} into place: {}", staging, source);
        let _ = fs::remove_file(&staging).await;
        return Err(AppError::Reassembly {
            filename: filename.to_string(),
            source,
        });
    }

    if let Err(e) = store.remove_session(session).await {
        tracing::warn!("Failed to clean up fragments of upload {}: {}", session, e);
    }

    let size = fs::metadata(&final_path).await.map(|m| m.len()).unwrap_or(0);
    tracing::info!("✅ Completed chunked upload: {} ({} bytes)", filename, size);
    Ok(size)
}

async fn write_staged(
    store: &ChunkStore,
    session: &SessionId,
    total_chunks: usize,
    filename: &str,
    staging: &Path,
) -> Result<()> {
    let io_err = |source: std::io::Error| AppError::Reassembly {
        filename: filename.to_string(),
        source,
    };

    let mut out = fs::File::create(staging).await.map_err(io_err)?;

    for index in 0..total_chunks {
        let fragment = store.fragment_path(session, index);
        tracing::trace!("Appending {:?}", fragment);

        let data = match fs::read(&fragment).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::MissingFragment {
                    session: session.to_string(),
                    index,
                });
            }
            Err(e) => return Err(io_err(e)),
        };

        out.write_all(&data).await.map_err(io_err)?;
    }

    out.sync_all().await.map_err(io_err)?;
    Ok(())
}
