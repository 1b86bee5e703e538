use axum::{
    body::{Body, Bytes},
    extract::{multipart::MultipartError, Multipart, Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Json, Redirect, Response,
    },
};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::path::Path as FsPath;
use std::pin::Pin;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::WaitForCancellationFutureOwned;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::chunks::SessionId;
use crate::error::{AppError, Result};
use crate::models::{FileInfo, FileListResponse};
use crate::notifier::{ChangeNotifier, ListenerHandle, Notice};
use crate::page::{qr_svg, render_index};
use crate::reassembly::{accept_chunk, staging_path, ChunkOutcome, IncomingChunk};
use crate::state::AppState;
use crate::utils::{encode_path_segment, is_visible_name, sanitize_filename};

fn bad_multipart(e: MultipartError) -> AppError {
    tracing::warn!("Failed to read multipart body: {}", e);
    AppError::BadRequest(format!("Failed to read multipart body: {}", e))
}

/// visible regular files in the shared folder, sorted by name
pub async fn read_entries(dir: &FsPath) -> Result<Vec<FileInfo>> {
    let mut files = Vec::new();
    let mut entries = fs::read_dir(dir).await.map_err(|e| {
        tracing::error!("Failed to read directory {:?}: {}", dir, e);
        AppError::Io(e)
    })?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_visible_name(&name) {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("Failed to read metadata for {}: {}", name, e);
                continue;
            }
        };

        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .and_then(|d| chrono::DateTime::from_timestamp(d.as_secs() as i64, 0))
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        tracing::trace!("Found file: {} ({} bytes)", name, metadata.len());
        files.push(FileInfo {
            name,
            size: metadata.len(),
            modified,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

// the page
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>> {
    let files = read_entries(&state.files_dir).await?;
    tracing::debug!("Rendering index with {} files", files.len());
    Ok(Html(render_index(&files, state.chunk_size, &state.public_url)))
}

// list all files in the shared folder
pub async fn list_files(State(state): State<Arc<AppState>>) -> Result<Json<FileListResponse>> {
    let files = read_entries(&state.files_dir).await?;
    let total = files.len();
    tracing::debug!("Found {} files total", total);
    Ok(Json(FileListResponse { files, total }))
}

pub async fn qr_code(State(state): State<Arc<AppState>>) -> Result<Response> {
    let svg = qr_svg(&state.public_url)?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        svg,
    )
        .into_response())
}

fn parse_number(field: &str, value: Option<String>) -> Result<usize> {
    let value = value.ok_or_else(|| AppError::BadRequest(format!("Missing field: {}", field)))?;
    value
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {}: {:?}", field, value)))
}

// receive one slice of a chunked upload. the last one triggers reassembly
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<StatusCode> {
    let mut file_id = None;
    let mut chunk_index = None;
    let mut total_chunks = None;
    let mut filename = None;
    let mut bytes: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "chunk" => bytes = Some(field.bytes().await.map_err(bad_multipart)?),
            "file_id" => file_id = Some(field.text().await.map_err(bad_multipart)?),
            "chunk_index" => chunk_index = Some(field.text().await.map_err(bad_multipart)?),
            "total_chunks" => total_chunks = Some(field.text().await.map_err(bad_multipart)?),
            "filename" => filename = Some(field.text().await.map_err(bad_multipart)?),
            other => tracing::trace!("Ignoring multipart field {:?}", other),
        }
    }

    let session = SessionId::parse(
        file_id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Missing field: file_id".to_string()))?,
    )?;
    let chunk_index = parse_number("chunk_index", chunk_index)?;
    let total_chunks = parse_number("total_chunks", total_chunks)?;
    let raw_name = filename.ok_or_else(|| AppError::BadRequest("Missing field: filename".to_string()))?;
    let filename = sanitize_filename(&raw_name)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid filename: {:?}", raw_name)))?;
    let bytes = bytes.ok_or_else(|| AppError::BadRequest("Missing field: chunk".to_string()))?;

    let chunk = IncomingChunk {
        session,
        chunk_index,
        total_chunks,
        filename,
        bytes,
    };

    match accept_chunk(&state.chunks, &state.files_dir, &state.notifier, chunk).await? {
        ChunkOutcome::Pending { received, total } => {
            tracing::trace!("Upload waiting on {} more chunk(s)", total - received);
        }
        ChunkOutcome::Assembled { filename, size } => {
            tracing::debug!("{} assembled ({} bytes)", filename, size);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

// whole-file upload, what the page falls back to without javascript
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Redirect> {
    tracing::debug!("Processing file upload request");
    let mut saved = 0usize;

    while let Some(mut field) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        // browsers send an empty part when no file was picked
        let Some(filename) = sanitize_filename(&raw_name) else {
            tracing::warn!("Skipping upload with unusable filename {:?}", raw_name);
            continue;
        };

        let staging = staging_path(&state.files_dir, &filename);
        let mut file = fs::File::create(&staging).await?;
        let mut size = 0u64;

        let written = async {
            while let Some(data) = field.chunk().await.map_err(bad_multipart)? {
                size += data.len() as u64;
                file.write_all(&data).await?;
            }
            file.sync_all().await?;
            fs::rename(&staging, state.files_dir.join(&filename)).await?;
            Ok::<(), AppError>(())
        }
        .await;

        if let Err(e) = written {
            tracing::error!("Failed to save upload {}: {}", filename, e);
            let _ = fs::remove_file(&staging).await;
            return Err(e);
        }

        tracing::info!("✅ Uploaded file: {} ({} bytes)", filename, size);
        saved += 1;
    }

    if saved == 0 {
        tracing::warn!("Upload request contained no file field");
        return Err(AppError::BadRequest("No file provided".to_string()));
    }

    state.notifier.publish(Notice::Reload);
    Ok(Redirect::to("/"))
}

#[derive(Debug, Clone, Copy)]
enum Disposition {
    Attachment,
    Inline,
}

fn content_disposition(kind: Disposition, filename: &str) -> Option<HeaderValue> {
    let kind = match kind {
        Disposition::Attachment => "attachment",
        Disposition::Inline => "inline",
    };
    // plain ascii for old clients, the exact name in filename*
    let fallback: String = filename
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect();
    HeaderValue::from_str(&format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        kind,
        fallback,
        encode_path_segment(filename)
    ))
    .ok()
}

async fn serve_shared_file(
    state: &AppState,
    filename: &str,
    req: Request,
    kind: Disposition,
) -> Result<Response> {
    let name = sanitize_filename(filename).ok_or_else(|| {
        tracing::warn!("Rejected file request for {:?}", filename);
        AppError::NotFound(filename.to_string())
    })?;
    let path = state.files_dir.join(&name);

    let is_file = fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false);
    if !is_file {
        tracing::warn!("File not found: {}", name);
        return Err(AppError::NotFound(name));
    }

    tracing::debug!("Serving {} ({:?})", name, kind);
    let response = match ServeFile::new(&path).oneshot(req).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new);
    if let Some(value) = content_disposition(kind, &name) {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

// download as attachment
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    req: Request,
) -> Result<Response> {
    serve_shared_file(&state, &filename, req, Disposition::Attachment).await
}

// show in the browser
pub async fn view_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    req: Request,
) -> Result<Response> {
    serve_shared_file(&state, &filename, req, Disposition::Inline).await
}

// delete a specific file
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<StatusCode> {
    tracing::debug!("Request to delete file: {}", filename);

    let name = sanitize_filename(&filename).ok_or_else(|| AppError::NotFound(filename.clone()))?;
    let file_path = state.files_dir.join(&name);
    tracing::trace!("Target path for deletion: {:?}", file_path);

    let is_file = fs::metadata(&file_path).await.map(|m| m.is_file()).unwrap_or(false);
    if !is_file {
        tracing::warn!("File not found for deletion: {}", name);
        return Err(AppError::NotFound(name));
    }

    match fs::remove_file(&file_path).await {
        Ok(()) => {}
        // lost a race with another delete
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound(name)),
        Err(source) => {
            tracing::error!("Failed to delete file {}: {}", name, source);
            return Err(AppError::Delete {
                filename: name,
                source,
            });
        }
    }

    tracing::info!("🗑️  Deleted file: {}", name);
    state.notifier.publish(Notice::Reload);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn shutdown(State(state): State<Arc<AppState>>) -> &'static str {
    if state.shutdown.initiate() {
        tracing::info!("Shutdown requested over http");
    }
    "Server shutting down..."
}

/// one open event stream. unsubscribes when the connection goes away
struct Subscription {
    notifier: Arc<ChangeNotifier>,
    handle: ListenerHandle,
    terminated: Pin<Box<WaitForCancellationFutureOwned>>,
    // subscribed after the shutdown notice went out
    late_shutdown: bool,
    done: bool,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.notifier.unsubscribe(self.handle.id());
    }
}

impl Subscription {
    async fn next_notice(&mut self) -> Option<Notice> {
        if self.done {
            return None;
        }
        if self.late_shutdown {
            self.done = true;
            return Some(Notice::Shutdown);
        }

        let notice = tokio::select! {
            notice = self.handle.recv() => notice,
            _ = &mut self.terminated => None,
        }?;

        // nothing follows a shutdown, end the stream so the server can drain
        if notice == Notice::Shutdown {
            self.done = true;
        }
        Some(notice)
    }
}

// live update stream: `data: reload` / `data: shutdown`
pub async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let handle = state.notifier.subscribe();
    tracing::debug!("Event stream opened for {}", handle.id());

    let subscription = Subscription {
        notifier: state.notifier.clone(),
        handle,
        terminated: Box::pin(state.shutdown.terminated()),
        late_shutdown: state.shutdown.is_stopping(),
        done: false,
    };

    let stream = stream::unfold(subscription, |mut sub| async move {
        let notice = sub.next_notice().await?;
        Some((Ok::<_, Infallible>(Event::default().data(notice.as_str())), sub))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
