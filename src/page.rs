//! The single html page and the qr code that points at it.

use qrcode::render::svg;
use qrcode::QrCode;

use crate::error::{AppError, Result};
use crate::models::FileInfo;
use crate::utils::{encode_path_segment, escape_html};

const FILE_LIST_SLOT: &str = "{{FILE_LIST}}";
const CHUNK_SIZE_SLOT: &str = "{{CHUNK_SIZE}}";
const PUBLIC_URL_SLOT: &str = "{{PUBLIC_URL}}";

const EMPTY_LIST: &str = r#"<p class="empty">No files uploaded yet.</p>"#;

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Local File Sharing</title>
  <style>
    * { box-sizing: border-box; }
    body { margin: 0; background: #121212; color: #e0e0e0; font-family: system-ui, sans-serif; }
    nav { display: flex; align-items: center; padding: 12px 20px; background: #1f1f1f; }
    nav .brand { font-size: 1.2em; }
    nav button { margin-left: auto; }
    main { max-width: 900px; margin: 20px auto; padding: 0 16px; }
    button, .btn { background: #2a2a2a; color: #e0e0e0; border: 1px solid #444; border-radius: 6px; padding: 6px 12px; cursor: pointer; text-decoration: none; font-size: 0.9em; }
    .danger { background: #b02a37; border-color: #b02a37; color: #fff; }
    #uploadArea { border: 2px dashed #333; padding: 30px; border-radius: 12px; text-align: center; cursor: pointer; margin-bottom: 24px; }
    #uploadArea.dragover { background: #1e1e1e; }
    #progress { margin-top: 10px; font-size: 0.9em; color: #00ffaa; min-height: 1.2em; }
    .file-card { display: flex; justify-content: space-between; align-items: center; gap: 10px; background: #1e1e1e; border-radius: 8px; padding: 12px 16px; margin-bottom: 12px; }
    .file-card .name { overflow: hidden; text-overflow: ellipsis; white-space: nowrap; max-width: 60%; }
    .file-card .actions { display: flex; gap: 8px; }
    .empty { text-align: center; color: #888; }
    .qr { text-align: center; margin-top: 30px; }
    .qr img { width: 160px; height: 160px; background: #fff; border-radius: 6px; }
    .qr small { display: block; color: #888; margin-top: 6px; }
    #shutdown-overlay { position: fixed; inset: 0; background: rgba(0, 0, 0, 0.95); display: none; justify-content: center; align-items: center; flex-direction: column; z-index: 9999; }
    .spinner { border: 8px solid #f3f3f3; border-top: 8px solid #00ffaa; border-radius: 50%; width: 60px; height: 60px; animation: spin 1s linear infinite; margin-bottom: 15px; }
    @keyframes spin { 0% { transform: rotate(0deg); } 100% { transform: rotate(360deg); } }
    @media (max-width: 576px) {
      #uploadArea { padding: 20px; }
      .file-card { flex-direction: column; align-items: flex-start; }
      .file-card .name { max-width: 100%; }
    }
  </style>
</head>
<body>
<div id="shutdown-overlay">
  <div class="spinner"></div>
  <h3>Server stopped</h3>
</div>

<nav>
  <span class="brand">📁 FileShare</span>
  <button class="danger" onclick="stopServer()">Stop Server</button>
</nav>

<main>
  <div id="uploadArea">
    <p>Drag &amp; Drop files here or click to upload</p>
    <small>Supported: Any file type</small>
    <form id="uploadForm" method="POST" action="/upload" enctype="multipart/form-data" hidden>
      <input id="fileInput" type="file" name="file" multiple>
    </form>
    <div id="progress"></div>
  </div>

  <div id="fileList">{{FILE_LIST}}</div>

  <div class="qr">
    <h4>Open on Another Device</h4>
    <img src="/qrcode" alt="QR Code">
    <small>{{PUBLIC_URL}}</small>
  </div>
</main>

<script>
  const CHUNK_SIZE = {{CHUNK_SIZE}};
  const uploadArea = document.getElementById('uploadArea');
  const fileInput = document.getElementById('fileInput');
  const progress = document.getElementById('progress');
  const fileList = document.getElementById('fileList');

  uploadArea.addEventListener('click', (e) => { if (e.target !== fileInput) fileInput.click(); });
  fileInput.addEventListener('change', () => uploadAll(fileInput.files));
  uploadArea.addEventListener('dragover', (e) => { e.preventDefault(); uploadArea.classList.add('dragover'); });
  uploadArea.addEventListener('dragleave', () => uploadArea.classList.remove('dragover'));
  uploadArea.addEventListener('drop', (e) => {
    e.preventDefault();
    uploadArea.classList.remove('dragover');
    uploadAll(e.dataTransfer.files);
  });

  function newFileId() {
    return Date.now().toString(36) + '-' + Math.random().toString(36).slice(2, 10);
  }

  // one chunk in flight at a time
  async function uploadFile(file) {
    const fileId = newFileId();
    const totalChunks = Math.max(1, Math.ceil(file.size / CHUNK_SIZE));
    for (let i = 0; i < totalChunks; i++) {
      const form = new FormData();
      form.append('file_id', fileId);
      form.append('chunk_index', i);
      form.append('total_chunks', totalChunks);
      form.append('filename', file.name);
      form.append('chunk', file.slice(i * CHUNK_SIZE, (i + 1) * CHUNK_SIZE), file.name);
      const res = await fetch('/upload_chunk', { method: 'POST', body: form });
      if (!res.ok) throw new Error(await res.text());
      progress.textContent = `${file.name}: ${Math.round(((i + 1) / totalChunks) * 100)}%`;
    }
  }

  async function uploadAll(files) {
    for (const file of Array.from(files)) {
      try {
        await uploadFile(file);
      } catch (err) {
        progress.textContent = `${file.name}: upload failed (${err.message})`;
        return;
      }
    }
    progress.textContent = '';
    fileInput.value = '';
    refreshList();
  }

  function escapeHtml(s) {
    return s.replace(/[&<>"']/g, (c) => ({ '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' }[c]));
  }

  function renderList(files) {
    if (files.length === 0) {
      fileList.innerHTML = '<p class="empty">No files uploaded yet.</p>';
      return;
    }
    fileList.innerHTML = files.map((f) => {
      const enc = encodeURIComponent(f.name);
      return `<div class="file-card"><span class="name" title="${escapeHtml(f.name)}">${escapeHtml(f.name)}</span>` +
        `<div class="actions"><a class="btn" href="/view/${enc}" target="_blank">View</a>` +
        `<a class="btn" href="/uploads/${enc}">Download</a>` +
        `<button class="danger" data-name="${escapeHtml(f.name)}">Delete</button></div></div>`;
    }).join('');
  }

  async function refreshList() {
    try {
      const res = await fetch('/api/files');
      if (res.ok) renderList((await res.json()).files);
    } catch (_) {}
  }

  fileList.addEventListener('click', (e) => {
    const name = e.target.dataset && e.target.dataset.name;
    if (name !== undefined) deleteFile(name);
  });

  function deleteFile(name) {
    fetch('/delete/' + encodeURIComponent(name), { method: 'POST' }).then(refreshList);
  }

  function showStopped() {
    document.getElementById('shutdown-overlay').style.display = 'flex';
  }

  function stopServer() {
    showStopped();
    fetch('/shutdown', { method: 'POST' }).catch(() => {});
  }

  const events = new EventSource('/events');
  events.onmessage = (e) => {
    if (e.data === 'reload') {
      refreshList();
    } else if (e.data === 'shutdown') {
      events.close();
      showStopped();
    }
  };
</script>
</body>
</html>
"##;

/// one entry of the file list, same markup the browser renders on refresh
fn render_file_card(file: &FileInfo) -> String {
    let name = escape_html(&file.name);
    let href = encode_path_segment(&file.name);
    format!(
        r#"<div class="file-card"><span class="name" title="{name}">{name}</span><div class="actions"><a class="btn" href="/view/{href}" target="_blank">View</a><a class="btn" href="/uploads/{href}">Download</a><button class="danger" data-name="{name}">Delete</button></div></div>"#
    )
}

pub fn render_index(files: &[FileInfo], chunk_size: usize, public_url: &str) -> String {
    let list = if files.is_empty() {
        EMPTY_LIST.to_string()
    } else {
        files.iter().map(render_file_card).collect()
    };

    // file names are user text, so they go in last
    TEMPLATE
        .replace(CHUNK_SIZE_SLOT, &chunk_size.to_string())
        .replace(PUBLIC_URL_SLOT, &escape_html(public_url))
        .replace(FILE_LIST_SLOT, &list)
}

/// qr code for `url` as a standalone svg document
pub fn qr_svg(url: &str) -> Result<String> {
    let code = QrCode::new(url.as_bytes()).map_err(|e| AppError::Render(e.to_string()))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .quiet_zone(true)
        .build())
}
