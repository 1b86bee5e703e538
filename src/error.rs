use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// every error a request can end in. converted to a plain-text response at
/// the handler boundary, never allowed to take down the serving loop
#[derive(Debug, Error)]
pub enum AppError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// writing a chunk fragment to disk failed
    #[error("failed to store chunk {index} of upload {session}: {source}")]
    Fragment {
        session: String,
        index: usize,
        #[source]
        source: std::io::Error,
    },

    /// a fragment expected to be on disk vanished before concatenation
    #[error("upload {session} is missing chunk {index}")]
    MissingFragment { session: String, index: usize },

    #[error("failed to reassemble {filename}: {source}")]
    Reassembly {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete {filename}: {source}")]
    Delete {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render qr code: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server is shutting down")]
    ShuttingDown,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Fragment { .. }
            | AppError::MissingFragment { .. }
            | AppError::Reassembly { .. }
            | AppError::Delete { .. }
            | AppError::Render(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
