use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Upstream fetch/parse failure. Recovered by the cache if a prior
    /// snapshot exists, otherwise surfaced to the caller.
    #[error("adapter error: {0}")]
    Adapter(String),

    /// Snapshot has no usable listings for the requested computation.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Unknown listing id or url_slug.
    #[error("not found: {0}")]
    NotFound(String),

    /// Non-positive surface/rooms or a parameter outside documented bounds.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Adapter(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
