use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{provider}: unauthorized (check API key)")]
    Unauthorized { provider: &'static str },

    #[error("{provider}: rate limited")]
    RateLimited { provider: &'static str },

    #[error("{provider}: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("invalid stored data: {0}")]
    Data(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("a reconciliation run is already in progress")]
    RunInProgress,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Transport-shaped failures are worth another attempt; credential and
    /// validation failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Http(_)
                | AppError::Database(_)
                | AppError::RateLimited { .. }
                | AppError::Provider { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::RunInProgress => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. }
            | AppError::RateLimited { .. }
            | AppError::Provider { .. }
            | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
