use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error as ThisError;
use tracing::error;

#[derive(ThisError, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Price lookup error: {0}")]
    PriceLookup(String),

    #[error("Database error: {0}")]
    Store(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Plain-text bodies naming the failing stage, no internal detail.
        let (status, body) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, format!("bad equity symbol: {msg}")),
            Self::PriceLookup(_) => {
                error!("{self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "error getting price".to_string(),
                )
            }
            Self::Store(_) => {
                error!("{self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "error fetching from database".to_string(),
                )
            }
            Self::Config(_) | Self::Io(_) => {
                error!("{self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
