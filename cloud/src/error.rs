//! Service-level error bridge
//!
//! Handlers return `ServiceResult<T>`; infrastructure failures (database,
//! provider HTTP) and application errors both convert into an HTTP response
//! through a single `IntoResponse` impl.

use axum::response::{IntoResponse, Response};
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Database failure
    #[error("database error: {0}")]
    Db(BoxError),
    /// Application-level error with a stable error code
    #[error(transparent)]
    App(#[from] AppError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Db(Box::new(e))
    }
}

impl From<ErrorCode> for ServiceError {
    fn from(code: ErrorCode) -> Self {
        Self::App(AppError::new(code))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            Self::Db(e) => {
                tracing::error!(error = %e, "database error");
                AppError::new(ErrorCode::DatabaseError).into_response()
            }
            Self::App(e) => e.into_response(),
        }
    }
}
