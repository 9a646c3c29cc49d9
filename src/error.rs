//! Error types for SEGA server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    DbFailure = 2,
    NotFound = 3,
    BadValue = 4,
    Duplicate = 5,
    EquipmentUnavailable = 6,
    InUse = 7,
    InvalidTransition = 8,
    StaleWrite = 9,
    InvalidCredentials = 10,
}

impl ErrorCode {
    /// HTTP status used when this code is returned.
    ///
    /// Business conflicts are reported as 400 with a typed code rather than 409.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Failure | Self::DbFailure => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadValue
            | Self::Duplicate
            | Self::EquipmentUnavailable
            | Self::InUse
            | Self::InvalidTransition
            | Self::StaleWrite => StatusCode::BAD_REQUEST,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Equipment cannot be reserved for a new loan
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Delete blocked by existing references
    #[error("In use: {0}")]
    InUse(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The row changed between read and write
    #[error("Stale write: {0}")]
    StaleWrite(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Authentication(_) => ErrorCode::InvalidCredentials,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorCode::BadValue,
            AppError::Duplicate(_) => ErrorCode::Duplicate,
            AppError::Conflict(_) => ErrorCode::EquipmentUnavailable,
            AppError::InUse(_) => ErrorCode::InUse,
            AppError::InvalidTransition(_) => ErrorCode::InvalidTransition,
            AppError::StaleWrite(_) => ErrorCode::StaleWrite,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Authentication(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::BadRequest(msg)
            | AppError::Duplicate(msg)
            | AppError::Conflict(msg)
            | AppError::InUse(msg)
            | AppError::InvalidTransition(msg)
            | AppError::StaleWrite(msg) => msg.clone(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (code.http_status(), body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
