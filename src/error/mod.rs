//! Error handling module.
//!
//! This module provides unified error handling with proper HTTP status code
//! mapping and standardized API error responses.
//!
//! Propagation policy: counter-advance races are recovered locally in the
//! allocator via retry; every other error is surfaced to the caller
//! unmodified. Nothing that could cause a duplicate or lost number is
//! swallowed.

pub mod codes;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub use codes::ErrorCode;

use crate::domain::ReservationStatus;

/// Application-level error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Series configuration not found.
    #[error("Series not found: {0}")]
    ConfigNotFound(String),

    /// Series configuration already exists.
    #[error("Series already exists: {0}")]
    ConfigExists(String),

    /// Invalid series configuration.
    #[error("Invalid series configuration: {0}")]
    InvalidConfig(String),

    /// Series disabled; no new reservations may be created.
    #[error("Series disabled: {0}")]
    MappingDisabled(String),

    /// Malformed format pattern.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Reservation not found.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    /// Reservation is in a terminal state incompatible with the request.
    #[error("Reservation {reservation_id} is already {status}, cannot {operation}")]
    InvalidState {
        /// The reservation the operation targeted.
        reservation_id: String,
        /// Its current (terminal) state.
        status: ReservationStatus,
        /// The requested operation.
        operation: &'static str,
    },

    /// Counter advance contention exceeded bounded attempts.
    #[error("Counter contention on series {mapping_id}: gave up after {attempts} attempts")]
    RetryExhausted {
        /// The contended series.
        mapping_id: String,
        /// How many conditional updates were attempted.
        attempts: u32,
    },

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ConfigNotFound(_) => ErrorCode::CONFIG_NOT_FOUND,
            Self::ConfigExists(_) => ErrorCode::CONFIG_EXISTS,
            Self::InvalidConfig(_) => ErrorCode::INVALID_CONFIG,
            Self::MappingDisabled(_) => ErrorCode::MAPPING_DISABLED,
            Self::InvalidPattern(_) => ErrorCode::INVALID_PATTERN,
            Self::ReservationNotFound(_) => ErrorCode::RESERVATION_NOT_FOUND,
            Self::InvalidState { .. } => ErrorCode::INVALID_STATE,
            Self::RetryExhausted { .. } => ErrorCode::RETRY_EXHAUSTED,
            Self::BadRequest(_) => ErrorCode::BAD_REQUEST,
            Self::Storage(_) => ErrorCode::STORAGE_ERROR,
            Self::Internal(_) => ErrorCode::INTERNAL_ERROR,
        }
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ConfigNotFound(_) | Self::ReservationNotFound(_) => StatusCode::NOT_FOUND,
            Self::ConfigExists(_) | Self::MappingDisabled(_) | Self::InvalidState { .. } => {
                StatusCode::CONFLICT
            }
            Self::InvalidConfig(_) | Self::InvalidPattern(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::RetryExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().as_i32();
        let message = self.to_string();

        tracing::error!(
            error_code = code,
            status = %status,
            message = %message,
            "Request failed"
        );

        let body = Json(json!({
            "code": code,
            "message": message,
            "data": null
        }));

        (status, body).into_response()
    }
}

/// Storage-specific error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Lock acquisition failed.
    #[error("Failed to acquire lock: {0}")]
    LockFailed(String),

    /// File I/O error.
    #[error("File I/O error: {0}")]
    FileIO(String),

    /// Data not found.
    #[error("Data not found: {0}")]
    NotFound(String),

    /// Backend not available.
    #[error("Storage backend unavailable")]
    Unavailable,
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::FileIO(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias using `StorageError`.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
