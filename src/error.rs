// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent callable-function responses.
//!
//! Errors serialize as `{"error": {"status": "...", "message": "..."}}`.
//! Internal causes are logged but never returned to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Error kinds exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    PermissionDenied,
    InvalidArgument,
    Internal,
}

impl ErrorKind {
    /// Wire status string of the callable protocol.
    pub fn status(self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "UNAUTHENTICATED",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    pub fn http_status(self) -> StatusCode {
        match self {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    InvalidArgument(String),

    /// `message` is what the caller sees; `source` is only logged.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub const NOT_AUTHENTICATED: &'static str = "The function must be called while authenticated.";

    pub fn unauthenticated() -> Self {
        AppError::Unauthenticated(Self::NOT_AUTHENTICATED.to_string())
    }

    pub fn internal(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        AppError::Internal {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            AppError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            AppError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            AppError::Internal { .. } => ErrorKind::Internal,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if let AppError::Internal { message, source } = &self {
            tracing::error!(error = %source, message = %message, "Internal error");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                status: kind.status(),
                message: self.to_string(),
            },
        };

        (kind.http_status(), Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
