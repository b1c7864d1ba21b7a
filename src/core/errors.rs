//! Custom error types for gateway operations

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Gateway errors, one variant per error kind
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Client input was missing or malformed
    #[error("{0}")]
    Validation(String),

    /// The vendor rejected the API key
    #[error("{0}")]
    Credential(String),

    /// Upload body exceeded the configured size limit
    #[error("{0}")]
    TooLarge(String),

    /// Any other vendor or network failure
    #[error("{0}")]
    Backend(String),

    /// Local file operation failed
    #[error("File error: {path} - {source}")]
    Io {
        /// Path of the file involved
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl GatewayError {
    /// Shorthand for a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation(message.into())
    }

    /// Shorthand for a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        GatewayError::Backend(message.into())
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        GatewayError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Stable name of the error kind, as reported in error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "validation",
            GatewayError::Credential(_) => "credential",
            GatewayError::TooLarge(_) => "too_large",
            GatewayError::Backend(_) => "backend",
            GatewayError::Io { .. } => "io",
        }
    }

    /// HTTP status designated for this error kind
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Credential(_) => StatusCode::UNAUTHORIZED,
            GatewayError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Backend(_) | GatewayError::Io { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON body for this error
    pub fn body(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            error: self.to_string(),
            kind: self.kind().to_string(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Backend("Request to translation service timed out".to_string())
        } else {
            GatewayError::Backend(format!("HTTP client error: {}", err))
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Backend(format!("Invalid response: {}", err))
    }
}

/// Error response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Human readable message
    pub error: String,
    /// One of `validation`, `credential`, `too_large`, `backend`, `io`
    pub kind: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_per_kind() {
        assert_eq!(
            GatewayError::validation("No text provided").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::Credential("Authorization failed".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::backend("Quota exceeded").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let large = GatewayError::TooLarge("Upload exceeds the limit of 10 bytes".into());
        assert_eq!(large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(large.kind(), "too_large");

        let io = GatewayError::io(
            "uploads/a.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(io.kind(), "io");
    }

    #[test]
    fn test_error_body() {
        let body = GatewayError::validation("Target language is required").body();
        assert!(!body.success);
        assert_eq!(body.error, "Target language is required");
        assert_eq!(body.kind, "validation");
    }

    #[test]
    fn test_json_error_maps_to_backend() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: GatewayError = err.into();
        assert_eq!(err.kind(), "backend");
    }
}
