//! # API Request/Response Types
//!
//! JSON bodies and request validation for the HTTP API. Successful lookups
//! answer with bare JSON arrays of strings; everything else uses the
//! structures below.

use crate::AppError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use trixel_tags_core::TagError;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// JSON body of every error answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A failed request: status code plus message.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<TagError> for ApiError {
    fn from(e: TagError) -> Self {
        match e {
            TagError::InvalidId(_) => Self::bad_request(e.to_string()),
            _ => {
                tracing::error!(error = %e, "index operation failed");
                Self::internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// A trixel id is one or more ASCII digits.
pub fn validate_trid(trid: &str) -> Result<&str, AppError> {
    if !trid.is_empty() && trid.bytes().all(|b| b.is_ascii_digit()) {
        Ok(trid)
    } else {
        Err(AppError::InvalidTrid(trid.to_string()))
    }
}

/// Trid carried in a request body. Surrounding whitespace is ignored so
/// `echo 42 | curl --data-binary @-` works.
pub fn trid_from_body(body: &str) -> Result<&str, AppError> {
    validate_trid(body.trim())
}
