//! Response definitions
//!
//! JSON bodies and the error-to-status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::compaction::CompactionStats;
use crate::error::HiveError;

#[derive(Debug, Serialize)]
pub struct PutResponse {
    pub message: &'static str,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CompactResponse {
    pub message: &'static str,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_keys: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tombstones_dropped: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

impl CompactResponse {
    pub fn completed(stats: &CompactionStats) -> Self {
        Self {
            message: "Compaction completed successfully",
            skipped: false,
            live_keys: Some(stats.live_keys),
            tombstones_dropped: Some(stats.tombstones_dropped),
            elapsed_ms: Some(stats.duration.as_millis() as u64),
        }
    }

    pub fn skipped() -> Self {
        Self {
            message: "Compaction already in progress",
            skipped: true,
            live_keys: None,
            tombstones_dropped: None,
            elapsed_ms: None,
        }
    }
}

/// An error rendered as `{"error": "..."}` with a matching status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<HiveError> for ApiError {
    fn from(err: HiveError) -> Self {
        let status = match &err {
            HiveError::NotFound => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: &self.message,
        });
        (self.status, body).into_response()
    }
}
