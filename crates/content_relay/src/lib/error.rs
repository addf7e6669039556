use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Failure taxonomy shared by every endpoint.
///
/// Each variant maps to exactly one HTTP status (see [`Error::status`]) and a
/// stable machine-readable code (see [`Error::code`]). The same code is used
/// for in-band error frames once a stream has been committed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Upstream request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Upstream error: {message}")]
    Upstream { status: Option<u16>, message: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("'{0}' is required and must not be empty")]
    MissingField(&'static str),
    #[error("Invalid video URL or ID: {0}")]
    BadVideoId(String),
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Unknown {field} '{value}', expected one of: {expected}")]
    UnknownVariant {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("'{field}' must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extracted content is too short ({length} characters) to be meaningful")]
    EmptyContent { length: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum NotFound {
    #[error("No captions available for video {video_id}")]
    NoCaptions { video_id: String },
    #[error("Note {0} not found")]
    Note(String),
    #[error("Workspace {0} not found")]
    Workspace(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Error::Upstream { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::Extraction(_) => "empty_content",
            Error::NotFound(_) => "not_found",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::Timeout(_) => "timeout",
            Error::Upstream { .. } => "upstream_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(format!("{err:#}"))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        } else {
            tracing::warn!(error = %self, code = self.code(), "Request rejected");
        }

        let body = serde_json::json!({
            "success": false,
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
