use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::{error::Error, fmt};

#[derive(Debug)]
pub enum UpstreamError {
    RequestError(reqwest::Error),
    StatusError { status: u16, body: String },
    InvalidBaseUrl(String),
}

impl std::error::Error for UpstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use UpstreamError::*;
        match self {
            RequestError(e) => Some(e as &dyn Error),
            _ => None,
        }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use UpstreamError::*;
        match self {
            RequestError(e) => write!(f, "RequestError: {}", e),
            StatusError { status, body } => write!(f, "StatusError: {} {}", status, body),
            InvalidBaseUrl(s) => write!(f, "InvalidBaseUrl: {}", s),
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(error: reqwest::Error) -> Self {
        UpstreamError::RequestError(error)
    }
}

/// Failures that abort a notification with a non-200 response. Validation
/// failures are not errors: they are acknowledged with 200.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid notification payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("upstream call failed: {}", crate::unpack_error(.0))]
    Upstream(#[from] UpstreamError),

    #[error("user store failed: {0:#}")]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for NotifyError {
    fn into_response(self) -> Response {
        let status = match self {
            NotifyError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            NotifyError::Upstream(_) | NotifyError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
