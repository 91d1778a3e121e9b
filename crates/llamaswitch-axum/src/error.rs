//! Axum-specific error types and mappings.
//!
//! Every error leaves as a JSON body of the form `{"detail": "..."}`, which
//! is what the dashboard and OpenAI clients already expect from this server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use llamaswitch_core::SessionError;
use serde::Serialize;
use thiserror::Error;

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request (invalid input).
    #[error("{0}")]
    BadRequest(String),

    /// The model server is not available to take the request.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// The model server failed or answered with garbage.
    #[error("{0}")]
    BadGateway(String),

    /// The model server did not become ready in time.
    #[error("{0}")]
    GatewayTimeout(String),

    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl HttpError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<SessionError> for HttpError {
    fn from(err: SessionError) -> Self {
        let msg = err.to_string();
        match err {
            SessionError::ModelNotFound(_) => Self::NotFound(msg),
            SessionError::InvalidContextSize(_) => Self::BadRequest(msg),
            SessionError::NotRunning(_) => Self::ServiceUnavailable(msg),
            SessionError::ReadyTimeout(_) => Self::GatewayTimeout(msg),
            SessionError::EmptyCommand(_)
            | SessionError::PortUnavailable(_)
            | SessionError::Spawn { .. }
            | SessionError::Internal(_) => Self::Internal(msg),
        }
    }
}
