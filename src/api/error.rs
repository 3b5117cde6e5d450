use std::any::Any;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::error::{GenerationError, RetrievalError};

/// Everything a handler can fail with. Converted to a response only here.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(&'static str),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Retrieval(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Generation(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Retrieval(_) | ApiError::Generation(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Retrieval(e) if e.is_timeout() => "UPSTREAM_TIMEOUT",
            ApiError::Generation(e) if e.is_timeout() => "UPSTREAM_TIMEOUT",
            ApiError::Retrieval(_) => "DOCS_UPSTREAM_ERROR",
            ApiError::Generation(_) => "COMPLETION_UPSTREAM_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Text shown to callers. Upstream details stay in the server logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ApiError::BadRequest(msg) => *msg,
            ApiError::Retrieval(e) if e.is_timeout() => {
                "The documentation service did not respond in time."
            }
            ApiError::Generation(e) if e.is_timeout() => {
                "The language model service did not respond in time."
            }
            ApiError::Retrieval(_) => "Failed to retrieve documentation context.",
            ApiError::Generation(_) => "Failed to generate an answer.",
            ApiError::Internal(_) => "Internal server error.",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::BadRequest(msg) => warn!(%status, msg, "rejected request"),
            ApiError::Retrieval(e) => {
                error!(%status, stage = %e.stage(), error = ?e, "context retrieval failed")
            }
            ApiError::Generation(e) => error!(%status, error = ?e, "answer generation failed"),
            ApiError::Internal(detail) => error!(%status, %detail, "unhandled failure"),
        }

        let body = ErrorBody {
            error: self.error_code().to_string(),
            message: self.public_message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(reason = %rejection.body_text(), "invalid JSON payload");
        ApiError::BadRequest("Request body must be a JSON object.")
    }
}

/// Response for a handler that panicked.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal(detail).into_response()
}
