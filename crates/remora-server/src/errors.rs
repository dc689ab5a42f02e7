//! HTTP-facing error types.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// A request the server refuses. Rendered as a short plaintext body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Missing or malformed query parameter. Nothing was enqueued.
    #[error("{0}")]
    BadRequest(String),

    /// The command queue is at capacity; retry later.
    #[error("command queue full (capacity {capacity}), retry later")]
    Busy {
        /// Queue capacity.
        capacity: usize,
    },

    /// Nothing to serve.
    #[error("{0}")]
    NotFound(&'static str),

    /// Writing to the asset directory failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// Shorthand for [`ApiError::BadRequest`].
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    /// Status code this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Busy { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let busy = matches!(self, Self::Busy { .. });
        let mut response = (self.status(), self.to_string()).into_response();
        if busy {
            let _ = response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

/// Errors starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The bound socket's address could not be read.
    #[error("listener address unavailable: {0}")]
    LocalAddr(std::io::Error),

    /// The Prometheus recorder could not be installed.
    #[error("metrics recorder: {0}")]
    Metrics(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Busy { capacity: 4 }.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::NotFound("no frame").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Storage("disk full".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn busy_sets_retry_after() {
        let response = ApiError::Busy { capacity: 4 }.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }

    #[test]
    fn bad_request_is_plaintext() {
        let response = ApiError::bad_request("missing parameter 'x'").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }
}
