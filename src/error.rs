use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::server::envelope::ApiResponse;
use crate::upstream::GatewayError;

/// Outcome of a stream operation that did not succeed.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Camera not found")]
    NotFound,

    #[error("Camera is disabled")]
    Forbidden,

    #[error("Invalid stream path: {0}")]
    InvalidPath(String),

    #[error("Stream server error: {0}")]
    BadGateway(#[from] GatewayError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type StreamResult<T> = std::result::Result<T, StreamError>;

impl StreamError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StreamError::NotFound => StatusCode::NOT_FOUND,
            StreamError::Forbidden => StatusCode::FORBIDDEN,
            StreamError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            StreamError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            StreamError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the client is told. Internal details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            StreamError::NotFound | StreamError::Forbidden | StreamError::InvalidPath(_) => {
                self.to_string()
            }
            StreamError::BadGateway(_) => "Failed to connect to stream server".to_string(),
            StreamError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        match &self {
            StreamError::Internal(e) => tracing::error!("Internal error: {:#}", e),
            StreamError::BadGateway(e) => tracing::error!("Upstream failure: {}", e),
            other => tracing::debug!("Request rejected: {}", other),
        }

        (self.status_code(), ApiResponse::<()>::error(self.public_message())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(StreamError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(StreamError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            StreamError::from(GatewayError::Timeout).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            StreamError::from(anyhow::anyhow!("disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = StreamError::from(anyhow::anyhow!("sqlite: database is locked"));
        assert_eq!(err.public_message(), "Internal server error");

        let err = StreamError::from(GatewayError::Unreachable("tcp connect error 10.0.0.2".into()));
        assert!(!err.public_message().contains("10.0.0.2"));
    }
}
