//! Responses the proxy produces itself.
//!
//! # Responsibilities
//! - Map every locally produced failure to one status code and a short
//!   plain-text reason
//! - Everything else is the upstream's response, relayed unchanged
//!
//! # Status codes
//! - 401: credential missing or wrong
//! - 503: pending queue full
//! - 502: upstream transport failure, deadline exceeded, or execution ended
//!   without a response
//! - 400: the request path cannot be joined to the upstream origin or would
//!   leave its base path

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::queue::AdmissionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProxyError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("queue limit exceeded")]
    QueueFull,

    #[error("Upstream error")]
    Upstream,

    #[error("Invalid request target")]
    InvalidTarget,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            ProxyError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Upstream => StatusCode::BAD_GATEWAY,
            ProxyError::InvalidTarget => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<AdmissionError> for ProxyError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::QueueFull { .. } => ProxyError::QueueFull,
            AdmissionError::NoRuntime => ProxyError::Upstream,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
