//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! queue::scheduler (job dispatched, slot held)
//!     → Upstream::call(JobRequest)
//!         → client.rs (hyper client, rustls, per-job deadline)
//!     → Response<Bytes> or UpstreamError
//!     → slot released, caller resolved
//! ```
//!
//! # Design Decisions
//! - The scheduler only knows the `Upstream` trait; tests plug in doubles
//! - Responses are returned unchanged; the proxy never rewrites them
//! - No retries: a failure is reported once and the caller decides

pub mod client;

use std::future::Future;
use std::time::Duration;

use axum::http::Response;
use bytes::Bytes;
use thiserror::Error;

use crate::queue::JobRequest;

pub use client::HttpUpstream;

/// Transport-level failure talking to the upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream call exceeded deadline of {0:?}")]
    Timeout(Duration),

    #[error("upstream transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("failed reading upstream body: {0}")]
    Body(#[from] axum::Error),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),
}

/// Executes one admitted job against the upstream.
pub trait Upstream: Send + Sync + 'static {
    fn call(&self, request: JobRequest) -> impl Future<Output = Result<Response<Bytes>, UpstreamError>> + Send;
}
