//! Jobs: one admitted unit of work and the handle its caller waits on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::http::uri::InvalidUri;
use axum::http::{header, HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::oneshot;
use url::Url;

use crate::http::response::ProxyError;

/// Relaxed ordering is enough; ids only need to be unique.
static JOB_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a job, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

impl JobId {
    pub fn next() -> Self {
        Self(JOB_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Why an inbound path cannot be turned into an upstream target.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("dot segment would leave the origin base path")]
    EscapesBasePath,

    #[error("invalid target: {0}")]
    Uri(#[from] InvalidUri),
}

/// Everything needed to make the upstream call for one request.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// `{origin}{path}{?query}` with the caller's path and query copied
    /// byte for byte; never the proxy's own host.
    pub target: Uri,
    pub method: Method,
    /// Forwarded headers, credential and `host` removed.
    pub headers: HeaderMap,
    /// Absent when the inbound request carried no body.
    pub body: Option<Bytes>,
}

impl JobRequest {
    /// Build a job for `path_and_query` against `origin`. The `host` header
    /// is dropped here; the credential header is dropped by the gate.
    ///
    /// The path is not normalized. When the origin carries a base path, a
    /// `.` or `..` segment (plain or percent-encoded) is refused instead,
    /// since the upstream would resolve it outside that base.
    pub fn new(
        origin: &Url,
        method: Method,
        path_and_query: &str,
        mut headers: HeaderMap,
        body: Bytes,
    ) -> Result<Self, TargetError> {
        if origin.path() != "/" && has_dot_segment(path_and_query) {
            return Err(TargetError::EscapesBasePath);
        }

        let base = origin.as_str().trim_end_matches('/');
        let target = Uri::try_from(format!("{}{}", base, path_and_query))?;

        headers.remove(header::HOST);

        Ok(Self {
            target,
            method,
            headers,
            body: (!body.is_empty()).then_some(body),
        })
    }
}

fn has_dot_segment(path_and_query: &str) -> bool {
    let path = path_and_query.split('?').next().unwrap_or_default();
    path.split('/').any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// A job waiting in, or dispatched from, the pending queue.
#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) id: JobId,
    pub(crate) request: JobRequest,
    pub(crate) reply: oneshot::Sender<Response>,
    pub(crate) enqueued_at: Instant,
}

/// Returned to an admitted caller; resolves once the job completes.
#[derive(Debug)]
pub struct Ticket {
    id: JobId,
    rx: oneshot::Receiver<Response>,
}

impl Ticket {
    pub(crate) fn new(id: JobId, rx: oneshot::Receiver<Response>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Wait for the job's response. There is no deadline here; callers bound
    /// the wait at their transport layer.
    pub async fn response(self) -> Response {
        match self.rx.await {
            Ok(response) => response,
            Err(_) => {
                // The executing task was dropped before replying (runtime shutdown).
                tracing::error!(job_id = %self.id, "Job ended without a response");
                ProxyError::Upstream.into_response()
            }
        }
    }
}
