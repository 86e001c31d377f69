//! The admission queue: bounded FIFO in front of a concurrency-limited upstream.
//!
//! # State
//! One mutex guards the pending `VecDeque` and the in-flight counter.
//! Admission, dispatch evaluation and completion bookkeeping all happen
//! while holding it; only the upstream calls run outside it.
//!
//! # Invariants
//! - `in_flight <= max_concurrency`
//! - `pending.len() <= max_queue_size`
//! - pending work is never left behind while a slot is free: every
//!   admission and every completion re-runs [`Inner::take_ready`]
//!
//! # Job lifecycle
//! ```text
//! submit ──(queue full)──▶ rejected, no state change
//!    │
//!    ▼
//! Pending ──dispatch──▶ Executing ──slot dropped──▶ Completed (reply sent)
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use axum::body::Body;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::config::QueueConfig;
use crate::http::response::ProxyError;
use crate::observability::metrics;
use crate::queue::job::{Job, JobId, JobRequest, Ticket};
use crate::queue::stats::{QueueSnapshot, QueueStats};
use crate::upstream::Upstream;

/// Why a job was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("queue limit exceeded ({pending} pending, limit {limit})")]
    QueueFull { pending: usize, limit: usize },

    /// `submit` was called outside a tokio runtime, so nothing could ever
    /// execute the job.
    #[error("no tokio runtime to execute jobs")]
    NoRuntime,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Job>,
    in_flight: usize,
}

struct Inner<U: Upstream> {
    upstream: U,
    limits: QueueConfig,
    state: Mutex<QueueState>,
    stats: QueueStats,
}

/// Handle to a single admission queue. Clones share the same queue.
///
/// Construct one per upstream at startup and hand clones to every request
/// path; the queue state is never reachable any other way.
pub struct AdmissionQueue<U: Upstream> {
    inner: Arc<Inner<U>>,
}

impl<U: Upstream> Clone for AdmissionQueue<U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<U: Upstream> AdmissionQueue<U> {
    pub fn new(upstream: U, limits: QueueConfig) -> Self {
        tracing::info!(
            max_concurrency = limits.max_concurrency,
            max_queue_size = limits.max_queue_size,
            "Admission queue created"
        );
        Self {
            inner: Arc::new(Inner {
                upstream,
                limits,
                state: Mutex::new(QueueState::default()),
                stats: QueueStats::default(),
            }),
        }
    }

    pub fn limits(&self) -> QueueConfig {
        self.inner.limits
    }

    /// Admit or reject a job. Never waits on the upstream: on admission the
    /// job is queued (and possibly dispatched) before this returns.
    ///
    /// Must be called from within a tokio runtime; otherwise the job is
    /// refused with [`AdmissionError::NoRuntime`] and nothing is counted.
    pub fn submit(&self, request: JobRequest) -> Result<Ticket, AdmissionError> {
        if Handle::try_current().is_err() {
            return Err(AdmissionError::NoRuntime);
        }
        let id = JobId::next();
        let (reply, rx) = oneshot::channel();

        let mut state = self.inner.lock();
        let pending = state.pending.len();
        if pending >= self.inner.limits.max_queue_size {
            drop(state);
            self.inner.stats.record_rejected();
            metrics::record_rejected();
            tracing::warn!(
                job_id = %id,
                pending,
                limit = self.inner.limits.max_queue_size,
                "Queue full, rejecting job"
            );
            return Err(AdmissionError::QueueFull {
                pending,
                limit: self.inner.limits.max_queue_size,
            });
        }

        tracing::debug!(
            job_id = %id,
            method = %request.method,
            path = %request.target.path(),
            pending = pending + 1,
            in_flight = state.in_flight,
            "Job admitted"
        );
        state.pending.push_back(Job {
            id,
            request,
            reply,
            enqueued_at: Instant::now(),
        });
        self.inner.stats.record_admitted();
        let ready = self.inner.take_ready(&mut state);
        drop(state);
        self.inner.launch(ready);

        Ok(Ticket::new(id, rx))
    }

    /// Submit and wait, mapping rejection to a 503 response.
    pub async fn handle(&self, request: JobRequest) -> Response {
        match self.submit(request) {
            Ok(ticket) => ticket.response().await,
            Err(err) => ProxyError::from(err).into_response(),
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.inner.lock();
        QueueSnapshot::new(
            state.pending.len(),
            state.in_flight,
            self.inner.limits.max_concurrency,
            self.inner.limits.max_queue_size,
            &self.inner.stats,
        )
    }
}

impl<U: Upstream> Inner<U> {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Critical sections never panic; recover the state if one ever did.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim slots for queued jobs, in order, until the budget or the queue
    /// runs out. The claimed jobs must be passed to [`Inner::launch`] once
    /// the lock is released.
    fn take_ready(&self, state: &mut QueueState) -> Vec<Job> {
        let mut ready = Vec::new();
        if Handle::try_current().is_err() {
            // Only reachable from a slot dropped while the runtime shuts down;
            // the remaining pending jobs are lost.
            tracing::warn!(pending = state.pending.len(), "No runtime available, dispatch skipped");
            return ready;
        }

        while state.in_flight < self.limits.max_concurrency {
            let Some(job) = state.pending.pop_front() else {
                break;
            };
            state.in_flight += 1;
            ready.push(job);
        }

        metrics::record_queue_depth(state.pending.len(), state.in_flight);
        ready
    }

    /// Spawn one task per claimed job. Must not be called with the state
    /// lock held: a slot dropped here re-enters it.
    fn launch(self: &Arc<Self>, ready: Vec<Job>) {
        for job in ready {
            let slot = InFlightSlot {
                inner: Arc::clone(self),
            };
            tokio::spawn(execute(slot, job));
        }
    }
}

/// One unit of the concurrency budget. Dropping it frees the slot and
/// dispatches the next job, whichever way execution ended.
struct InFlightSlot<U: Upstream> {
    inner: Arc<Inner<U>>,
}

impl<U: Upstream> Drop for InFlightSlot<U> {
    fn drop(&mut self) {
        let ready = {
            let mut state = self.inner.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            self.inner.take_ready(&mut state)
        };
        self.inner.launch(ready);
    }
}

async fn execute<U: Upstream>(slot: InFlightSlot<U>, job: Job) {
    let Job {
        id,
        request,
        reply,
        enqueued_at,
    } = job;

    let waited = enqueued_at.elapsed();
    metrics::record_queue_wait(waited);
    let method = request.method.clone();
    let path = request.target.path().to_string();
    let started = Instant::now();

    tracing::debug!(
        job_id = %id,
        method = %method,
        path = %path,
        waited_ms = waited.as_millis() as u64,
        "Dispatching job to upstream"
    );

    let outcome = AssertUnwindSafe(slot.inner.upstream.call(request))
        .catch_unwind()
        .await;
    slot.inner.stats.record_completed();

    let response = match outcome {
        Ok(Ok(response)) => {
            tracing::debug!(
                job_id = %id,
                status = %response.status(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Upstream responded"
            );
            response.map(Body::from)
        }
        Ok(Err(e)) => upstream_failure(&slot.inner, id, &method, &path, started, &e.to_string()),
        Err(panic) => {
            let reason = format!("upstream call panicked: {}", panic_message(panic.as_ref()));
            upstream_failure(&slot.inner, id, &method, &path, started, &reason)
        }
    };

    drop(slot);

    if reply.send(response).is_err() {
        tracing::debug!(job_id = %id, "Caller disconnected before its response was ready");
    }
}

/// Count, log and answer a job whose upstream call did not produce a response.
fn upstream_failure<U: Upstream>(
    inner: &Inner<U>,
    id: JobId,
    method: &Method,
    path: &str,
    started: Instant,
    error: &str,
) -> Response {
    inner.stats.record_upstream_failure();
    metrics::record_upstream_failure();
    tracing::error!(
        job_id = %id,
        method = %method,
        path = %path,
        error = %error,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Upstream error"
    );
    ProxyError::Upstream.into_response()
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
