//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, request gate, body limit)
//! - Own the admission queue and hand it to every request
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header::InvalidHeaderName, HeaderMap, HeaderName, Method, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use url::Url;

use crate::config::validation::{validate_origin, ValidationError};
use crate::config::ProxyConfig;
use crate::http::request::{build_job, request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::observability::metrics;
use crate::queue::AdmissionQueue;
use crate::security::{gate_middleware, Credential, RequestGate};
use crate::upstream::{HttpUpstream, Upstream, UpstreamError};

/// Errors building the server from a configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid upstream origin: {0}")]
    Origin(#[from] ValidationError),

    #[error("invalid credential header name: {0}")]
    HeaderName(#[from] InvalidHeaderName),

    #[error("failed to build upstream client: {0}")]
    Upstream(#[from] UpstreamError),
}

/// Application state injected into handlers.
pub struct AppState<U: Upstream> {
    pub queue: AdmissionQueue<U>,
    pub origin: Arc<Url>,
}

impl<U: Upstream> Clone for AppState<U> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            origin: Arc::clone(&self.origin),
        }
    }
}

/// HTTP server for the admission proxy.
pub struct HttpServer<U: Upstream = HttpUpstream> {
    router: Router,
    queue: AdmissionQueue<U>,
    config: ProxyConfig,
}

impl HttpServer<HttpUpstream> {
    /// Create a server forwarding to the configured upstream over HTTP.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let upstream = HttpUpstream::new(&config.upstream)?;
        Self::with_upstream(config, upstream)
    }
}

impl<U: Upstream> HttpServer<U> {
    /// Create a server around any upstream implementation.
    pub fn with_upstream(config: ProxyConfig, upstream: U) -> Result<Self, ServerError> {
        let origin = Arc::new(validate_origin(&config.upstream.origin)?);
        let header = HeaderName::from_bytes(config.auth.header_name.as_bytes())?;
        let gate = Arc::new(RequestGate::new(
            header,
            Credential::new(config.auth.secret.as_deref()),
        ));

        if config.auth.secret.as_deref().map_or(true, str::is_empty) {
            tracing::warn!("auth.secret is not set; every request will be rejected with 401");
        }

        let queue = AdmissionQueue::new(upstream, config.queue);
        let state = AppState {
            queue: queue.clone(),
            origin,
        };

        let router = Self::build_router(&config, state, gate);
        Ok(Self {
            router,
            queue,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState<U>, gate: Arc<RequestGate>) -> Router {
        Router::new()
            .route("/", any(proxy_handler::<U>))
            .route("/{*path}", any(proxy_handler::<U>))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(middleware::from_fn_with_state(gate, gate_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone())),
            )
    }

    /// Handle to the queue, shared with the admin API.
    pub fn queue(&self) -> &AdmissionQueue<U> {
        &self.queue
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.origin,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler. The gate has already authenticated the request and
/// removed the credential header.
async fn proxy_handler<U: Upstream>(
    State(state): State<AppState<U>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers).to_string();
    let method_str = method.to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %uri.path(),
        "Proxying request"
    );

    let job = match build_job(&state.origin, method, &uri, headers, body) {
        Ok(job) => job,
        Err(e) => {
            metrics::record_request(&method_str, e.status().as_u16(), start_time);
            return e.into_response();
        }
    };

    let response = state.queue.handle(job).await;

    let status = response.status();
    metrics::record_request(&method_str, status.as_u16(), start_time);
    tracing::info!(
        request_id = %request_id,
        method = %method_str,
        path = %uri.path(),
        status = status.as_u16(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}
