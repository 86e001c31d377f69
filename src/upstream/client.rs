//! HTTP client for the fixed upstream origin.
//!
//! The request target goes out as the `Uri` the job carries, so the caller's
//! path and query reach the upstream exactly as received. TLS uses rustls
//! with the platform's root certificates.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{self, Body};
use axum::http::{header, HeaderMap, HeaderName, Request, Response};
use bytes::Bytes;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use rustls::{ClientConfig, RootCertStore};
use tokio::time;

use crate::config::UpstreamConfig;
use crate::queue::JobRequest;
use crate::upstream::{Upstream, UpstreamError};

/// Connection-scoped headers; they describe one hop and are never relayed.
const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::TE,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in `Connection` are hop-by-hop as well.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

fn tls_config() -> Result<ClientConfig, UpstreamError> {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for error in native.errors {
        tracing::warn!(error = %error, "Error loading a native certificate");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    tracing::debug!(added, ignored, "Loaded native root certificates");

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    Ok(ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth())
}

/// Forwards jobs over a shared hyper connection pool. Redirects are relayed
/// to the caller, never followed.
#[derive(Clone)]
pub struct HttpUpstream {
    client: UpstreamClient,
    request_timeout: Duration,
}

impl std::fmt::Debug for HttpUpstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUpstream")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl HttpUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));

        let connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config()?)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    async fn exchange(&self, request: JobRequest) -> Result<Response<Bytes>, UpstreamError> {
        let JobRequest {
            target,
            method,
            mut headers,
            body: payload,
        } = request;
        strip_hop_by_hop(&mut headers);

        let mut outbound = Request::new(payload.map(Body::from).unwrap_or_else(Body::empty));
        *outbound.method_mut() = method;
        *outbound.uri_mut() = target;
        *outbound.headers_mut() = headers;

        let response: Response<Incoming> = self.client.request(outbound).await?;
        let (mut parts, incoming) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        let body = body::to_bytes(Body::new(incoming), usize::MAX).await?;

        Ok(Response::from_parts(parts, body))
    }
}

impl Upstream for HttpUpstream {
    async fn call(&self, request: JobRequest) -> Result<Response<Bytes>, UpstreamError> {
        match time::timeout(self.request_timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(self.request_timeout)),
        }
    }
}
