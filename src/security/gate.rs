//! Request gate: shared-secret authentication for every inbound request.
//!
//! Both the presented and the expected credential are reduced to SHA-256
//! digests and compared with a constant-time equality, so the comparison
//! time depends neither on the position of the first differing byte nor on
//! the length of the presented value.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::http::response::ProxyError;
use crate::observability::metrics;

type CredentialDigest = [u8; 32];

fn digest(value: &[u8]) -> CredentialDigest {
    let mut hasher = Sha256::new();
    hasher.update(value);
    hasher.finalize().into()
}

/// An expected shared secret, held only as its digest.
#[derive(Clone)]
pub struct Credential {
    expected: Option<CredentialDigest>,
}

impl Credential {
    /// Build from the configured secret. `None` or an empty secret yields an
    /// unconfigured credential that rejects everything.
    pub fn new(secret: Option<&str>) -> Self {
        let expected = secret
            .filter(|s| !s.is_empty())
            .map(|s| digest(s.as_bytes()));
        Self { expected }
    }

    pub fn is_configured(&self) -> bool {
        self.expected.is_some()
    }

    /// Check a presented credential. Absent values are hashed as empty so
    /// every call does the same work.
    pub fn verify(&self, presented: Option<&[u8]>) -> bool {
        let presented_digest = digest(presented.unwrap_or_default());
        let expected = self.expected.unwrap_or([0u8; 32]);
        let matches: bool = presented_digest.ct_eq(&expected).into();

        matches & self.expected.is_some() & presented.is_some()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// The credential plus the header it is read from.
#[derive(Debug, Clone)]
pub struct RequestGate {
    header: HeaderName,
    credential: Credential,
}

impl RequestGate {
    pub fn new(header: HeaderName, credential: Credential) -> Self {
        Self { header, credential }
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Pass/fail decision for one request. Stateless.
    pub fn authorize<B>(&self, request: &Request<B>) -> bool {
        let presented = request.headers().get(&self.header).map(|v| v.as_bytes());
        self.credential.verify(presented)
    }
}

/// Reject unauthenticated requests before the body is read or the queue is
/// consulted. Authenticated requests continue without the credential header.
pub async fn gate_middleware(
    State(gate): State<Arc<RequestGate>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !gate.authorize(&request) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Rejected request with missing or invalid credential"
        );
        metrics::record_unauthorized();
        return ProxyError::Unauthorized.into_response();
    }

    request.headers_mut().remove(&gate.header);
    next.run(request).await
}
