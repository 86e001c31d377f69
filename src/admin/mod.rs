//! Admin API: read-only view of the proxy for operators.
//!
//! Served on its own listener so it never shares the proxy's catch-all
//! routes. Every route requires the admin bearer token.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::{get_queue, get_status};
use crate::queue::AdmissionQueue;
use crate::security::Credential;
use crate::upstream::Upstream;

pub struct AdminState<U: Upstream> {
    pub queue: AdmissionQueue<U>,
    pub upstream: Arc<str>,
}

impl<U: Upstream> Clone for AdminState<U> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            upstream: Arc::clone(&self.upstream),
        }
    }
}

pub fn setup_admin_router<U: Upstream>(state: AdminState<U>, api_key: &str) -> Router {
    let credential = Arc::new(Credential::new(Some(api_key)));
    Router::new()
        .route("/admin/status", get(get_status::<U>))
        .route("/admin/queue", get(get_queue::<U>))
        .layer(middleware::from_fn_with_state(credential, admin_auth_middleware))
        .with_state(state)
}
