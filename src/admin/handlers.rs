use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::queue::QueueSnapshot;
use crate::upstream::Upstream;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub upstream: String,
}

pub async fn get_status<U: Upstream>(State(state): State<AdminState<U>>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        upstream: state.upstream.to_string(),
    })
}

pub async fn get_queue<U: Upstream>(State(state): State<AdminState<U>>) -> Json<QueueSnapshot> {
    Json(state.queue.snapshot())
}
