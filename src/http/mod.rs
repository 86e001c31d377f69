//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → security::gate (401 or pass, credential stripped)
//!     → request.rs (JobRequest: upstream target, headers minus host)
//!     → queue (admit / 503, wait for completion)
//!     → response.rs (locally produced errors) or upstream response
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::ProxyError;
pub use server::{AppState, HttpServer, ServerError};
