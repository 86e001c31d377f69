//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → gate.rs (shared-secret check, constant-time)
//!         fail → 401, request ends here
//!         pass → credential header stripped
//!     → Pass to the admission queue
//! ```
//!
//! # Design Decisions
//! - Fail closed: an unconfigured secret rejects everything
//! - The gate runs before the body is read and before any queue interaction
//! - The same digest comparison protects the admin API key

pub mod gate;

pub use gate::{gate_middleware, Credential, RequestGate};
