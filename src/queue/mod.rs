//! Admission queue subsystem.
//!
//! # Data Flow
//! ```text
//! authenticated request
//!     → job.rs (JobRequest: target, method, headers, body)
//!     → scheduler.rs (admit or reject with 503)
//!         → pending FIFO (bounded by max_queue_size)
//!         → dispatch while in_flight < max_concurrency
//!         → Upstream::call on a spawned task
//!         → slot released, next job dispatched
//!     → Ticket resolves with the upstream response or a 502 surrogate
//! ```
//!
//! # Design Decisions
//! - One explicitly constructed queue per upstream, no global state
//! - A single mutex serializes every state transition
//! - Completion is delivered over a oneshot channel per job
//! - No cancellation: abandoned jobs still run and use their slot

pub mod job;
pub mod scheduler;
pub mod stats;

pub use job::{JobId, JobRequest, Ticket};
pub use scheduler::{AdmissionError, AdmissionQueue};
pub use stats::QueueSnapshot;
