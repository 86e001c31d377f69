//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + PROXY_SHARED_SECRET
//!     → loader.rs (parse, deserialize, apply secret override)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → handed to lifecycle::startup, which builds every subsystem from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart, which also
//!   discards the pending queue
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, AuthConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig,
    QueueConfig, SecurityConfig, UpstreamConfig,
};
