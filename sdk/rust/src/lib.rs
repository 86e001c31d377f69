//! Rust client for calling an upstream API through the admission proxy.

mod client;

pub use client::{ProxyClient, DEFAULT_SECRET_HEADER};
