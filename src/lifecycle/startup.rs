//! Startup orchestration.
//!
//! # Order
//! metrics → upstream client + admission queue → admin listener →
//! proxy listener. Listeners start last so traffic only arrives once the
//! queue exists. Any startup error is fatal.

use std::net::SocketAddr;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::ProxyConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("invalid address '{0}'")]
    Address(String),
}

fn parse_addr(value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::Address(value.to_string()))
}

/// Start every subsystem and serve until SIGINT/SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        metrics::init_metrics(parse_addr(&config.observability.metrics_address)?)?;
    }

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config.clone())?;

    if config.admin.enabled {
        let listener = TcpListener::bind(parse_addr(&config.admin.bind_address)?).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let state = AdminState {
            queue: server.queue().clone(),
            upstream: config.upstream.origin.as_str().into(),
        };
        let router = setup_admin_router(state, &config.admin.api_key);
        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        });
    }

    let listener = TcpListener::bind(parse_addr(&config.listener.bind_address)?).await?;

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
