//! Admission Proxy (v1)
//!
//! Sits in front of a rate-sensitive upstream API and guarantees that no more
//! than `max_concurrency` requests are ever in flight against it.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                   ADMISSION PROXY                    │
//!                     │                                                      │
//!  Client Request     │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐   │
//!  ───────────────────┼─▶│  http   │──▶│ security │──▶│      queue       │   │
//!                     │  │ server  │   │   gate   │   │ FIFO + in-flight │   │
//!                     │  └─────────┘   └────┬─────┘   └───────┬──────────┘   │
//!                     │                     │ 401             │ 503          │
//!                     │                     ▼                 ▼ dispatch ≤ N │
//!  Client Response    │                                ┌──────────────────┐  │
//!  ◀──────────────────┼────────────────────────────────│     upstream     │◀─┼── Upstream
//!                     │                                │  client (502 on  │  │    API
//!                     │                                │  transport error)│  │
//!                     │                                └──────────────────┘  │
//!                     │                                                      │
//!                     │   config · observability · lifecycle · admin API     │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use admission_proxy::config::load_config;
use admission_proxy::lifecycle::startup;
use admission_proxy::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "admission-proxy", version)]
#[command(about = "Concurrency-limited admission proxy for a single upstream API")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "ADMISSION_PROXY_CONFIG", default_value = "admission-proxy.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    init_logging(&config.observability)?;

    tracing::info!("admission-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = %args.config.display(),
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.origin,
        max_concurrency = config.queue.max_concurrency,
        max_queue_size = config.queue.max_queue_size,
        request_timeout_secs = config.upstream.request_timeout_secs,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
