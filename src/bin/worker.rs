//! # Vote Relay Worker Binary
//!
//! Thin wrapper for running the relay loop as a standalone process. Fatal
//! startup errors (configuration, secret resolution) exit non-zero; once
//! the loop is running the process only stops on Ctrl-C/SIGTERM.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_HOST=db REDIS_HOST=redis cargo run --bin worker
//! ```

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use vote_worker::{
    logging, secrets, ConnectionSupervisor, PostgresVoteStore, RedisVoteQueue, RelayWorker,
    Shutdown, WorkerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    info!("🚀 Starting vote relay worker");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env().inspect_err(|e| {
        error!(error = %e, "Invalid worker configuration");
    })?;

    // Misconfigured secrets are fatal: retrying cannot fix a missing or
    // malformed secret.
    let descriptor = secrets::resolve(&config.database).await.inspect_err(|e| {
        error!(error = %e, "Failed to resolve database credentials");
    })?;

    let shutdown = Arc::new(Shutdown::new());

    // Initial connects block until each dependency is reachable; the worker
    // has nothing useful to do before then.
    let store =
        PostgresVoteStore::connect(&descriptor, config.reconnect_backoff, &shutdown).await?;
    let queue = RedisVoteQueue::connect(
        &config.queue.host,
        config.queue.port,
        config.reconnect_backoff,
        &shutdown,
    )
    .await?;

    let supervisor = ConnectionSupervisor::new(queue, store);
    let mut relay = RelayWorker::new(supervisor, config.poll_interval, Arc::clone(&shutdown));

    info!("🎉 Vote relay worker started");

    let worker = tokio::spawn(async move { relay.run().await });

    shutdown_signal().await;
    info!("🛑 Shutdown signal received, stopping relay loop");
    shutdown.request();

    worker.await??;

    info!("👋 Vote relay worker shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
