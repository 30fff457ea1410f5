//! # Structured Logging Module
//!
//! Console-only logging using the tracing ecosystem, designed for
//! containerized deployment where logs go to stdout/stderr and are collected
//! by the orchestrator.

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console tracing. Safe to call more than once.
///
/// The filter comes from `RUST_LOG` when set, otherwise `info`.
pub fn init_tracing() {
    TRACING_INITIALIZED.get_or_init(|| {
        // Determine if we're in a TTY for ANSI color support
        let use_ansi = std::io::stdout().is_terminal();

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(use_ansi)
            .with_filter(filter);

        let subscriber = tracing_subscriber::registry().with(console_layer);

        // Use try_init to avoid panic if a global subscriber already exists
        // (e.g. a test harness installed one first).
        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }
    });
}
