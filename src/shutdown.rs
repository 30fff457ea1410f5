//! Cooperative shutdown signal.
//!
//! The relay loop and both connectors' retry loops block on fixed sleeps;
//! every one of those waits goes through [`Shutdown::sleep`] so an external
//! stop request interrupts the worker instead of waiting out the backoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Shutdown handle shared between the signal handler and the relay loop.
#[derive(Debug, Default)]
pub struct Shutdown {
    requested: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake every pending wait.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Sleep for `duration`, waking early on a shutdown request.
    ///
    /// Returns `true` if the full duration elapsed and no shutdown is
    /// pending, `false` if the caller should stop.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register interest before checking the flag so a request landing
        // between the check and the select cannot be missed.
        notified.as_mut().enable();

        if self.is_requested() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_requested(),
            _ = &mut notified => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn sleep_completes_when_no_shutdown_requested() {
        let shutdown = Shutdown::new();
        assert!(shutdown.sleep(Duration::from_millis(1)).await);
    }

    #[tokio::test]
    async fn sleep_returns_false_after_request() {
        let shutdown = Shutdown::new();
        shutdown.request();
        assert!(shutdown.is_requested());
        assert!(!shutdown.sleep(Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn request_interrupts_a_pending_sleep() {
        let shutdown = Arc::new(Shutdown::new());
        let sleeper = Arc::clone(&shutdown);
        let handle = tokio::spawn(async move { sleeper.sleep(Duration::from_secs(60)).await });

        // Give the sleeper a chance to park before signalling.
        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.request();

        let completed = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sleep should be interrupted promptly")
            .unwrap();
        assert!(!completed);
    }
}
