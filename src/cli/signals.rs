//! Shutdown signal handling for the record command

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::debug;

/// Set once SIGINT (Ctrl+C) or SIGTERM arrives
pub struct ShutdownSignal {
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Mark shutdown and wake any waiter
    pub fn trigger(&self) {
        trigger(&self.shutdown, &self.notify);
    }

    /// Resolve once shutdown has been requested
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_shutdown() {
                return;
            }
            notified.await;
        }
    }

    /// Install the OS signal listeners
    pub async fn setup(&self) -> Result<(), std::io::Error> {
        let (shutdown, notify) = (Arc::clone(&self.shutdown), Arc::clone(&self.notify));
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Received SIGINT");
                trigger(&shutdown, &notify);
            }
        });

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = signal(SignalKind::terminate())?;
            let (shutdown, notify) = (Arc::clone(&self.shutdown), Arc::clone(&self.notify));
            tokio::spawn(async move {
                sigterm.recv().await;
                debug!("Received SIGTERM");
                trigger(&shutdown, &notify);
            });
        }

        Ok(())
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

fn trigger(shutdown: &AtomicBool, notify: &Notify) {
    shutdown.store(true, Ordering::SeqCst);
    notify.notify_waiters();
}
