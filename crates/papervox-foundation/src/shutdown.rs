use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;

/// Installs Ctrl-C handling and a panic hook, producing a guard the control
/// loop can wait on. Shutdown can also be requested programmatically, which
/// the interactive `quit` command uses.
pub struct ShutdownHandler {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandler {
    pub fn new() -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub async fn install(self) -> ShutdownGuard {
        let requested = Arc::clone(&self.requested);
        let notify = Arc::clone(&self.notify);

        tokio::spawn(async move {
            if let Err(err) = signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", err);
                return;
            }
            tracing::info!("Shutdown requested via Ctrl-C");
            requested.store(true, Ordering::SeqCst);
            notify.notify_waiters();
        });

        let original_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            tracing::error!("PANIC: {}", panic_info);
            original_panic(panic_info);
        }));

        ShutdownGuard {
            requested: self.requested,
            notify: self.notify,
        }
    }
}

pub struct ShutdownGuard {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownGuard {
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        if self.is_requested() {
            return;
        }
        self.notify.notified().await;
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn programmatic_request_wakes_waiters() {
        let guard = ShutdownHandler::new().install().await;
        assert!(!guard.is_requested());
        guard.request();
        assert!(guard.is_requested());
        // Must resolve immediately now that shutdown was requested.
        guard.wait().await;
    }
}
