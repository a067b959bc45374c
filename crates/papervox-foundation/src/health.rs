use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// A component that can report whether it is currently healthy.
///
/// Checks must be cheap and non-blocking; they run on the monitor task at a
/// fixed cadence. The playback controller registers a probe here so a
/// synthesis call that never returns is detected and reported rather than
/// silently hanging the session.
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct ComponentHealth {
    pub healthy: bool,
    pub last_check: Instant,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

pub struct HealthMonitor {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    checks: Arc<RwLock<Vec<Box<dyn HealthCheck>>>>,
    check_interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl HealthMonitor {
    pub fn new(check_interval: Duration) -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            checks: Arc::new(RwLock::new(Vec::new())),
            check_interval,
            handle: None,
        }
    }

    pub fn register(&self, check: Box<dyn HealthCheck>) {
        let name = check.name().to_string();
        self.components.write().insert(
            name,
            ComponentHealth {
                healthy: true,
                last_check: Instant::now(),
                last_error: None,
                consecutive_failures: 0,
            },
        );
        self.checks.write().push(check);
    }

    /// Runs every registered check once, updating component status and
    /// logging edges (healthy -> unhealthy and back).
    pub fn run_once(&self) {
        let now = Instant::now();
        let checks = self.checks.read();
        let mut components = self.components.write();
        for check in checks.iter() {
            let entry = components
                .entry(check.name().to_string())
                .or_insert(ComponentHealth {
                    healthy: true,
                    last_check: now,
                    last_error: None,
                    consecutive_failures: 0,
                });
            entry.last_check = now;
            match check.check() {
                Ok(()) => {
                    if !entry.healthy {
                        tracing::info!(component = check.name(), "Component recovered");
                    }
                    entry.healthy = true;
                    entry.last_error = None;
                    entry.consecutive_failures = 0;
                }
                Err(err) => {
                    entry.healthy = false;
                    entry.consecutive_failures += 1;
                    tracing::warn!(
                        component = check.name(),
                        failures = entry.consecutive_failures,
                        "Health check failed: {}",
                        err
                    );
                    entry.last_error = Some(err);
                }
            }
        }
    }

    pub fn start(mut self) -> Self {
        let components = Arc::clone(&self.components);
        let checks = Arc::clone(&self.checks);
        let interval = self.check_interval;

        let handle = tokio::spawn(async move {
            let monitor = HealthMonitor {
                components,
                checks,
                check_interval: interval,
                handle: None,
            };
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                monitor.run_once();
            }
        });

        self.handle = Some(handle);
        self
    }

    pub fn snapshot(&self) -> HashMap<String, ComponentHealth> {
        self.components.read().clone()
    }

    pub fn all_healthy(&self) -> bool {
        self.components.read().values().all(|c| c.healthy)
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
