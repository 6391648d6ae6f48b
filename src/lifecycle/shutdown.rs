use crate::error::CoreResult;
use crate::lifecycle::task_registry::{TaskCategory, TaskRegistry};
use futures::future::BoxFuture;
use log::{error, info, warn};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// A component that needs an ordered say during shutdown. Higher priority
/// runs first.
pub trait ShutdownHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> i32;
    fn shutdown(&self) -> BoxFuture<'_, CoreResult<()>>;
}

/// Task categories whose failure takes the whole process down.
const CRITICAL_CATEGORIES: [TaskCategory; 4] = [
    TaskCategory::Api,
    TaskCategory::Hardware,
    TaskCategory::Render,
    TaskCategory::Input,
];

/// Orchestrates graceful shutdown: traps SIGINT/SIGTERM, watches for
/// critical task failures, then runs every registered handler in priority
/// order under per-handler and total timeouts.
pub struct ShutdownCoordinator {
    handlers: Mutex<Vec<Arc<dyn ShutdownHandler>>>,
    trigger_tx: watch::Sender<Option<String>>,
    trigger_rx: watch::Receiver<Option<String>>,
    timeout_per_handler: Duration,
    total_timeout: Duration,
}

impl ShutdownCoordinator {
    pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new() -> Arc<Self> {
        Self::with_timeouts(Self::DEFAULT_HANDLER_TIMEOUT, Self::DEFAULT_TOTAL_TIMEOUT)
    }

    pub fn with_timeouts(timeout_per_handler: Duration, total_timeout: Duration) -> Arc<Self> {
        let (trigger_tx, trigger_rx) = watch::channel(None);
        Arc::new(Self {
            handlers: Mutex::new(Vec::new()),
            trigger_tx,
            trigger_rx,
            timeout_per_handler,
            total_timeout,
        })
    }

    pub fn register(&self, handler: Arc<dyn ShutdownHandler>) {
        info!(
            "Registered shutdown handler: {} (priority {})",
            handler.name(),
            handler.priority()
        );
        self.handlers.lock().unwrap().push(handler);
    }

    /// Request shutdown; idempotent, the first reason wins.
    pub fn trigger(&self, reason: &str) {
        let mut first = false;
        self.trigger_tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason.to_string());
                first = true;
                true
            } else {
                false
            }
        });
        if first {
            info!("Shutdown triggered: {}", reason);
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.trigger_rx.borrow().is_some()
    }

    /// Install SIGINT/SIGTERM traps. Other signals stay with the runtime.
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut interrupt = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::interrupt(),
            ) {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Failed to install SIGINT handler: {}", e);
                    return;
                }
            };
            let mut terminate = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            ) {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    return;
                }
            };

            tokio::select! {
                _ = interrupt.recv() => coordinator.trigger("SIGINT"),
                _ = terminate.recv() => coordinator.trigger("SIGTERM"),
            }
        });
        info!("Signal handlers installed (SIGINT, SIGTERM)");
    }

    /// Watch the registry for failures in critical categories and trigger
    /// shutdown when one appears.
    pub fn watch_critical_tasks(self: &Arc<Self>, registry: Arc<TaskRegistry>) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                if coordinator.is_triggered() {
                    return;
                }
                for record in registry.failed() {
                    if CRITICAL_CATEGORIES.contains(&record.info.category) {
                        error!(
                            "Critical task failed: {} ({:?})",
                            record.info.description, record.info.category
                        );
                        coordinator.trigger(&format!(
                            "critical task failure: {}",
                            record.info.description
                        ));
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        });
    }

    /// Block until shutdown is requested; returns the reason.
    pub async fn wait_for_shutdown(&self) -> String {
        let mut rx = self.trigger_rx.clone();
        loop {
            if let Some(reason) = rx.borrow().clone() {
                return reason;
            }
            if rx.changed().await.is_err() {
                return "trigger channel closed".to_string();
            }
        }
    }

    /// Run all handlers, highest priority first. A slow handler is skipped
    /// after its timeout, a failing one is logged; neither aborts the
    /// sequence. The whole run is bounded by the total timeout.
    pub async fn shutdown_all(&self) {
        let mut handlers: Vec<Arc<dyn ShutdownHandler>> =
            self.handlers.lock().unwrap().clone();
        handlers.sort_by_key(|h| std::cmp::Reverse(h.priority()));

        info!("Running {} shutdown handler(s)", handlers.len());
        let deadline = Instant::now() + self.total_timeout;

        for handler in handlers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    "Total shutdown timeout exceeded; skipping remaining handlers from {}",
                    handler.name()
                );
                break;
            }

            let budget = self.timeout_per_handler.min(remaining);
            info!("Shutting down: {}", handler.name());
            match tokio::time::timeout(budget, handler.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    // Log and move on; later handlers still run.
                    error!("Shutdown handler {} failed: {}", handler.name(), e);
                }
                Err(_) => {
                    warn!(
                        "Shutdown handler {} timed out after {:?}",
                        handler.name(),
                        budget
                    );
                }
            }
        }

        info!("Shutdown sequence complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use futures::FutureExt;

    struct RecordingHandler {
        name: &'static str,
        priority: i32,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
        hang: bool,
    }

    impl ShutdownHandler for RecordingHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn shutdown(&self) -> BoxFuture<'_, CoreResult<()>> {
            async move {
                if self.hang {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                self.log.lock().unwrap().push(self.name);
                if self.fail {
                    return Err(CoreError::IllegalState("handler failure".into()));
                }
                Ok(())
            }
            .boxed()
        }
    }

    fn handler(
        name: &'static str,
        priority: i32,
        log: &Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> Arc<dyn ShutdownHandler> {
        Arc::new(RecordingHandler {
            name,
            priority,
            log: Arc::clone(log),
            fail,
            hang: false,
        })
    }

    #[tokio::test]
    async fn handlers_run_in_descending_priority_and_failures_do_not_abort() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let coordinator = ShutdownCoordinator::new();
        coordinator.register(handler("ten", 10, &log, false));
        coordinator.register(handler("hundred", 100, &log, false));
        coordinator.register(handler("fifty", 50, &log, true));

        coordinator.trigger("test");
        coordinator.shutdown_all().await;

        assert_eq!(*log.lock().unwrap(), vec!["hundred", "fifty", "ten"]);
    }

    #[tokio::test]
    async fn hanging_handler_is_timed_out_and_sequence_continues() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let coordinator = ShutdownCoordinator::with_timeouts(
            Duration::from_millis(50),
            Duration::from_secs(2),
        );
        coordinator.register(Arc::new(RecordingHandler {
            name: "stuck",
            priority: 100,
            log: Arc::clone(&log),
            fail: false,
            hang: true,
        }));
        coordinator.register(handler("after", 10, &log, false));

        coordinator.shutdown_all().await;
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[tokio::test]
    async fn trigger_is_idempotent_and_first_reason_wins() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.trigger("first");
        coordinator.trigger("second");
        assert_eq!(coordinator.wait_for_shutdown().await, "first");
    }

    #[tokio::test]
    async fn critical_task_failure_triggers_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let registry = TaskRegistry::new();
        coordinator.watch_critical_tasks(Arc::clone(&registry));

        let handle = registry.create_tracked_task(TaskCategory::Render, "render loop", async {
            Err(CoreError::HardwareTransient("dma stuck".into()))
        });
        handle.join().await;

        let reason = coordinator.wait_for_shutdown().await;
        assert!(reason.contains("render loop"));
    }

    #[tokio::test]
    async fn wait_for_shutdown_sees_trigger_from_other_task() {
        let coordinator = ShutdownCoordinator::new();
        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.wait_for_shutdown().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        coordinator.trigger("external");
        assert_eq!(waiter.await.unwrap(), "external");
    }

    #[tokio::test]
    async fn total_timeout_bounds_the_sequence() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let coordinator = ShutdownCoordinator::with_timeouts(
            Duration::from_millis(80),
            Duration::from_millis(100),
        );
        for (name, priority) in [("a", 30), ("b", 20), ("c", 10)] {
            coordinator.register(Arc::new(RecordingHandler {
                name,
                priority,
                log: Arc::clone(&log),
                fail: false,
                hang: true,
            }));
        }

        coordinator.shutdown_all().await;
        // Every handler hangs; the total budget cuts the sequence off.
        assert!(log.lock().unwrap().is_empty());
    }
}
