//! Concrete shutdown handlers, registered in priority order so the strip
//! goes dark cleanly: animation stop, indicator stop, render loop drain,
//! LED clear, API stop, then task cancellation.

use crate::engine::animation::AnimationEngine;
use crate::engine::frame_manager::FrameManager;
use crate::engine::indicator::SelectedZoneIndicator;
use crate::engine::transition::TransitionConfig;
use crate::error::CoreResult;
use crate::lifecycle::shutdown::ShutdownHandler;
use crate::lifecycle::task_registry::TaskRegistry;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, watch};

pub struct AnimationShutdownHandler {
    engine: Arc<AnimationEngine>,
}

impl AnimationShutdownHandler {
    pub fn new(engine: Arc<AnimationEngine>) -> Arc<Self> {
        Arc::new(Self { engine })
    }
}

impl ShutdownHandler for AnimationShutdownHandler {
    fn name(&self) -> &'static str {
        "animation engine"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn shutdown(&self) -> BoxFuture<'_, CoreResult<()>> {
        async move {
            self.engine
                .stop(Some(TransitionConfig::SHUTDOWN), false)
                .await;
            Ok(())
        }
        .boxed()
    }
}

pub struct IndicatorShutdownHandler {
    indicator: Arc<SelectedZoneIndicator>,
}

impl IndicatorShutdownHandler {
    pub fn new(indicator: Arc<SelectedZoneIndicator>) -> Arc<Self> {
        Arc::new(Self { indicator })
    }
}

impl ShutdownHandler for IndicatorShutdownHandler {
    fn name(&self) -> &'static str {
        "zone indicator"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn shutdown(&self) -> BoxFuture<'_, CoreResult<()>> {
        async move {
            self.indicator.stop();
            Ok(())
        }
        .boxed()
    }
}

pub struct FrameManagerShutdownHandler {
    frame_manager: Arc<FrameManager>,
}

impl FrameManagerShutdownHandler {
    pub fn new(frame_manager: Arc<FrameManager>) -> Arc<Self> {
        Arc::new(Self { frame_manager })
    }
}

impl ShutdownHandler for FrameManagerShutdownHandler {
    fn name(&self) -> &'static str {
        "frame manager"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn shutdown(&self) -> BoxFuture<'_, CoreResult<()>> {
        async move {
            self.frame_manager.stop();
            Ok(())
        }
        .boxed()
    }
}

pub struct LedClearShutdownHandler {
    frame_manager: Arc<FrameManager>,
}

impl LedClearShutdownHandler {
    pub fn new(frame_manager: Arc<FrameManager>) -> Arc<Self> {
        Arc::new(Self { frame_manager })
    }
}

impl ShutdownHandler for LedClearShutdownHandler {
    fn name(&self) -> &'static str {
        "led clear"
    }

    fn priority(&self) -> i32 {
        70
    }

    fn shutdown(&self) -> BoxFuture<'_, CoreResult<()>> {
        async move {
            self.frame_manager.clear_channels().await;
            Ok(())
        }
        .boxed()
    }
}

/// Signals the axum server to stop accepting connections and waits briefly
/// for it to wind down before the rest of shutdown proceeds.
pub struct ApiServerShutdownHandler {
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
    done_rx: watch::Receiver<bool>,
}

impl ApiServerShutdownHandler {
    pub const GRACE: Duration = Duration::from_secs(2);

    pub fn new(stop_tx: oneshot::Sender<()>, done_rx: watch::Receiver<bool>) -> Arc<Self> {
        Arc::new(Self {
            stop_tx: Mutex::new(Some(stop_tx)),
            done_rx,
        })
    }
}

impl ShutdownHandler for ApiServerShutdownHandler {
    fn name(&self) -> &'static str {
        "api server"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn shutdown(&self) -> BoxFuture<'_, CoreResult<()>> {
        async move {
            if let Some(tx) = self.stop_tx.lock().unwrap().take() {
                let _ = tx.send(());
            }

            let mut done = self.done_rx.clone();
            let _ = tokio::time::timeout(Self::GRACE, async {
                while !*done.borrow() {
                    if done.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await;
            Ok(())
        }
        .boxed()
    }
}

/// Cancels every remaining tracked task, then gives them a short grace
/// window to unwind.
pub struct TaskCancellationHandler {
    registry: Arc<TaskRegistry>,
}

impl TaskCancellationHandler {
    pub const GRACE: Duration = Duration::from_millis(50);

    pub fn new(registry: Arc<TaskRegistry>) -> Arc<Self> {
        Arc::new(Self { registry })
    }
}

impl ShutdownHandler for TaskCancellationHandler {
    fn name(&self) -> &'static str {
        "task cancellation"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn shutdown(&self) -> BoxFuture<'_, CoreResult<()>> {
        async move {
            let cancelled = self.registry.cancel_all(&[]);
            debug!("Task cancellation handler signalled {} task(s)", cancelled);
            tokio::time::sleep(Self::GRACE).await;
            Ok(())
        }
        .boxed()
    }
}
