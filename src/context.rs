use crate::engine::frame_manager::FrameManager;
use crate::engine::transition::TransitionService;
use crate::events::EventBus;
use crate::lifecycle::task_registry::TaskRegistry;
use std::sync::Arc;

/// Shared core handles, assembled once in `main` and passed explicitly to
/// everything that needs them. Producers reference channels through the
/// frame manager by GPIO, never by owning pointer, which keeps the
/// ownership tree acyclic.
#[derive(Clone)]
pub struct CoreContext {
    pub event_bus: Arc<EventBus>,
    pub task_registry: Arc<TaskRegistry>,
    pub frame_manager: Arc<FrameManager>,
    pub transitions: Arc<TransitionService>,
}
