pub mod animation;
pub mod frame_manager;
pub mod indicator;
pub mod transition;

pub use animation::AnimationEngine;
pub use frame_manager::FrameManager;
pub use indicator::SelectedZoneIndicator;
pub use transition::{Easing, TransitionConfig, TransitionService};
