pub mod animation_service;
pub mod app_service;
pub mod persistence;
pub mod zone_service;

pub use animation_service::AnimationService;
pub use app_service::AppStateService;
pub use persistence::StateSaver;
pub use zone_service::ZoneService;
