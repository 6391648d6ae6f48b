pub mod animation;
pub mod color;
pub mod events;
pub mod frame;
pub mod parameter;
pub mod state;
pub mod zone;
