pub mod channel;
pub mod mapper;

pub use channel::LedChannel;
pub use mapper::ZonePixelMapper;
