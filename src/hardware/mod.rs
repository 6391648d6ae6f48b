use crate::config::hardware::StripConfig;
use crate::error::CoreResult;
use crate::models::color::Color;
use serde::{Deserialize, Serialize};

mod virtual_strip;
#[cfg(feature = "hardware")]
mod ws281x;

pub use virtual_strip::VirtualStrip;
#[cfg(feature = "hardware")]
pub use ws281x::Ws281xStrip;

/// Channel wiring order of the LED chip. The strip applies the remap
/// internally during transfer; everything above hardware speaks RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorOrder {
    Rgb,
    Rbg,
    Grb,
    Gbr,
    Brg,
    Bgr,
}

impl ColorOrder {
    pub fn remap(&self, [r, g, b]: [u8; 3]) -> [u8; 3] {
        match self {
            ColorOrder::Rgb => [r, g, b],
            ColorOrder::Rbg => [r, b, g],
            ColorOrder::Grb => [g, r, b],
            ColorOrder::Gbr => [g, b, r],
            ColorOrder::Brg => [b, r, g],
            ColorOrder::Bgr => [b, g, r],
        }
    }
}

/// One physical LED chain on one GPIO. Pixel writes are buffered; `show`
/// and `apply_frame` transfer to the hardware. Out-of-range indices are
/// clipped silently; transfer failures surface as `HardwareTransient` and
/// leave the visible frame at the last successful push.
pub trait PhysicalStrip: Send {
    fn pixel_count(&self) -> usize;

    /// Buffered single-pixel write; no transfer.
    fn set_pixel(&mut self, index: usize, color: Color);

    fn get_pixel(&self, index: usize) -> Color;

    /// Snapshot of the buffered frame.
    fn get_frame(&self) -> Vec<Color>;

    /// Atomic full-frame push in one transfer. Only
    /// `min(pixels.len(), pixel_count)` pixels are written; the rest keep
    /// their buffered values.
    fn apply_frame(&mut self, pixels: &[Color]) -> CoreResult<()>;

    /// Transfer the buffered frame.
    fn show(&mut self) -> CoreResult<()>;

    /// Black out the strip and transfer.
    fn clear(&mut self) -> CoreResult<()>;
}

/// Build the strip implementation for one configured chain. `virtual_mode`
/// forces the in-memory strip (development machines, tests, CI).
pub fn create_strip(config: &StripConfig, virtual_mode: bool) -> CoreResult<Box<dyn PhysicalStrip>> {
    if virtual_mode {
        log::debug!("Creating virtual strip for GPIO {}", config.gpio_pin);
        return Ok(Box::new(VirtualStrip::new(config.pixel_count)));
    }

    #[cfg(feature = "hardware")]
    {
        log::debug!("Creating WS281x strip on GPIO {}", config.gpio_pin);
        Ok(Box::new(Ws281xStrip::initialize(config)?))
    }

    #[cfg(not(feature = "hardware"))]
    {
        log::warn!(
            "Built without the 'hardware' feature; GPIO {} runs on a virtual strip",
            config.gpio_pin
        );
        Ok(Box::new(VirtualStrip::new(config.pixel_count)))
    }
}
