use crate::config::hardware::StripConfig;
use crate::error::{CoreError, CoreResult};
use crate::hardware::{ColorOrder, PhysicalStrip};
use crate::models::color::Color;
use log::{debug, info};
use rs_ws281x::{ChannelBuilder, Controller, ControllerBuilder, StripType};

/// WS281x-family strip driven through the rpi_ws281x PWM/DMA bindings.
/// The channel-order remap happens here so the rest of the system always
/// speaks RGB regardless of chip wiring.
pub struct Ws281xStrip {
    controller: Controller,
    order: ColorOrder,
    staged: Vec<Color>,
    shown: Vec<Color>,
}

impl Ws281xStrip {
    pub fn initialize(config: &StripConfig) -> CoreResult<Self> {
        info!(
            "Initializing WS281x strip: GPIO {}, {} pixels, DMA {}",
            config.gpio_pin, config.pixel_count, config.dma_channel
        );

        let channel = ChannelBuilder::new()
            .pin(config.gpio_pin as i32)
            .count(config.pixel_count as i32)
            .strip_type(StripType::Ws2811Rgb)
            .brightness(255)
            .build();

        let controller = ControllerBuilder::new()
            .freq(800_000)
            .dma(config.dma_channel as i32)
            .channel(0, channel)
            .build()
            .map_err(|e| {
                CoreError::HardwareUnavailable(format!(
                    "ws281x init failed on GPIO {}: {:?}",
                    config.gpio_pin, e
                ))
            })?;

        Ok(Self {
            controller,
            order: config.color_order,
            staged: vec![Color::black(); config.pixel_count],
            shown: vec![Color::black(); config.pixel_count],
        })
    }

    fn transfer(&mut self) -> CoreResult<()> {
        {
            let leds = self.controller.leds_mut(0);
            for (slot, color) in leds.iter_mut().zip(self.staged.iter()) {
                let [r, g, b] = self.order.remap(color.to_rgb());
                // The binding's raw LED layout is [B, G, R, W].
                *slot = [b, g, r, 0];
            }
        }

        self.controller
            .render()
            .map_err(|e| CoreError::HardwareTransient(format!("render failed: {:?}", e)))?;

        self.shown.clone_from(&self.staged);
        Ok(())
    }
}

impl PhysicalStrip for Ws281xStrip {
    fn pixel_count(&self) -> usize {
        self.staged.len()
    }

    fn set_pixel(&mut self, index: usize, color: Color) {
        if let Some(slot) = self.staged.get_mut(index) {
            *slot = color;
        }
    }

    fn get_pixel(&self, index: usize) -> Color {
        self.staged.get(index).cloned().unwrap_or_else(Color::black)
    }

    fn get_frame(&self) -> Vec<Color> {
        self.staged.clone()
    }

    fn apply_frame(&mut self, pixels: &[Color]) -> CoreResult<()> {
        let previous = self.staged.clone();
        let count = pixels.len().min(self.staged.len());
        self.staged[..count].clone_from_slice(&pixels[..count]);

        if let Err(e) = self.transfer() {
            self.staged = previous;
            return Err(e);
        }
        Ok(())
    }

    fn show(&mut self) -> CoreResult<()> {
        self.transfer()
    }

    fn clear(&mut self) -> CoreResult<()> {
        debug!("Clearing WS281x strip");
        self.staged.fill(Color::black());
        self.transfer()
    }
}
