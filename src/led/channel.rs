use crate::error::CoreResult;
use crate::hardware::PhysicalStrip;
use crate::led::mapper::ZonePixelMapper;
use crate::models::color::Color;
use crate::models::zone::ZoneId;
use std::collections::HashMap;

/// One logical LED channel: a physical strip plus the zone mapper for its
/// GPIO. The frame manager is the only caller of `apply_pixel_frame` at
/// runtime; everything else builds frames through the mapper.
pub struct LedChannel {
    gpio: u8,
    strip: Box<dyn PhysicalStrip>,
    mapper: ZonePixelMapper,
}

impl LedChannel {
    pub fn new(gpio: u8, strip: Box<dyn PhysicalStrip>, mapper: ZonePixelMapper) -> Self {
        Self {
            gpio,
            strip,
            mapper,
        }
    }

    pub fn gpio(&self) -> u8 {
        self.gpio
    }

    pub fn pixel_count(&self) -> usize {
        self.strip.pixel_count()
    }

    pub fn mapper(&self) -> &ZonePixelMapper {
        &self.mapper
    }

    pub fn has_zone(&self, zone: ZoneId) -> bool {
        self.mapper.zone_length(zone) > 0
    }

    /// Snapshot of the frame currently on the hardware buffer.
    pub fn current_frame(&self) -> Vec<Color> {
        self.strip.get_frame()
    }

    /// Atomic push of a full absolute-pixel frame.
    pub fn apply_pixel_frame(&mut self, pixels: &[Color]) -> CoreResult<()> {
        self.strip.apply_frame(pixels)
    }

    /// Build an absolute frame with the given zones overlaid on the current
    /// hardware snapshot. Zones absent from the map keep their pixels: this
    /// is what makes zone frames partial updates.
    pub fn build_frame_from_zones(&self, zone_colors: &HashMap<ZoneId, Color>) -> Vec<Color> {
        let mut frame = self.strip.get_frame();
        for (zone, color) in zone_colors {
            for &index in self.mapper.get_indices(*zone) {
                if let Some(slot) = frame.get_mut(index) {
                    *slot = color.clone();
                }
            }
        }
        frame
    }

    /// Build an absolute frame with per-zone pixel arrays overlaid on the
    /// current snapshot. Arrays shorter than the zone overwrite only the
    /// provided prefix; `reversed` zones are handled by the mapper.
    pub fn build_frame_from_zone_pixels(
        &self,
        zone_pixels: &HashMap<ZoneId, Vec<Color>>,
    ) -> Vec<Color> {
        let mut frame = self.strip.get_frame();
        for (zone, pixels) in zone_pixels {
            let indices = self.mapper.get_indices(*zone);
            for (logical, color) in pixels.iter().enumerate() {
                let Some(&index) = indices.get(logical) else {
                    break;
                };
                if let Some(slot) = frame.get_mut(index) {
                    *slot = color.clone();
                }
            }
        }
        frame
    }

    /// Convenience write: one zone, one color, immediate push.
    pub fn set_zone_color(&mut self, zone: ZoneId, color: Color) -> CoreResult<()> {
        let mut zone_colors = HashMap::new();
        zone_colors.insert(zone, color);
        let frame = self.build_frame_from_zones(&zone_colors);
        self.apply_pixel_frame(&frame)
    }

    /// Convenience write: one absolute pixel, immediate push.
    pub fn set_absolute_pixel(&mut self, index: usize, color: Color) -> CoreResult<()> {
        self.strip.set_pixel(index, color);
        self.strip.show()
    }

    pub fn clear(&mut self) -> CoreResult<()> {
        self.strip.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::VirtualStrip;
    use crate::models::zone::ZoneConfig;

    fn zone(id: ZoneId, start: usize, count: usize, reversed: bool) -> ZoneConfig {
        ZoneConfig {
            id,
            display_name: id.as_key().to_string(),
            gpio: 18,
            pixel_count: count,
            enabled: true,
            reversed,
            start_index: start,
            end_index: start + count - 1,
        }
    }

    fn channel() -> LedChannel {
        let mapper = ZonePixelMapper::new(&[
            zone(ZoneId::Floor, 0, 3, false),
            zone(ZoneId::Lamp, 3, 2, false),
        ])
        .unwrap();
        LedChannel::new(18, Box::new(VirtualStrip::new(5)), mapper)
    }

    #[test]
    fn zone_frame_preserves_untouched_zones() {
        let mut ch = channel();

        let mut pixels = HashMap::new();
        pixels.insert(ZoneId::Floor, vec![Color::from_rgb(255, 0, 0); 3]);
        pixels.insert(ZoneId::Lamp, vec![Color::from_rgb(0, 0, 255); 2]);
        let frame = ch.build_frame_from_zone_pixels(&pixels);
        ch.apply_pixel_frame(&frame).unwrap();

        let mut zone_colors = HashMap::new();
        zone_colors.insert(ZoneId::Floor, Color::from_rgb(0, 255, 0));
        let frame = ch.build_frame_from_zones(&zone_colors);
        ch.apply_pixel_frame(&frame).unwrap();

        let current = ch.current_frame();
        for i in 0..3 {
            assert_eq!(current[i].to_rgb(), [0, 255, 0]);
        }
        for i in 3..5 {
            assert_eq!(current[i].to_rgb(), [0, 0, 255]);
        }
    }

    #[test]
    fn short_pixel_array_overwrites_prefix_only() {
        let mut ch = channel();
        let mut zone_colors = HashMap::new();
        zone_colors.insert(ZoneId::Floor, Color::from_rgb(10, 10, 10));
        let frame = ch.build_frame_from_zones(&zone_colors);
        ch.apply_pixel_frame(&frame).unwrap();

        let mut pixels = HashMap::new();
        pixels.insert(ZoneId::Floor, vec![Color::from_rgb(99, 0, 0)]);
        let frame = ch.build_frame_from_zone_pixels(&pixels);
        ch.apply_pixel_frame(&frame).unwrap();

        let current = ch.current_frame();
        assert_eq!(current[0].to_rgb(), [99, 0, 0]);
        assert_eq!(current[1].to_rgb(), [10, 10, 10]);
        assert_eq!(current[2].to_rgb(), [10, 10, 10]);
    }

    #[test]
    fn reversed_zone_pixels_land_high_to_low() {
        let mapper = ZonePixelMapper::new(&[zone(ZoneId::Pixel, 10, 4, true)]).unwrap();
        let mut ch = LedChannel::new(19, Box::new(VirtualStrip::new(14)), mapper);

        let mut pixels = HashMap::new();
        pixels.insert(
            ZoneId::Pixel,
            vec![
                Color::from_rgb(1, 0, 0),
                Color::from_rgb(2, 0, 0),
                Color::from_rgb(3, 0, 0),
                Color::from_rgb(4, 0, 0),
            ],
        );
        let frame = ch.build_frame_from_zone_pixels(&pixels);
        ch.apply_pixel_frame(&frame).unwrap();

        let current = ch.current_frame();
        assert_eq!(current[13].to_rgb(), [1, 0, 0]);
        assert_eq!(current[12].to_rgb(), [2, 0, 0]);
        assert_eq!(current[11].to_rgb(), [3, 0, 0]);
        assert_eq!(current[10].to_rgb(), [4, 0, 0]);
        assert_eq!(current[0].to_rgb(), [0, 0, 0]);
    }

    #[test]
    fn applied_frame_equals_snapshot() {
        let mut ch = channel();
        let frame = vec![Color::from_rgb(5, 6, 7); 5];
        ch.apply_pixel_frame(&frame).unwrap();
        assert_eq!(ch.current_frame(), frame);
    }
}
