use crate::error::{CoreError, CoreResult};
use crate::hardware::PhysicalStrip;
use crate::models::color::Color;

/// In-memory strip used on development machines and in tests. Mirrors the
/// buffered/transferred split of the real driver: `set_pixel` stages,
/// `show`/`apply_frame` commit.
pub struct VirtualStrip {
    staged: Vec<Color>,
    shown: Vec<Color>,
    pub transfers: u64,
    fail_next: u32,
}

impl VirtualStrip {
    pub fn new(pixel_count: usize) -> Self {
        Self {
            staged: vec![Color::black(); pixel_count],
            shown: vec![Color::black(); pixel_count],
            transfers: 0,
            fail_next: 0,
        }
    }

    /// Make the next `count` transfers fail, for transient-error tests.
    pub fn fail_next_transfers(&mut self, count: u32) {
        self.fail_next = count;
    }

    /// The frame currently "on the hardware" (last successful transfer).
    pub fn shown_frame(&self) -> Vec<Color> {
        self.shown.clone()
    }

    fn transfer(&mut self) -> CoreResult<()> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(CoreError::HardwareTransient(
                "simulated DMA transfer failure".into(),
            ));
        }
        self.shown = self.staged.clone();
        self.transfers += 1;
        Ok(())
    }
}

impl PhysicalStrip for VirtualStrip {
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
            // Failed pushes must not change the visible state.
            self.staged = previous;
            return Err(e);
        }
        Ok(())
    }

    fn show(&mut self) -> CoreResult<()> {
        self.transfer()
    }

    fn clear(&mut self) -> CoreResult<()> {
        self.staged.fill(Color::black());
        self.transfer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_frame_truncates_and_pads() {
        let mut strip = VirtualStrip::new(3);
        strip
            .apply_frame(&[
                Color::from_rgb(1, 0, 0),
                Color::from_rgb(2, 0, 0),
                Color::from_rgb(3, 0, 0),
                Color::from_rgb(4, 0, 0),
            ])
            .unwrap();
        assert_eq!(strip.get_frame()[2], Color::from_rgb(3, 0, 0));

        strip.apply_frame(&[Color::from_rgb(9, 0, 0)]).unwrap();
        // Only the provided prefix is overwritten.
        assert_eq!(strip.get_frame()[0], Color::from_rgb(9, 0, 0));
        assert_eq!(strip.get_frame()[1], Color::from_rgb(2, 0, 0));
    }

    #[test]
    fn out_of_range_writes_are_clipped() {
        let mut strip = VirtualStrip::new(2);
        strip.set_pixel(10, Color::white());
        assert_eq!(strip.get_frame(), vec![Color::black(); 2]);
    }

    #[test]
    fn failed_transfer_preserves_visible_state() {
        let mut strip = VirtualStrip::new(2);
        strip.apply_frame(&[Color::white(), Color::white()]).unwrap();

        strip.fail_next_transfers(1);
        let err = strip.apply_frame(&[Color::black(), Color::black()]);
        assert!(matches!(err, Err(CoreError::HardwareTransient(_))));
        assert_eq!(strip.shown_frame(), vec![Color::white(); 2]);
        assert_eq!(strip.get_frame(), vec![Color::white(); 2]);

        // Next push succeeds again.
        strip.apply_frame(&[Color::black(), Color::black()]).unwrap();
        assert_eq!(strip.shown_frame(), vec![Color::black(); 2]);
    }
}
