use crate::config::presets::ColorPresets;
use crate::error::{CoreError, CoreResult};
use crate::utils::colors::{hue_to_rgb, rgb_to_hue};
use serde::{Deserialize, Serialize};

pub type Rgb = [u8; 3];

/// Color representation modes. HUE is the encoder-friendly storage format,
/// PRESET is a named entry from colors.yaml (whites need exact RGB), RGB is
/// used for direct API writes and derived colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorMode {
    Hue,
    Preset,
    Rgb,
}

/// Unified color value. Immutable after construction; all adjusters return a
/// new value. Exactly one of `hue`/`rgb` is always populated, so `to_rgb` is
/// total.
#[derive(Debug, Clone, PartialEq)]
pub struct Color {
    mode: ColorMode,
    hue: Option<u16>,
    preset_name: Option<String>,
    rgb: Option<Rgb>,
}

impl Color {
    pub fn from_hue(hue: u16) -> Self {
        Self {
            mode: ColorMode::Hue,
            hue: Some(hue % 360),
            preset_name: None,
            rgb: None,
        }
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            mode: ColorMode::Rgb,
            hue: None,
            preset_name: None,
            rgb: Some([r, g, b]),
        }
    }

    /// Build a preset color. Whites keep their exact RGB; saturated presets
    /// also carry a hue so the encoder can seamlessly switch to HUE mode.
    pub fn from_preset(preset_name: &str, presets: &ColorPresets) -> CoreResult<Self> {
        let rgb = presets.get_rgb(preset_name).ok_or_else(|| {
            CoreError::NotFound(format!("unknown color preset '{}'", preset_name))
        })?;

        let hue = if presets.is_white(preset_name) {
            None
        } else {
            Some(rgb_to_hue(rgb))
        };

        Ok(Self {
            mode: ColorMode::Preset,
            hue,
            preset_name: Some(preset_name.to_string()),
            rgb: Some(rgb),
        })
    }

    pub fn black() -> Self {
        Self::from_rgb(0, 0, 0)
    }

    pub fn white() -> Self {
        Self::from_rgb(255, 255, 255)
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    pub fn preset_name(&self) -> Option<&str> {
        self.preset_name.as_deref()
    }

    /// Render to RGB. Cached RGB wins (presets, brightness-scaled values),
    /// otherwise the stored hue is converted.
    pub fn to_rgb(&self) -> Rgb {
        if let Some(rgb) = self.rgb {
            return rgb;
        }
        match self.hue {
            Some(hue) => hue_to_rgb(hue),
            // Unreachable through the constructors; render black rather
            // than poison the frame path.
            None => [0, 0, 0],
        }
    }

    pub fn to_hue(&self) -> u16 {
        if let Some(hue) = self.hue {
            return hue;
        }
        rgb_to_hue(self.to_rgb())
    }

    /// Rotate the hue by `delta` degrees; the result is always a HUE-mode
    /// color.
    pub fn adjust_hue(&self, delta: i32) -> Self {
        let hue = (self.to_hue() as i32 + delta).rem_euclid(360) as u16;
        Self::from_hue(hue)
    }

    /// Cycle through the preset order by `delta` steps. Non-preset colors
    /// enter the cycle at the preset closest to their current RGB.
    pub fn next_preset(&self, delta: i32, presets: &ColorPresets) -> CoreResult<Self> {
        let order = presets.order();
        if order.is_empty() {
            return Err(CoreError::ConfigInvalid(
                "color preset order is empty".into(),
            ));
        }

        let current_idx = match &self.preset_name {
            Some(name) => order.iter().position(|n| n == name).unwrap_or(0),
            None => {
                let closest = presets.closest(self.to_rgb());
                order.iter().position(|n| Some(n.as_str()) == closest).unwrap_or(0)
            }
        };

        let len = order.len() as i32;
        let new_idx = (current_idx as i32 + delta).rem_euclid(len) as usize;
        Self::from_preset(&order[new_idx], presets)
    }

    /// Scale an RGB triple by a brightness percentage (clamped to 0..100).
    pub fn scale_rgb(rgb: Rgb, brightness: u8) -> Rgb {
        let pct = brightness.min(100) as u32;
        [
            (rgb[0] as u32 * pct / 100) as u8,
            (rgb[1] as u32 * pct / 100) as u8,
            (rgb[2] as u32 * pct / 100) as u8,
        ]
    }

    /// Apply brightness while preserving the color mode, so a dimmed preset
    /// still cycles as a preset and a dimmed hue still turns as a hue.
    pub fn with_brightness(&self, brightness: u8) -> Self {
        let scaled = Self::scale_rgb(self.to_rgb(), brightness);
        Self {
            mode: self.mode,
            hue: self.hue,
            preset_name: self.preset_name.clone(),
            rgb: Some(scaled),
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mode {
            ColorMode::Hue => write!(f, "Color(HUE={}°)", self.hue.unwrap_or(0)),
            ColorMode::Preset => write!(
                f,
                "Color(PRESET={})",
                self.preset_name.as_deref().unwrap_or("?")
            ),
            ColorMode::Rgb => {
                let [r, g, b] = self.to_rgb();
                write!(f, "Color(RGB={},{},{})", r, g, b)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets::ColorPresets;

    fn test_presets() -> ColorPresets {
        ColorPresets::builtin()
    }

    #[test]
    fn hue_round_trips_exactly() {
        for h in 0..360u16 {
            assert_eq!(Color::from_hue(h).to_hue(), h);
        }
    }

    #[test]
    fn preset_renders_exact_rgb() {
        let presets = test_presets();
        for name in presets.order() {
            let color = Color::from_preset(name, &presets).unwrap();
            assert_eq!(color.to_rgb(), presets.get_rgb(name).unwrap());
        }
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let presets = test_presets();
        assert!(matches!(
            Color::from_preset("no_such_color", &presets),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn adjust_hue_wraps() {
        assert_eq!(Color::from_hue(350).adjust_hue(20).to_hue(), 10);
        assert_eq!(Color::from_hue(10).adjust_hue(-20).to_hue(), 350);
    }

    #[test]
    fn brightness_scales_channels_and_keeps_mode() {
        let dimmed = Color::from_hue(0).with_brightness(50);
        assert_eq!(dimmed.mode(), ColorMode::Hue);
        assert_eq!(dimmed.to_rgb(), [127, 0, 0]);

        let off = Color::from_rgb(10, 20, 30).with_brightness(0);
        assert_eq!(off.to_rgb(), [0, 0, 0]);
    }

    #[test]
    fn next_preset_cycles_in_order() {
        let presets = test_presets();
        let order = presets.order();
        let first = Color::from_preset(&order[0], &presets).unwrap();
        let second = first.next_preset(1, &presets).unwrap();
        assert_eq!(second.preset_name(), Some(order[1].as_str()));

        let back = second.next_preset(-1, &presets).unwrap();
        assert_eq!(back.preset_name(), Some(order[0].as_str()));
    }
}
