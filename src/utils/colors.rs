//! Hue <-> RGB conversion helpers shared by the color model and animations.

/// Convert a hue angle (degrees, full saturation and value) to RGB.
pub fn hue_to_rgb(hue: u16) -> [u8; 3] {
    let h = (hue % 360) as f32;
    let sector = (h / 60.0).floor() as u8 % 6;
    let f = h / 60.0 - (h / 60.0).floor();
    let q = ((1.0 - f) * 255.0).round() as u8;
    let t = (f * 255.0).round() as u8;

    match sector {
        0 => [255, t, 0],
        1 => [q, 255, 0],
        2 => [0, 255, t],
        3 => [0, q, 255],
        4 => [t, 0, 255],
        _ => [255, 0, q],
    }
}

/// Approximate a hue angle from RGB. Gray (max == min) maps to 0.
pub fn rgb_to_hue(rgb: [u8; 3]) -> u16 {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    if delta <= f32::EPSILON {
        return 0;
    }

    let hue = if max == r {
        60.0 * (((g - b) / delta) % 6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let hue = if hue < 0.0 { hue + 360.0 } else { hue };
    (hue.round() as u16) % 360
}

/// Squared Euclidean distance between two colors, used for closest-preset
/// lookups.
pub fn rgb_distance_sq(a: [u8; 3], b: [u8; 3]) -> u32 {
    let dr = a[0] as i32 - b[0] as i32;
    let dg = a[1] as i32 - b[1] as i32;
    let db = a[2] as i32 - b[2] as i32;
    (dr * dr + dg * dg + db * db) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_hues_map_to_primaries() {
        assert_eq!(hue_to_rgb(0), [255, 0, 0]);
        assert_eq!(hue_to_rgb(120), [0, 255, 0]);
        assert_eq!(hue_to_rgb(240), [0, 0, 255]);
    }

    #[test]
    fn hue_wraps_at_360() {
        assert_eq!(hue_to_rgb(360), hue_to_rgb(0));
        assert_eq!(hue_to_rgb(480), hue_to_rgb(120));
    }

    #[test]
    fn rgb_to_hue_inverts_primaries() {
        assert_eq!(rgb_to_hue([255, 0, 0]), 0);
        assert_eq!(rgb_to_hue([0, 255, 0]), 120);
        assert_eq!(rgb_to_hue([0, 0, 255]), 240);
        assert_eq!(rgb_to_hue([128, 128, 128]), 0);
    }

    #[test]
    fn distance_is_zero_for_equal_colors() {
        assert_eq!(rgb_distance_sq([10, 20, 30], [10, 20, 30]), 0);
        assert!(rgb_distance_sq([0, 0, 0], [255, 255, 255]) > 0);
    }
}
