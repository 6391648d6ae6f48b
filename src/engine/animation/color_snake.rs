use crate::engine::animation::{param_number, Animation, AnimationZone, MicroUpdateBuffer};
use crate::error::CoreResult;
use crate::models::animation::AnimationId;
use crate::models::parameter::{ParamId, ParamValue};
use crate::models::zone::ZoneId;
use crate::utils::colors::hue_to_rgb;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Snake variant whose head cycles through the hue wheel, leaving a rainbow
/// body behind it.
pub struct ColorSnakeAnimation {
    zones: Vec<AnimationZone>,
    heads: HashMap<ZoneId, usize>,
    speed: i64,
    length: i64,
    hue: f32,
    primed: bool,
}

impl ColorSnakeAnimation {
    pub const HUE_STEP: f32 = 9.0;

    pub fn new(zones: Vec<AnimationZone>, parameters: &HashMap<ParamId, ParamValue>) -> Self {
        let heads = zones.iter().map(|z| (z.id, 0usize)).collect();
        Self {
            zones,
            heads,
            speed: param_number(parameters, ParamId::Speed, 50),
            length: param_number(parameters, ParamId::Length, 6),
            hue: param_number(parameters, ParamId::Hue, 0) as f32,
            primed: false,
        }
    }

    fn effective_length(&self, zone_pixels: usize) -> usize {
        (self.length.max(1) as usize).min(zone_pixels)
    }
}

impl Animation for ColorSnakeAnimation {
    fn id(&self) -> AnimationId {
        AnimationId::ColorSnake
    }

    fn tick(&mut self, _now: Instant, out: &mut MicroUpdateBuffer) -> CoreResult<()> {
        if !self.primed {
            for zone in &self.zones {
                let length = self.effective_length(zone.pixel_count);
                for i in 0..length {
                    let hue = (self.hue + i as f32 * Self::HUE_STEP).rem_euclid(360.0);
                    out.pixel(zone.id, i, hue_to_rgb(hue as u16));
                }
                self.heads.insert(zone.id, length.saturating_sub(1));
            }
            self.hue = (self.hue + Self::HUE_STEP).rem_euclid(360.0);
            self.primed = true;
            return Ok(());
        }

        let rgb = hue_to_rgb(self.hue as u16 % 360);
        for zone in &self.zones {
            if zone.pixel_count == 0 {
                continue;
            }
            let head = self.heads.get(&zone.id).copied().unwrap_or(0);
            let next = (head + 1) % zone.pixel_count;
            let length = self.effective_length(zone.pixel_count);
            let tail = (next + zone.pixel_count - length) % zone.pixel_count;

            out.pixel(zone.id, next, rgb);
            out.pixel(zone.id, tail, [0, 0, 0]);
            self.heads.insert(zone.id, next);
        }

        self.hue = (self.hue + Self::HUE_STEP).rem_euclid(360.0);
        Ok(())
    }

    fn interval(&self) -> Duration {
        let speed = self.speed.clamp(1, 100) as u64;
        Duration::from_millis(200 - (speed - 1) * 180 / 99)
    }

    fn set_parameter(&mut self, id: ParamId, value: ParamValue) -> CoreResult<()> {
        match (id, value) {
            (ParamId::Speed, ParamValue::Number(n)) => self.speed = n,
            (ParamId::Length, ParamValue::Number(n)) => self.length = n,
            (ParamId::Hue, ParamValue::Number(n)) => self.hue = n as f32,
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::animation::MicroUpdate;

    #[test]
    fn head_color_changes_between_steps() {
        let zones = vec![AnimationZone {
            id: ZoneId::Floor,
            pixel_count: 12,
        }];
        let mut anim = ColorSnakeAnimation::new(zones, &HashMap::new());
        let mut out = MicroUpdateBuffer::new();
        anim.tick(Instant::now(), &mut out).unwrap();

        let mut head_colors = Vec::new();
        for _ in 0..3 {
            out.clear();
            anim.tick(Instant::now(), &mut out).unwrap();
            for update in out.updates() {
                if let MicroUpdate::Pixel { rgb, .. } = update {
                    if *rgb != [0, 0, 0] {
                        head_colors.push(*rgb);
                    }
                }
            }
        }
        assert_eq!(head_colors.len(), 3);
        assert_ne!(head_colors[0], head_colors[2]);
    }
}
