use crate::engine::animation::{param_number, Animation, AnimationZone, MicroUpdateBuffer};
use crate::error::CoreResult;
use crate::models::animation::AnimationId;
use crate::models::parameter::{ParamId, ParamValue};
use crate::models::zone::ZoneId;
use crate::utils::colors::hue_to_rgb;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A lit run of pixels crawling around each zone. Emits only the new head
/// and the cleared tail each step; the engine's pixel buffers keep the body.
pub struct SnakeAnimation {
    zones: Vec<AnimationZone>,
    heads: HashMap<ZoneId, usize>,
    speed: i64,
    length: i64,
    hue: i64,
    primed: bool,
}

impl SnakeAnimation {
    pub fn new(zones: Vec<AnimationZone>, parameters: &HashMap<ParamId, ParamValue>) -> Self {
        let heads = zones.iter().map(|z| (z.id, 0usize)).collect();
        Self {
            zones,
            heads,
            speed: param_number(parameters, ParamId::Speed, 50),
            length: param_number(parameters, ParamId::Length, 5),
            hue: param_number(parameters, ParamId::Hue, 120),
            primed: false,
        }
    }

    fn body_rgb(&self) -> [u8; 3] {
        hue_to_rgb(self.hue.rem_euclid(360) as u16)
    }

    fn effective_length(&self, zone_pixels: usize) -> usize {
        (self.length.max(1) as usize).min(zone_pixels)
    }
}

impl Animation for SnakeAnimation {
    fn id(&self) -> AnimationId {
        AnimationId::Snake
    }

    fn tick(&mut self, _now: Instant, out: &mut MicroUpdateBuffer) -> CoreResult<()> {
        let rgb = self.body_rgb();

        if !self.primed {
            // First tick paints the whole body so the strip never starts
            // with a lone pixel.
            for zone in &self.zones {
                let length = self.effective_length(zone.pixel_count);
                for i in 0..length {
                    out.pixel(zone.id, i, rgb);
                }
                self.heads.insert(zone.id, length.saturating_sub(1));
            }
            self.primed = true;
            return Ok(());
        }

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
        Ok(())
    }

    fn interval(&self) -> Duration {
        // 200 ms per step at speed 1 down to 20 ms at speed 100.
        let speed = self.speed.clamp(1, 100) as u64;
        Duration::from_millis(200 - (speed - 1) * 180 / 99)
    }

    fn set_parameter(&mut self, id: ParamId, value: ParamValue) -> CoreResult<()> {
        match (id, value) {
            (ParamId::Speed, ParamValue::Number(n)) => self.speed = n,
            (ParamId::Length, ParamValue::Number(n)) => self.length = n,
            (ParamId::Hue, ParamValue::Number(n)) => self.hue = n,
            _ => {}
        }
        Ok(())
    }
}
