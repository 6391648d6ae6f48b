use crate::engine::animation::{param_number, Animation, AnimationZone, MicroUpdateBuffer};
use crate::error::CoreResult;
use crate::models::animation::AnimationId;
use crate::models::parameter::{ParamId, ParamValue};
use crate::utils::colors::hue_to_rgb;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A slow full-strip drift through the hue wheel.
pub struct ColorFadeAnimation {
    _zones: Vec<AnimationZone>,
    speed: i64,
    hue: f32,
}

impl ColorFadeAnimation {
    pub fn new(zones: Vec<AnimationZone>, parameters: &HashMap<ParamId, ParamValue>) -> Self {
        Self {
            hue: param_number(parameters, ParamId::Hue, 0) as f32,
            speed: param_number(parameters, ParamId::Speed, 50),
            _zones: zones,
        }
    }

    fn degrees_per_tick(&self) -> f32 {
        // 0.2°..6° per tick across the speed range.
        let speed = self.speed.clamp(1, 100) as f32;
        0.2 + (speed / 100.0) * 5.8
    }
}

impl Animation for ColorFadeAnimation {
    fn id(&self) -> AnimationId {
        AnimationId::ColorFade
    }

    fn tick(&mut self, _now: Instant, out: &mut MicroUpdateBuffer) -> CoreResult<()> {
        out.full_strip(hue_to_rgb(self.hue as u16 % 360));
        self.hue = (self.hue + self.degrees_per_tick()) % 360.0;
        Ok(())
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(40)
    }

    fn set_parameter(&mut self, id: ParamId, value: ParamValue) -> CoreResult<()> {
        match (id, value) {
            (ParamId::Speed, ParamValue::Number(n)) => self.speed = n,
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
    use crate::models::zone::ZoneId;

    #[test]
    fn hue_advances_every_tick() {
        let zones = vec![AnimationZone {
            id: ZoneId::Floor,
            pixel_count: 4,
        }];
        let mut anim = ColorFadeAnimation::new(zones, &HashMap::new());
        let mut out = MicroUpdateBuffer::new();

        anim.tick(Instant::now(), &mut out).unwrap();
        let first = match out.updates()[0] {
            MicroUpdate::FullStrip { rgb } => rgb,
            _ => panic!("expected a full-strip update"),
        };

        for _ in 0..30 {
            out.clear();
            anim.tick(Instant::now(), &mut out).unwrap();
        }
        let later = match out.updates()[0] {
            MicroUpdate::FullStrip { rgb } => rgb,
            _ => panic!("expected a full-strip update"),
        };
        assert_ne!(first, later);
    }
}
