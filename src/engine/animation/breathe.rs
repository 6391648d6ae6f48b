use crate::engine::animation::{param_number, Animation, AnimationZone, MicroUpdateBuffer};
use crate::error::CoreResult;
use crate::models::animation::AnimationId;
use crate::models::parameter::{ParamId, ParamValue};
use crate::utils::colors::hue_to_rgb;
use std::collections::HashMap;
use std::f32::consts::{PI, TAU};
use std::time::{Duration, Instant};

/// All zones breathe together: a sinusoidal brightness envelope over one
/// base hue. SPEED sets the cycle period, INTENSITY how deep the dip goes.
pub struct BreatheAnimation {
    zones: Vec<AnimationZone>,
    speed: i64,
    intensity: i64,
    hue: i64,
    phase: f32,
}

impl BreatheAnimation {
    pub fn new(zones: Vec<AnimationZone>, parameters: &HashMap<ParamId, ParamValue>) -> Self {
        Self {
            zones,
            speed: param_number(parameters, ParamId::Speed, 50),
            intensity: param_number(parameters, ParamId::Intensity, 80),
            hue: param_number(parameters, ParamId::Hue, 0),
            phase: 0.0,
        }
    }

    /// Cycle period scales from 6 s at speed 1 down to 1 s at speed 100.
    fn period_secs(&self) -> f32 {
        let speed = self.speed.clamp(1, 100) as f32;
        6.0 - (speed / 100.0) * 5.0
    }
}

impl Animation for BreatheAnimation {
    fn id(&self) -> AnimationId {
        AnimationId::Breathe
    }

    fn tick(&mut self, _now: Instant, out: &mut MicroUpdateBuffer) -> CoreResult<()> {
        // Start the cycle at the dim end.
        let envelope = ((self.phase * TAU - PI / 2.0).sin() + 1.0) / 2.0;
        let depth = self.intensity.clamp(0, 100) as f32 / 100.0;
        let brightness = 1.0 - depth + depth * envelope;

        let [r, g, b] = hue_to_rgb(self.hue.rem_euclid(360) as u16);
        let rgb = [
            (r as f32 * brightness) as u8,
            (g as f32 * brightness) as u8,
            (b as f32 * brightness) as u8,
        ];

        for zone in &self.zones {
            out.zone(zone.id, rgb);
        }

        self.phase = (self.phase + self.interval().as_secs_f32() / self.period_secs()).fract();
        Ok(())
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(33)
    }

    fn set_parameter(&mut self, id: ParamId, value: ParamValue) -> CoreResult<()> {
        match (id, value) {
            (ParamId::Speed, ParamValue::Number(n)) => self.speed = n,
            (ParamId::Intensity, ParamValue::Number(n)) => self.intensity = n,
            (ParamId::Hue, ParamValue::Number(n)) => self.hue = n,
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::zone::ZoneId;

    fn zones() -> Vec<AnimationZone> {
        vec![
            AnimationZone {
                id: ZoneId::Floor,
                pixel_count: 4,
            },
            AnimationZone {
                id: ZoneId::Top,
                pixel_count: 2,
            },
        ]
    }

    #[test]
    fn emits_one_update_per_zone_per_tick() {
        let mut anim = BreatheAnimation::new(zones(), &HashMap::new());
        let mut out = MicroUpdateBuffer::new();
        anim.tick(Instant::now(), &mut out).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn brightness_envelope_varies_over_the_cycle() {
        let mut anim = BreatheAnimation::new(zones(), &HashMap::new());
        let mut seen = std::collections::HashSet::new();
        let mut out = MicroUpdateBuffer::new();
        for _ in 0..200 {
            out.clear();
            anim.tick(Instant::now(), &mut out).unwrap();
            if let crate::engine::animation::MicroUpdate::Zone { rgb, .. } = out.updates()[0] {
                seen.insert(rgb);
            }
        }
        assert!(seen.len() > 5, "expected a varying envelope, saw {:?}", seen);
    }

    #[test]
    fn speed_parameter_updates_apply() {
        let mut anim = BreatheAnimation::new(zones(), &HashMap::new());
        anim.set_parameter(ParamId::Speed, ParamValue::Number(100))
            .unwrap();
        assert_eq!(anim.period_secs(), 1.0);
    }
}
