use crate::engine::animation::{param_number, Animation, AnimationZone, MicroUpdateBuffer};
use crate::error::CoreResult;
use crate::models::animation::AnimationId;
use crate::models::parameter::{ParamId, ParamValue};
use crate::utils::colors::hue_to_rgb;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Every zone gets its own slice of the hue wheel and the whole wheel
/// rotates, so colors chase each other from zone to zone.
pub struct ColorCycleAnimation {
    zones: Vec<AnimationZone>,
    speed: i64,
    offset: f32,
}

impl ColorCycleAnimation {
    pub fn new(zones: Vec<AnimationZone>, parameters: &HashMap<ParamId, ParamValue>) -> Self {
        Self {
            zones,
            speed: param_number(parameters, ParamId::Speed, 50),
            offset: 0.0,
        }
    }

    fn degrees_per_tick(&self) -> f32 {
        let speed = self.speed.clamp(1, 100) as f32;
        0.5 + (speed / 100.0) * 7.5
    }
}

impl Animation for ColorCycleAnimation {
    fn id(&self) -> AnimationId {
        AnimationId::ColorCycle
    }

    fn tick(&mut self, _now: Instant, out: &mut MicroUpdateBuffer) -> CoreResult<()> {
        let spread = 360.0 / self.zones.len().max(1) as f32;
        for (i, zone) in self.zones.iter().enumerate() {
            let hue = (self.offset + i as f32 * spread).rem_euclid(360.0);
            out.zone(zone.id, hue_to_rgb(hue as u16));
        }
        self.offset = (self.offset + self.degrees_per_tick()).rem_euclid(360.0);
        Ok(())
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(40)
    }

    fn set_parameter(&mut self, id: ParamId, value: ParamValue) -> CoreResult<()> {
        if let (ParamId::Speed, ParamValue::Number(n)) = (id, value) {
            self.speed = n;
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
    fn zones_are_spread_across_the_wheel() {
        let zones = vec![
            AnimationZone {
                id: ZoneId::Floor,
                pixel_count: 4,
            },
            AnimationZone {
                id: ZoneId::Top,
                pixel_count: 4,
            },
        ];
        let mut anim = ColorCycleAnimation::new(zones, &HashMap::new());
        let mut out = MicroUpdateBuffer::new();
        anim.tick(Instant::now(), &mut out).unwrap();

        let colors: Vec<[u8; 3]> = out
            .updates()
            .iter()
            .map(|u| match u {
                MicroUpdate::Zone { rgb, .. } => *rgb,
                _ => panic!("expected zone updates"),
            })
            .collect();
        assert_eq!(colors.len(), 2);
        // Two zones, 180 degrees apart: distinctly different colors.
        assert_ne!(colors[0], colors[1]);
    }
}
