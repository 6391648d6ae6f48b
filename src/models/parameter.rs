use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Parameter identifiers used by animations and zone editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamId {
    Speed,
    Intensity,
    Length,
    Hue,
    PrimaryHue,
    Brightness,
    Reversed,
}

impl ParamId {
    pub fn as_key(&self) -> &'static str {
        match self {
            ParamId::Speed => "SPEED",
            ParamId::Intensity => "INTENSITY",
            ParamId::Length => "LENGTH",
            ParamId::Hue => "HUE",
            ParamId::PrimaryHue => "PRIMARY_HUE",
            ParamId::Brightness => "BRIGHTNESS",
            ParamId::Reversed => "REVERSED",
        }
    }

    pub fn from_key(key: &str) -> Option<ParamId> {
        [
            ParamId::Speed,
            ParamId::Intensity,
            ParamId::Length,
            ParamId::Hue,
            ParamId::PrimaryHue,
            ParamId::Brightness,
            ParamId::Reversed,
        ]
        .into_iter()
        .find(|p| p.as_key() == key)
    }
}

/// Parameter value categories with their validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterType {
    Percentage,
    #[serde(rename = "RANGE_0_255")]
    Range0_255,
    RangeCustom,
    Boolean,
    Color,
}

/// A typed parameter value. Replaces the original's untyped kwargs bag:
/// every value the engine hands to an animation went through `validate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(i64),
    Boolean(bool),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Boolean(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Boolean(b) => Some(*b),
            ParamValue::Number(_) => None,
        }
    }
}

/// Immutable parameter definition, loaded from parameters.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub id: ParamId,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    pub default: ParamValue,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub step: Option<i64>,
    #[serde(default)]
    pub wraps: bool,
    pub unit: Option<String>,
}

impl ParameterConfig {
    /// Effective numeric bounds; PERCENTAGE and RANGE_0_255 imply theirs.
    pub fn bounds(&self) -> (i64, i64) {
        match self.kind {
            ParameterType::Percentage => (self.min.unwrap_or(0), self.max.unwrap_or(100)),
            ParameterType::Range0_255 => (self.min.unwrap_or(0), self.max.unwrap_or(255)),
            _ => (self.min.unwrap_or(0), self.max.unwrap_or(100)),
        }
    }

    pub fn step_size(&self) -> i64 {
        self.step.unwrap_or(1).max(1)
    }
}

/// Mutable layer: the current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    pub value: ParamValue,
}

/// Combined view pairing a definition with its state; the only place
/// parameter mutation logic lives.
pub struct ParameterCombined<'a> {
    pub config: &'a ParameterConfig,
    pub state: &'a mut ParameterState,
}

impl<'a> ParameterCombined<'a> {
    pub fn new(config: &'a ParameterConfig, state: &'a mut ParameterState) -> Self {
        Self { config, state }
    }

    pub fn clamp(&self, value: i64) -> i64 {
        let (min, max) = self.config.bounds();
        value.clamp(min, max)
    }

    pub fn validate(&self, value: &ParamValue) -> CoreResult<()> {
        match (self.config.kind, value) {
            (ParameterType::Boolean, ParamValue::Boolean(_)) => Ok(()),
            (ParameterType::Boolean, _) => Err(CoreError::InvalidArgument(format!(
                "parameter {} expects a boolean",
                self.config.id.as_key()
            ))),
            (_, ParamValue::Boolean(_)) => Err(CoreError::InvalidArgument(format!(
                "parameter {} expects a number",
                self.config.id.as_key()
            ))),
            (_, ParamValue::Number(n)) => {
                let (min, max) = self.config.bounds();
                if *n < min || *n > max {
                    Err(CoreError::InvalidArgument(format!(
                        "parameter {} out of range: {} not in [{}, {}]",
                        self.config.id.as_key(),
                        n,
                        min,
                        max
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Move the value by `delta` encoder detents. Wrapping parameters cycle
    /// modulo the range; clamping parameters saturate at the bounds.
    /// Booleans toggle on any non-zero delta.
    pub fn adjust(&mut self, delta: i64) -> ParamValue {
        let next = match self.state.value {
            ParamValue::Boolean(b) => ParamValue::Boolean(if delta != 0 { !b } else { b }),
            ParamValue::Number(current) => {
                let (min, max) = self.config.bounds();
                let step = self.config.step_size();
                let moved = current + delta * step;
                let value = if self.config.wraps {
                    let span = max - min + 1;
                    min + (moved - min).rem_euclid(span)
                } else {
                    moved.clamp(min, max)
                };
                ParamValue::Number(value)
            }
        };
        self.state.value = next;
        next
    }

    /// Set an explicit value, validating it first.
    pub fn set(&mut self, value: ParamValue) -> CoreResult<ParamValue> {
        self.validate(&value)?;
        self.state.value = value;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(default: i64, step: i64) -> ParameterConfig {
        ParameterConfig {
            id: ParamId::Speed,
            kind: ParameterType::Percentage,
            default: ParamValue::Number(default),
            min: None,
            max: None,
            step: Some(step),
            wraps: false,
            unit: Some("%".into()),
        }
    }

    fn hue() -> ParameterConfig {
        ParameterConfig {
            id: ParamId::Hue,
            kind: ParameterType::RangeCustom,
            default: ParamValue::Number(0),
            min: Some(0),
            max: Some(359),
            step: Some(5),
            wraps: true,
            unit: Some("°".into()),
        }
    }

    #[test]
    fn adjust_clamps_at_bounds() {
        let config = pct(50, 5);
        let mut state = ParameterState {
            value: ParamValue::Number(95),
        };
        let mut combined = ParameterCombined::new(&config, &mut state);
        assert_eq!(combined.adjust(2), ParamValue::Number(100));
        assert_eq!(combined.adjust(-25), ParamValue::Number(0));
        assert_eq!(combined.adjust(-1), ParamValue::Number(0));
    }

    #[test]
    fn adjust_wraps_modulo_span() {
        let config = hue();
        let mut state = ParameterState {
            value: ParamValue::Number(355),
        };
        let mut combined = ParameterCombined::new(&config, &mut state);
        // 355 + 2*5 = 365 -> wraps to 5
        assert_eq!(combined.adjust(2), ParamValue::Number(5));
        // 5 - 2*5 = -5 -> wraps to 355
        assert_eq!(combined.adjust(-2), ParamValue::Number(355));
    }

    #[test]
    fn adjust_moves_at_most_step_times_delta() {
        let config = pct(50, 5);
        let mut state = ParameterState {
            value: ParamValue::Number(50),
        };
        let mut combined = ParameterCombined::new(&config, &mut state);
        let next = combined.adjust(3).as_number().unwrap();
        assert!((next - 50).abs() <= 15);
    }

    #[test]
    fn validate_rejects_out_of_range_and_type_mismatch() {
        let config = pct(50, 5);
        let mut state = ParameterState {
            value: ParamValue::Number(50),
        };
        let combined = ParameterCombined::new(&config, &mut state);
        assert!(combined.validate(&ParamValue::Number(100)).is_ok());
        assert!(combined.validate(&ParamValue::Number(101)).is_err());
        assert!(combined.validate(&ParamValue::Boolean(true)).is_err());
    }

    #[test]
    fn set_applies_validated_value() {
        let config = hue();
        let mut state = ParameterState {
            value: ParamValue::Number(10),
        };
        let mut combined = ParameterCombined::new(&config, &mut state);
        assert!(combined.set(ParamValue::Number(200)).is_ok());
        assert_eq!(state.value, ParamValue::Number(200));
    }
}
