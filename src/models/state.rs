//! Persisted state file schema (state.json).
//!
//! Missing fields fall back to config defaults at assembly time; unknown
//! fields are captured in `extra` maps so a rewrite never loses data written
//! by a newer version.

use crate::config::presets::ColorPresets;
use crate::error::CoreResult;
use crate::models::animation::AnimationId;
use crate::models::color::{Color, ColorMode};
use crate::models::parameter::ParamValue;
use crate::models::zone::ZoneRenderMode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Serialized form of a [`Color`]. Presets are stored by name and
/// re-resolved against colors.yaml on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSpec {
    pub mode: ColorMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rgb: Option<[u8; 3]>,
}

impl ColorSpec {
    pub fn from_color(color: &Color) -> Self {
        match color.mode() {
            ColorMode::Hue => Self {
                mode: ColorMode::Hue,
                hue: Some(color.to_hue()),
                preset_name: None,
                rgb: None,
            },
            ColorMode::Preset => Self {
                mode: ColorMode::Preset,
                hue: None,
                preset_name: color.preset_name().map(str::to_string),
                rgb: None,
            },
            ColorMode::Rgb => Self {
                mode: ColorMode::Rgb,
                hue: None,
                preset_name: None,
                rgb: Some(color.to_rgb()),
            },
        }
    }

    pub fn resolve(&self, presets: &ColorPresets) -> CoreResult<Color> {
        match self.mode {
            ColorMode::Hue => Ok(Color::from_hue(self.hue.unwrap_or(0))),
            ColorMode::Preset => match &self.preset_name {
                Some(name) => Color::from_preset(name, presets),
                None => Ok(Color::from_hue(0)),
            },
            ColorMode::Rgb => {
                let [r, g, b] = self.rgb.unwrap_or([0, 0, 0]);
                Ok(Color::from_rgb(r, g, b))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedZone {
    pub color: ColorSpec,
    pub brightness: u8,
    #[serde(default = "default_true")]
    pub is_on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_mode: Option<ZoneRenderMode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedAnimation {
    pub id: AnimationId,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedApplication {
    #[serde(default)]
    pub edit_mode_on: bool,
    #[serde(default)]
    pub lamp_white_mode_on: bool,
    #[serde(default)]
    pub selected_zone_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_parameter: Option<String>,
    /// Pre-white zone snapshot restored when lamp white mode toggles off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lamp_white_saved_state: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for PersistedApplication {
    fn default() -> Self {
        Self {
            edit_mode_on: false,
            lamp_white_mode_on: false,
            selected_zone_index: 0,
            active_parameter: None,
            lamp_white_saved_state: None,
            extra: Map::new(),
        }
    }
}

/// Root of the state file. Zone keys are the lowercase zone names.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub zones: BTreeMap<String, PersistedZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_animation: Option<PersistedAnimation>,
    #[serde(default)]
    pub application: PersistedApplication,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_and_preserves_unknown_fields() {
        let raw = serde_json::json!({
            "zones": {
                "lamp": {
                    "color": { "mode": "HUE", "hue": 120 },
                    "brightness": 80,
                    "future_field": "kept"
                }
            },
            "current_animation": { "id": "BREATHE", "parameters": { "SPEED": 40 } },
            "application": { "edit_mode_on": true, "selected_zone_index": 2 },
            "schema_version": 7
        });

        let state: PersistedState = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(state.zones["lamp"].brightness, 80);
        assert!(state.zones["lamp"].is_on, "missing is_on defaults to true");
        assert_eq!(state.zones["lamp"].extra["future_field"], "kept");
        assert_eq!(state.extra["schema_version"], 7);

        let rewritten = serde_json::to_value(&state).unwrap();
        assert_eq!(rewritten["zones"]["lamp"]["future_field"], "kept");
        assert_eq!(rewritten["schema_version"], 7);

        let reparsed: PersistedState = serde_json::from_value(rewritten).unwrap();
        assert_eq!(reparsed, state);
    }

    #[test]
    fn color_spec_round_trips_through_resolution() {
        let presets = ColorPresets::builtin();

        let hue = Color::from_hue(210);
        let spec = ColorSpec::from_color(&hue);
        assert_eq!(spec.resolve(&presets).unwrap(), hue);

        let rgb = Color::from_rgb(1, 2, 3);
        let spec = ColorSpec::from_color(&rgb);
        assert_eq!(spec.resolve(&presets).unwrap(), rgb);

        let preset = Color::from_preset("red", &presets).unwrap();
        let spec = ColorSpec::from_color(&preset);
        assert_eq!(spec.resolve(&presets).unwrap(), preset);
    }
}
