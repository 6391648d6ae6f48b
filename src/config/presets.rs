use crate::error::{CoreError, CoreResult};
use crate::utils::colors::rgb_distance_sq;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One named color from colors.yaml. Whites carry exact RGB values that a
/// hue conversion could never reproduce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetEntry {
    pub rgb: [u8; 3],
    pub category: String,
}

/// The preset color table plus the cycling order the encoder steps through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPresets {
    presets: HashMap<String, PresetEntry>,
    order: Vec<String>,
}

impl ColorPresets {
    pub fn from_yaml(raw: &str) -> CoreResult<Self> {
        let presets: ColorPresets = serde_yaml::from_str(raw)
            .map_err(|e| CoreError::ConfigInvalid(format!("colors.yaml: {}", e)))?;
        presets.validate()?;
        Ok(presets)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.order.is_empty() {
            return Err(CoreError::ConfigInvalid(
                "colors.yaml: preset order is empty".into(),
            ));
        }
        for name in &self.order {
            if !self.presets.contains_key(name) {
                return Err(CoreError::ConfigInvalid(format!(
                    "colors.yaml: order references unknown preset '{}'",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn get_rgb(&self, name: &str) -> Option<[u8; 3]> {
        self.presets.get(name).map(|p| p.rgb)
    }

    pub fn is_white(&self, name: &str) -> bool {
        self.presets
            .get(name)
            .map(|p| p.category == "white")
            .unwrap_or(false)
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &PresetEntry)> {
        self.presets.iter()
    }

    /// Name of the preset whose RGB is closest to `rgb`.
    pub fn closest(&self, rgb: [u8; 3]) -> Option<&str> {
        self.order
            .iter()
            .min_by_key(|name| {
                self.presets
                    .get(name.as_str())
                    .map(|p| rgb_distance_sq(p.rgb, rgb))
                    .unwrap_or(u32::MAX)
            })
            .map(|s| s.as_str())
    }

    /// Compiled-in default table, used when no colors.yaml is present and by
    /// tests.
    pub fn builtin() -> Self {
        let mut presets = HashMap::new();
        let mut add = |name: &str, rgb: [u8; 3], category: &str| {
            presets.insert(
                name.to_string(),
                PresetEntry {
                    rgb,
                    category: category.to_string(),
                },
            );
        };
        add("red", [255, 0, 0], "basic");
        add("orange", [255, 128, 0], "basic");
        add("yellow", [255, 255, 0], "basic");
        add("green", [0, 255, 0], "basic");
        add("cyan", [0, 255, 255], "basic");
        add("blue", [0, 0, 255], "basic");
        add("purple", [128, 0, 255], "basic");
        add("pink", [255, 0, 128], "basic");
        add("warm_white", [255, 147, 41], "white");
        add("neutral_white", [255, 197, 143], "white");
        add("cool_white", [255, 255, 255], "white");

        Self {
            presets,
            order: vec![
                "red".into(),
                "orange".into(),
                "yellow".into(),
                "green".into(),
                "cyan".into(),
                "blue".into(),
                "purple".into(),
                "pink".into(),
                "warm_white".into(),
                "neutral_white".into(),
                "cool_white".into(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_valid() {
        let presets = ColorPresets::builtin();
        assert!(presets.validate().is_ok());
        assert!(presets.is_white("warm_white"));
        assert!(!presets.is_white("red"));
    }

    #[test]
    fn closest_finds_exact_match_first() {
        let presets = ColorPresets::builtin();
        assert_eq!(presets.closest([255, 0, 0]), Some("red"));
        assert_eq!(presets.closest([250, 5, 5]), Some("red"));
    }

    #[test]
    fn yaml_with_unknown_order_entry_is_rejected() {
        let raw = r#"
presets:
  red: { rgb: [255, 0, 0], category: basic }
order: [red, missing]
"#;
        assert!(matches!(
            ColorPresets::from_yaml(raw),
            Err(CoreError::ConfigInvalid(_))
        ));
    }
}
