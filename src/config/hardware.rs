use crate::error::{CoreError, CoreResult};
use crate::hardware::ColorOrder;
use serde::{Deserialize, Serialize};

/// One physical LED chain declaration from hardware.yaml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripConfig {
    pub id: String,
    pub gpio_pin: u8,
    pub chip_type: String,
    pub color_order: ColorOrder,
    pub pixel_count: usize,
    #[serde(default)]
    pub voltage: Option<f32>,
    #[serde(default = "default_dma_channel")]
    pub dma_channel: u8,
}

fn default_dma_channel() -> u8 {
    10
}

/// Rotary encoder pins. The input-policy layer consumes these; the core
/// only validates the declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub id: String,
    pub clk: u8,
    pub dt: u8,
    pub sw: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonConfig {
    pub id: String,
    pub gpio: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuzzerConfig {
    pub id: String,
    pub gpio: u8,
}

/// Static hardware layout: strips plus input device declarations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HardwareConfig {
    pub strips: Vec<StripConfig>,
    #[serde(default)]
    pub encoders: Vec<EncoderConfig>,
    #[serde(default)]
    pub buttons: Vec<ButtonConfig>,
    #[serde(default)]
    pub buzzers: Vec<BuzzerConfig>,
}

impl HardwareConfig {
    pub fn from_yaml(raw: &str) -> CoreResult<Self> {
        let config: HardwareConfig = serde_yaml::from_str(raw)
            .map_err(|e| CoreError::ConfigInvalid(format!("hardware.yaml: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.strips.is_empty() {
            return Err(CoreError::ConfigInvalid(
                "hardware.yaml: at least one strip is required".into(),
            ));
        }

        let mut gpios = Vec::new();
        for strip in &self.strips {
            if strip.pixel_count == 0 {
                return Err(CoreError::ConfigInvalid(format!(
                    "hardware.yaml: strip '{}' has zero pixels",
                    strip.id
                )));
            }
            if gpios.contains(&strip.gpio_pin) {
                return Err(CoreError::ConfigInvalid(format!(
                    "hardware.yaml: GPIO {} is assigned to more than one strip",
                    strip.gpio_pin
                )));
            }
            gpios.push(strip.gpio_pin);
        }
        Ok(())
    }

    pub fn strip_for_gpio(&self, gpio: u8) -> Option<&StripConfig> {
        self.strips.iter().find(|s| s.gpio_pin == gpio)
    }

    /// Compiled-in two-strip layout matching the default zones table.
    pub fn builtin() -> Self {
        Self {
            strips: vec![
                StripConfig {
                    id: "main_12v".into(),
                    gpio_pin: 18,
                    chip_type: "WS2811".into(),
                    color_order: ColorOrder::Grb,
                    pixel_count: 86,
                    voltage: Some(12.0),
                    dma_channel: 10,
                },
                StripConfig {
                    id: "aux_5v".into(),
                    gpio_pin: 19,
                    chip_type: "WS2812".into(),
                    color_order: ColorOrder::Grb,
                    pixel_count: 38,
                    voltage: Some(5.0),
                    dma_channel: 11,
                },
            ],
            encoders: vec![
                EncoderConfig {
                    id: "SELECTOR".into(),
                    clk: 17,
                    dt: 27,
                    sw: 22,
                },
                EncoderConfig {
                    id: "MODULATOR".into(),
                    clk: 23,
                    dt: 24,
                    sw: 25,
                },
            ],
            buttons: vec![
                ButtonConfig {
                    id: "BTN1".into(),
                    gpio: 5,
                },
                ButtonConfig {
                    id: "BTN2".into(),
                    gpio: 6,
                },
                ButtonConfig {
                    id: "BTN3".into(),
                    gpio: 13,
                },
                ButtonConfig {
                    id: "BTN4".into(),
                    gpio: 26,
                },
            ],
            buzzers: vec![BuzzerConfig {
                id: "ACTIVE".into(),
                gpio: 12,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_layout_is_valid() {
        assert!(HardwareConfig::builtin().validate().is_ok());
    }

    #[test]
    fn duplicate_gpio_is_rejected() {
        let raw = r#"
strips:
  - { id: a, gpio_pin: 18, chip_type: WS2811, color_order: GRB, pixel_count: 10 }
  - { id: b, gpio_pin: 18, chip_type: WS2812, color_order: RGB, pixel_count: 8 }
"#;
        assert!(matches!(
            HardwareConfig::from_yaml(raw),
            Err(CoreError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn yaml_parses_with_optional_sections_missing() {
        let raw = r#"
strips:
  - { id: main, gpio_pin: 18, chip_type: WS2811, color_order: BRG, pixel_count: 30 }
"#;
        let config = HardwareConfig::from_yaml(raw).unwrap();
        assert_eq!(config.strips[0].dma_channel, 10);
        assert!(config.encoders.is_empty());
    }
}
