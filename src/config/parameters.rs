use crate::error::{CoreError, CoreResult};
use crate::models::parameter::{ParamId, ParamValue, ParameterConfig, ParameterType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameter definitions table from parameters.yaml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParametersConfig {
    pub parameters: Vec<ParameterConfig>,
}

impl ParametersConfig {
    pub fn from_yaml(raw: &str) -> CoreResult<Self> {
        let config: ParametersConfig = serde_yaml::from_str(raw)
            .map_err(|e| CoreError::ConfigInvalid(format!("parameters.yaml: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        let mut seen = Vec::new();
        for param in &self.parameters {
            if seen.contains(&param.id) {
                return Err(CoreError::ConfigInvalid(format!(
                    "parameters.yaml: parameter {} declared twice",
                    param.id.as_key()
                )));
            }
            seen.push(param.id);

            if let (Some(min), Some(max)) = (param.min, param.max) {
                if min > max {
                    return Err(CoreError::ConfigInvalid(format!(
                        "parameters.yaml: parameter {} has min {} > max {}",
                        param.id.as_key(),
                        min,
                        max
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn by_id(&self) -> HashMap<ParamId, ParameterConfig> {
        self.parameters.iter().map(|p| (p.id, p.clone())).collect()
    }

    pub fn get(&self, id: ParamId) -> Option<&ParameterConfig> {
        self.parameters.iter().find(|p| p.id == id)
    }

    /// Compiled-in parameter table.
    pub fn builtin() -> Self {
        Self {
            parameters: vec![
                ParameterConfig {
                    id: ParamId::Speed,
                    kind: ParameterType::Percentage,
                    default: ParamValue::Number(50),
                    min: None,
                    max: None,
                    step: Some(5),
                    wraps: false,
                    unit: Some("%".into()),
                },
                ParameterConfig {
                    id: ParamId::Intensity,
                    kind: ParameterType::Percentage,
                    default: ParamValue::Number(80),
                    min: None,
                    max: None,
                    step: Some(5),
                    wraps: false,
                    unit: Some("%".into()),
                },
                ParameterConfig {
                    id: ParamId::Length,
                    kind: ParameterType::RangeCustom,
                    default: ParamValue::Number(5),
                    min: Some(2),
                    max: Some(20),
                    step: Some(1),
                    wraps: false,
                    unit: Some("px".into()),
                },
                ParameterConfig {
                    id: ParamId::Hue,
                    kind: ParameterType::RangeCustom,
                    default: ParamValue::Number(0),
                    min: Some(0),
                    max: Some(359),
                    step: Some(5),
                    wraps: true,
                    unit: Some("°".into()),
                },
                ParameterConfig {
                    id: ParamId::PrimaryHue,
                    kind: ParameterType::RangeCustom,
                    default: ParamValue::Number(120),
                    min: Some(0),
                    max: Some(359),
                    step: Some(5),
                    wraps: true,
                    unit: Some("°".into()),
                },
                ParameterConfig {
                    id: ParamId::Brightness,
                    kind: ParameterType::Percentage,
                    default: ParamValue::Number(100),
                    min: None,
                    max: None,
                    step: Some(5),
                    wraps: false,
                    unit: Some("%".into()),
                },
                ParameterConfig {
                    id: ParamId::Reversed,
                    kind: ParameterType::Boolean,
                    default: ParamValue::Boolean(false),
                    min: None,
                    max: None,
                    step: None,
                    wraps: false,
                    unit: None,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_valid() {
        assert!(ParametersConfig::builtin().validate().is_ok());
    }

    #[test]
    fn yaml_round_trip() {
        let raw = r#"
parameters:
  - id: SPEED
    type: PERCENTAGE
    default: 40
    step: 5
  - id: HUE
    type: RANGE_CUSTOM
    default: 0
    min: 0
    max: 359
    step: 5
    wraps: true
    unit: "°"
"#;
        let config = ParametersConfig::from_yaml(raw).unwrap();
        assert_eq!(config.parameters.len(), 2);
        let hue = config.get(ParamId::Hue).unwrap();
        assert!(hue.wraps);
        assert_eq!(hue.bounds(), (0, 359));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let raw = r#"
parameters:
  - id: LENGTH
    type: RANGE_CUSTOM
    default: 5
    min: 20
    max: 2
"#;
        assert!(matches!(
            ParametersConfig::from_yaml(raw),
            Err(CoreError::ConfigInvalid(_))
        ));
    }
}
