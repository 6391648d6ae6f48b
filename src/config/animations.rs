use crate::config::parameters::ParametersConfig;
use crate::error::{CoreError, CoreResult};
use crate::models::animation::{AnimationConfig, AnimationId};
use crate::models::parameter::ParamId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Animation registry from animations.yaml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimationsConfig {
    pub animations: Vec<AnimationConfig>,
}

impl AnimationsConfig {
    pub fn from_yaml(raw: &str, parameters: &ParametersConfig) -> CoreResult<Self> {
        let config: AnimationsConfig = serde_yaml::from_str(raw)
            .map_err(|e| CoreError::ConfigInvalid(format!("animations.yaml: {}", e)))?;
        config.validate(parameters)?;
        Ok(config)
    }

    pub fn validate(&self, parameters: &ParametersConfig) -> CoreResult<()> {
        let mut seen = Vec::new();
        for animation in &self.animations {
            if seen.contains(&animation.id) {
                return Err(CoreError::ConfigInvalid(format!(
                    "animations.yaml: animation {} declared twice",
                    animation.id
                )));
            }
            seen.push(animation.id);

            for param in &animation.parameters {
                if parameters.get(*param).is_none() {
                    return Err(CoreError::ConfigInvalid(format!(
                        "animations.yaml: animation {} references undeclared parameter {}",
                        animation.id,
                        param.as_key()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn by_id(&self) -> HashMap<AnimationId, AnimationConfig> {
        self.animations.iter().map(|a| (a.id, a.clone())).collect()
    }

    pub fn get(&self, id: AnimationId) -> Option<&AnimationConfig> {
        self.animations.iter().find(|a| a.id == id)
    }

    /// Compiled-in registry matching the built-in generators.
    pub fn builtin() -> Self {
        let anim = |id: AnimationId, name: &str, desc: &str, params: Vec<ParamId>| AnimationConfig {
            id,
            display_name: name.to_string(),
            description: desc.to_string(),
            parameters: params,
        };
        Self {
            animations: vec![
                anim(
                    AnimationId::Breathe,
                    "Breathe",
                    "All zones pulse together through a brightness envelope",
                    vec![ParamId::Speed, ParamId::Intensity, ParamId::Hue],
                ),
                anim(
                    AnimationId::ColorFade,
                    "Color Fade",
                    "The whole strip drifts through the hue wheel",
                    vec![ParamId::Speed, ParamId::Hue],
                ),
                anim(
                    AnimationId::ColorCycle,
                    "Color Cycle",
                    "Zones chase each other around the hue wheel",
                    vec![ParamId::Speed],
                ),
                anim(
                    AnimationId::Snake,
                    "Snake",
                    "A lit run of pixels crawling through each zone",
                    vec![ParamId::Speed, ParamId::Length, ParamId::Hue],
                ),
                anim(
                    AnimationId::ColorSnake,
                    "Color Snake",
                    "A snake that paints a rainbow trail",
                    vec![ParamId::Speed, ParamId::Length, ParamId::Hue],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_validates_against_builtin_parameters() {
        let params = ParametersConfig::builtin();
        assert!(AnimationsConfig::builtin().validate(&params).is_ok());
    }

    #[test]
    fn undeclared_parameter_reference_is_rejected() {
        let raw = r#"
animations:
  - id: BREATHE
    display_name: Breathe
    parameters: [SPEED]
"#;
        let empty = ParametersConfig { parameters: vec![] };
        assert!(matches!(
            AnimationsConfig::from_yaml(raw, &empty),
            Err(CoreError::ConfigInvalid(_))
        ));
    }
}
