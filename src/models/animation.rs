use crate::models::parameter::{ParamId, ParamValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registered animation identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnimationId {
    Breathe,
    ColorFade,
    ColorCycle,
    Snake,
    ColorSnake,
}

impl AnimationId {
    pub const ALL: [AnimationId; 5] = [
        AnimationId::Breathe,
        AnimationId::ColorFade,
        AnimationId::ColorCycle,
        AnimationId::Snake,
        AnimationId::ColorSnake,
    ];

    pub fn as_key(&self) -> &'static str {
        match self {
            AnimationId::Breathe => "BREATHE",
            AnimationId::ColorFade => "COLOR_FADE",
            AnimationId::ColorCycle => "COLOR_CYCLE",
            AnimationId::Snake => "SNAKE",
            AnimationId::ColorSnake => "COLOR_SNAKE",
        }
    }

    pub fn from_key(key: &str) -> Option<AnimationId> {
        AnimationId::ALL.iter().copied().find(|a| a.as_key() == key)
    }
}

impl std::fmt::Display for AnimationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Immutable animation registration from animations.yaml: display metadata
/// plus the parameters the animation declares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    pub id: AnimationId,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: Vec<ParamId>,
}

/// Mutable per-animation state: the current value of every declared
/// parameter. Persisted as part of the state file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationState {
    pub id: AnimationId,
    pub parameters: HashMap<ParamId, ParamValue>,
}

impl AnimationState {
    pub fn new(id: AnimationId) -> Self {
        Self {
            id,
            parameters: HashMap::new(),
        }
    }

    pub fn value(&self, param: ParamId) -> Option<ParamValue> {
        self.parameters.get(&param).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animation_keys_round_trip() {
        for id in AnimationId::ALL {
            assert_eq!(AnimationId::from_key(id.as_key()), Some(id));
        }
        assert_eq!(AnimationId::from_key("DISCO"), None);
    }
}
