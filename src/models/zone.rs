use crate::models::animation::AnimationId;
use crate::models::color::Color;
use serde::{Deserialize, Serialize};

/// Closed set of zone identifiers. The state file and API address zones by
/// the lowercase form of these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneId {
    Floor,
    Circle,
    Left,
    Top,
    Right,
    Bottom,
    Lamp,
    Gate,
    Pixel,
    Preview,
    Back,
    Desk,
}

impl ZoneId {
    pub const ALL: [ZoneId; 12] = [
        ZoneId::Floor,
        ZoneId::Circle,
        ZoneId::Left,
        ZoneId::Top,
        ZoneId::Right,
        ZoneId::Bottom,
        ZoneId::Lamp,
        ZoneId::Gate,
        ZoneId::Pixel,
        ZoneId::Preview,
        ZoneId::Back,
        ZoneId::Desk,
    ];

    /// Lowercase key used in the state file and URLs.
    pub fn as_key(&self) -> &'static str {
        match self {
            ZoneId::Floor => "floor",
            ZoneId::Circle => "circle",
            ZoneId::Left => "left",
            ZoneId::Top => "top",
            ZoneId::Right => "right",
            ZoneId::Bottom => "bottom",
            ZoneId::Lamp => "lamp",
            ZoneId::Gate => "gate",
            ZoneId::Pixel => "pixel",
            ZoneId::Preview => "preview",
            ZoneId::Back => "back",
            ZoneId::Desk => "desk",
        }
    }

    pub fn from_key(key: &str) -> Option<ZoneId> {
        ZoneId::ALL.iter().copied().find(|z| z.as_key() == key)
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Per-zone operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZoneRenderMode {
    Static,
    Animation,
    Off,
}

/// Static zone layout, resolved at config load. `start_index`/`end_index`
/// are absolute pixel indices on the owning strip; disabled zones still
/// reserve their range so the physical layout stays stable.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneConfig {
    pub id: ZoneId,
    pub display_name: String,
    pub gpio: u8,
    pub pixel_count: usize,
    pub enabled: bool,
    pub reversed: bool,
    pub start_index: usize,
    pub end_index: usize,
}

/// Mutable per-zone state, persisted between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneState {
    pub render_mode: ZoneRenderMode,
    pub color: Color,
    pub brightness: u8,
    pub is_on: bool,
    pub animation: Option<AnimationId>,
}

impl Default for ZoneState {
    fn default() -> Self {
        Self {
            render_mode: ZoneRenderMode::Static,
            color: Color::from_hue(0),
            brightness: 100,
            is_on: true,
            animation: None,
        }
    }
}

/// A zone's immutable config plus its mutable state, as handed out by the
/// zone service.
#[derive(Debug, Clone)]
pub struct Zone {
    pub config: ZoneConfig,
    pub state: ZoneState,
}

impl Zone {
    /// Effective render color: zone color scaled by brightness, black when
    /// the zone is switched off.
    pub fn effective_rgb(&self) -> [u8; 3] {
        if !self.state.is_on {
            return [0, 0, 0];
        }
        Color::scale_rgb(self.state.color.to_rgb(), self.state.brightness)
    }
}
