use crate::models::animation::AnimationId;
use crate::models::parameter::{ParamId, ParamValue};
use crate::models::zone::{ZoneId, ZoneRenderMode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Event categories routed through the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    EncoderRotate,
    EncoderClick,
    ButtonPress,
    KeyboardKeyPress,
    ZoneStateChanged,
    ZoneRenderModeChanged,
    ZoneAnimationChanged,
    AnimationStarted,
    AnimationStopped,
    AnimationParameterChanged,
    SelectedZoneChanged,
    EditModeChanged,
    TaskStateChanged,
}

impl EventType {
    pub const ALL: [EventType; 13] = [
        EventType::EncoderRotate,
        EventType::EncoderClick,
        EventType::ButtonPress,
        EventType::KeyboardKeyPress,
        EventType::ZoneStateChanged,
        EventType::ZoneRenderModeChanged,
        EventType::ZoneAnimationChanged,
        EventType::AnimationStarted,
        EventType::AnimationStopped,
        EventType::AnimationParameterChanged,
        EventType::SelectedZoneChanged,
        EventType::EditModeChanged,
        EventType::TaskStateChanged,
    ];
}

/// Which subsystem published the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    Input,
    ZoneService,
    AnimationEngine,
    Application,
    Api,
    Lifecycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncoderId {
    Selector,
    Modulator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ButtonId {
    Btn1,
    Btn2,
    Btn3,
    Btn4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyModifier {
    Ctrl,
    Shift,
    Alt,
}

/// Typed event payloads; the variant determines the `EventType`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventData {
    EncoderRotate {
        encoder: EncoderId,
        delta: i8,
    },
    EncoderClick {
        encoder: EncoderId,
    },
    ButtonPress {
        button: ButtonId,
    },
    KeyboardKeyPress {
        key: String,
        modifiers: Vec<KeyModifier>,
    },
    ZoneStateChanged {
        zone: ZoneId,
        color_rgb: Option<[u8; 3]>,
        brightness: Option<u8>,
        is_on: Option<bool>,
        render_mode: Option<ZoneRenderMode>,
    },
    ZoneRenderModeChanged {
        zone: ZoneId,
        old: ZoneRenderMode,
        new: ZoneRenderMode,
    },
    ZoneAnimationChanged {
        zone: ZoneId,
        animation: Option<AnimationId>,
    },
    AnimationStarted {
        animation: AnimationId,
        parameters: HashMap<ParamId, ParamValue>,
    },
    AnimationStopped {
        animation: AnimationId,
    },
    AnimationParameterChanged {
        animation: AnimationId,
        param: ParamId,
        value: ParamValue,
    },
    SelectedZoneChanged {
        zone: Option<ZoneId>,
    },
    EditModeChanged {
        enabled: bool,
    },
    TaskStateChanged {
        task_id: u64,
        status: String,
    },
}

impl EventData {
    pub fn event_type(&self) -> EventType {
        match self {
            EventData::EncoderRotate { .. } => EventType::EncoderRotate,
            EventData::EncoderClick { .. } => EventType::EncoderClick,
            EventData::ButtonPress { .. } => EventType::ButtonPress,
            EventData::KeyboardKeyPress { .. } => EventType::KeyboardKeyPress,
            EventData::ZoneStateChanged { .. } => EventType::ZoneStateChanged,
            EventData::ZoneRenderModeChanged { .. } => EventType::ZoneRenderModeChanged,
            EventData::ZoneAnimationChanged { .. } => EventType::ZoneAnimationChanged,
            EventData::AnimationStarted { .. } => EventType::AnimationStarted,
            EventData::AnimationStopped { .. } => EventType::AnimationStopped,
            EventData::AnimationParameterChanged { .. } => EventType::AnimationParameterChanged,
            EventData::SelectedZoneChanged { .. } => EventType::SelectedZoneChanged,
            EventData::EditModeChanged { .. } => EventType::EditModeChanged,
            EventData::TaskStateChanged { .. } => EventType::TaskStateChanged,
        }
    }
}

/// An event as seen by subscribers. Handlers within one publish all see the
/// same event value.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub origin: EventOrigin,
    pub data: EventData,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(origin: EventOrigin, data: EventData) -> Self {
        Self {
            event_type: data.event_type(),
            origin,
            data,
            timestamp: Utc::now(),
        }
    }
}
