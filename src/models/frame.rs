use crate::models::color::Color;
use crate::models::zone::ZoneId;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Frame priority levels; higher wins. PULSE must beat ANIMATION so the
/// edit-mode indicator overlays a running animation, and TRANSITION beats
/// both so crossfades own the strip while they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FramePriority {
    Idle = 0,
    Manual = 10,
    Animation = 20,
    Pulse = 30,
    Transition = 40,
    Debug = 50,
}

/// Which subsystem produced a frame; used for logging and debugging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FrameSource {
    Idle,
    Static,
    Manual,
    Pulse,
    Animation,
    Transition,
    Preview,
    Debug,
}

/// Frame scope. Zone and pixel frames are partial updates: zones absent
/// from the map keep whatever the hardware currently shows.
#[derive(Debug, Clone)]
pub enum FramePayload {
    /// Every pixel on every channel set to one color.
    FullStrip { color: Color },
    /// Named zones set to uniform colors.
    Zone { zone_colors: HashMap<ZoneId, Color> },
    /// Per-zone pixel arrays in logical zone order. Arrays shorter than the
    /// zone only overwrite the provided prefix.
    Pixel { zone_pixels: HashMap<ZoneId, Vec<Color>> },
}

static NEXT_FRAME_TOKEN: AtomicU64 = AtomicU64::new(1);

/// An immutable description of desired hardware state. The `token` is the
/// frame's identity: the render loop skips the hardware push when the same
/// token wins two ticks in a row, while value-equal frames from different
/// producers (distinct tokens) still flush.
#[derive(Debug, Clone)]
pub struct Frame {
    pub payload: FramePayload,
    pub priority: FramePriority,
    pub source: FrameSource,
    pub token: u64,
    pub created_at: Instant,
    pub ttl: Option<Duration>,
}

impl Frame {
    fn build(
        payload: FramePayload,
        priority: FramePriority,
        source: FrameSource,
        ttl: Option<Duration>,
    ) -> Arc<Frame> {
        Arc::new(Frame {
            payload,
            priority,
            source,
            token: NEXT_FRAME_TOKEN.fetch_add(1, Ordering::Relaxed),
            created_at: Instant::now(),
            ttl,
        })
    }

    pub fn full_strip(
        color: Color,
        priority: FramePriority,
        source: FrameSource,
        ttl: Option<Duration>,
    ) -> Arc<Frame> {
        Self::build(FramePayload::FullStrip { color }, priority, source, ttl)
    }

    pub fn zone(
        zone_colors: HashMap<ZoneId, Color>,
        priority: FramePriority,
        source: FrameSource,
        ttl: Option<Duration>,
    ) -> Arc<Frame> {
        Self::build(FramePayload::Zone { zone_colors }, priority, source, ttl)
    }

    pub fn pixel(
        zone_pixels: HashMap<ZoneId, Vec<Color>>,
        priority: FramePriority,
        source: FrameSource,
        ttl: Option<Duration>,
    ) -> Arc<Frame> {
        Self::build(FramePayload::Pixel { zone_pixels }, priority, source, ttl)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(self.created_at) > ttl,
            None => false,
        }
    }

    /// Zones this frame touches; empty for full-strip frames (which touch
    /// everything).
    pub fn touched_zones(&self) -> Vec<ZoneId> {
        match &self.payload {
            FramePayload::FullStrip { .. } => Vec::new(),
            FramePayload::Zone { zone_colors } => zone_colors.keys().copied().collect(),
            FramePayload::Pixel { zone_pixels } => zone_pixels.keys().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_monotonic() {
        let a = Frame::full_strip(Color::black(), FramePriority::Idle, FrameSource::Idle, None);
        let b = Frame::full_strip(Color::black(), FramePriority::Idle, FrameSource::Idle, None);
        assert!(b.token > a.token);
    }

    #[test]
    fn ttl_expiry() {
        let frame = Frame::full_strip(
            Color::black(),
            FramePriority::Manual,
            FrameSource::Manual,
            Some(Duration::from_millis(10)),
        );
        assert!(!frame.is_expired(frame.created_at));
        assert!(frame.is_expired(frame.created_at + Duration::from_millis(11)));

        let forever = Frame::full_strip(Color::black(), FramePriority::Manual, FrameSource::Manual, None);
        assert!(!forever.is_expired(Instant::now() + Duration::from_secs(3600)));
    }

    #[test]
    fn priority_ordering_matches_arbitration_rules() {
        assert!(FramePriority::Idle < FramePriority::Manual);
        assert!(FramePriority::Manual < FramePriority::Animation);
        assert!(FramePriority::Animation < FramePriority::Pulse);
        assert!(FramePriority::Pulse < FramePriority::Transition);
        assert!(FramePriority::Transition < FramePriority::Debug);
    }
}
