use crate::engine::frame_manager::FrameManager;
use crate::models::color::Color;
use crate::models::frame::{Frame, FramePriority, FrameSource};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Easing curves for interpolated transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    CubicIn,
    CubicOut,
}

impl Easing {
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    pub duration_ms: u64,
    pub steps: u32,
    pub easing: Easing,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration_ms: 200,
            steps: 20,
            easing: Easing::Linear,
        }
    }
}

impl TransitionConfig {
    pub const ANIMATION_SWITCH: TransitionConfig = TransitionConfig {
        duration_ms: 200,
        steps: 20,
        easing: Easing::Linear,
    };

    pub const STARTUP: TransitionConfig = TransitionConfig {
        duration_ms: 600,
        steps: 30,
        easing: Easing::CubicOut,
    };

    pub const SHUTDOWN: TransitionConfig = TransitionConfig {
        duration_ms: 400,
        steps: 20,
        easing: Easing::CubicIn,
    };

    fn step_delay(&self) -> Duration {
        Duration::from_millis(self.duration_ms / self.steps.max(1) as u64)
    }
}

/// Frames emitted by a transition decay quickly once the producer stops:
/// long enough to bridge the gap between steps, short enough that a
/// finished crossfade hands the strip back to lower-priority producers
/// almost immediately.
const TRANSITION_FRAME_TTL: Duration = Duration::from_millis(300);

/// Interpolates between two absolute frames of one channel, routing every
/// intermediate frame through the frame manager at TRANSITION priority.
/// At most one transition runs per channel; a new request cancels the
/// running one at its next step boundary.
pub struct TransitionService {
    frame_manager: Arc<FrameManager>,
    active: std::sync::Mutex<HashMap<u8, Arc<AtomicBool>>>,
    busy_tx: watch::Sender<usize>,
    busy_rx: watch::Receiver<usize>,
}

impl TransitionService {
    pub fn new(frame_manager: Arc<FrameManager>) -> Arc<Self> {
        let (busy_tx, busy_rx) = watch::channel(0usize);
        Arc::new(Self {
            frame_manager,
            active: std::sync::Mutex::new(HashMap::new()),
            busy_tx,
            busy_rx,
        })
    }

    /// Fade a channel in from black to `target`.
    pub async fn fade_in(&self, gpio: u8, target: Vec<Color>, config: TransitionConfig) {
        let from = vec![Color::black(); target.len()];
        self.run(gpio, from, target, config).await;
    }

    /// Fade a channel from its current hardware state to black.
    pub async fn fade_out(&self, gpio: u8, config: TransitionConfig) {
        let Some(from) = self.frame_manager.channel_snapshot(gpio) else {
            warn!("fade_out: no channel on GPIO {}", gpio);
            return;
        };
        let to = vec![Color::black(); from.len()];
        self.run(gpio, from, to, config).await;
    }

    /// Crossfade a channel from `from` (or its current hardware state) to
    /// `to`.
    pub async fn crossfade(
        &self,
        gpio: u8,
        from: Option<Vec<Color>>,
        to: Vec<Color>,
        config: TransitionConfig,
    ) {
        let from = match from {
            Some(frame) => frame,
            None => match self.frame_manager.channel_snapshot(gpio) {
                Some(frame) => frame,
                None => {
                    warn!("crossfade: no channel on GPIO {}", gpio);
                    return;
                }
            },
        };
        self.run(gpio, from, to, config).await;
    }

    /// Wait until no transition is running on any channel.
    pub async fn wait_for_idle(&self) {
        let mut rx = self.busy_rx.clone();
        while *rx.borrow() != 0 {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        *self.busy_rx.borrow() == 0
    }

    async fn run(&self, gpio: u8, from: Vec<Color>, to: Vec<Color>, config: TransitionConfig) {
        if to.is_empty() || config.steps == 0 {
            return;
        }

        let cancel = Arc::new(AtomicBool::new(false));
        {
            let mut active = self.active.lock().unwrap();
            if let Some(previous) = active.insert(gpio, Arc::clone(&cancel)) {
                // The running transition stops at its next step boundary.
                previous.store(true, Ordering::SeqCst);
            }
        }
        self.busy_tx.send_modify(|n| *n += 1);

        debug!(
            "Transition on GPIO {}: {} steps over {} ms",
            gpio, config.steps, config.duration_ms
        );

        let steps = config.steps;
        let delay = config.step_delay();
        let mut completed = true;

        for step in 0..=steps {
            if cancel.load(Ordering::SeqCst) {
                debug!("Transition on GPIO {} cancelled at step {}", gpio, step);
                completed = false;
                break;
            }

            let t = step as f32 / steps as f32;
            let factor = config.easing.apply(t);
            let blended = blend_frames(&from, &to, factor);

            let zone_pixels = self.frame_manager.map_absolute_to_zones(gpio, &blended);
            if !zone_pixels.is_empty() {
                self.frame_manager.submit_pixel_frame(Frame::pixel(
                    zone_pixels,
                    FramePriority::Transition,
                    FrameSource::Transition,
                    Some(TRANSITION_FRAME_TTL),
                ));
            }

            if step < steps {
                tokio::time::sleep(delay).await;
            }
        }

        {
            let mut active = self.active.lock().unwrap();
            if let Some(current) = active.get(&gpio) {
                if Arc::ptr_eq(current, &cancel) {
                    active.remove(&gpio);
                }
            }
        }
        self.busy_tx.send_modify(|n| *n = n.saturating_sub(1));

        if completed {
            debug!("Transition on GPIO {} complete", gpio);
        }
    }
}

/// Channel-wise linear interpolation with banker's rounding, so repeated
/// fades do not drift.
pub fn blend_frames(from: &[Color], to: &[Color], factor: f32) -> Vec<Color> {
    let black = Color::black();
    (0..to.len())
        .map(|i| {
            let a = from.get(i).unwrap_or(&black).to_rgb();
            let b = to[i].to_rgb();
            Color::from_rgb(
                lerp_channel(a[0], b[0], factor),
                lerp_channel(a[1], b[1], factor),
                lerp_channel(a[2], b[2], factor),
            )
        })
        .collect()
}

fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t)
        .round_ties_even()
        .clamp(0.0, 255.0) as u8
}
