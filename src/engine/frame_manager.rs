use crate::led::LedChannel;
use crate::models::color::Color;
use crate::models::frame::{Frame, FramePayload, FramePriority, FrameSource};
use crate::models::zone::ZoneId;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Pull-based frame source, polled once per tick.
pub type PullSource = Box<dyn Fn() -> Option<Arc<Frame>> + Send + Sync>;

/// Counters surfaced through /api/status.
#[derive(Debug, Clone, Serialize)]
pub struct FrameStats {
    pub frames_rendered: u64,
    pub dma_skipped: u64,
    pub frames_dropped: u64,
    pub hardware_errors: u64,
}

struct PendingFrames {
    /// Latest frame per priority level; newest submission wins.
    retained: BTreeMap<FramePriority, Arc<Frame>>,
    sources: Vec<(u64, PullSource)>,
    next_source_id: u64,
}

/// Priority-arbitrated frame queue with a fixed-rate render loop.
///
/// Producers submit frames at any rate; every tick the highest-priority
/// non-expired frame wins and is materialized onto the channels. Change
/// detection is by frame token, so re-submitting the same frame value as a
/// new object still flushes while re-submitting the same frame object does
/// not.
pub struct FrameManager {
    channels: Arc<Mutex<Vec<LedChannel>>>,
    known_zones: HashSet<ZoneId>,
    pending: Mutex<PendingFrames>,
    fps: AtomicU32,
    running: AtomicBool,
    paused: AtomicBool,
    step_requested: AtomicBool,
    /// Token of the frame currently on the hardware; 0 = nothing rendered.
    last_rendered_token: AtomicU64,
    frames_rendered: AtomicU64,
    dma_skipped: AtomicU64,
    frames_dropped: AtomicU64,
    hardware_errors: AtomicU64,
}

impl FrameManager {
    pub const MIN_FPS: u32 = 1;
    pub const MAX_FPS: u32 = 240;

    pub fn new(channels: Vec<LedChannel>, fps: u32) -> Arc<Self> {
        let known_zones = channels
            .iter()
            .flat_map(|ch| ch.mapper().all_zone_ids().to_vec())
            .collect();

        let manager = Arc::new(Self {
            channels: Arc::new(Mutex::new(channels)),
            known_zones,
            pending: Mutex::new(PendingFrames {
                retained: BTreeMap::new(),
                sources: Vec::new(),
                next_source_id: 1,
            }),
            fps: AtomicU32::new(fps.clamp(Self::MIN_FPS, Self::MAX_FPS)),
            running: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            step_requested: AtomicBool::new(false),
            last_rendered_token: AtomicU64::new(0),
            frames_rendered: AtomicU64::new(0),
            dma_skipped: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            hardware_errors: AtomicU64::new(0),
        });

        info!(
            "FrameManager initialized: {} channel(s), {} fps",
            manager.channels.lock().unwrap().len(),
            manager.fps.load(Ordering::Relaxed)
        );
        manager
    }

    // === Submission API ===

    pub fn submit_full_strip(&self, frame: Arc<Frame>) {
        self.submit(frame);
    }

    pub fn submit_zone_frame(&self, frame: Arc<Frame>) {
        self.submit(frame);
    }

    pub fn submit_pixel_frame(&self, frame: Arc<Frame>) {
        self.submit(frame);
    }

    /// Retain a frame for arbitration. Malformed frames (no payload, or
    /// zones no channel knows) are dropped with a warning so the last good
    /// frame stays on the hardware.
    pub fn submit(&self, frame: Arc<Frame>) {
        if !self.validate(&frame) {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut pending = self.pending.lock().unwrap();
        let replaced = pending.retained.insert(frame.priority, frame);
        if let Some(old) = replaced {
            // Newest per priority wins; an unrendered intermediate frame is
            // simply discarded.
            if old.token != self.last_rendered_token.load(Ordering::Relaxed) {
                self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn validate(&self, frame: &Frame) -> bool {
        match &frame.payload {
            FramePayload::FullStrip { .. } => true,
            FramePayload::Zone { zone_colors } => {
                if zone_colors.is_empty() {
                    warn!("Dropping empty zone frame from {:?}", frame.source);
                    return false;
                }
                self.check_zones(frame, zone_colors.keys())
            }
            FramePayload::Pixel { zone_pixels } => {
                if zone_pixels.is_empty() {
                    warn!("Dropping empty pixel frame from {:?}", frame.source);
                    return false;
                }
                self.check_zones(frame, zone_pixels.keys())
            }
        }
    }

    fn check_zones<'a>(&self, frame: &Frame, zones: impl Iterator<Item = &'a ZoneId>) -> bool {
        for zone in zones {
            if !self.known_zones.contains(zone) {
                warn!(
                    "Dropping frame from {:?}: zone {} is not mapped to any channel",
                    frame.source, zone
                );
                return false;
            }
        }
        true
    }

    // === Pull sources ===

    pub fn add_source(&self, source: PullSource) -> u64 {
        let mut pending = self.pending.lock().unwrap();
        let id = pending.next_source_id;
        pending.next_source_id += 1;
        pending.sources.push((id, source));
        info!("Frame source {} added", id);
        id
    }

    pub fn remove_source(&self, id: u64) {
        let mut pending = self.pending.lock().unwrap();
        pending.sources.retain(|(sid, _)| *sid != id);
        info!("Frame source {} removed", id);
    }

    // === Control API ===

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        info!("FrameManager paused");
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.step_requested.store(false, Ordering::SeqCst);
        info!("FrameManager resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Run exactly one arbitration+flush while paused.
    pub fn step_frame(&self) -> crate::error::CoreResult<()> {
        if !self.is_paused() {
            return Err(crate::error::CoreError::IllegalState(
                "step_frame requires the frame manager to be paused".into(),
            ));
        }
        self.step_requested.store(true, Ordering::SeqCst);
        debug!("Single frame step requested");
        Ok(())
    }

    /// Discard retained frames below `priority`; used when the debug
    /// controller takes over the strip.
    pub fn clear_below_priority(&self, priority: FramePriority) {
        let mut pending = self.pending.lock().unwrap();
        let before = pending.retained.len();
        pending.retained.retain(|p, _| *p >= priority);
        debug!(
            "Cleared {} retained frame(s) below {:?}",
            before - pending.retained.len(),
            priority
        );
    }

    pub fn set_fps(&self, fps: u32) {
        let fps = fps.clamp(Self::MIN_FPS, Self::MAX_FPS);
        self.fps.store(fps, Ordering::Relaxed);
        info!("FrameManager FPS set to {}", fps);
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            dma_skipped: self.dma_skipped.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            hardware_errors: self.hardware_errors.load(Ordering::Relaxed),
        }
    }

    /// Snapshot of the hardware frame on the channel owning `gpio`.
    pub fn channel_snapshot(&self, gpio: u8) -> Option<Vec<Color>> {
        let channels = self.channels.lock().unwrap();
        channels
            .iter()
            .find(|ch| ch.gpio() == gpio)
            .map(|ch| ch.current_frame())
    }

    pub fn channel_pixel_count(&self, gpio: u8) -> Option<usize> {
        let channels = self.channels.lock().unwrap();
        channels
            .iter()
            .find(|ch| ch.gpio() == gpio)
            .map(|ch| ch.pixel_count())
    }

    pub fn gpios(&self) -> Vec<u8> {
        self.channels.lock().unwrap().iter().map(|ch| ch.gpio()).collect()
    }

    /// Split an absolute channel frame into per-zone pixel arrays in logical
    /// zone order; the transition service uses this to emit pixel frames.
    pub fn map_absolute_to_zones(&self, gpio: u8, pixels: &[Color]) -> HashMap<ZoneId, Vec<Color>> {
        let channels = self.channels.lock().unwrap();
        let Some(channel) = channels.iter().find(|ch| ch.gpio() == gpio) else {
            return HashMap::new();
        };

        let mapper = channel.mapper();
        let mut zone_pixels = HashMap::new();
        for &zone in mapper.all_zone_ids() {
            let indices = mapper.get_indices(zone);
            if indices.is_empty() {
                continue;
            }
            let colors: Vec<Color> = indices
                .iter()
                .map(|&i| pixels.get(i).cloned().unwrap_or_else(Color::black))
                .collect();
            zone_pixels.insert(zone, colors);
        }
        zone_pixels
    }

    /// Build an absolute frame for one channel from per-zone pixel arrays.
    /// Pixels of zones not present keep their value from `base` (black when
    /// no base is given or its size does not match).
    pub fn absolute_from_zone_pixels(
        &self,
        gpio: u8,
        zone_pixels: &HashMap<ZoneId, Vec<Color>>,
        base: Option<&[Color]>,
    ) -> Option<Vec<Color>> {
        let channels = self.channels.lock().unwrap();
        let channel = channels.iter().find(|ch| ch.gpio() == gpio)?;

        let mapper = channel.mapper();
        let mut frame = match base {
            Some(base) if base.len() == channel.pixel_count() => base.to_vec(),
            _ => vec![Color::black(); channel.pixel_count()],
        };
        for (zone, pixels) in zone_pixels {
            let indices = mapper.get_indices(*zone);
            for (logical, color) in pixels.iter().enumerate() {
                let Some(&index) = indices.get(logical) else {
                    break;
                };
                if let Some(slot) = frame.get_mut(index) {
                    *slot = color.clone();
                }
            }
        }
        Some(frame)
    }

    /// Length of a zone as mapped on its channel.
    pub fn zone_length(&self, zone: ZoneId) -> usize {
        let channels = self.channels.lock().unwrap();
        channels
            .iter()
            .map(|ch| ch.mapper().zone_length(zone))
            .max()
            .unwrap_or(0)
    }

    /// Black out every channel; used by the LED shutdown handler.
    pub async fn clear_channels(&self) {
        let channels = Arc::clone(&self.channels);
        let result = tokio::task::spawn_blocking(move || {
            let mut channels = channels.lock().unwrap();
            for channel in channels.iter_mut() {
                if let Err(e) = channel.clear() {
                    warn!("Failed to clear channel GPIO {}: {}", channel.gpio(), e);
                }
            }
        })
        .await;
        if let Err(e) = result {
            error!("Channel clear task failed: {}", e);
        }
    }

    // === Render loop ===

    /// Fixed-rate render loop; runs until [`stop`](Self::stop).
    pub async fn run(self: Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("FrameManager render loop already running");
            return;
        }

        info!(
            "Render loop running at {} FPS",
            self.fps.load(Ordering::Relaxed)
        );

        while self.running.load(Ordering::SeqCst) {
            let frame_delay = Duration::from_secs_f64(1.0 / self.fps.load(Ordering::Relaxed) as f64);

            if self.is_paused() && !self.step_requested.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
                continue;
            }

            self.render_tick().await;
            tokio::time::sleep(frame_delay).await;
        }

        info!("FrameManager render loop stopped");
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// One arbitration + flush cycle.
    pub(crate) async fn render_tick(&self) {
        let winner = {
            let mut pending = self.pending.lock().unwrap();

            // Poll pull sources; their frames arbitrate like submissions.
            let pulled: Vec<Arc<Frame>> = pending
                .sources
                .iter()
                .filter_map(|(_, source)| source())
                .collect();
            for frame in pulled {
                if self.validate(&frame) {
                    pending.retained.insert(frame.priority, frame);
                }
            }

            let now = Instant::now();
            pending.retained.retain(|_, frame| !frame.is_expired(now));

            // BTreeMap is priority-ordered, so the last entry is the winner.
            pending.retained.values().next_back().cloned()
        };

        let Some(winner) = winner else {
            // Nothing to show. If a frame was ever rendered it simply stays
            // on the hardware; only a cold start blanks the strip, once.
            if self.last_rendered_token.load(Ordering::Relaxed) == 0 {
                debug!("No frames retained; rendering idle fallback");
                let idle = Frame::full_strip(
                    Color::black(),
                    FramePriority::Idle,
                    FrameSource::Idle,
                    None,
                );
                self.flush(idle).await;
            }
            return;
        };

        if winner.token == self.last_rendered_token.load(Ordering::Relaxed) {
            self.dma_skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.flush(winner).await;
    }

    /// Materialize `frame` per channel and push on the blocking pool so the
    /// tick loop never waits on DMA.
    async fn flush(&self, frame: Arc<Frame>) {
        let channels = Arc::clone(&self.channels);
        let to_render = Arc::clone(&frame);

        let errors = tokio::task::spawn_blocking(move || {
            let mut channels = channels.lock().unwrap();
            let mut errors = 0u64;

            for channel in channels.iter_mut() {
                let result = match &to_render.payload {
                    FramePayload::FullStrip { color } => {
                        let pixels = vec![color.clone(); channel.pixel_count()];
                        channel.apply_pixel_frame(&pixels)
                    }
                    FramePayload::Zone { zone_colors } => {
                        let relevant: HashMap<ZoneId, Color> = zone_colors
                            .iter()
                            .filter(|(zone, _)| channel.has_zone(**zone))
                            .map(|(zone, color)| (*zone, color.clone()))
                            .collect();
                        if relevant.is_empty() {
                            continue;
                        }
                        let pixels = channel.build_frame_from_zones(&relevant);
                        channel.apply_pixel_frame(&pixels)
                    }
                    FramePayload::Pixel { zone_pixels } => {
                        let relevant: HashMap<ZoneId, Vec<Color>> = zone_pixels
                            .iter()
                            .filter(|(zone, _)| channel.has_zone(**zone))
                            .map(|(zone, pixels)| (*zone, pixels.clone()))
                            .collect();
                        if relevant.is_empty() {
                            continue;
                        }
                        let pixels = channel.build_frame_from_zone_pixels(&relevant);
                        channel.apply_pixel_frame(&pixels)
                    }
                };

                if let Err(e) = result {
                    // One channel failing must not stop the others.
                    warn!("Frame push failed on GPIO {}: {}", channel.gpio(), e);
                    errors += 1;
                }
            }
            errors
        })
        .await;

        match errors {
            Ok(errors) => {
                self.hardware_errors.fetch_add(errors, Ordering::Relaxed);
                self.last_rendered_token.store(frame.token, Ordering::Relaxed);
                self.frames_rendered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => error!("Hardware flush task failed: {}", e),
        }
    }
}
