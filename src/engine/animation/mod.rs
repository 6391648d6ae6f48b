use crate::engine::frame_manager::FrameManager;
use crate::engine::transition::{TransitionConfig, TransitionService};
use crate::error::{CoreError, CoreResult};
use crate::lifecycle::task_registry::{TaskCategory, TaskRegistry};
use crate::models::animation::AnimationId;
use crate::models::color::Color;
use crate::models::frame::{Frame, FramePriority, FrameSource};
use crate::models::parameter::{ParamId, ParamValue};
use crate::models::zone::{Zone, ZoneId, ZoneRenderMode};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

mod breathe;
mod color_cycle;
mod color_fade;
mod color_snake;
mod snake;

pub use breathe::BreatheAnimation;
pub use color_cycle::ColorCycleAnimation;
pub use color_fade::ColorFadeAnimation;
pub use color_snake::ColorSnakeAnimation;
pub use snake::SnakeAnimation;

/// One yield from an animation: scope plus color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MicroUpdate {
    FullStrip { rgb: [u8; 3] },
    Zone { zone: ZoneId, rgb: [u8; 3] },
    Pixel { zone: ZoneId, index: usize, rgb: [u8; 3] },
}

/// Output buffer an animation fills during one tick.
#[derive(Debug, Default)]
pub struct MicroUpdateBuffer {
    updates: Vec<MicroUpdate>,
}

impl MicroUpdateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn full_strip(&mut self, rgb: [u8; 3]) {
        self.updates.push(MicroUpdate::FullStrip { rgb });
    }

    pub fn zone(&mut self, zone: ZoneId, rgb: [u8; 3]) {
        self.updates.push(MicroUpdate::Zone { zone, rgb });
    }

    pub fn pixel(&mut self, zone: ZoneId, index: usize, rgb: [u8; 3]) {
        self.updates.push(MicroUpdate::Pixel { zone, index, rgb });
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn clear(&mut self) {
        self.updates.clear();
    }

    pub fn drain(&mut self) -> impl Iterator<Item = MicroUpdate> + '_ {
        self.updates.drain(..)
    }

    pub fn updates(&self) -> &[MicroUpdate] {
        &self.updates
    }
}

/// The slice of the zone table an animation renders to.
#[derive(Debug, Clone)]
pub struct AnimationZone {
    pub id: ZoneId,
    pub pixel_count: usize,
}

/// Animation contract: an explicit state-step generator. `tick` emits zero
/// or more micro-updates; `interval` tells the engine how long to sleep
/// before the next tick. Implementations are restarted fresh on every
/// `start` and must not touch hardware.
pub trait Animation: Send {
    fn id(&self) -> AnimationId;

    fn tick(&mut self, now: Instant, out: &mut MicroUpdateBuffer) -> CoreResult<()>;

    fn interval(&self) -> Duration;

    fn set_parameter(&mut self, id: ParamId, value: ParamValue) -> CoreResult<()>;
}

/// Instantiate a registered animation over the given zones.
pub fn create_animation(
    id: AnimationId,
    zones: Vec<AnimationZone>,
    parameters: &HashMap<ParamId, ParamValue>,
) -> CoreResult<Box<dyn Animation>> {
    if zones.is_empty() {
        return Err(CoreError::IllegalState(
            "no zones available for animation".into(),
        ));
    }

    Ok(match id {
        AnimationId::Breathe => Box::new(BreatheAnimation::new(zones, parameters)),
        AnimationId::ColorFade => Box::new(ColorFadeAnimation::new(zones, parameters)),
        AnimationId::ColorCycle => Box::new(ColorCycleAnimation::new(zones, parameters)),
        AnimationId::Snake => Box::new(SnakeAnimation::new(zones, parameters)),
        AnimationId::ColorSnake => Box::new(ColorSnakeAnimation::new(zones, parameters)),
    })
}

pub(crate) fn param_number(
    parameters: &HashMap<ParamId, ParamValue>,
    id: ParamId,
    default: i64,
) -> i64 {
    parameters
        .get(&id)
        .and_then(|v| v.as_number())
        .unwrap_or(default)
}

/// Accumulates micro-updates into per-zone payload buffers, mirroring how
/// pixels land on the strip: zone-level color first, pixel overlays on top.
struct ZoneBuffers {
    zone_ids: Vec<ZoneId>,
    lengths: HashMap<ZoneId, usize>,
    zone_colors: HashMap<ZoneId, [u8; 3]>,
    zone_pixels: HashMap<ZoneId, HashMap<usize, [u8; 3]>>,
}

impl ZoneBuffers {
    fn new(zones: &[AnimationZone]) -> Self {
        Self {
            zone_ids: zones.iter().map(|z| z.id).collect(),
            lengths: zones.iter().map(|z| (z.id, z.pixel_count)).collect(),
            zone_colors: HashMap::new(),
            zone_pixels: HashMap::new(),
        }
    }

    fn apply(&mut self, buffer: &MicroUpdateBuffer) {
        for update in buffer.updates() {
            match *update {
                MicroUpdate::FullStrip { rgb } => {
                    for zone in &self.zone_ids {
                        self.zone_colors.insert(*zone, rgb);
                    }
                }
                MicroUpdate::Zone { zone, rgb } => {
                    self.zone_colors.insert(zone, rgb);
                }
                MicroUpdate::Pixel { zone, index, rgb } => {
                    let length = self.lengths.get(&zone).copied().unwrap_or(0);
                    if index < length {
                        self.zone_pixels.entry(zone).or_default().insert(index, rgb);
                    }
                }
            }
        }
    }

    /// Build the per-zone pixel arrays. Zones never touched are absent;
    /// untouched pixels inside a touched zone are black.
    fn materialize(&self) -> HashMap<ZoneId, Vec<Color>> {
        let mut payload: HashMap<ZoneId, Vec<Color>> = HashMap::new();

        for (zone, rgb) in &self.zone_colors {
            let length = self.lengths.get(zone).copied().unwrap_or(0);
            payload.insert(
                *zone,
                vec![Color::from_rgb(rgb[0], rgb[1], rgb[2]); length],
            );
        }

        for (zone, pixels) in &self.zone_pixels {
            let length = self.lengths.get(zone).copied().unwrap_or(0);
            let entry = payload
                .entry(*zone)
                .or_insert_with(|| vec![Color::black(); length]);
            for (&index, rgb) in pixels {
                if let Some(slot) = entry.get_mut(index) {
                    *slot = Color::from_rgb(rgb[0], rgb[1], rgb[2]);
                }
            }
        }

        payload
    }

    fn clear(&mut self) {
        self.zone_colors.clear();
        self.zone_pixels.clear();
    }
}

/// Source of zone snapshots (config + state), provided by the zone service
/// so the engine holds no owning reference to it.
pub type ZonesSnapshotFn = Arc<dyn Fn() -> Vec<Zone> + Send + Sync>;

const FIRST_FRAME_MIN_UPDATES: usize = 15;
const FIRST_FRAME_MAX_UPDATES: usize = 100;
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_millis(250);
/// TTL on the frame that keeps the old picture up while the first frame of
/// the next animation is being collected.
const HOLDOVER_TTL: Duration = Duration::from_secs(5);
/// Animation frames decay shortly after the producer stops submitting.
const ANIMATION_FRAME_TTL: Duration = Duration::from_secs(2);

struct RunningAnimation {
    id: AnimationId,
    stop: Arc<AtomicBool>,
    param_tx: mpsc::UnboundedSender<(ParamId, ParamValue)>,
    task_id: u64,
    gpios: Vec<u8>,
}

/// Owns the currently running animation and drives it into the frame
/// manager under the start/stop/switch/freeze lifecycle.
pub struct AnimationEngine {
    frame_manager: Arc<FrameManager>,
    transitions: Arc<TransitionService>,
    registry: Arc<TaskRegistry>,
    zones_snapshot: ZonesSnapshotFn,
    current: tokio::sync::Mutex<Option<RunningAnimation>>,
    frozen: Arc<AtomicBool>,
}

impl AnimationEngine {
    pub fn new(
        frame_manager: Arc<FrameManager>,
        transitions: Arc<TransitionService>,
        registry: Arc<TaskRegistry>,
        zones_snapshot: ZonesSnapshotFn,
    ) -> Arc<Self> {
        info!("AnimationEngine initialized");
        Arc::new(Self {
            frame_manager,
            transitions,
            registry,
            zones_snapshot,
            current: tokio::sync::Mutex::new(None),
            frozen: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Start an animation, crossfading from the previous picture.
    ///
    /// `excluded_zones` are never written by the engine, so their pixels
    /// survive through the frame manager's partial-frame semantics.
    /// `from_frames` overrides the per-GPIO starting frames for the
    /// crossfade; when absent the current hardware snapshots are used.
    pub async fn start(
        &self,
        animation_id: AnimationId,
        excluded_zones: Vec<ZoneId>,
        transition: Option<TransitionConfig>,
        from_frames: Option<HashMap<u8, Vec<Color>>>,
        parameters: HashMap<ParamId, ParamValue>,
    ) -> CoreResult<()> {
        let transition_cfg = transition.unwrap_or(TransitionConfig::ANIMATION_SWITCH);
        info!("AnimationEngine.start(): {}", animation_id);

        // Step 1: let any in-flight transition settle.
        self.transitions.wait_for_idle().await;

        let mut current = self.current.lock().await;

        // Step 2: resolve the zones this animation renders to.
        let zones = (self.zones_snapshot)();
        let anim_zones: Vec<AnimationZone> = zones
            .iter()
            .filter(|z| {
                z.config.enabled
                    && z.config.pixel_count > 0
                    && z.state.render_mode == ZoneRenderMode::Animation
                    && !excluded_zones.contains(&z.config.id)
            })
            .map(|z| AnimationZone {
                id: z.config.id,
                pixel_count: z.config.pixel_count,
            })
            .collect();

        if anim_zones.is_empty() {
            return Err(CoreError::IllegalState(
                "no zones are in animation mode".into(),
            ));
        }

        let mut gpios: Vec<u8> = zones
            .iter()
            .filter(|z| anim_zones.iter().any(|az| az.id == z.config.id))
            .map(|z| z.config.gpio)
            .collect();
        gpios.sort_unstable();
        gpios.dedup();

        // Step 3: capture the old picture, then stop the previous animation
        // without fading (the crossfade replaces the fade).
        let old_frames: HashMap<u8, Vec<Color>> = match from_frames {
            Some(frames) => frames,
            None => gpios
                .iter()
                .filter_map(|&gpio| {
                    self.frame_manager
                        .channel_snapshot(gpio)
                        .map(|frame| (gpio, frame))
                })
                .collect(),
        };

        if let Some(previous) = current.take() {
            debug!(
                "AnimationEngine: stopping {} for switch (no fade)",
                previous.id
            );
            previous.stop.store(true, Ordering::SeqCst);
            self.registry.cancel(previous.task_id);
        }

        // Step 4: fresh animation instance.
        let mut animation = create_animation(animation_id, anim_zones.clone(), &parameters)?;

        // Step 5: build the first frame in memory, off the hardware path.
        let first_frame = Self::collect_first_frame(animation.as_mut(), &anim_zones).await?;

        // Step 6: keep the old picture visible while the crossfade spins up.
        let mut holdover: HashMap<ZoneId, Vec<Color>> = HashMap::new();
        for (gpio, frame) in &old_frames {
            holdover.extend(self.frame_manager.map_absolute_to_zones(*gpio, frame));
        }
        if !holdover.is_empty() {
            self.frame_manager.submit_pixel_frame(Frame::pixel(
                holdover,
                FramePriority::Manual,
                FrameSource::Animation,
                Some(HOLDOVER_TTL),
            ));
        }

        // Step 7: crossfade old -> first frame per channel (fade in from
        // black when sizes do not line up).
        let fades = gpios.iter().map(|&gpio| {
            // Zones the animation does not touch (excluded or static) keep
            // their old pixels in the crossfade target.
            let old = old_frames.get(&gpio).cloned();
            let first_abs = self
                .frame_manager
                .absolute_from_zone_pixels(gpio, &first_frame, old.as_deref())
                .unwrap_or_default();
            async move {
                if first_abs.is_empty() {
                    return;
                }
                match old {
                    Some(old) if old.len() == first_abs.len() => {
                        self.transitions
                            .crossfade(gpio, Some(old), first_abs, transition_cfg)
                            .await;
                    }
                    _ => {
                        self.transitions
                            .fade_in(gpio, first_abs, transition_cfg)
                            .await;
                    }
                }
            }
        });
        futures::future::join_all(fades).await;

        // Step 8: hand over to the run loop.
        let stop = Arc::new(AtomicBool::new(false));
        let (param_tx, param_rx) = mpsc::unbounded_channel();

        let task = self.registry.create_tracked_task(
            TaskCategory::Animation,
            &format!("animation loop: {}", animation_id),
            Self::run_loop(
                animation,
                anim_zones,
                excluded_zones,
                Arc::clone(&self.frame_manager),
                Arc::clone(&self.zones_snapshot),
                Arc::clone(&stop),
                Arc::clone(&self.frozen),
                param_rx,
            ),
        );

        *current = Some(RunningAnimation {
            id: animation_id,
            stop,
            param_tx,
            task_id: task.id,
            gpios,
        });

        info!("AnimationEngine: started {}", animation_id);
        Ok(())
    }

    /// Drive the animation until it has yielded enough micro-updates for a
    /// representative first frame, bounded by update count and wall time.
    async fn collect_first_frame(
        animation: &mut dyn Animation,
        zones: &[AnimationZone],
    ) -> CoreResult<HashMap<ZoneId, Vec<Color>>> {
        let mut buffers = ZoneBuffers::new(zones);
        let mut scratch = MicroUpdateBuffer::new();
        let mut collected = 0usize;
        let started = Instant::now();

        while collected < FIRST_FRAME_MIN_UPDATES && started.elapsed() < FIRST_FRAME_TIMEOUT {
            scratch.clear();
            animation.tick(Instant::now(), &mut scratch)?;
            collected += scratch.len();
            buffers.apply(&scratch);

            if collected >= FIRST_FRAME_MAX_UPDATES {
                warn!(
                    "First frame collection hit the {} update cap",
                    FIRST_FRAME_MAX_UPDATES
                );
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        debug!(
            "First frame built: {} update(s) in {:?}",
            collected,
            started.elapsed()
        );
        Ok(buffers.materialize())
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_loop(
        mut animation: Box<dyn Animation>,
        zones: Vec<AnimationZone>,
        excluded_zones: Vec<ZoneId>,
        frame_manager: Arc<FrameManager>,
        zones_snapshot: ZonesSnapshotFn,
        stop: Arc<AtomicBool>,
        frozen: Arc<AtomicBool>,
        mut param_rx: mpsc::UnboundedReceiver<(ParamId, ParamValue)>,
    ) -> CoreResult<()> {
        let mut buffers = ZoneBuffers::new(&zones);
        let mut scratch = MicroUpdateBuffer::new();
        let mut frame_count: u64 = 0;

        loop {
            if stop.load(Ordering::SeqCst) {
                debug!("Animation loop stopped after {} frames", frame_count);
                return Ok(());
            }

            while let Ok((param, value)) = param_rx.try_recv() {
                if let Err(e) = animation.set_parameter(param, value) {
                    warn!("Parameter update rejected by animation: {}", e);
                }
            }

            scratch.clear();
            if let Err(e) = animation.tick(Instant::now(), &mut scratch) {
                // The animation is broken; stop producing but leave the
                // engine ready for the next start.
                error!("Animation {} failed: {}", animation.id(), e);
                return Err(e);
            }

            if !scratch.is_empty() {
                frame_count += 1;
                buffers.apply(&scratch);
                let mut payload = buffers.materialize();

                // Zones running static colors ride along in every frame so
                // an animation never blanks them.
                for zone in zones_snapshot() {
                    let id = zone.config.id;
                    if payload.contains_key(&id)
                        || excluded_zones.contains(&id)
                        || !zone.config.enabled
                        || zone.config.pixel_count == 0
                    {
                        continue;
                    }
                    if zone.state.render_mode == ZoneRenderMode::Static {
                        let rgb = zone.effective_rgb();
                        payload.insert(
                            id,
                            vec![Color::from_rgb(rgb[0], rgb[1], rgb[2]); zone.config.pixel_count],
                        );
                    }
                }

                if !payload.is_empty() && !frozen.load(Ordering::SeqCst) {
                    frame_manager.submit_pixel_frame(Frame::pixel(
                        payload,
                        FramePriority::Animation,
                        FrameSource::Animation,
                        Some(ANIMATION_FRAME_TTL),
                    ));
                }
            }

            tokio::time::sleep(animation.interval()).await;
        }
    }

    /// Stop the running animation. Unless `skip_fade` is set and a
    /// transition config is provided, the strip fades to black.
    pub async fn stop(&self, transition: Option<TransitionConfig>, skip_fade: bool) {
        let mut current = self.current.lock().await;
        let Some(running) = current.take() else {
            return;
        };

        info!(
            "AnimationEngine: stopping {} (skip_fade={})",
            running.id, skip_fade
        );
        running.stop.store(true, Ordering::SeqCst);
        self.registry.cancel(running.task_id);
        drop(current);

        if !skip_fade {
            if let Some(cfg) = transition {
                for gpio in running.gpios {
                    self.transitions.fade_out(gpio, cfg).await;
                }
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.current.lock().await.is_some()
    }

    pub async fn current_animation(&self) -> Option<AnimationId> {
        self.current.lock().await.as_ref().map(|r| r.id)
    }

    /// Forward a validated parameter change to the running animation.
    pub async fn update_parameter(&self, param: ParamId, value: ParamValue) {
        let current = self.current.lock().await;
        if let Some(running) = current.as_ref() {
            let _ = running.param_tx.send((param, value));
        }
    }

    /// Suppress frame submission while the debug controller owns the strip;
    /// the animation keeps ticking so its timing stays consistent.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
        info!("AnimationEngine: frozen");
    }

    pub fn unfreeze(&self) {
        self.frozen.store(false, Ordering::SeqCst);
        info!("AnimationEngine: unfrozen");
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::VirtualStrip;
    use crate::led::{LedChannel, ZonePixelMapper};
    use crate::models::zone::{ZoneConfig, ZoneState};

    fn zone_config(id: ZoneId, start: usize, count: usize) -> ZoneConfig {
        ZoneConfig {
            id,
            display_name: id.as_key().to_string(),
            gpio: 18,
            pixel_count: count,
            enabled: true,
            reversed: false,
            start_index: start,
            end_index: start + count - 1,
        }
    }

    fn zones_snapshot(mode: ZoneRenderMode) -> ZonesSnapshotFn {
        Arc::new(move || {
            vec![
                Zone {
                    config: zone_config(ZoneId::Floor, 0, 4),
                    state: ZoneState {
                        render_mode: mode,
                        ..ZoneState::default()
                    },
                },
                Zone {
                    config: zone_config(ZoneId::Lamp, 4, 2),
                    state: ZoneState {
                        render_mode: ZoneRenderMode::Static,
                        color: Color::from_rgb(10, 20, 30),
                        ..ZoneState::default()
                    },
                },
            ]
        })
    }

    fn engine_fixture(mode: ZoneRenderMode) -> (Arc<FrameManager>, Arc<AnimationEngine>) {
        let mapper = ZonePixelMapper::new(&[
            zone_config(ZoneId::Floor, 0, 4),
            zone_config(ZoneId::Lamp, 4, 2),
        ])
        .unwrap();
        let channel = LedChannel::new(18, Box::new(VirtualStrip::new(6)), mapper);
        let fm = FrameManager::new(vec![channel], 60);
        let transitions = TransitionService::new(Arc::clone(&fm));
        let registry = TaskRegistry::new();
        let engine = AnimationEngine::new(
            Arc::clone(&fm),
            transitions,
            registry,
            zones_snapshot(mode),
        );
        (fm, engine)
    }

    fn quick_transition() -> TransitionConfig {
        TransitionConfig {
            duration_ms: 20,
            steps: 4,
            easing: crate::engine::transition::Easing::Linear,
        }
    }

    #[tokio::test]
    async fn start_requires_a_zone_in_animation_mode() {
        let (_fm, engine) = engine_fixture(ZoneRenderMode::Static);
        let result = engine
            .start(
                AnimationId::Breathe,
                Vec::new(),
                Some(quick_transition()),
                None,
                HashMap::new(),
            )
            .await;
        assert!(matches!(result, Err(CoreError::IllegalState(_))));
    }

    #[tokio::test]
    async fn start_runs_loop_and_merges_static_zones() {
        let (fm, engine) = engine_fixture(ZoneRenderMode::Animation);
        engine
            .start(
                AnimationId::Breathe,
                Vec::new(),
                Some(quick_transition()),
                None,
                HashMap::new(),
            )
            .await
            .unwrap();
        assert!(engine.is_running().await);
        assert_eq!(engine.current_animation().await, Some(AnimationId::Breathe));

        // Give the run loop a few intervals to submit, then render.
        tokio::time::sleep(Duration::from_millis(150)).await;
        fm.render_tick().await;

        let frame = fm.channel_snapshot(18).unwrap();
        // The static LAMP zone rides along with the animation payload.
        assert_eq!(frame[4].to_rgb(), [10, 20, 30]);
        assert_eq!(frame[5].to_rgb(), [10, 20, 30]);
        // The animated FLOOR zone is lit.
        assert_ne!(frame[0].to_rgb(), [0, 0, 0]);

        engine.stop(None, true).await;
        assert!(!engine.is_running().await);
    }

    #[tokio::test]
    async fn freeze_suppresses_submissions() {
        let (fm, engine) = engine_fixture(ZoneRenderMode::Animation);
        engine
            .start(
                AnimationId::ColorCycle,
                Vec::new(),
                Some(quick_transition()),
                None,
                HashMap::new(),
            )
            .await
            .unwrap();

        // Drain whatever the startup produced.
        tokio::time::sleep(Duration::from_millis(100)).await;
        fm.render_tick().await;

        engine.freeze();
        fm.clear_below_priority(FramePriority::Debug);
        tokio::time::sleep(Duration::from_millis(150)).await;

        let rendered_before = fm.stats().frames_rendered;
        fm.render_tick().await;
        fm.render_tick().await;
        // Idle fallback may render once, but no animation frames arrive.
        assert!(fm.stats().frames_rendered <= rendered_before + 1);

        engine.unfreeze();
        assert!(!engine.is_frozen());
        engine.stop(None, true).await;
    }

    #[tokio::test]
    async fn excluded_zones_never_appear_in_submissions() {
        let (fm, engine) = engine_fixture(ZoneRenderMode::Animation);

        // Seed the LAMP zone with a known color.
        let mut seed = HashMap::new();
        seed.insert(ZoneId::Lamp, Color::from_rgb(9, 9, 9));
        fm.submit_zone_frame(Frame::zone(
            seed,
            FramePriority::Manual,
            FrameSource::Manual,
            None,
        ));
        fm.render_tick().await;

        engine
            .start(
                AnimationId::Snake,
                vec![ZoneId::Lamp],
                Some(quick_transition()),
                None,
                HashMap::new(),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        fm.render_tick().await;

        let frame = fm.channel_snapshot(18).unwrap();
        assert_eq!(frame[4].to_rgb(), [9, 9, 9]);
        assert_eq!(frame[5].to_rgb(), [9, 9, 9]);

        engine.stop(None, true).await;
    }

    #[tokio::test]
    async fn switch_replaces_the_running_animation() {
        let (_fm, engine) = engine_fixture(ZoneRenderMode::Animation);
        engine
            .start(
                AnimationId::Breathe,
                Vec::new(),
                Some(quick_transition()),
                None,
                HashMap::new(),
            )
            .await
            .unwrap();
        engine
            .start(
                AnimationId::Snake,
                Vec::new(),
                Some(quick_transition()),
                None,
                HashMap::new(),
            )
            .await
            .unwrap();

        assert_eq!(engine.current_animation().await, Some(AnimationId::Snake));
        engine.stop(None, true).await;
    }

    #[test]
    fn zone_buffers_overlay_pixels_on_zone_color() {
        let zones = vec![
            AnimationZone {
                id: ZoneId::Floor,
                pixel_count: 3,
            },
            AnimationZone {
                id: ZoneId::Lamp,
                pixel_count: 2,
            },
        ];
        let mut buffers = ZoneBuffers::new(&zones);
        let mut buf = MicroUpdateBuffer::new();
        buf.zone(ZoneId::Floor, [100, 0, 0]);
        buf.pixel(ZoneId::Floor, 1, [0, 100, 0]);
        buf.pixel(ZoneId::Floor, 99, [1, 1, 1]); // out of range: ignored
        buffers.apply(&buf);

        let payload = buffers.materialize();
        let floor = &payload[&ZoneId::Floor];
        assert_eq!(floor[0].to_rgb(), [100, 0, 0]);
        assert_eq!(floor[1].to_rgb(), [0, 100, 0]);
        assert_eq!(floor[2].to_rgb(), [100, 0, 0]);
        assert!(!payload.contains_key(&ZoneId::Lamp));

        buffers.clear();
        assert!(buffers.materialize().is_empty());
    }

    #[test]
    fn full_strip_updates_expand_to_every_animation_zone() {
        let zones = vec![
            AnimationZone {
                id: ZoneId::Floor,
                pixel_count: 2,
            },
            AnimationZone {
                id: ZoneId::Lamp,
                pixel_count: 1,
            },
        ];
        let mut buffers = ZoneBuffers::new(&zones);
        let mut buf = MicroUpdateBuffer::new();
        buf.full_strip([5, 6, 7]);
        buffers.apply(&buf);

        let payload = buffers.materialize();
        assert_eq!(payload[&ZoneId::Floor].len(), 2);
        assert_eq!(payload[&ZoneId::Lamp][0].to_rgb(), [5, 6, 7]);
    }
}
