use crate::engine::animation::ZonesSnapshotFn;
use crate::engine::frame_manager::FrameManager;
use crate::events::EventBus;
use crate::lifecycle::task_registry::{TaskCategory, TaskRegistry};
use crate::models::color::Color;
use crate::models::events::{Event, EventData, EventType};
use crate::models::frame::{Frame, FramePriority, FrameSource};
use crate::models::zone::ZoneId;
use log::{debug, info};
use std::collections::HashMap;
use std::f32::consts::{PI, TAU};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Pulse cycle length.
const PULSE_PERIOD: Duration = Duration::from_secs(1);
/// Refresh rate of the overlay while active.
const PULSE_INTERVAL: Duration = Duration::from_millis(50);
/// Pulse frames decay almost immediately once the indicator stops.
const PULSE_FRAME_TTL: Duration = Duration::from_millis(150);

struct IndicatorState {
    edit_mode: bool,
    selected: Option<ZoneId>,
    stop: Option<Arc<AtomicBool>>,
    task_id: Option<u64>,
}

/// Edit-mode overlay: pulses the currently selected zone with a sinusoidal
/// brightness envelope at PULSE priority. Purely a frame producer; it never
/// touches hardware and the frame manager blends it over whatever the
/// animation or static controller last rendered.
pub struct SelectedZoneIndicator {
    frame_manager: Arc<FrameManager>,
    registry: Arc<TaskRegistry>,
    zones_snapshot: ZonesSnapshotFn,
    state: Mutex<IndicatorState>,
}

impl SelectedZoneIndicator {
    pub fn new(
        frame_manager: Arc<FrameManager>,
        registry: Arc<TaskRegistry>,
        zones_snapshot: ZonesSnapshotFn,
    ) -> Arc<Self> {
        Arc::new(Self {
            frame_manager,
            registry,
            zones_snapshot,
            state: Mutex::new(IndicatorState {
                edit_mode: false,
                selected: None,
                stop: None,
                task_id: None,
            }),
        })
    }

    /// Subscribe to the events that drive the indicator.
    pub fn attach(self: &Arc<Self>, bus: &EventBus) {
        for event_type in [
            EventType::EditModeChanged,
            EventType::SelectedZoneChanged,
            EventType::ZoneRenderModeChanged,
        ] {
            let indicator = Arc::clone(self);
            bus.subscribe_sync(event_type, "selected-zone-indicator", 5, move |event| {
                indicator.handle_event(&event);
            });
        }
    }

    fn handle_event(self: &Arc<Self>, event: &Event) {
        match &event.data {
            EventData::EditModeChanged { enabled } => {
                let mut state = self.state.lock().unwrap();
                state.edit_mode = *enabled;
                self.reconcile(&mut state);
            }
            EventData::SelectedZoneChanged { zone } => {
                let mut state = self.state.lock().unwrap();
                state.selected = *zone;
                // Retarget by restarting the pulse on the new zone.
                self.stop_pulse(&mut state);
                self.reconcile(&mut state);
            }
            EventData::ZoneRenderModeChanged { .. } => {
                let mut state = self.state.lock().unwrap();
                self.reconcile(&mut state);
            }
            _ => {}
        }
    }

    fn reconcile(self: &Arc<Self>, state: &mut IndicatorState) {
        let should_run = state.edit_mode && state.selected.is_some();
        let running = state.stop.is_some();

        if should_run && !running {
            self.start_pulse(state);
        } else if !should_run && running {
            self.stop_pulse(state);
        }
    }

    fn start_pulse(self: &Arc<Self>, state: &mut IndicatorState) {
        let Some(zone) = state.selected else {
            return;
        };

        let stop = Arc::new(AtomicBool::new(false));
        let indicator = Arc::clone(self);
        let stop_flag = Arc::clone(&stop);

        let task = self.registry.create_tracked_task(
            TaskCategory::Background,
            &format!("zone pulse: {}", zone),
            async move {
                indicator.pulse_loop(zone, stop_flag).await;
                Ok(())
            },
        );

        info!("Zone indicator started for {}", zone);
        state.stop = Some(stop);
        state.task_id = Some(task.id);
    }

    fn stop_pulse(&self, state: &mut IndicatorState) {
        if let Some(stop) = state.stop.take() {
            stop.store(true, Ordering::SeqCst);
        }
        if let Some(task_id) = state.task_id.take() {
            self.registry.cancel(task_id);
            debug!("Zone indicator pulse task {} stopped", task_id);
        }
    }

    /// Stop the overlay; used on shutdown and when leaving edit mode.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        self.stop_pulse(&mut state);
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().unwrap().stop.is_some()
    }

    async fn pulse_loop(&self, zone: ZoneId, stop: Arc<AtomicBool>) {
        let started = Instant::now();

        while !stop.load(Ordering::SeqCst) {
            let base = (self.zones_snapshot)()
                .into_iter()
                .find(|z| z.config.id == zone)
                .map(|z| z.state.color.to_rgb())
                .unwrap_or([255, 255, 255]);

            let scale = Self::envelope(started.elapsed());
            let rgb = [
                (base[0] as f32 * scale) as u8,
                (base[1] as f32 * scale) as u8,
                (base[2] as f32 * scale) as u8,
            ];

            let mut zone_colors = HashMap::new();
            zone_colors.insert(zone, Color::from_rgb(rgb[0], rgb[1], rgb[2]));
            self.frame_manager.submit_zone_frame(Frame::zone(
                zone_colors,
                FramePriority::Pulse,
                FrameSource::Pulse,
                Some(PULSE_FRAME_TTL),
            ));

            tokio::time::sleep(PULSE_INTERVAL).await;
        }
    }

    /// Brightness envelope: dips to 10%, peaks at 100%, starting dim.
    fn envelope(elapsed: Duration) -> f32 {
        let t = (elapsed.as_secs_f32() / PULSE_PERIOD.as_secs_f32()).fract();
        0.1 + 0.9 * ((t * TAU - PI / 2.0).sin() + 1.0) / 2.0
    }
}
