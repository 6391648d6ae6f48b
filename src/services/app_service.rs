use crate::error::{CoreError, CoreResult};
use crate::events::EventBus;
use crate::models::color::Color;
use crate::models::events::{Event, EventData, EventOrigin};
use crate::models::parameter::ParamId;
use crate::models::state::PersistedApplication;
use crate::models::zone::ZoneId;
use crate::services::persistence::StateSaver;
use crate::services::zone_service::ZoneService;
use log::{info, warn};
use std::sync::{Arc, Mutex};

/// Runtime UI state: edit mode, zone selection, active parameter and the
/// lamp white quick mode.
#[derive(Debug, Clone)]
struct AppState {
    edit_mode_on: bool,
    lamp_white_mode_on: bool,
    selected_zone_index: usize,
    active_parameter: Option<ParamId>,
    lamp_white_saved_state: Option<serde_json::Value>,
}

/// Owns the application-level state the control panel flows through.
/// Every mutation emits a typed event and schedules a debounced save.
pub struct AppStateService {
    state: Mutex<AppState>,
    zones: Arc<ZoneService>,
    bus: Arc<EventBus>,
    saver: Arc<StateSaver>,
}

impl AppStateService {
    pub fn new(
        persisted: &PersistedApplication,
        zones: Arc<ZoneService>,
        bus: Arc<EventBus>,
        saver: Arc<StateSaver>,
    ) -> Arc<Self> {
        let active_parameter = persisted
            .active_parameter
            .as_deref()
            .and_then(ParamId::from_key);

        Arc::new(Self {
            state: Mutex::new(AppState {
                edit_mode_on: persisted.edit_mode_on,
                lamp_white_mode_on: persisted.lamp_white_mode_on,
                selected_zone_index: persisted.selected_zone_index,
                active_parameter,
                lamp_white_saved_state: persisted.lamp_white_saved_state.clone(),
            }),
            zones,
            bus,
            saver,
        })
    }

    fn persist(&self) {
        let snapshot = self.state.lock().unwrap().clone();
        self.saver.update(move |doc| {
            doc.application.edit_mode_on = snapshot.edit_mode_on;
            doc.application.lamp_white_mode_on = snapshot.lamp_white_mode_on;
            doc.application.selected_zone_index = snapshot.selected_zone_index;
            doc.application.active_parameter =
                snapshot.active_parameter.map(|p| p.as_key().to_string());
            doc.application.lamp_white_saved_state = snapshot.lamp_white_saved_state.clone();
        });
    }

    pub fn edit_mode(&self) -> bool {
        self.state.lock().unwrap().edit_mode_on
    }

    pub async fn set_edit_mode(&self, enabled: bool) {
        {
            let mut state = self.state.lock().unwrap();
            if state.edit_mode_on == enabled {
                return;
            }
            state.edit_mode_on = enabled;
            if !enabled {
                state.active_parameter = None;
            }
        }
        self.persist();
        info!("Edit mode {}", if enabled { "on" } else { "off" });

        self.bus
            .publish(Event::new(
                EventOrigin::Application,
                EventData::EditModeChanged { enabled },
            ))
            .await;

        // Entering edit mode re-announces the selection so the indicator
        // can latch onto it.
        if enabled {
            let selected = self.selected_zone();
            self.bus
                .publish(Event::new(
                    EventOrigin::Application,
                    EventData::SelectedZoneChanged { zone: selected },
                ))
                .await;
        }
    }

    pub fn selected_zone(&self) -> Option<ZoneId> {
        let order = self.zones.enabled_zone_ids();
        if order.is_empty() {
            return None;
        }
        let index = self.state.lock().unwrap().selected_zone_index % order.len();
        Some(order[index])
    }

    /// Step the zone selection by `delta`, wrapping through the enabled
    /// zones.
    pub async fn cycle_selected_zone(&self, delta: i32) -> CoreResult<ZoneId> {
        let order = self.zones.enabled_zone_ids();
        if order.is_empty() {
            return Err(CoreError::IllegalState("no enabled zones".into()));
        }

        let selected = {
            let mut state = self.state.lock().unwrap();
            let len = order.len() as i32;
            let current = (state.selected_zone_index % order.len()) as i32;
            let next = (current + delta).rem_euclid(len) as usize;
            state.selected_zone_index = next;
            order[next]
        };
        self.persist();

        self.bus
            .publish(Event::new(
                EventOrigin::Application,
                EventData::SelectedZoneChanged {
                    zone: Some(selected),
                },
            ))
            .await;
        Ok(selected)
    }

    pub fn active_parameter(&self) -> Option<ParamId> {
        self.state.lock().unwrap().active_parameter
    }

    /// Select which parameter the modulator encoder edits. Only meaningful
    /// in edit mode.
    pub async fn set_active_parameter(&self, param: Option<ParamId>) -> CoreResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            if param.is_some() && !state.edit_mode_on {
                return Err(CoreError::IllegalState(
                    "cannot select a parameter outside edit mode".into(),
                ));
            }
            state.active_parameter = param;
        }
        self.persist();
        Ok(())
    }

    pub fn lamp_white_mode(&self) -> bool {
        self.state.lock().unwrap().lamp_white_mode_on
    }

    /// Quick lamp white mode: force the LAMP zone to warm white, remember
    /// what it showed before, restore that on the way out.
    pub async fn toggle_lamp_white(&self) -> CoreResult<bool> {
        let turning_on = !self.lamp_white_mode();

        if turning_on {
            let lamp = self.zones.get(ZoneId::Lamp)?;
            let saved = serde_json::json!({
                "color": crate::models::state::ColorSpec::from_color(&lamp.state.color),
                "brightness": lamp.state.brightness,
            });

            let white = Color::from_preset("warm_white", self.zones.presets())
                .unwrap_or_else(|_| Color::white());
            self.zones.set_color(ZoneId::Lamp, white).await?;
            self.zones.set_brightness(ZoneId::Lamp, 100).await?;

            let mut state = self.state.lock().unwrap();
            state.lamp_white_saved_state = Some(saved);
            state.lamp_white_mode_on = true;
        } else {
            let saved = {
                let mut state = self.state.lock().unwrap();
                state.lamp_white_mode_on = false;
                state.lamp_white_saved_state.take()
            };

            if let Some(saved) = saved {
                let color = saved
                    .get("color")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<crate::models::state::ColorSpec>(v).ok())
                    .and_then(|spec| spec.resolve(self.zones.presets()).ok());
                let brightness = saved.get("brightness").and_then(|v| v.as_u64());

                match (color, brightness) {
                    (Some(color), Some(brightness)) => {
                        self.zones.set_color(ZoneId::Lamp, color).await?;
                        self.zones
                            .set_brightness(ZoneId::Lamp, brightness.min(100) as u8)
                            .await?;
                    }
                    _ => warn!("Saved lamp state unusable, leaving lamp as-is"),
                }
            }
        }

        self.persist();
        info!(
            "Lamp white mode {}",
            if turning_on { "on" } else { "off" }
        );
        Ok(turning_on)
    }
}
