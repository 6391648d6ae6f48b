use crate::config::presets::ColorPresets;
use crate::engine::animation::ZonesSnapshotFn;
use crate::error::{CoreError, CoreResult};
use crate::events::EventBus;
use crate::models::animation::AnimationId;
use crate::models::color::Color;
use crate::models::events::{Event, EventData, EventOrigin};
use crate::models::state::{ColorSpec, PersistedState, PersistedZone};
use crate::models::zone::{Zone, ZoneConfig, ZoneId, ZoneRenderMode, ZoneState};
use crate::services::persistence::StateSaver;
use log::{info, warn};
use std::sync::{Arc, Mutex};

/// Owns zone runtime state, validates every mutation, emits typed events
/// and keeps the persisted document in sync.
pub struct ZoneService {
    zones: Mutex<Vec<Zone>>,
    presets: ColorPresets,
    bus: Arc<EventBus>,
    saver: Arc<StateSaver>,
}

impl ZoneService {
    /// Assemble runtime zones from static config and the persisted state;
    /// missing or unusable persisted entries fall back to defaults.
    pub fn new(
        configs: Vec<ZoneConfig>,
        presets: ColorPresets,
        persisted: &PersistedState,
        bus: Arc<EventBus>,
        saver: Arc<StateSaver>,
    ) -> Arc<Self> {
        let zones = configs
            .into_iter()
            .map(|config| {
                let state = persisted
                    .zones
                    .get(config.id.as_key())
                    .map(|entry| Self::state_from_persisted(entry, &presets))
                    .unwrap_or_default();
                Zone { config, state }
            })
            .collect();

        Arc::new(Self {
            zones: Mutex::new(zones),
            presets,
            bus,
            saver,
        })
    }

    fn state_from_persisted(entry: &PersistedZone, presets: &ColorPresets) -> ZoneState {
        let color = match entry.color.resolve(presets) {
            Ok(color) => color,
            Err(e) => {
                warn!("Persisted zone color unusable ({}), using default", e);
                Color::from_hue(0)
            }
        };

        let brightness = if entry.brightness > 100 {
            warn!(
                "Persisted brightness {} out of range, clamping",
                entry.brightness
            );
            100
        } else {
            entry.brightness
        };

        ZoneState {
            render_mode: entry.render_mode.unwrap_or(ZoneRenderMode::Static),
            color,
            brightness,
            is_on: entry.is_on,
            animation: None,
        }
    }

    pub fn presets(&self) -> &ColorPresets {
        &self.presets
    }

    /// Snapshot of all zones in config order.
    pub fn snapshot(&self) -> Vec<Zone> {
        self.zones.lock().unwrap().clone()
    }

    /// Closure handed to the engine and indicator so they can read zones
    /// without owning the service.
    pub fn snapshot_fn(self: &Arc<Self>) -> ZonesSnapshotFn {
        let service = Arc::clone(self);
        Arc::new(move || service.snapshot())
    }

    pub fn get(&self, id: ZoneId) -> CoreResult<Zone> {
        self.zones
            .lock()
            .unwrap()
            .iter()
            .find(|z| z.config.id == id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("zone '{}' is not configured", id)))
    }

    /// Enabled zones, in config order; the selection cycle the control
    /// panel steps through.
    pub fn enabled_zone_ids(&self) -> Vec<ZoneId> {
        self.zones
            .lock()
            .unwrap()
            .iter()
            .filter(|z| z.config.enabled && z.config.pixel_count > 0)
            .map(|z| z.config.id)
            .collect()
    }

    fn mutate<T>(
        &self,
        id: ZoneId,
        f: impl FnOnce(&mut Zone) -> CoreResult<T>,
    ) -> CoreResult<(T, Zone)> {
        let mut zones = self.zones.lock().unwrap();
        let zone = zones
            .iter_mut()
            .find(|z| z.config.id == id)
            .ok_or_else(|| CoreError::NotFound(format!("zone '{}' is not configured", id)))?;

        if !zone.config.enabled {
            return Err(CoreError::InvalidArgument(format!(
                "zone '{}' is disabled",
                id
            )));
        }

        let result = f(zone)?;
        Ok((result, zone.clone()))
    }

    fn persist(&self, zone: &Zone) {
        let saver = Arc::clone(&self.saver);
        let key = zone.config.id.as_key().to_string();
        let color = ColorSpec::from_color(&zone.state.color);
        let brightness = zone.state.brightness;
        let is_on = zone.state.is_on;
        let render_mode = zone.state.render_mode;

        saver.update(move |doc| {
            let entry = doc.zones.entry(key).or_insert_with(|| PersistedZone {
                color: color.clone(),
                brightness,
                is_on,
                render_mode: Some(render_mode),
                extra: Default::default(),
            });
            entry.color = color.clone();
            entry.brightness = brightness;
            entry.is_on = is_on;
            entry.render_mode = Some(render_mode);
        });
    }

    pub async fn set_color(&self, id: ZoneId, color: Color) -> CoreResult<()> {
        let (_, zone) = self.mutate(id, |zone| {
            zone.state.color = color.clone();
            Ok(())
        })?;
        self.persist(&zone);

        self.bus
            .publish(Event::new(
                EventOrigin::ZoneService,
                EventData::ZoneStateChanged {
                    zone: id,
                    color_rgb: Some(zone.state.color.to_rgb()),
                    brightness: None,
                    is_on: None,
                    render_mode: None,
                },
            ))
            .await;
        Ok(())
    }

    /// Resolve and apply a serialized color (API surface).
    pub async fn set_color_spec(&self, id: ZoneId, spec: &ColorSpec) -> CoreResult<()> {
        let color = spec.resolve(&self.presets)?;
        self.set_color(id, color).await
    }

    pub async fn adjust_hue(&self, id: ZoneId, delta: i32) -> CoreResult<Color> {
        let (color, zone) = self.mutate(id, |zone| {
            zone.state.color = zone.state.color.adjust_hue(delta);
            Ok(zone.state.color.clone())
        })?;
        self.persist(&zone);

        self.bus
            .publish(Event::new(
                EventOrigin::ZoneService,
                EventData::ZoneStateChanged {
                    zone: id,
                    color_rgb: Some(color.to_rgb()),
                    brightness: None,
                    is_on: None,
                    render_mode: None,
                },
            ))
            .await;
        Ok(color)
    }

    pub async fn cycle_preset(&self, id: ZoneId, delta: i32) -> CoreResult<Color> {
        let presets = self.presets.clone();
        let (color, zone) = self.mutate(id, |zone| {
            zone.state.color = zone.state.color.next_preset(delta, &presets)?;
            Ok(zone.state.color.clone())
        })?;
        self.persist(&zone);

        self.bus
            .publish(Event::new(
                EventOrigin::ZoneService,
                EventData::ZoneStateChanged {
                    zone: id,
                    color_rgb: Some(color.to_rgb()),
                    brightness: None,
                    is_on: None,
                    render_mode: None,
                },
            ))
            .await;
        Ok(color)
    }

    pub async fn set_brightness(&self, id: ZoneId, brightness: u8) -> CoreResult<()> {
        if brightness > 100 {
            return Err(CoreError::InvalidArgument(format!(
                "brightness {} exceeds 100",
                brightness
            )));
        }

        let (_, zone) = self.mutate(id, |zone| {
            zone.state.brightness = brightness;
            Ok(())
        })?;
        self.persist(&zone);

        self.bus
            .publish(Event::new(
                EventOrigin::ZoneService,
                EventData::ZoneStateChanged {
                    zone: id,
                    color_rgb: None,
                    brightness: Some(brightness),
                    is_on: None,
                    render_mode: None,
                },
            ))
            .await;
        Ok(())
    }

    pub async fn set_render_mode(&self, id: ZoneId, mode: ZoneRenderMode) -> CoreResult<()> {
        let (old, zone) = self.mutate(id, |zone| {
            let old = zone.state.render_mode;
            zone.state.render_mode = mode;
            Ok(old)
        })?;

        if old == mode {
            return Ok(());
        }
        self.persist(&zone);
        info!("Zone {} render mode: {:?} -> {:?}", id, old, mode);

        self.bus
            .publish(Event::new(
                EventOrigin::ZoneService,
                EventData::ZoneRenderModeChanged {
                    zone: id,
                    old,
                    new: mode,
                },
            ))
            .await;
        Ok(())
    }

    pub async fn set_power(&self, id: ZoneId, is_on: bool) -> CoreResult<()> {
        let (_, zone) = self.mutate(id, |zone| {
            zone.state.is_on = is_on;
            Ok(())
        })?;
        self.persist(&zone);

        self.bus
            .publish(Event::new(
                EventOrigin::ZoneService,
                EventData::ZoneStateChanged {
                    zone: id,
                    color_rgb: None,
                    brightness: None,
                    is_on: Some(is_on),
                    render_mode: None,
                },
            ))
            .await;
        Ok(())
    }

    pub async fn set_animation(&self, id: ZoneId, animation: Option<AnimationId>) -> CoreResult<()> {
        let (_, _zone) = self.mutate(id, |zone| {
            zone.state.animation = animation;
            Ok(())
        })?;

        self.bus
            .publish(Event::new(
                EventOrigin::ZoneService,
                EventData::ZoneAnimationChanged {
                    zone: id,
                    animation,
                },
            ))
            .await;
        Ok(())
    }
}
