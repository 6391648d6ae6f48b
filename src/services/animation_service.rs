use crate::config::animations::AnimationsConfig;
use crate::config::parameters::ParametersConfig;
use crate::engine::animation::AnimationEngine;
use crate::engine::transition::TransitionConfig;
use crate::error::{CoreError, CoreResult};
use crate::events::EventBus;
use crate::models::animation::{AnimationConfig, AnimationId, AnimationState};
use crate::models::events::{Event, EventData, EventOrigin};
use crate::models::parameter::{ParamId, ParamValue, ParameterCombined, ParameterState};
use crate::models::state::PersistedAnimation;
use crate::services::persistence::StateSaver;
use log::{info, warn};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Validates animation selections and parameter mutations against the
/// registry, drives the engine, and persists the current animation state.
pub struct AnimationService {
    animations: AnimationsConfig,
    parameters: ParametersConfig,
    engine: OnceCell<Arc<AnimationEngine>>,
    current: Mutex<Option<AnimationState>>,
    bus: Arc<EventBus>,
    saver: Arc<StateSaver>,
}

impl AnimationService {
    pub fn new(
        animations: AnimationsConfig,
        parameters: ParametersConfig,
        persisted: Option<&PersistedAnimation>,
        bus: Arc<EventBus>,
        saver: Arc<StateSaver>,
    ) -> Arc<Self> {
        let service = Self {
            animations,
            parameters,
            engine: OnceCell::new(),
            current: Mutex::new(None),
            bus,
            saver,
        };

        if let Some(persisted) = persisted {
            match service.restore_state(persisted) {
                Ok(state) => *service.current.lock().unwrap() = Some(state),
                Err(e) => warn!("Persisted animation unusable ({}), ignoring", e),
            }
        }

        Arc::new(service)
    }

    /// The engine is constructed after the service (it needs the zone
    /// snapshot closure), so it is wired in here.
    pub fn set_engine(&self, engine: Arc<AnimationEngine>) {
        let _ = self.engine.set(engine);
    }

    fn engine(&self) -> CoreResult<&Arc<AnimationEngine>> {
        self.engine
            .get()
            .ok_or_else(|| CoreError::IllegalState("animation engine not wired".into()))
    }

    fn restore_state(&self, persisted: &PersistedAnimation) -> CoreResult<AnimationState> {
        let config = self
            .animations
            .get(persisted.id)
            .ok_or_else(|| CoreError::NotFound(format!("animation {}", persisted.id)))?;

        let mut state = AnimationState::new(persisted.id);
        for param in &config.parameters {
            let default = self
                .parameters
                .get(*param)
                .map(|p| p.default)
                .unwrap_or(ParamValue::Number(0));
            let value = persisted
                .parameters
                .get(param.as_key())
                .copied()
                .unwrap_or(default);
            state.parameters.insert(*param, value);
        }
        Ok(state)
    }

    pub fn list(&self) -> Vec<AnimationConfig> {
        self.animations.animations.clone()
    }

    pub fn current_state(&self) -> Option<AnimationState> {
        self.current.lock().unwrap().clone()
    }

    pub async fn is_running(&self) -> bool {
        match self.engine.get() {
            Some(engine) => engine.is_running().await,
            None => false,
        }
    }

    /// Resolve the effective parameter set for a start request: explicit
    /// overrides, then the persisted values for the same animation, then
    /// config defaults. Overrides are validated before anything runs.
    fn resolve_parameters(
        &self,
        config: &AnimationConfig,
        overrides: &HashMap<ParamId, ParamValue>,
    ) -> CoreResult<HashMap<ParamId, ParamValue>> {
        for param in overrides.keys() {
            if !config.parameters.contains(param) {
                return Err(CoreError::InvalidArgument(format!(
                    "animation {} does not take parameter {}",
                    config.id,
                    param.as_key()
                )));
            }
        }

        let previous = self.current.lock().unwrap().clone();
        let mut resolved = HashMap::new();
        for param in &config.parameters {
            let param_config = self.parameters.get(*param).ok_or_else(|| {
                CoreError::ConfigInvalid(format!("parameter {} undeclared", param.as_key()))
            })?;

            let value = overrides
                .get(param)
                .copied()
                .or_else(|| {
                    previous
                        .as_ref()
                        .filter(|s| s.id == config.id)
                        .and_then(|s| s.value(*param))
                })
                .unwrap_or(param_config.default);

            let mut probe = ParameterState { value };
            ParameterCombined::new(param_config, &mut probe).validate(&value)?;
            resolved.insert(*param, value);
        }
        Ok(resolved)
    }

    /// Start (or switch to) an animation.
    pub async fn start(
        &self,
        id: AnimationId,
        overrides: HashMap<ParamId, ParamValue>,
    ) -> CoreResult<()> {
        let config = self
            .animations
            .get(id)
            .ok_or_else(|| CoreError::NotFound(format!("animation {}", id)))?
            .clone();

        let parameters = self.resolve_parameters(&config, &overrides)?;
        self.engine()?
            .start(id, Vec::new(), None, None, parameters.clone())
            .await?;

        let mut state = AnimationState::new(id);
        state.parameters = parameters.clone();
        *self.current.lock().unwrap() = Some(state);
        self.persist();
        info!("Animation started: {}", id);

        self.bus
            .publish(Event::new(
                EventOrigin::AnimationEngine,
                EventData::AnimationStarted {
                    animation: id,
                    parameters,
                },
            ))
            .await;
        Ok(())
    }

    /// Stop the running animation with a fade out. The current parameter
    /// values stay persisted so the next start resumes them.
    pub async fn stop(&self) -> CoreResult<()> {
        let stopped = self.current.lock().unwrap().as_ref().map(|s| s.id);
        let Some(id) = stopped else {
            return Ok(());
        };

        self.engine()?
            .stop(Some(TransitionConfig::ANIMATION_SWITCH), false)
            .await;
        info!("Animation stopped: {}", id);

        self.bus
            .publish(Event::new(
                EventOrigin::AnimationEngine,
                EventData::AnimationStopped { animation: id },
            ))
            .await;
        Ok(())
    }

    /// Set one parameter of the running animation to an explicit value.
    pub async fn set_parameter(&self, param: ParamId, value: ParamValue) -> CoreResult<ParamValue> {
        self.apply_parameter(param, |combined| combined.set(value))
            .await
    }

    /// Move one parameter by `delta` encoder steps.
    pub async fn adjust_parameter(&self, param: ParamId, delta: i64) -> CoreResult<ParamValue> {
        self.apply_parameter(param, |combined| Ok(combined.adjust(delta)))
            .await
    }

    async fn apply_parameter(
        &self,
        param: ParamId,
        f: impl FnOnce(&mut ParameterCombined<'_>) -> CoreResult<ParamValue>,
    ) -> CoreResult<ParamValue> {
        let param_config = self
            .parameters
            .get(param)
            .ok_or_else(|| CoreError::NotFound(format!("parameter {}", param.as_key())))?;

        let (id, value) = {
            let mut current = self.current.lock().unwrap();
            let state = current.as_mut().ok_or_else(|| {
                CoreError::IllegalState("no animation selected".into())
            })?;

            if !state.parameters.contains_key(&param) {
                return Err(CoreError::InvalidArgument(format!(
                    "animation {} does not take parameter {}",
                    state.id,
                    param.as_key()
                )));
            }

            let mut probe = ParameterState {
                value: state.parameters[&param],
            };
            let mut combined = ParameterCombined::new(param_config, &mut probe);
            let value = f(&mut combined)?;
            state.parameters.insert(param, value);
            (state.id, value)
        };

        if let Some(engine) = self.engine.get() {
            engine.update_parameter(param, value).await;
        }
        self.persist();

        self.bus
            .publish(Event::new(
                EventOrigin::AnimationEngine,
                EventData::AnimationParameterChanged {
                    animation: id,
                    param,
                    value,
                },
            ))
            .await;
        Ok(value)
    }

    fn persist(&self) {
        let Some(state) = self.current.lock().unwrap().clone() else {
            return;
        };
        self.saver.update(move |doc| {
            let parameters = state
                .parameters
                .iter()
                .map(|(k, v)| (k.as_key().to_string(), *v))
                .collect();
            match &mut doc.current_animation {
                Some(entry) => {
                    entry.id = state.id;
                    entry.parameters = parameters;
                }
                None => {
                    doc.current_animation = Some(PersistedAnimation {
                        id: state.id,
                        parameters,
                        extra: Default::default(),
                    });
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::state::PersistedState;
    use crate::storage::StateStore;
    use std::collections::BTreeMap;

    fn service_without_engine() -> Arc<AnimationService> {
        let store = StateStore::new(std::env::temp_dir().join(format!(
            "led-anim-service-{}.json",
            std::process::id()
        )));
        let saver = StateSaver::new(store, PersistedState::default());
        AnimationService::new(
            AnimationsConfig::builtin(),
            ParametersConfig::builtin(),
            None,
            EventBus::new(),
            saver,
        )
    }

    #[tokio::test]
    async fn parameter_mutation_without_animation_is_illegal_state() {
        let service = service_without_engine();
        assert!(matches!(
            service.adjust_parameter(ParamId::Speed, 1).await,
            Err(CoreError::IllegalState(_))
        ));
    }

    #[tokio::test]
    async fn restore_merges_persisted_values_with_defaults() {
        let mut parameters = BTreeMap::new();
        parameters.insert("SPEED".to_string(), ParamValue::Number(90));
        let persisted = PersistedAnimation {
            id: AnimationId::Breathe,
            parameters,
            extra: Default::default(),
        };

        let store = StateStore::new(std::env::temp_dir().join(format!(
            "led-anim-restore-{}.json",
            std::process::id()
        )));
        let saver = StateSaver::new(store, PersistedState::default());
        let service = AnimationService::new(
            AnimationsConfig::builtin(),
            ParametersConfig::builtin(),
            Some(&persisted),
            EventBus::new(),
            saver,
        );

        let state = service.current_state().unwrap();
        assert_eq!(state.id, AnimationId::Breathe);
        assert_eq!(state.value(ParamId::Speed), Some(ParamValue::Number(90)));
        // INTENSITY was not persisted: config default applies.
        assert_eq!(
            state.value(ParamId::Intensity),
            Some(ParamValue::Number(80))
        );
    }

    #[tokio::test]
    async fn start_rejects_undeclared_override() {
        let service = service_without_engine();
        let mut overrides = HashMap::new();
        overrides.insert(ParamId::Length, ParamValue::Number(5));
        // BREATHE takes SPEED/INTENSITY/HUE, not LENGTH.
        assert!(matches!(
            service.start(AnimationId::Breathe, overrides).await,
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn start_rejects_out_of_range_override() {
        let service = service_without_engine();
        let mut overrides = HashMap::new();
        overrides.insert(ParamId::Speed, ParamValue::Number(500));
        assert!(matches!(
            service.start(AnimationId::Breathe, overrides).await,
            Err(CoreError::InvalidArgument(_))
        ));
    }
}
