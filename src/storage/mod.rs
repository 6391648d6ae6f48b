use crate::error::{CoreError, CoreResult};
use crate::models::state::PersistedState;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load/save of the mutable state file (state.json). Writes go through a
/// temp file + rename so a crash mid-save never corrupts the previous
/// state.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self { path: path.into() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state file. A missing file yields the default state; a
    /// corrupt one is retried once (the previous write may still have been
    /// in flight) before giving up.
    pub fn load(&self) -> CoreResult<PersistedState> {
        match self.try_load() {
            Ok(state) => Ok(state),
            Err(CoreError::ConfigInvalid(first)) => {
                warn!("State file unreadable ({}), retrying once", first);
                std::thread::sleep(std::time::Duration::from_millis(100));
                self.try_load()
            }
            Err(e) => Err(e),
        }
    }

    fn try_load(&self) -> CoreResult<PersistedState> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No state file at {}, starting fresh", self.path.display());
                return Ok(PersistedState::default());
            }
            Err(e) => {
                return Err(CoreError::ConfigInvalid(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&raw).map_err(|e| {
            CoreError::ConfigInvalid(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    pub fn save(&self, state: &PersistedState) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| CoreError::IllegalState(format!("state serialization failed: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CoreError::ConfigInvalid(format!(
                        "cannot create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| {
            error!("Failed to write state file: {}", e);
            CoreError::ConfigInvalid(format!("failed to write {}: {}", tmp.display(), e))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            CoreError::ConfigInvalid(format!("failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!("State saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::state::{ColorSpec, PersistedZone};
    use crate::models::color::{Color, ColorMode};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("led-zone-test-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn missing_file_loads_default_state() {
        let store = StateStore::new(temp_path("missing"));
        let state = store.load().unwrap();
        assert!(state.zones.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = temp_path("roundtrip");
        let store = StateStore::new(path.clone());

        let mut state = PersistedState::default();
        state.zones.insert(
            "lamp".into(),
            PersistedZone {
                color: ColorSpec::from_color(&Color::from_hue(42)),
                brightness: 77,
                is_on: true,
                render_mode: None,
                extra: Default::default(),
            },
        );
        state
            .extra
            .insert("written_by".into(), serde_json::json!("a future version"));

        store.save(&state).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.zones["lamp"].color.mode, ColorMode::Hue);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn corrupt_file_fails_with_config_invalid() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{not json").unwrap();
        let store = StateStore::new(path.clone());
        assert!(matches!(store.load(), Err(CoreError::ConfigInvalid(_))));
        let _ = std::fs::remove_file(path);
    }
}
