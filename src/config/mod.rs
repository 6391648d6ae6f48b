//! Configuration module: CLI + environment merge, YAML document loading
//! and cross-document validation.

pub mod animations;
pub mod cli;
pub mod env;
pub mod hardware;
pub mod parameters;
pub mod presets;
pub mod zones;

pub use animations::AnimationsConfig;
pub use cli::CliArgs;
pub use env::{load_env_vars, EnvVars};
pub use hardware::HardwareConfig;
pub use parameters::ParametersConfig;
pub use presets::ColorPresets;
pub use zones::ZonesConfig;

use crate::error::{CoreError, CoreResult};
use crate::models::zone::ZoneConfig;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub hardware: HardwareConfig,
    pub zones: Vec<ZoneConfig>,
    pub parameters: ParametersConfig,
    pub animations: AnimationsConfig,
    pub presets: ColorPresets,
    pub state_file: PathBuf,
    pub fps: u32,
    pub port: u16,
    pub interface: String,
    pub virtual_strips: bool,
    pub stdin_input: bool,
}

/// Initialize configuration from all sources (CLI, environment, YAML).
pub fn init_config() -> CoreResult<AppConfig> {
    let cli = CliArgs::parse();
    let env = load_env_vars();
    build_config(cli, env)
}

pub fn build_config(cli: CliArgs, env: EnvVars) -> CoreResult<AppConfig> {
    let config_dir = PathBuf::from(env.config_dir.unwrap_or(cli.config_dir));

    let hardware = load_document(&config_dir, "hardware.yaml", HardwareConfig::from_yaml)
        .unwrap_or_else(|| Ok(HardwareConfig::builtin()))?;

    let zones_config = load_document(&config_dir, "zones.yaml", ZonesConfig::from_yaml)
        .unwrap_or_else(|| Ok(ZonesConfig::builtin()))?;
    let zones = zones_config.resolve(&hardware)?;

    let parameters = load_document(&config_dir, "parameters.yaml", ParametersConfig::from_yaml)
        .unwrap_or_else(|| Ok(ParametersConfig::builtin()))?;

    let animations = load_document(&config_dir, "animations.yaml", |raw| {
        AnimationsConfig::from_yaml(raw, &parameters)
    })
    .unwrap_or_else(|| {
        let builtin = AnimationsConfig::builtin();
        builtin.validate(&parameters).map(|_| builtin)
    })?;

    let presets = load_document(&config_dir, "colors.yaml", ColorPresets::from_yaml)
        .unwrap_or_else(|| Ok(ColorPresets::builtin()))?;

    let state_file = env
        .state_file
        .or(cli.state_file)
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir.join("state.json"));

    let fps = env.fps.unwrap_or(cli.fps);
    if !(1..=240).contains(&fps) {
        return Err(CoreError::ConfigInvalid(format!(
            "fps must be within 1-240, got {}",
            fps
        )));
    }

    Ok(AppConfig {
        hardware,
        zones,
        parameters,
        animations,
        presets,
        state_file,
        fps,
        port: env.port.unwrap_or(cli.port),
        interface: env.interface.unwrap_or(cli.interface),
        virtual_strips: env.virtual_strips.unwrap_or(cli.virtual_strips),
        stdin_input: cli.stdin_input,
    })
}

/// Read and parse one YAML document; `None` when the file does not exist so
/// the caller can fall back to the compiled-in defaults.
fn load_document<T>(
    dir: &Path,
    name: &str,
    parse: impl FnOnce(&str) -> CoreResult<T>,
) -> Option<CoreResult<T>> {
    let path = dir.join(name);
    match std::fs::read_to_string(&path) {
        Ok(raw) => {
            info!("Loaded {}", path.display());
            Some(parse(&raw))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("{} not found, using built-in defaults", path.display());
            None
        }
        Err(e) => Some(Err(CoreError::ConfigInvalid(format!(
            "failed to read {}: {}",
            path.display(),
            e
        )))),
    }
}
