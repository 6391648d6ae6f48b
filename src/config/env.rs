//! Environment variable handling

/// Environment overrides for the controller configuration.
#[derive(Debug, Default, Clone)]
pub struct EnvVars {
    pub config_dir: Option<String>,
    pub state_file: Option<String>,
    pub fps: Option<u32>,
    pub port: Option<u16>,
    pub interface: Option<String>,
    pub virtual_strips: Option<bool>,
}

/// Load configuration from environment variables.
pub fn load_env_vars() -> EnvVars {
    let mut env = EnvVars::default();

    if let Ok(value) = std::env::var("LED_CONFIG_DIR") {
        env.config_dir = Some(value);
    }

    if let Ok(value) = std::env::var("LED_STATE_FILE") {
        env.state_file = Some(value);
    }

    if let Ok(value) = std::env::var("LED_FPS") {
        if let Ok(fps) = value.parse() {
            env.fps = Some(fps);
        }
    }

    if let Ok(value) = std::env::var("LED_PORT") {
        if let Ok(port) = value.parse() {
            env.port = Some(port);
        }
    }

    if let Ok(value) = std::env::var("LED_INTERFACE") {
        env.interface = Some(value);
    }

    if let Ok(value) = std::env::var("LED_VIRTUAL") {
        env.virtual_strips = Some(value == "1" || value.eq_ignore_ascii_case("true"));
    }

    env
}
