//! Command-line argument parsing

/// Zoned LED Strip Controller
///
/// Drives zoned addressable LED strips with animations, a control panel
/// event bus and a web API.
#[derive(argh::FromArgs, Debug, Clone)]
pub struct CliArgs {
    #[argh(option, short = 'c', default = "String::from(\"config\")")]
    /// directory holding hardware.yaml, zones.yaml, parameters.yaml,
    /// animations.yaml and colors.yaml. Default: config
    pub config_dir: String,

    #[argh(option, short = 's')]
    /// path of the mutable state file. Default: <config-dir>/state.json
    pub state_file: Option<String>,

    #[argh(option, short = 'f', default = "60")]
    /// render loop rate in frames per second (1-240). Default: 60
    pub fps: u32,

    #[argh(option, short = 'p', default = "3000")]
    /// web API port. Default: 3000
    pub port: u16,

    #[argh(option, default = "String::from(\"0.0.0.0\")")]
    /// network interface to bind the web API to. Default: 0.0.0.0
    pub interface: String,

    #[argh(switch)]
    /// run on in-memory virtual strips instead of real hardware
    pub virtual_strips: bool,

    #[argh(switch)]
    /// read key presses from stdin and feed them to the event bus
    pub stdin_input: bool,
}

impl CliArgs {
    pub fn parse() -> Self {
        argh::from_env()
    }
}
