use thiserror::Error;

/// Error kinds the core distinguishes between. Startup errors abort the
/// process (exit code 1), transients are logged and retried on the next
/// tick, everything else is surfaced to the caller.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("hardware transient failure: {0}")]
    HardwareTransient(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("cancelled")]
    Cancelled,

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl CoreError {
    /// Short kind tag used by the API layer and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::ConfigInvalid(_) => "config_invalid",
            CoreError::HardwareUnavailable(_) => "hardware_unavailable",
            CoreError::HardwareTransient(_) => "hardware_transient",
            CoreError::InvalidArgument(_) => "invalid_argument",
            CoreError::NotFound(_) => "not_found",
            CoreError::IllegalState(_) => "illegal_state",
            CoreError::Cancelled => "cancelled",
            CoreError::Timeout(_) => "timeout",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
