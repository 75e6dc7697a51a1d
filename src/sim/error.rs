use crate::config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid timestep {0}: must be finite and within (0, 0.1] s")]
    InvalidTimestep(f64),

    #[error("numerical fault in {0}, tick rejected")]
    NumericalFault(&'static str),

    #[error("invalid body state: {0}")]
    InvalidState(&'static str),

    #[error("operation requires {0} integration mode")]
    WrongIntegrationMode(&'static str),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to write telemetry: {0}")]
    Io(#[from] std::io::Error),
}
