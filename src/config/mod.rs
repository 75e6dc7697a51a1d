pub mod aircraft;
pub mod error;
pub mod simulation;

pub use aircraft::AircraftConfig;
pub use error::ConfigError;
pub use simulation::{ControlKeyframe, EventAction, InitialConditions, ScenarioConfig, ScenarioEvent};
