//! Rotary-wing flight dynamics: blade-element rotor aerodynamics, a governed
//! engine and drivetrain, a swashplate mixer and a 6-DOF rigid body, stepped
//! together at a fixed timestep.

pub mod aero;
pub mod config;
pub mod control;
pub mod math;
pub mod physics;
pub mod power;
pub mod sim;

pub use config::{AircraftConfig, ConfigError, ScenarioConfig};
pub use control::ControlInputs;
pub use power::FailureKind;
pub use sim::{Fleet, Helicopter, IntegrationMode, SimError, Simulator, TickOutput};
