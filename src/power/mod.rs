//! Engine, governor and rotor drivetrain.

pub mod drivetrain;
pub mod engine;

pub use drivetrain::DrivetrainConfig;
pub use engine::{step, EngineConfig, EngineMode, EngineState, EngineStep, FailureKind, TransitionStatus};
