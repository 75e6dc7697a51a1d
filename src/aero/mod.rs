pub mod airfoil;
pub mod atmosphere;
pub mod fuselage;
pub mod inflow;
pub mod rotor;

pub use airfoil::{Airfoil, AirfoilModel, CoefficientTable, SectionCoefficients};
pub use atmosphere::{Atmosphere, AtmosphereConfig, EnvironmentSample, GustConfig, WindFieldBounds};
pub use fuselage::{compute_dynamic_pressure, compute_fuselage_loads, AirData, FuselageConfig, FuselageLoads};
pub use inflow::{momentum_induced_velocity, GroundEffect};
pub use rotor::{BladeFlap, RotationSense, RotorGeometry, RotorKind, RotorLoads, RotorModel, RotorState};
