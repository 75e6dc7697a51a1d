pub mod ground;
pub mod integrator;
pub mod rigid_body;

pub use ground::{Contact, GroundContact};
pub use integrator::{sanitize_loads, Integrator, LoadLimits, RungeKutta4, SanitizedLoads};
pub use rigid_body::{accumulate_loads, AircraftState, MassProperties, StateDerivative};
