pub mod aircraft;
pub mod error;
pub mod fleet;
pub mod simulator;
pub mod telemetry;

pub use aircraft::{Diagnostics, Helicopter, IntegrationMode, PublicState, SimState, Snapshot, TickOutput};
pub use error::SimError;
pub use fleet::Fleet;
pub use simulator::Simulator;
pub use telemetry::FlightTelemetry;
