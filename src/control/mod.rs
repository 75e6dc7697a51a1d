pub mod inputs;
pub mod mixer;
pub mod pid;
pub mod shaping;
pub mod stability;

pub use inputs::ControlInputs;
pub use mixer::{mix, BladePitch, MixerConfig, PitchCommands};
pub use pid::PidController;
pub use shaping::{CubicBezier, Dampen, VirtualThrottle};
pub use stability::{StabilityAssist, StabilityAssistConfig};
