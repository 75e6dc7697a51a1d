use crate::aero::RotorGeometry;
use crate::config::error::{require_in_range, require_non_negative};
use crate::config::ConfigError;
use crate::control::ControlInputs;
use crate::math::lerp;
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Maps (cyclic pitch, cyclic roll) to (cosine, sine) cyclic pitch in
    /// radians, rows first.
    pub swashplate: [[f64; 2]; 2],
    /// Tail collective per unit pedal (rad).
    pub pedal_gain: f64,
    /// Tail collective per newton-metre of main rotor torque (rad/N m).
    pub torque_feed_forward: f64,
    /// Lateral cyclic per newton-metre of main rotor torque (rad/N m). Offsets
    /// the roll moment of a tail rotor mounted above the centre of gravity.
    pub roll_trim: f64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            roll_trim: 1.6e-7,
            ..Self::with_phase(0.14, 0.0, 0.2, 1.8e-5)
        }
    }
}

impl MixerConfig {
    /// Swashplate with equal longitudinal and lateral authority rotated by
    /// `phase` (rad) in the direction of rotation.
    pub fn with_phase(cyclic_gain: f64, phase: f64, pedal_gain: f64, torque_feed_forward: f64) -> Self {
        let (s, c) = phase.sin_cos();
        Self {
            swashplate: [[cyclic_gain * c, cyclic_gain * s], [cyclic_gain * s, -cyclic_gain * c]],
            pedal_gain,
            torque_feed_forward,
            roll_trim: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.swashplate.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid("mixer.swashplate", "must be finite"));
        }
        require_in_range("mixer.pedal_gain", self.pedal_gain, 0.0, 1.0)?;
        require_non_negative("mixer.torque_feed_forward", self.torque_feed_forward)?;
        require_in_range("mixer.roll_trim", self.roll_trim, -1e-4, 1e-4)
    }

    fn swashplate_matrix(&self) -> Matrix2<f64> {
        let m = &self.swashplate;
        Matrix2::new(m[0][0], m[0][1], m[1][0], m[1][1])
    }
}

/// Blade pitch for one rotor (rad).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BladePitch {
    pub collective: f64,
    pub cyclic_longitudinal: f64,
    pub cyclic_lateral: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchCommands {
    pub main: BladePitch,
    pub tail: BladePitch,
}

/// Pilot inputs to blade pitch. Pure: the same inputs always give the same
/// commands.
pub fn mix(
    config: &MixerConfig,
    main: &RotorGeometry,
    tail: &RotorGeometry,
    controls: &ControlInputs,
    main_rotor_torque: f64,
) -> PitchCommands {
    let controls = controls.clamped();

    let collective = lerp(main.collective_min, main.collective_max, controls.collective);
    let torque = if main_rotor_torque.is_finite() { main_rotor_torque } else { 0.0 };

    let stick = Vector2::new(controls.cyclic_pitch, controls.cyclic_roll);
    let trim = Vector2::new(0.0, config.roll_trim * torque);
    let cyclic = limit_tilt(config.swashplate_matrix() * stick + trim, main.cyclic_max);

    let tail_collective = -config.pedal_gain * controls.pedal + config.torque_feed_forward * torque;

    PitchCommands {
        main: BladePitch {
            collective,
            cyclic_longitudinal: cyclic[0],
            cyclic_lateral: cyclic[1],
        },
        tail: BladePitch {
            collective: tail_collective.clamp(tail.collective_min, tail.collective_max),
            cyclic_longitudinal: 0.0,
            cyclic_lateral: 0.0,
        },
    }
}

/// Limits the swashplate tilt, the magnitude of the cyclic vector, to
/// `cyclic_max`, keeping its direction.
fn limit_tilt(cyclic: Vector2<f64>, cyclic_max: f64) -> Vector2<f64> {
    if !cyclic.iter().all(|v| v.is_finite()) {
        return Vector2::zeros();
    }
    let tilt = cyclic.norm();
    if tilt > cyclic_max {
        cyclic * (cyclic_max / tilt)
    } else {
        cyclic
    }
}
