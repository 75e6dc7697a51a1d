use crate::config::error::{require_non_negative, require_positive};
use crate::config::ConfigError;
use crate::math::RPM_TO_RAD_PER_SEC;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrivetrainConfig {
    /// Engine speed over main rotor speed.
    pub engine_to_main_ratio: f64,
    /// Tail rotor speed over main rotor speed.
    pub main_to_tail_ratio: f64,
    /// Bearing and gearbox drag referred to the main shaft: a constant part
    /// (N m) plus a part proportional to shaft speed (N m s/rad).
    pub coulomb_friction: f64,
    pub viscous_friction: f64,
}

impl Default for DrivetrainConfig {
    fn default() -> Self {
        Self {
            engine_to_main_ratio: 15.0,
            main_to_tail_ratio: 5.0,
            coulomb_friction: 200.0,
            viscous_friction: 3.0,
        }
    }
}

impl DrivetrainConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("drivetrain.engine_to_main_ratio", self.engine_to_main_ratio)?;
        require_positive("drivetrain.main_to_tail_ratio", self.main_to_tail_ratio)?;
        require_non_negative("drivetrain.coulomb_friction", self.coulomb_friction)?;
        require_non_negative("drivetrain.viscous_friction", self.viscous_friction)
    }

    /// Rotor inertia seen at the main shaft.
    pub fn effective_inertia(&self, main_inertia: f64, tail_inertia: f64, tail_connected: bool) -> f64 {
        if tail_connected {
            main_inertia + self.main_to_tail_ratio * self.main_to_tail_ratio * tail_inertia
        } else {
            main_inertia
        }
    }

    /// Aerodynamic load of both rotors referred to the main shaft.
    pub fn demanded_torque(&self, main_torque: f64, tail_torque: f64) -> f64 {
        main_torque + self.main_to_tail_ratio * tail_torque
    }

    pub fn tail_rpm(&self, main_rpm: f64) -> f64 {
        main_rpm * self.main_to_tail_ratio
    }

    /// Integrates main rotor speed one tick. Friction only ever slows the
    /// rotor and cannot reverse it; the result is never negative.
    pub fn advance_rpm(&self, main_rpm: f64, drive_torque: f64, load_torque: f64, inertia: f64, dt: f64) -> f64 {
        let omega = main_rpm.max(0.0) * RPM_TO_RAD_PER_SEC;
        let net = drive_torque - load_torque;
        if !net.is_finite() || !(inertia > 0.0) {
            return main_rpm.max(0.0);
        }

        let free = omega + net / inertia * dt;
        let friction = (self.coulomb_friction + self.viscous_friction * omega) / inertia * dt;
        let omega = (free - friction).max(0.0);
        omega / RPM_TO_RAD_PER_SEC
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tail_inertia_reflects_through_gear_ratio() {
        let drivetrain = DrivetrainConfig::default();
        assert_relative_eq!(drivetrain.effective_inertia(2400.0, 5.0, true), 2525.0);
        assert_relative_eq!(drivetrain.effective_inertia(2400.0, 5.0, false), 2400.0);
        assert_relative_eq!(drivetrain.demanded_torque(1000.0, 20.0), 1100.0);
    }

    #[test]
    fn friction_brings_free_rotor_to_rest() {
        let drivetrain = DrivetrainConfig::default();
        let mut rpm = 50.0;
        for _ in 0..10_000 {
            rpm = drivetrain.advance_rpm(rpm, 0.0, 0.0, 2500.0, 0.01);
        }
        assert_eq!(rpm, 0.0);
        assert_eq!(drivetrain.advance_rpm(0.0, 0.0, 0.0, 2500.0, 0.01), 0.0);
    }

    #[test]
    fn static_friction_holds_until_overcome() {
        let drivetrain = DrivetrainConfig::default();
        assert_eq!(drivetrain.advance_rpm(0.0, 150.0, 0.0, 2500.0, 0.01), 0.0);
        assert!(drivetrain.advance_rpm(0.0, 5000.0, 0.0, 2500.0, 0.01) > 0.0);
    }

    #[test]
    fn drive_torque_accelerates_rotor() {
        let drivetrain = DrivetrainConfig {
            coulomb_friction: 0.0,
            viscous_friction: 0.0,
            ..DrivetrainConfig::default()
        };
        let rpm = drivetrain.advance_rpm(300.0, 2500.0, 0.0, 2500.0, 1.0);
        assert_relative_eq!(rpm, 300.0 + 1.0 / RPM_TO_RAD_PER_SEC, epsilon = 1e-9);
    }
}
