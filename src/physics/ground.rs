use crate::config::error::{require_in_range, require_non_negative, require_positive};
use crate::config::ConfigError;
use crate::math::{Quat, Vec3};
use crate::physics::AircraftState;
use serde::{Deserialize, Serialize};

/// Skid-type landing gear on flat ground.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundContact {
    /// Height of the centre of gravity above the ground when resting on the gear.
    pub gear_height: f64,
    /// Horizontal velocity decay rate while in contact (1/s).
    pub friction: f64,
    /// Yaw rate decay rate while in contact (1/s).
    pub angular_friction: f64,
    /// Touchdown sink rate above which a contact counts as hard (m/s).
    pub hard_contact_speed: f64,
    /// Bank or pitch at touchdown above which a contact counts as hard (rad).
    pub hard_contact_tilt: f64,
}

/// Outcome of one contact resolution.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Contact {
    pub in_contact: bool,
    /// Sink rate removed by the gear (m/s).
    pub impact_speed: f64,
    /// Largest of bank and pitch levelled out by the gear (rad).
    pub tilt: f64,
    /// Beyond what the gear can absorb; the aircraft was snapped anyway.
    pub hard: bool,
}

impl Default for GroundContact {
    fn default() -> Self {
        Self {
            gear_height: 1.0,
            friction: 2.0,
            angular_friction: 4.0,
            hard_contact_speed: 3.0,
            hard_contact_tilt: 0.35,
        }
    }
}

impl GroundContact {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_negative("ground.gear_height", self.gear_height)?;
        require_in_range("ground.friction", self.friction, 0.0, 100.0)?;
        require_in_range("ground.angular_friction", self.angular_friction, 0.0, 100.0)?;
        require_positive("ground.hard_contact_speed", self.hard_contact_speed)?;
        require_in_range("ground.hard_contact_tilt", self.hard_contact_tilt, 0.0, std::f64::consts::PI)
    }

    pub fn rest_altitude(&self, ground_elevation: f64) -> f64 {
        ground_elevation + self.gear_height
    }

    /// Resolves penetration of the ground plane. While in contact the gear
    /// keeps the airframe level, takes out descending velocity and bleeds off
    /// sliding and yawing.
    pub fn resolve(&self, state: &mut AircraftState, ground_elevation: f64, dt: f64) -> Contact {
        let rest = self.rest_altitude(ground_elevation);
        if state.altitude() > rest {
            return Contact::default();
        }

        let impact_speed = state.velocity.z.max(0.0);
        state.position.z = -rest;
        state.velocity.z = state.velocity.z.min(0.0);

        let slide = (-self.friction * dt).exp();
        state.velocity.x *= slide;
        state.velocity.y *= slide;

        let (roll, pitch, yaw) = state.orientation.to_euler();
        let tilt = roll.abs().max(pitch.abs());
        state.orientation = Quat::from_euler(0.0, 0.0, yaw);
        state.angular_velocity = Vec3::new(0.0, 0.0, state.angular_velocity.z * (-self.angular_friction * dt).exp());

        Contact {
            in_contact: true,
            impact_speed,
            tilt,
            hard: impact_speed > self.hard_contact_speed || tilt > self.hard_contact_tilt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn penetration_is_pushed_back_to_rest_height() {
        let gear = GroundContact::default();
        let mut state = AircraftState::at_altitude(0.2);
        state.velocity = Vec3::new(3.0, 0.0, 4.0);
        state.orientation = Quat::from_euler(0.1, -0.05, 1.0);

        let contact = gear.resolve(&mut state, 0.0, 0.01);
        assert!(contact.in_contact);
        assert_relative_eq!(contact.impact_speed, 4.0);
        assert!(contact.hard);
        assert_relative_eq!(state.altitude(), gear.gear_height);
        assert_eq!(state.velocity.z, 0.0);
        assert!(state.velocity.x < 3.0 && state.velocity.x > 0.0);

        let (roll, pitch, yaw) = state.orientation.to_euler();
        assert_relative_eq!(roll, 0.0, epsilon = 1e-12);
        assert_relative_eq!(pitch, 0.0, epsilon = 1e-12);
        assert_relative_eq!(yaw, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn climbing_away_is_not_contact() {
        let gear = GroundContact::default();
        let mut state = AircraftState::at_altitude(5.0);
        assert_eq!(gear.resolve(&mut state, 0.0, 0.01), Contact::default());
        assert_relative_eq!(state.altitude(), 5.0);
    }

    #[test]
    fn gentle_touchdown_is_soft_but_rollover_is_hard() {
        let gear = GroundContact::default();
        let mut state = AircraftState::at_altitude(0.95);
        state.velocity = Vec3::new(0.0, 0.0, 0.5);
        let soft = gear.resolve(&mut state, 0.0, 0.01);
        assert!(soft.in_contact && !soft.hard);

        let mut state = AircraftState::at_altitude(0.95);
        state.orientation = Quat::from_euler(2.5, 0.0, 0.3);
        let rolled = gear.resolve(&mut state, 0.0, 0.01);
        assert!(rolled.hard);
        assert_relative_eq!(rolled.tilt, 2.5, epsilon = 1e-9);
    }
}
