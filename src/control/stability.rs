use crate::config::error::require_in_range;
use crate::config::ConfigError;
use crate::control::{ControlInputs, PidController};
use crate::math::wrap_pi;
use crate::physics::AircraftState;
use serde::{Deserialize, Serialize};

/// Gains for host-side attitude and heading hold, in stick units per radian
/// and per rad/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityAssistConfig {
    pub attitude_gain: f64,
    pub rate_gain: f64,
    pub heading_gain: f64,
    pub heading_integral_gain: f64,
    pub yaw_rate_gain: f64,
    /// Stick travel the assist may add on each axis.
    pub authority: f64,
}

impl Default for StabilityAssistConfig {
    fn default() -> Self {
        Self {
            attitude_gain: 0.5,
            rate_gain: 0.2,
            heading_gain: 0.5,
            heading_integral_gain: 0.2,
            yaw_rate_gain: 0.5,
            authority: 0.6,
        }
    }
}

impl StabilityAssistConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_in_range("stability_assist.attitude_gain", self.attitude_gain, 0.0, 10.0)?;
        require_in_range("stability_assist.rate_gain", self.rate_gain, 0.0, 10.0)?;
        require_in_range("stability_assist.heading_gain", self.heading_gain, 0.0, 10.0)?;
        require_in_range(
            "stability_assist.heading_integral_gain",
            self.heading_integral_gain,
            0.0,
            10.0,
        )?;
        require_in_range("stability_assist.yaw_rate_gain", self.yaw_rate_gain, 0.0, 10.0)?;
        require_in_range("stability_assist.authority", self.authority, 0.0, 1.0)
    }
}

/// Holds wings level, nose level and the heading captured on the first
/// update by adding cyclic and pedal on top of the pilot's inputs. Rates are
/// fed back directly rather than differentiated.
#[derive(Debug, Clone)]
pub struct StabilityAssist {
    config: StabilityAssistConfig,
    roll: PidController,
    pitch: PidController,
    heading: PidController,
    target_heading: Option<f64>,
}

impl StabilityAssist {
    pub fn new(config: StabilityAssistConfig) -> Self {
        let limit = config.authority;
        Self {
            config,
            roll: PidController::new(config.attitude_gain, 0.0, 0.0).with_limits(0.0, limit),
            pitch: PidController::new(config.attitude_gain, 0.0, 0.0).with_limits(0.0, limit),
            heading: PidController::new(config.heading_gain, config.heading_integral_gain, 0.0).with_limits(1.0, limit),
            target_heading: None,
        }
    }

    pub fn target_heading(&self) -> Option<f64> {
        self.target_heading
    }

    pub fn apply(&mut self, pilot: ControlInputs, body: &AircraftState, dt: f64) -> ControlInputs {
        let (roll, pitch, yaw) = body.orientation.to_euler();
        let rates = body.angular_velocity;
        let target_heading = *self.target_heading.get_or_insert(yaw);

        // Right stick rolls right and forward stick pitches nose down.
        let roll_cmd = self.roll.update_with_feed_forward(-roll, -self.config.rate_gain * rates.x, dt);
        let pitch_cmd = self.pitch.update_with_feed_forward(pitch, self.config.rate_gain * rates.y, dt);
        let pedal_cmd = self.heading.update_with_feed_forward(
            wrap_pi(target_heading - yaw),
            -self.config.yaw_rate_gain * rates.z,
            dt,
        );

        ControlInputs::new(
            pilot.collective,
            pilot.cyclic_pitch + pitch_cmd,
            pilot.cyclic_roll + roll_cmd,
            pilot.pedal + pedal_cmd,
            pilot.throttle,
        )
    }

    pub fn reset(&mut self) {
        self.roll.reset();
        self.pitch.reset();
        self.heading.reset();
        self.target_heading = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quat, Vec3};

    fn pilot() -> ControlInputs {
        ControlInputs::new(0.4, 0.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn level_body_gets_pilot_inputs() {
        let mut assist = StabilityAssist::new(StabilityAssistConfig::default());
        let body = AircraftState::at_altitude(50.0);
        let out = assist.apply(pilot(), &body, 0.01);
        assert_eq!(out, pilot());
        assert_eq!(assist.target_heading(), Some(0.0));
    }

    #[test]
    fn opposes_bank_and_pitch() {
        let mut assist = StabilityAssist::new(StabilityAssistConfig::default());
        let mut body = AircraftState::at_altitude(50.0);
        body.orientation = Quat::from_euler(0.2, 0.1, 0.0);
        body.angular_velocity = Vec3::new(0.3, 0.2, 0.0);
        let out = assist.apply(pilot(), &body, 0.01);
        assert!(out.cyclic_roll < 0.0, "banked right, stick {}", out.cyclic_roll);
        assert!(out.cyclic_pitch > 0.0, "nose up, stick {}", out.cyclic_pitch);
        assert!(out.cyclic_roll.abs() <= 0.6 + 1e-12);
    }

    #[test]
    fn holds_captured_heading() {
        let mut assist = StabilityAssist::new(StabilityAssistConfig::default());
        let mut body = AircraftState::at_altitude(50.0);
        body.orientation = Quat::from_euler(0.0, 0.0, 1.0);
        assist.apply(pilot(), &body, 0.01);

        body.orientation = Quat::from_euler(0.0, 0.0, 1.2);
        let out = assist.apply(pilot(), &body, 0.01);
        assert!(out.pedal < 0.0, "nose right of target, pedal {}", out.pedal);

        assist.reset();
        assert_eq!(assist.target_heading(), None);
    }
}
