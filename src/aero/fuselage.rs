use crate::config::error::{require_non_negative, require_positive};
use crate::config::ConfigError;
use crate::math::{inverse_lerp, lerp, Vec3};
use serde::{Deserialize, Serialize};

/// Airflow over the airframe in body axes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AirData {
    pub velocity_mag: f64,
    pub dynamic_pressure: f64,
    /// Fuselage angle of attack (rad).
    pub alpha: f64,
    /// Sideslip (rad), positive with the relative wind from the right.
    pub beta: f64,
}

impl AirData {
    pub fn from_body_velocity(velocity_body: &Vec3, density: f64) -> Self {
        let velocity_mag = velocity_body.magnitude();
        if velocity_mag < 1e-6 {
            return Self::default();
        }

        Self {
            velocity_mag,
            dynamic_pressure: compute_dynamic_pressure(density, velocity_mag),
            alpha: velocity_body.z.atan2(velocity_body.x),
            beta: (velocity_body.y / velocity_mag).clamp(-1.0, 1.0).asin(),
        }
    }
}

pub fn compute_dynamic_pressure(density: f64, velocity: f64) -> f64 {
    0.5 * density * velocity * velocity
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuselageConfig {
    /// Projected areas seen along body x, y and z (m^2).
    pub frontal_area: f64,
    pub side_area: f64,
    pub top_area: f64,
    /// Drag coefficient with the flow on the nose.
    pub drag_coefficient_level: f64,
    /// Drag coefficient with the flow at 90 degrees angle of attack.
    pub drag_coefficient_vertical: f64,
    /// Yaw and pitch restoring moment per unit dynamic pressure per radian.
    pub weathervane_yaw: f64,
    pub weathervane_pitch: f64,
    /// Airspeed at which the weathervane moments reach full strength.
    pub weathervane_full_speed: f64,
    /// Angular rate damping per axis (N m s/rad).
    pub rate_damping: Vec3,
}

impl Default for FuselageConfig {
    fn default() -> Self {
        Self {
            frontal_area: 1.6,
            side_area: 6.0,
            top_area: 8.0,
            drag_coefficient_level: 0.667,
            drag_coefficient_vertical: 1.5,
            weathervane_yaw: 12.0,
            weathervane_pitch: 6.0,
            weathervane_full_speed: 20.0,
            rate_damping: Vec3::new(1500.0, 4000.0, 3000.0),
        }
    }
}

impl FuselageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("fuselage.frontal_area", self.frontal_area)?;
        require_non_negative("fuselage.side_area", self.side_area)?;
        require_non_negative("fuselage.top_area", self.top_area)?;
        require_non_negative("fuselage.drag_coefficient_level", self.drag_coefficient_level)?;
        require_non_negative("fuselage.drag_coefficient_vertical", self.drag_coefficient_vertical)?;
        require_non_negative("fuselage.weathervane_yaw", self.weathervane_yaw)?;
        require_non_negative("fuselage.weathervane_pitch", self.weathervane_pitch)?;
        require_positive("fuselage.weathervane_full_speed", self.weathervane_full_speed)?;
        if !self.rate_damping.is_finite()
            || self.rate_damping.x < 0.0
            || self.rate_damping.y < 0.0
            || self.rate_damping.z < 0.0
        {
            return Err(ConfigError::invalid("fuselage.rate_damping", "must be finite and non-negative"));
        }
        Ok(())
    }

    /// Drag coefficient against the magnitude of the fuselage angle of
    /// attack, blended linearly from level to vertical flow.
    pub fn drag_coefficient(&self, alpha: f64) -> f64 {
        let t = inverse_lerp(alpha.abs().min(std::f64::consts::PI - alpha.abs()), 0.0, std::f64::consts::FRAC_PI_2);
        lerp(self.drag_coefficient_level, self.drag_coefficient_vertical, t)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FuselageLoads {
    pub drag: Vec3,
    pub moment: Vec3,
    pub air_data: AirData,
}

/// Parasitic drag, weathervane moments and rate damping of the airframe.
///
/// `air_velocity_body` is the velocity of the airframe relative to the air
/// mass, body axes.
pub fn compute_fuselage_loads(
    config: &FuselageConfig,
    air_velocity_body: &Vec3,
    angular_velocity: &Vec3,
    density: f64,
) -> FuselageLoads {
    let damping = -config.rate_damping.hadamard(angular_velocity);
    let air_data = AirData::from_body_velocity(air_velocity_body, density);
    if air_data.velocity_mag < 1e-6 {
        return FuselageLoads {
            drag: Vec3::zero(),
            moment: damping,
            air_data,
        };
    }

    let v = *air_velocity_body;
    let v_sq = air_data.velocity_mag * air_data.velocity_mag;
    let projected_area =
        (config.frontal_area * v.x * v.x + config.side_area * v.y * v.y + config.top_area * v.z * v.z) / v_sq;
    let drag_area = projected_area * config.drag_coefficient(air_data.alpha);
    let drag = v.normalize() * (-air_data.dynamic_pressure * drag_area);

    let influence = inverse_lerp(air_data.velocity_mag, 0.0, config.weathervane_full_speed);
    let q = air_data.dynamic_pressure * influence;
    let alpha = if v.x >= 0.0 { air_data.alpha } else { 0.0 };
    let weathervane = Vec3::new(0.0, -config.weathervane_pitch * q * alpha, config.weathervane_yaw * q * air_data.beta);

    FuselageLoads {
        drag,
        moment: weathervane + damping,
        air_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn drag_opposes_motion() {
        let config = FuselageConfig::default();
        let loads = compute_fuselage_loads(&config, &Vec3::new(30.0, 0.0, 0.0), &Vec3::zero(), 1.225);
        let expected = 0.5 * 1.225 * 900.0 * config.frontal_area * config.drag_coefficient_level;
        assert_relative_eq!(loads.drag.x, -expected, epsilon = 1e-9);
        assert_relative_eq!(loads.drag.y, 0.0);
    }

    #[test]
    fn drag_coefficient_blends_with_angle_of_attack() {
        let config = FuselageConfig::default();
        assert_relative_eq!(config.drag_coefficient(0.0), 0.667);
        assert_relative_eq!(config.drag_coefficient(std::f64::consts::FRAC_PI_2), 1.5, epsilon = 1e-12);
        assert_relative_eq!(config.drag_coefficient(-std::f64::consts::FRAC_PI_4), (0.667 + 1.5) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn sideslip_yaws_nose_into_wind() {
        let config = FuselageConfig::default();
        let loads = compute_fuselage_loads(&config, &Vec3::new(30.0, 5.0, 0.0), &Vec3::zero(), 1.225);
        assert!(loads.moment.z > 0.0);
        assert!(loads.air_data.beta > 0.0);
    }

    #[test]
    fn weathervane_fades_out_at_low_speed() {
        let config = FuselageConfig::default();
        let slow = compute_fuselage_loads(&config, &Vec3::new(1.0, 0.2, 0.0), &Vec3::zero(), 1.225);
        let fast = compute_fuselage_loads(&config, &Vec3::new(25.0, 5.0, 0.0), &Vec3::zero(), 1.225);
        let slow_per_q = slow.moment.z / slow.air_data.dynamic_pressure;
        let fast_per_q = fast.moment.z / fast.air_data.dynamic_pressure;
        assert!(slow_per_q < 0.1 * fast_per_q);
    }

    #[test]
    fn rates_are_damped_at_rest() {
        let config = FuselageConfig::default();
        let loads = compute_fuselage_loads(&config, &Vec3::zero(), &Vec3::new(0.1, -0.2, 0.3), 1.225);
        assert_eq!(loads.drag, Vec3::zero());
        assert!(loads.moment.x < 0.0);
        assert!(loads.moment.y > 0.0);
        assert!(loads.moment.z < 0.0);
    }
}
