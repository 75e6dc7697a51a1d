use crate::math::{Quat, Vec3, GRAVITY};
use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Six-degree-of-freedom body state. Position and velocity are world (NED),
/// angular velocity is body axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AircraftState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Quat,
    pub angular_velocity: Vec3,
}

impl Default for AircraftState {
    fn default() -> Self {
        Self::new()
    }
}

impl AircraftState {
    pub fn new() -> Self {
        Self {
            position: Vec3::zero(),
            velocity: Vec3::zero(),
            orientation: Quat::identity(),
            angular_velocity: Vec3::zero(),
        }
    }

    pub fn at_altitude(altitude: f64) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -altitude),
            ..Self::new()
        }
    }

    pub fn altitude(&self) -> f64 {
        -self.position.z
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.orientation.is_finite()
            && self.angular_velocity.is_finite()
    }

    pub fn body_to_world(&self, v: &Vec3) -> Vec3 {
        self.orientation.rotate_vector(v)
    }

    pub fn world_to_body(&self, v: &Vec3) -> Vec3 {
        self.orientation.conjugate().rotate_vector(v)
    }

    pub fn body_velocity(&self) -> Vec3 {
        self.world_to_body(&self.velocity)
    }

    /// Velocity of a point fixed to the body at `arm` from the centre of
    /// gravity, body axes.
    pub fn point_velocity(&self, arm: &Vec3) -> Vec3 {
        self.body_velocity() + self.angular_velocity.cross(arm)
    }

    /// Rates of change under body-axis `forces` and `moments`, with gravity
    /// added here.
    pub fn derivative(&self, forces: &Vec3, moments: &Vec3, mass: &MassProperties) -> StateDerivative {
        let gravity_body = self.world_to_body(&Vec3::new(0.0, 0.0, GRAVITY * mass.mass));
        let acceleration_body = (*forces + gravity_body) * (1.0 / mass.mass);

        let omega = self.angular_velocity;
        let gyroscopic = omega.cross(&Vec3::from_na(&(mass.inertia * omega.to_na())));
        let angular_acceleration = Vec3::from_na(&(mass.inertia_inverse * (*moments - gyroscopic).to_na()));

        StateDerivative {
            position_dot: self.velocity,
            velocity_dot: self.body_to_world(&acceleration_body),
            orientation_dot: self.orientation.derivative(&omega),
            angular_velocity_dot: angular_acceleration,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StateDerivative {
    pub position_dot: Vec3,
    pub velocity_dot: Vec3,
    pub orientation_dot: Quat,
    pub angular_velocity_dot: Vec3,
}

/// Mass and inertia about the centre of gravity, body axes.
#[derive(Debug, Clone)]
pub struct MassProperties {
    pub mass: f64,
    pub inertia: na::Matrix3<f64>,
    inertia_inverse: na::Matrix3<f64>,
}

impl MassProperties {
    /// `None` when the inertia tensor is singular.
    pub fn new(mass: f64, inertia: na::Matrix3<f64>) -> Option<Self> {
        let inertia_inverse = inertia.try_inverse()?;
        Some(Self {
            mass,
            inertia,
            inertia_inverse,
        })
    }

    pub fn from_rows(mass: f64, rows: &[[f64; 3]; 3]) -> Option<Self> {
        Self::new(mass, na::Matrix3::from_fn(|r, c| rows[r][c]))
    }

    pub fn weight(&self) -> f64 {
        self.mass * GRAVITY
    }
}

/// Sums point loads given as (force, application point) about the centre of
/// gravity, adding pure moments on top.
pub fn accumulate_loads(point_loads: &[(Vec3, Vec3)], pure_moments: &[Vec3]) -> (Vec3, Vec3) {
    let mut total_force = Vec3::zero();
    let mut total_moment = Vec3::zero();

    for (force, arm) in point_loads {
        total_force += *force;
        total_moment += arm.cross(force);
    }
    for moment in pure_moments {
        total_moment += *moment;
    }

    (total_force, total_moment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn free_fall_accelerates_down() {
        let mass = MassProperties::from_rows(100.0, &[[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]]);
        let mass = mass.expect("diagonal inertia is invertible");
        let d = AircraftState::new().derivative(&Vec3::zero(), &Vec3::zero(), &mass);
        assert_relative_eq!(d.velocity_dot.z, GRAVITY, epsilon = 1e-12);
    }

    #[test]
    fn singular_inertia_is_rejected() {
        assert!(MassProperties::from_rows(1.0, &[[0.0; 3]; 3]).is_none());
    }

    #[test]
    fn offset_force_produces_moment() {
        let (force, moment) = accumulate_loads(
            &[(Vec3::new(0.0, 0.0, -100.0), Vec3::new(2.0, 0.0, 0.0))],
            &[Vec3::new(0.0, 0.0, 5.0)],
        );
        assert_eq!(force, Vec3::new(0.0, 0.0, -100.0));
        assert_relative_eq!(moment.y, 200.0);
        assert_relative_eq!(moment.z, 5.0);
    }
}
