use crate::math::{Quat, Vec3};
use crate::physics::rigid_body::{AircraftState, MassProperties, StateDerivative};
use log::warn;
use serde::{Deserialize, Serialize};

pub trait Integrator {
    fn integrate(
        &self,
        state: &AircraftState,
        forces: &Vec3,
        moments: &Vec3,
        mass: &MassProperties,
        dt: f64,
    ) -> AircraftState;
}

/// Classic fourth-order Runge-Kutta with loads held constant over the step.
/// The quaternion is renormalised at every stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct RungeKutta4;

impl RungeKutta4 {
    pub fn new() -> Self {
        Self
    }

    fn add_state_derivative(state: &AircraftState, deriv: &StateDerivative, dt: f64) -> AircraftState {
        let mut orientation = state.orientation + deriv.orientation_dot * dt;
        orientation.renormalize();

        AircraftState {
            position: state.position + deriv.position_dot * dt,
            velocity: state.velocity + deriv.velocity_dot * dt,
            orientation,
            angular_velocity: state.angular_velocity + deriv.angular_velocity_dot * dt,
        }
    }

    fn weighted(k1: &StateDerivative, k2: &StateDerivative, k3: &StateDerivative, k4: &StateDerivative) -> StateDerivative {
        let vec = |a: Vec3, b: Vec3, c: Vec3, d: Vec3| (a + b * 2.0 + c * 2.0 + d) * (1.0 / 6.0);
        let quat = |a: Quat, b: Quat, c: Quat, d: Quat| (a + b * 2.0 + c * 2.0 + d) * (1.0 / 6.0);

        StateDerivative {
            position_dot: vec(k1.position_dot, k2.position_dot, k3.position_dot, k4.position_dot),
            velocity_dot: vec(k1.velocity_dot, k2.velocity_dot, k3.velocity_dot, k4.velocity_dot),
            orientation_dot: quat(k1.orientation_dot, k2.orientation_dot, k3.orientation_dot, k4.orientation_dot),
            angular_velocity_dot: vec(
                k1.angular_velocity_dot,
                k2.angular_velocity_dot,
                k3.angular_velocity_dot,
                k4.angular_velocity_dot,
            ),
        }
    }
}

impl Integrator for RungeKutta4 {
    fn integrate(
        &self,
        state: &AircraftState,
        forces: &Vec3,
        moments: &Vec3,
        mass: &MassProperties,
        dt: f64,
    ) -> AircraftState {
        let k1 = state.derivative(forces, moments, mass);
        let k2 = Self::add_state_derivative(state, &k1, dt * 0.5).derivative(forces, moments, mass);
        let k3 = Self::add_state_derivative(state, &k2, dt * 0.5).derivative(forces, moments, mass);
        let k4 = Self::add_state_derivative(state, &k3, dt).derivative(forces, moments, mass);

        Self::add_state_derivative(state, &Self::weighted(&k1, &k2, &k3, &k4), dt)
    }
}

/// Bounds applied to the summed loads before integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadLimits {
    pub max_force: f64,
    pub max_torque: f64,
}

impl Default for LoadLimits {
    fn default() -> Self {
        Self {
            max_force: 1e6,
            max_torque: 1e6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanitizedLoads {
    pub force: Vec3,
    pub moment: Vec3,
    /// How many of the two vectors had to be replaced or clamped.
    pub substitutions: u32,
}

/// Zeroes non-finite loads and clamps excessive ones.
pub fn sanitize_loads(force: &Vec3, moment: &Vec3, limits: &LoadLimits) -> SanitizedLoads {
    let mut substitutions = 0;
    let mut fix = |v: &Vec3, max: f64, what: &str| {
        if !v.is_finite() {
            substitutions += 1;
            warn!("non-finite {} replaced with zero", what);
            Vec3::zero()
        } else if v.magnitude() > max {
            substitutions += 1;
            warn!("{} of {:.3e} clamped to {:.3e}", what, v.magnitude(), max);
            v.clamp_magnitude(max)
        } else {
            *v
        }
    };

    let force = fix(force, limits.max_force, "force");
    let moment = fix(moment, limits.max_torque, "torque");
    SanitizedLoads {
        force,
        moment,
        substitutions,
    }
}
