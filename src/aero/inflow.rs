use crate::config::error::{require_in_range, require_positive};
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

const NEWTON_ITERATIONS: usize = 8;

/// Induced-velocity reduction near the ground, Cheeseman-Bennett form
/// `1 - c / (h/D)^2` shifted to reach 1 at `max_height_ratio`, held between
/// `min_factor` and 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundEffect {
    pub coefficient: f64,
    pub min_factor: f64,
    /// Height-over-diameter ratio above which the ground has no influence.
    pub max_height_ratio: f64,
}

impl Default for GroundEffect {
    fn default() -> Self {
        Self {
            coefficient: 1.0 / 64.0,
            min_factor: 0.5,
            max_height_ratio: 1.25,
        }
    }
}

impl GroundEffect {
    pub fn factor(&self, height_above_ground: f64, diameter: f64) -> f64 {
        if !height_above_ground.is_finite() || diameter <= 0.0 {
            return 1.0;
        }
        let ratio = height_above_ground.max(0.0) / diameter;
        if ratio >= self.max_height_ratio {
            return 1.0;
        }
        // Offset so the factor reaches 1 at the cutoff height.
        let ratio = ratio.max(1e-3);
        let cutoff = self.max_height_ratio * self.max_height_ratio;
        (1.0 - self.coefficient * (1.0 / (ratio * ratio) - 1.0 / cutoff)).clamp(self.min_factor, 1.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_in_range("ground_effect.coefficient", self.coefficient, 0.0, 1.0)?;
        require_in_range("ground_effect.min_factor", self.min_factor, 0.05, 1.0)?;
        require_positive("ground_effect.max_height_ratio", self.max_height_ratio)
    }
}

/// Glauert momentum-theory induced velocity for a disc producing `thrust`
/// while moving through the air at `inplane_speed` (edgewise) and
/// `climb_speed` (along the thrust axis).
///
/// Solves `v * sqrt(V_ip^2 + (V_c + v)^2) = T / (2 rho A)` by Newton's method
/// starting from `seed`. Where the momentum solution has no usable slope
/// (vortex-ring conditions) it falls back to a damped fixed-point update so
/// the result is always finite.
pub fn momentum_induced_velocity(
    thrust: f64,
    density: f64,
    disc_area: f64,
    inplane_speed: f64,
    climb_speed: f64,
    seed: f64,
) -> f64 {
    let denominator = 2.0 * density * disc_area;
    if !(denominator > 0.0) || !thrust.is_finite() || thrust.abs() < 1e-9 {
        return 0.0;
    }
    let target = thrust / denominator;
    let hover = target.signum() * target.abs().sqrt();

    let mut v = if seed.is_finite() && seed.abs() > 1e-6 && seed.signum() == target.signum() {
        seed
    } else {
        hover
    };

    for _ in 0..NEWTON_ITERATIONS {
        let axial = climb_speed + v;
        let flow = (inplane_speed * inplane_speed + axial * axial).sqrt().max(1e-6);
        let residual = v * flow - target;
        let slope = flow + v * axial / flow;

        v = if slope > 1e-6 {
            v - residual / slope
        } else {
            let fallback_flow = flow.max(hover.abs());
            0.5 * v + 0.5 * target / fallback_flow
        };
    }

    let limit = 4.0 * hover.abs() + climb_speed.abs();
    if v.is_finite() {
        v.clamp(-limit, limit)
    } else {
        hover
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hover_matches_ideal_momentum_theory() {
        let (thrust, rho, area) = (19_620.0, 1.225, 95.0);
        let v = momentum_induced_velocity(thrust, rho, area, 0.0, 0.0, 0.0);
        assert_relative_eq!(v, (thrust / (2.0 * rho * area)).sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn forward_flight_reduces_induced_velocity() {
        let hover = momentum_induced_velocity(19_620.0, 1.225, 95.0, 0.0, 0.0, 0.0);
        let cruise = momentum_induced_velocity(19_620.0, 1.225, 95.0, 40.0, 0.0, hover);
        assert!(cruise < 0.5 * hover);
        assert_relative_eq!(cruise * 40.0_f64.hypot(cruise), 19_620.0 / (2.0 * 1.225 * 95.0), epsilon = 1e-3);
    }

    #[test]
    fn climb_reduces_induced_velocity() {
        let hover = momentum_induced_velocity(10_000.0, 1.225, 50.0, 0.0, 0.0, 0.0);
        let climb = momentum_induced_velocity(10_000.0, 1.225, 50.0, 0.0, 5.0, hover);
        assert!(climb < hover);
        assert!(climb > 0.0);
    }

    #[test]
    fn zero_thrust_means_no_induced_flow() {
        assert_eq!(momentum_induced_velocity(0.0, 1.225, 95.0, 10.0, -3.0, 4.0), 0.0);
        assert_eq!(momentum_induced_velocity(f64::NAN, 1.225, 95.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn ground_effect_only_near_ground() {
        let ge = GroundEffect::default();
        assert_relative_eq!(ge.factor(0.1 * 11.0, 11.0), 0.5);
        assert_relative_eq!(ge.factor(10.0 * 11.0, 11.0), 1.0);
        let mid = ge.factor(0.5 * 11.0, 11.0);
        assert_relative_eq!(mid, 1.0 - (1.0 / 64.0) * (1.0 / 0.25 - 1.0 / 1.5625), epsilon = 1e-12);
        assert_eq!(ge.factor(f64::INFINITY, 11.0), 1.0);
    }

    #[test]
    fn ground_effect_fades_out_continuously() {
        let ge = GroundEffect::default();
        let below = ge.factor((ge.max_height_ratio - 1e-6) * 11.0, 11.0);
        assert_relative_eq!(below, 1.0, epsilon = 1e-6);
        assert!(below <= 1.0);

        let mut previous = ge.factor(0.0, 11.0);
        for step in 1..=200 {
            let factor = ge.factor(step as f64 * 0.01 * 11.0, 11.0);
            assert!(factor >= previous);
            previous = factor;
        }
    }
}
