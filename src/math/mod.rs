pub mod vector;
pub mod quaternion;

pub use vector::Vec3;
pub use quaternion::Quat;

pub const GRAVITY: f64 = 9.81;
pub const AIR_DENSITY_SEA_LEVEL: f64 = 1.225;
pub const RPM_TO_RAD_PER_SEC: f64 = std::f64::consts::PI / 30.0;
pub const MPS_TO_KNOTS: f64 = 1.943_844;

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Position of `value` between `min` and `max`, clamped to [0, 1].
pub fn inverse_lerp(value: f64, min: f64, max: f64) -> f64 {
    if (max - min).abs() < 1e-12 {
        return if value >= max { 1.0 } else { 0.0 };
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Fits a [0, 1] alpha onto a sine-shaped ease: cosine ease-in below 0.5,
/// sine above.
pub fn curve_sin(alpha: f64) -> f64 {
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha < 0.5 {
        1.0 - (alpha * std::f64::consts::FRAC_PI_2).cos()
    } else {
        (alpha * std::f64::consts::FRAC_PI_2).sin()
    }
}

/// Wraps an angle into [-pi, pi).
pub fn wrap_pi(angle: f64) -> f64 {
    let two_pi = std::f64::consts::TAU;
    (angle + std::f64::consts::PI).rem_euclid(two_pi) - std::f64::consts::PI
}
