//! Pilot input shaping applied by the host before inputs reach the core.

use serde::{Deserialize, Serialize};

const BEZIER_TOLERANCE: f64 = 0.001;
const BEZIER_MAX_ITERATIONS: usize = 9999;

/// Exponential approach toward `target`, Unreal-style `FInterpTo`.
pub fn interp_to(current: f64, target: f64, dt: f64, speed: f64) -> f64 {
    if speed <= 0.0 {
        return target;
    }
    let distance = target - current;
    if distance * distance < 1e-8 {
        return target;
    }
    current + distance * (dt * speed).clamp(0.0, 1.0)
}

/// Turns a spring-centred axis into a throttle lever: deflection moves the
/// lever at `sensitivity` per second and the lever stays put on release.
/// Inside the detent band an idle lever creeps back to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualThrottle {
    pub sensitivity: f64,
    pub detent: f64,
    value: f64,
}

impl Default for VirtualThrottle {
    fn default() -> Self {
        Self::new(0.6, 0.05)
    }
}

impl VirtualThrottle {
    pub fn new(sensitivity: f64, detent: f64) -> Self {
        Self {
            sensitivity,
            detent,
            value: 0.0,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn update(&mut self, input: f64, dt: f64) -> f64 {
        if input.abs() > f64::EPSILON {
            self.value = (self.value + input * self.sensitivity * dt).clamp(-1.0, 1.0);
        } else if self.value != 0.0 && self.detent > 0.0 && self.value.abs() <= self.detent {
            let step = self.sensitivity * dt * 0.25;
            self.value = if self.value.abs() <= step {
                0.0
            } else {
                self.value - self.value.signum() * step
            };
        }
        self.value
    }
}

/// First-order smoothing of an axis. A released axis snaps to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dampen {
    pub lerp_speed: f64,
    last: f64,
}

impl Dampen {
    pub fn new(lerp_speed: f64) -> Self {
        Self { lerp_speed, last: 0.0 }
    }

    pub fn update(&mut self, input: f64, dt: f64) -> f64 {
        self.last = if input.abs() < 1e-8 {
            0.0
        } else {
            interp_to(self.last, input, dt, self.lerp_speed)
        };
        self.last
    }
}

/// Cubic Bezier response curve in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub p0: [f64; 2],
    pub p1: [f64; 2],
    pub p2: [f64; 2],
    pub p3: [f64; 2],
}

impl Default for CubicBezier {
    fn default() -> Self {
        Self::new([0.0, 0.0], [0.0, 0.0], [1.0, 1.0], [1.0, 1.0])
    }
}

fn lerp2(a: [f64; 2], b: [f64; 2], t: f64) -> [f64; 2] {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
}

impl CubicBezier {
    pub fn new(p0: [f64; 2], p1: [f64; 2], p2: [f64; 2], p3: [f64; 2]) -> Self {
        Self { p0, p1, p2, p3 }
    }

    /// Spring-loaded stick profile: `scale_x` stretches the curve in time,
    /// `slope` sets how early it reaches full deflection, `easing` softens the
    /// end and `balance` blends between the two shoulder shapes.
    pub fn spring(scale_x: f64, slope: f64, easing: f64, balance: f64) -> Self {
        let p2_full = [(1.0 - slope) * scale_x, 1.0];
        let p3 = [p2_full[0] + easing * scale_x, 1.0];
        let p2_soft = lerp2(lerp2([0.0, 0.0], p2_full, 0.5), [0.0, 1.0], easing * 0.5);
        Self::new([0.0, 0.0], [0.0, 0.0], lerp2(p2_soft, p2_full, balance), p3)
    }

    pub fn duration(&self) -> f64 {
        self.p3[0] - self.p0[0]
    }

    /// De Casteljau evaluation.
    pub fn get(&self, t: f64) -> [f64; 2] {
        let a = lerp2(self.p0, self.p1, t);
        let b = lerp2(self.p1, self.p2, t);
        let c = lerp2(self.p2, self.p3, t);
        let d = lerp2(a, b, t);
        let e = lerp2(b, c, t);
        lerp2(d, e, t)
    }

    pub fn y_for_x(&self, x: f64) -> f64 {
        self.bisect(x, 0)[1]
    }

    pub fn x_for_y(&self, y: f64) -> f64 {
        self.bisect(y, 1)[0]
    }

    // Assumes the curve is monotonic along `axis`.
    fn bisect(&self, target: f64, axis: usize) -> [f64; 2] {
        let (mut lower, mut upper) = (0.0, 1.0);
        let mut t = 0.5;
        let mut point = self.get(t);

        for _ in 1..BEZIER_MAX_ITERATIONS {
            if (target - point[axis]).abs() <= BEZIER_TOLERANCE {
                break;
            }
            if target > point[axis] {
                lower = t;
            } else {
                upper = t;
            }
            t = 0.5 * (lower + upper);
            point = self.get(t);
        }
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn throttle_holds_position_on_release() {
        let mut throttle = VirtualThrottle::default();
        for _ in 0..100 {
            throttle.update(1.0, 0.01);
        }
        assert_relative_eq!(throttle.value(), 0.6, epsilon = 1e-9);
        assert_relative_eq!(throttle.update(0.0, 0.01), 0.6, epsilon = 1e-9);
    }

    #[test]
    fn throttle_saturates_at_full_travel() {
        let mut throttle = VirtualThrottle::default();
        for _ in 0..1000 {
            throttle.update(1.0, 0.01);
        }
        assert_eq!(throttle.value(), 1.0);
    }

    #[test]
    fn throttle_creeps_out_of_detent() {
        let mut throttle = VirtualThrottle::default();
        throttle.update(1.0, 0.05);
        assert_relative_eq!(throttle.value(), 0.03, epsilon = 1e-12);
        for _ in 0..100 {
            throttle.update(0.0, 0.05);
        }
        assert_eq!(throttle.value(), 0.0);
    }

    #[test]
    fn dampen_approaches_and_snaps_to_zero() {
        let mut dampen = Dampen::new(5.0);
        let first = dampen.update(1.0, 0.05);
        assert_relative_eq!(first, 0.25, epsilon = 1e-12);
        for _ in 0..200 {
            dampen.update(1.0, 0.05);
        }
        assert_relative_eq!(dampen.update(1.0, 0.05), 1.0, epsilon = 1e-3);
        assert_eq!(dampen.update(0.0, 0.05), 0.0);
    }

    #[test]
    fn bezier_endpoints_and_inverse() {
        let curve = CubicBezier::new([0.0, 0.0], [0.4, 0.0], [0.6, 1.0], [1.0, 1.0]);
        assert_eq!(curve.get(0.0), [0.0, 0.0]);
        let end = curve.get(1.0);
        assert_relative_eq!(end[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(end[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(curve.duration(), 1.0);

        let y = curve.y_for_x(0.3);
        assert!(y > 0.0 && y < 0.3);
        assert_relative_eq!(curve.x_for_y(y), 0.3, epsilon = 5e-3);
        assert_relative_eq!(curve.y_for_x(0.5), 0.5, epsilon = 2e-3);
    }

    #[test]
    fn spring_curve_reaches_full_deflection() {
        let curve = CubicBezier::spring(1.0, 0.5, 0.2, 0.5);
        assert_relative_eq!(curve.duration(), 0.7, epsilon = 1e-12);
        assert_relative_eq!(curve.get(1.0)[1], 1.0, epsilon = 1e-12);
    }
}
