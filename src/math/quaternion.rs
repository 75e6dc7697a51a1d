use super::Vec3;
use serde::{Deserialize, Serialize};

/// Attitude quaternion, body-to-world (NED) rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quat {
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    pub fn from_euler(roll: f64, pitch: f64, yaw: f64) -> Self {
        let cr = (roll * 0.5).cos();
        let sr = (roll * 0.5).sin();
        let cp = (pitch * 0.5).cos();
        let sp = (pitch * 0.5).sin();
        let cy = (yaw * 0.5).cos();
        let sy = (yaw * 0.5).sin();

        Self::new(
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        )
    }

    pub fn to_euler(&self) -> (f64, f64, f64) {
        let sinr_cosp = 2.0 * (self.w * self.x + self.y * self.z);
        let cosr_cosp = 1.0 - 2.0 * (self.x * self.x + self.y * self.y);
        let roll = sinr_cosp.atan2(cosr_cosp);

        let sinp = 2.0 * (self.w * self.y - self.z * self.x);
        let pitch = if sinp.abs() >= 1.0 {
            std::f64::consts::FRAC_PI_2.copysign(sinp)
        } else {
            sinp.asin()
        };

        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        let yaw = siny_cosp.atan2(cosy_cosp);

        (roll, pitch, yaw)
    }

    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    fn vector_part(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    fn pure(v: &Vec3) -> Self {
        Self::new(0.0, v.x, v.y, v.z)
    }

    /// Rotates `v` from body to world axes. Expanded form of `q v q*` for a
    /// unit quaternion.
    pub fn rotate_vector(&self, v: &Vec3) -> Vec3 {
        let u = self.vector_part();
        let t = u.cross(v) * 2.0;
        *v + t * self.w + u.cross(&t)
    }

    /// Attitude rate `q_dot = q (0, omega) / 2` for a body-axis rate.
    pub fn derivative(&self, omega_body: &Vec3) -> Self {
        (*self * Self::pure(omega_body)) * 0.5
    }

    /// Restores unit length. A degenerate quaternion collapses to identity
    /// rather than dividing by zero.
    pub fn renormalize(&mut self) {
        let mag = self.norm();
        if mag > 1e-10 && mag.is_finite() {
            self.w /= mag;
            self.x /= mag;
            self.y /= mag;
            self.z /= mag;
        } else {
            *self = Self::identity();
        }
    }
}

impl std::ops::Mul for Quat {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        Self::new(
            self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        )
    }
}

impl std::ops::Mul<f64> for Quat {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self::new(self.w * scalar, self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl std::ops::Add for Quat {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(
            self.w + other.w,
            self.x + other.x,
            self.y + other.y,
            self.z + other.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn euler_round_trip() {
        let q = Quat::from_euler(0.1, -0.2, 1.3);
        let (roll, pitch, yaw) = q.to_euler();
        assert_relative_eq!(roll, 0.1, epsilon = 1e-12);
        assert_relative_eq!(pitch, -0.2, epsilon = 1e-12);
        assert_relative_eq!(yaw, 1.3, epsilon = 1e-12);
    }

    #[test]
    fn yaw_rotates_north_to_east() {
        let q = Quat::from_euler(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let v = q.rotate_vector(&Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_quaternion_renormalizes_to_identity() {
        let mut q = Quat::new(0.0, 0.0, 0.0, 0.0);
        q.renormalize();
        assert_eq!(q, Quat::identity());

        let mut q = Quat::new(f64::NAN, 0.0, 0.0, 0.0);
        q.renormalize();
        assert_eq!(q, Quat::identity());
    }
}
