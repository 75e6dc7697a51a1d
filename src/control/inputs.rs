use serde::{Deserialize, Serialize};

/// Pilot control snapshot for one tick. Values are clamped on construction
/// and never modified by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlInputs {
    /// Collective lever, 0 = full down.
    pub collective: f64,
    /// Cyclic stick, positive forward.
    pub cyclic_pitch: f64,
    /// Cyclic stick, positive right.
    pub cyclic_roll: f64,
    /// Pedals, positive right (nose right).
    pub pedal: f64,
    pub throttle: f64,
}

fn sanitize(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        0.0
    }
}

impl ControlInputs {
    pub fn new(collective: f64, cyclic_pitch: f64, cyclic_roll: f64, pedal: f64, throttle: f64) -> Self {
        Self {
            collective,
            cyclic_pitch,
            cyclic_roll,
            pedal,
            throttle,
        }
        .clamped()
    }

    /// Hands off the cyclic and pedals with the throttle fully open.
    pub fn neutral() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 1.0)
    }

    pub fn clamped(&self) -> Self {
        Self {
            collective: sanitize(self.collective, 0.0, 1.0),
            cyclic_pitch: sanitize(self.cyclic_pitch, -1.0, 1.0),
            cyclic_roll: sanitize(self.cyclic_roll, -1.0, 1.0),
            pedal: sanitize(self.pedal, -1.0, 1.0),
            throttle: sanitize(self.throttle, 0.0, 1.0),
        }
    }

    /// Linear blend used for keyframed control schedules.
    pub fn lerp(&self, other: &ControlInputs, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self::new(
            mix(self.collective, other.collective),
            mix(self.cyclic_pitch, other.cyclic_pitch),
            mix(self.cyclic_roll, other.cyclic_roll),
            mix(self.pedal, other.pedal),
            mix(self.throttle, other.throttle),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_values_are_clamped() {
        let inputs = ControlInputs::new(1.5, -2.0, 0.3, f64::NAN, -0.1);
        assert_eq!(inputs.collective, 1.0);
        assert_eq!(inputs.cyclic_pitch, -1.0);
        assert_eq!(inputs.cyclic_roll, 0.3);
        assert_eq!(inputs.pedal, 0.0);
        assert_eq!(inputs.throttle, 0.0);
    }

    #[test]
    fn lerp_interpolates_each_axis() {
        let a = ControlInputs::new(0.0, -1.0, 0.0, 0.0, 1.0);
        let b = ControlInputs::new(1.0, 1.0, 0.0, 0.5, 1.0);
        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid.collective, 0.5);
        assert_eq!(mid.cyclic_pitch, 0.0);
        assert_eq!(mid.pedal, 0.25);
    }
}
