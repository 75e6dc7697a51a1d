use serde::{Deserialize, Serialize};

/// PID loop with a clamped integrator and conditional anti-windup. Serializable
/// so its integrator survives a state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PidController {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub integral: f64,
    pub previous_error: f64,
    pub integral_limit: f64,
    pub output_min: f64,
    pub output_max: f64,
    #[serde(default)]
    primed: bool,
}

impl PidController {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral: 0.0,
            previous_error: 0.0,
            integral_limit: 1000.0,
            output_min: -1000.0,
            output_max: 1000.0,
            primed: false,
        }
    }

    pub fn with_limits(mut self, integral_limit: f64, output_limit: f64) -> Self {
        self.integral_limit = integral_limit;
        self.output_min = -output_limit;
        self.output_max = output_limit;
        self
    }

    pub fn set_output_range(&mut self, min: f64, max: f64) {
        self.output_min = min.min(max);
        self.output_max = max;
    }

    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        self.update_with_feed_forward(error, 0.0, dt)
    }

    /// One controller step on top of a feed-forward term. The integrator only
    /// accumulates while the output is unsaturated or the error pulls it back
    /// inside the range.
    pub fn update_with_feed_forward(&mut self, error: f64, feed_forward: f64, dt: f64) -> f64 {
        if !error.is_finite() || !(dt > 0.0) {
            return (feed_forward + self.ki * self.integral).clamp(self.output_min, self.output_max);
        }

        let derivative = if self.primed {
            (error - self.previous_error) / dt
        } else {
            0.0
        };
        self.previous_error = error;
        self.primed = true;

        let candidate = (self.integral + error * dt).clamp(-self.integral_limit, self.integral_limit);
        let unclamped = feed_forward + self.kp * error + self.ki * candidate + self.kd * derivative;

        let saturated_high = unclamped > self.output_max && error > 0.0;
        let saturated_low = unclamped < self.output_min && error < 0.0;
        if !saturated_high && !saturated_low {
            self.integral = candidate;
        }

        let output = feed_forward + self.kp * error + self.ki * self.integral + self.kd * derivative;
        output.clamp(self.output_min, self.output_max)
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = 0.0;
        self.primed = false;
    }
}
