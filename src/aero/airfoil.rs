use crate::config::error::{require_in_range, require_non_negative, require_positive};
use crate::config::ConfigError;
use crate::math::wrap_pi;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Section lift and drag coefficients at one blade station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionCoefficients {
    pub cl: f64,
    pub cd: f64,
}

/// Blade section aerodynamics. Angle of attack and Mach number in,
/// coefficients out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AirfoilModel {
    Analytic(Airfoil),
    Table(CoefficientTable),
}

impl AirfoilModel {
    pub fn coefficients(&self, alpha: f64, mach: f64) -> SectionCoefficients {
        let alpha = wrap_pi(alpha);
        match self {
            Self::Analytic(airfoil) => airfoil.coefficients(alpha, mach),
            Self::Table(table) => table.coefficients(alpha),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Analytic(airfoil) => airfoil.validate(),
            Self::Table(table) => table.validate(),
        }
    }
}

impl Default for AirfoilModel {
    fn default() -> Self {
        Self::Analytic(Airfoil::default())
    }
}

/// Symmetric section with a linear lift slope, a smooth stall blend into
/// flat-plate behaviour, Prandtl-Glauert lift scaling and a drag rise past
/// the critical Mach number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airfoil {
    pub cl_alpha: f64,
    pub cl_max: f64,
    pub cd0: f64,
    pub cd_alpha2: f64,
    /// Half-width of the stall blend region (rad).
    pub stall_transition: f64,
    pub critical_mach: f64,
}

impl Default for Airfoil {
    fn default() -> Self {
        Self {
            cl_alpha: 5.73,
            cl_max: 1.4,
            cd0: 0.009,
            cd_alpha2: 0.4,
            stall_transition: 0.05,
            critical_mach: 0.75,
        }
    }
}

impl Airfoil {
    pub fn stall_angle(&self) -> f64 {
        self.cl_max / self.cl_alpha
    }

    fn coefficients(&self, alpha: f64, mach: f64) -> SectionCoefficients {
        let mach = mach.abs().min(0.95);
        let beta = (1.0 - mach.min(0.9).powi(2)).sqrt();

        let cl_attached = (self.cl_alpha * alpha / beta).clamp(-self.cl_max, self.cl_max);
        let cd_attached = self.cd0 + self.cd_alpha2 * alpha * alpha;

        let cl_plate = (2.0 * alpha).sin();
        let cd_plate = self.cd0 + 2.0 * alpha.sin().powi(2);

        let blend = self.stall_blend(alpha.abs());
        let cl = cl_attached * (1.0 - blend) + cl_plate * blend;
        let mut cd = cd_attached * (1.0 - blend) + cd_plate * blend;

        if mach > self.critical_mach {
            cd += 20.0 * (mach - self.critical_mach).powi(4);
        }

        SectionCoefficients { cl, cd }
    }

    fn stall_blend(&self, alpha_abs: f64) -> f64 {
        let alpha_stall = self.stall_angle();
        let width = self.stall_transition;

        if alpha_abs <= alpha_stall - width {
            0.0
        } else if alpha_abs >= alpha_stall + width {
            1.0
        } else {
            0.5 * (1.0 + ((alpha_abs - alpha_stall) / width * FRAC_PI_2).sin())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("airfoil.cl_alpha", self.cl_alpha)?;
        require_positive("airfoil.cl_max", self.cl_max)?;
        require_non_negative("airfoil.cd0", self.cd0)?;
        require_non_negative("airfoil.cd_alpha2", self.cd_alpha2)?;
        require_positive("airfoil.stall_transition", self.stall_transition)?;
        require_in_range("airfoil.critical_mach", self.critical_mach, 0.3, 1.0)?;
        if self.stall_angle() <= self.stall_transition || self.stall_angle() >= FRAC_PI_2 {
            return Err(ConfigError::invalid(
                "airfoil.cl_max",
                "stall angle (cl_max / cl_alpha) must lie between the transition width and 90 degrees",
            ));
        }
        Ok(())
    }
}

/// Tabulated coefficients against angle of attack in degrees. Values outside
/// the table hold the end points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoefficientTable {
    pub alpha_deg: Vec<f64>,
    pub cl: Vec<f64>,
    pub cd: Vec<f64>,
}

impl CoefficientTable {
    fn coefficients(&self, alpha: f64) -> SectionCoefficients {
        let alpha_deg = alpha.to_degrees();
        SectionCoefficients {
            cl: interpolate(&self.alpha_deg, &self.cl, alpha_deg),
            cd: interpolate(&self.alpha_deg, &self.cd, alpha_deg),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let n = self.alpha_deg.len();
        if n < 2 {
            return Err(ConfigError::invalid("airfoil.alpha_deg", "needs at least two points"));
        }
        if self.cl.len() != n || self.cd.len() != n {
            return Err(ConfigError::invalid(
                "airfoil.cl",
                "cl and cd must have the same length as alpha_deg",
            ));
        }
        if self.alpha_deg.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(ConfigError::invalid("airfoil.alpha_deg", "must be strictly ascending"));
        }
        if self.cd.iter().chain(&self.cl).any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid("airfoil.cl", "coefficients must be finite"));
        }
        Ok(())
    }
}

/// Piecewise-linear lookup in an ascending breakpoint table.
pub fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    match xs.len() {
        0 => 0.0,
        1 => ys[0],
        n => {
            if x <= xs[0] {
                return ys[0];
            }
            if x >= xs[n - 1] {
                return ys[n - 1];
            }
            let i = xs.partition_point(|&v| v <= x).max(1);
            let t = (x - xs[i - 1]) / (xs[i] - xs[i - 1]);
            ys[i - 1] + (ys[i] - ys[i - 1]) * t
        }
    }
}
