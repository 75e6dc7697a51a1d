use crate::config::error::{require_non_negative, require_positive};
use crate::config::ConfigError;
use crate::math::{Vec3, AIR_DENSITY_SEA_LEVEL};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

const SEA_LEVEL_TEMPERATURE: f64 = 288.15;
const SEA_LEVEL_PRESSURE: f64 = 101_325.0;
const LAPSE_RATE: f64 = 0.0065;
const GAS_CONSTANT_AIR: f64 = 287.053;
const HEAT_CAPACITY_RATIO: f64 = 1.4;
const MIN_MODEL_ALTITUDE: f64 = -500.0;
const MAX_MODEL_ALTITUDE: f64 = 11_000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosphereConfig {
    /// Flat terrain elevation above sea level (m).
    pub ground_elevation: f64,
    /// Steady wind, NED (m/s).
    pub wind: Vec3,
    /// Height above ground at which the wind reaches full strength.
    pub wind_shear_height: f64,
    pub gust: GustConfig,
    /// Wind and gusts only blow inside this box when set.
    pub bounds: Option<WindFieldBounds>,
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self {
            ground_elevation: 0.0,
            wind: Vec3::zero(),
            wind_shear_height: 10.0,
            gust: GustConfig::default(),
            bounds: None,
        }
    }
}

impl AtmosphereConfig {
    pub fn calm() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ground_elevation.is_finite() || !self.wind.is_finite() {
            return Err(ConfigError::invalid("atmosphere.wind", "must be finite"));
        }
        require_non_negative("atmosphere.wind_shear_height", self.wind_shear_height)?;
        require_non_negative("atmosphere.gust.intensity", self.gust.intensity)?;
        require_non_negative("atmosphere.gust.frequency", self.gust.frequency)?;
        require_positive("atmosphere.gust.wavelength", self.gust.wavelength)?;
        if let Some(bounds) = &self.bounds {
            if bounds.min.x > bounds.max.x || bounds.min.y > bounds.max.y || bounds.min.z > bounds.max.z {
                return Err(ConfigError::invalid("atmosphere.bounds", "min must not exceed max"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GustConfig {
    /// RMS gust speed (m/s).
    pub intensity: f64,
    /// Mean gust frequency (Hz).
    pub frequency: f64,
    /// Spatial wavelength of the gust field (m).
    pub wavelength: f64,
    pub modes: usize,
    pub seed: u64,
}

impl Default for GustConfig {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            frequency: 0.5,
            wavelength: 200.0,
            modes: 4,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindFieldBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl WindFieldBounds {
    pub fn contains(&self, p: &Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

/// Air state at one point and instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentSample {
    pub density: f64,
    pub temperature: f64,
    pub pressure: f64,
    pub speed_of_sound: f64,
    pub wind: Vec3,
    pub gust: Vec3,
    pub height_above_ground: f64,
}

impl EnvironmentSample {
    pub fn sea_level() -> Self {
        Self {
            density: AIR_DENSITY_SEA_LEVEL,
            temperature: SEA_LEVEL_TEMPERATURE,
            pressure: SEA_LEVEL_PRESSURE,
            speed_of_sound: (HEAT_CAPACITY_RATIO * GAS_CONSTANT_AIR * SEA_LEVEL_TEMPERATURE).sqrt(),
            wind: Vec3::zero(),
            gust: Vec3::zero(),
            height_above_ground: f64::INFINITY,
        }
    }

    /// Total air-mass velocity, NED.
    pub fn air_velocity(&self) -> Vec3 {
        self.wind + self.gust
    }
}

#[derive(Debug, Clone)]
struct GustMode {
    amplitude: Vec3,
    angular_frequency: f64,
    wave_vector: Vec3,
    phase: f64,
}

/// International Standard Atmosphere troposphere plus a seeded,
/// deterministic gust field. Immutable once built.
#[derive(Debug, Clone)]
pub struct Atmosphere {
    config: AtmosphereConfig,
    gust_modes: Vec<GustMode>,
}

impl Atmosphere {
    pub fn new(config: AtmosphereConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.gust.seed);
        let modes = config.gust.modes;
        let scale = if modes > 0 {
            config.gust.intensity / (modes as f64).sqrt()
        } else {
            0.0
        };

        let gust_modes = (0..modes)
            .map(|_| {
                let heading: f64 = rng.gen_range(0.0..TAU);
                let wavenumber = TAU / config.gust.wavelength;
                GustMode {
                    amplitude: Vec3::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-0.3..0.3),
                    ) * scale,
                    angular_frequency: TAU * config.gust.frequency * rng.gen_range(0.5..2.0),
                    wave_vector: Vec3::new(heading.cos(), heading.sin(), 0.0) * wavenumber,
                    phase: rng.gen_range(0.0..TAU),
                }
            })
            .collect();

        Self { config, gust_modes }
    }

    pub fn calm() -> Self {
        Self::new(AtmosphereConfig::calm())
    }

    pub fn config(&self) -> &AtmosphereConfig {
        &self.config
    }

    pub fn ground_elevation(&self) -> f64 {
        self.config.ground_elevation
    }

    /// Samples the air at a world (NED) position. Never fails: a non-finite
    /// position yields sea-level defaults.
    pub fn sample(&self, position: &Vec3, time: f64) -> EnvironmentSample {
        if !position.is_finite() || !time.is_finite() {
            return EnvironmentSample::sea_level();
        }

        let altitude = -position.z;
        let height_above_ground = altitude - self.config.ground_elevation;
        let (temperature, pressure, density, speed_of_sound) = Self::isa(altitude);

        let in_field = self
            .config
            .bounds
            .as_ref()
            .map_or(true, |bounds| bounds.contains(position));

        let (wind, gust) = if in_field {
            let factor = self.shear_factor(height_above_ground);
            (self.config.wind * factor, self.gust_at(position, time) * factor)
        } else {
            (Vec3::zero(), Vec3::zero())
        };

        EnvironmentSample {
            density,
            temperature,
            pressure,
            speed_of_sound,
            wind,
            gust,
            height_above_ground,
        }
    }

    /// Temperature, pressure, density and speed of sound at a geometric
    /// altitude, clamped to the troposphere.
    pub fn isa(altitude: f64) -> (f64, f64, f64, f64) {
        let h = altitude.clamp(MIN_MODEL_ALTITUDE, MAX_MODEL_ALTITUDE);
        let temperature = SEA_LEVEL_TEMPERATURE - LAPSE_RATE * h;
        let exponent = crate::math::GRAVITY / (LAPSE_RATE * GAS_CONSTANT_AIR);
        let pressure = SEA_LEVEL_PRESSURE * (temperature / SEA_LEVEL_TEMPERATURE).powf(exponent);
        let density = pressure / (GAS_CONSTANT_AIR * temperature);
        let speed_of_sound = (HEAT_CAPACITY_RATIO * GAS_CONSTANT_AIR * temperature).sqrt();
        (temperature, pressure, density, speed_of_sound)
    }

    fn shear_factor(&self, height_above_ground: f64) -> f64 {
        if self.config.wind_shear_height <= 0.0 {
            return 1.0;
        }
        (height_above_ground / self.config.wind_shear_height).clamp(0.1, 1.0)
    }

    fn gust_at(&self, position: &Vec3, time: f64) -> Vec3 {
        self.gust_modes.iter().fold(Vec3::zero(), |acc, mode| {
            let argument = mode.angular_frequency * time - mode.wave_vector.dot(position) + mode.phase;
            acc + mode.amplitude * argument.sin()
        })
    }
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self::calm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sea_level_matches_standard_values() {
        let atmosphere = Atmosphere::calm();
        let sample = atmosphere.sample(&Vec3::zero(), 0.0);
        assert_relative_eq!(sample.density, 1.225, epsilon = 2e-3);
        assert_relative_eq!(sample.speed_of_sound, 340.3, epsilon = 0.5);
        assert_relative_eq!(sample.height_above_ground, 0.0);
    }

    #[test]
    fn density_falls_with_altitude() {
        let atmosphere = Atmosphere::calm();
        let low = atmosphere.sample(&Vec3::new(0.0, 0.0, -100.0), 0.0);
        let high = atmosphere.sample(&Vec3::new(0.0, 0.0, -3000.0), 0.0);
        assert!(high.density < low.density);
        assert_relative_eq!(high.density, 0.909, epsilon = 5e-3);
    }

    #[test]
    fn non_finite_position_returns_defaults() {
        let atmosphere = Atmosphere::calm();
        let sample = atmosphere.sample(&Vec3::new(f64::NAN, 0.0, 0.0), 1.0);
        assert_eq!(sample, EnvironmentSample::sea_level());
    }

    #[test]
    fn wind_is_zero_outside_bounds() {
        let atmosphere = Atmosphere::new(AtmosphereConfig {
            wind: Vec3::new(5.0, 0.0, 0.0),
            wind_shear_height: 0.0,
            bounds: Some(WindFieldBounds {
                min: Vec3::new(-100.0, -100.0, -500.0),
                max: Vec3::new(100.0, 100.0, 0.0),
            }),
            ..AtmosphereConfig::default()
        });

        let inside = atmosphere.sample(&Vec3::new(0.0, 0.0, -50.0), 0.0);
        let outside = atmosphere.sample(&Vec3::new(500.0, 0.0, -50.0), 0.0);
        assert_relative_eq!(inside.wind.x, 5.0);
        assert_eq!(outside.wind, Vec3::zero());
    }

    #[test]
    fn gusts_are_deterministic_for_a_seed() {
        let config = AtmosphereConfig {
            gust: GustConfig {
                intensity: 3.0,
                ..GustConfig::default()
            },
            ..AtmosphereConfig::default()
        };
        let a = Atmosphere::new(config.clone());
        let b = Atmosphere::new(config);
        let p = Vec3::new(12.0, -4.0, -60.0);
        for step in 0..50 {
            let t = step as f64 * 0.1;
            assert_eq!(a.sample(&p, t).gust, b.sample(&p, t).gust);
        }
        assert!(a.sample(&p, 1.3).gust.magnitude() > 0.0);
    }
}
