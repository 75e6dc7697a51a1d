use crate::aero::{AirfoilModel, FuselageConfig, GroundEffect, RotationSense, RotorGeometry};
use crate::config::error::require_positive;
use crate::config::ConfigError;
use crate::control::MixerConfig;
use crate::math::Vec3;
use crate::physics::{GroundContact, LoadLimits, MassProperties};
use crate::power::{DrivetrainConfig, EngineConfig};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete description of one helicopter. Loaded once, validated, then
/// shared read-only between instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftConfig {
    pub name: String,
    pub mass: f64,
    /// Inertia tensor about the centre of gravity, body axes (kg m^2).
    pub inertia: [[f64; 3]; 3],
    pub main_rotor: RotorGeometry,
    pub tail_rotor: RotorGeometry,
    pub engine: EngineConfig,
    #[serde(default)]
    pub drivetrain: DrivetrainConfig,
    #[serde(default)]
    pub mixer: MixerConfig,
    #[serde(default)]
    pub fuselage: FuselageConfig,
    #[serde(default)]
    pub ground: GroundContact,
    #[serde(default)]
    pub ground_effect: GroundEffect,
    #[serde(default)]
    pub limits: LoadLimits,
}

impl AircraftConfig {
    /// Two-tonne single-engine utility helicopter with a four-blade
    /// counter-clockwise main rotor and a two-blade tail rotor.
    pub fn light_utility() -> Self {
        let main_rotor = RotorGeometry {
            hub_position: Vec3::new(0.0, 0.0, -2.0),
            shaft_axis: Vec3::new(0.0, 0.0, -1.0),
            rotation: RotationSense::CounterClockwise,
            radius: 5.5,
            root_cutout: 0.15,
            chord: 0.3,
            blade_count: 4,
            twist: (-8.0_f64).to_radians(),
            lock_number: 7.0,
            inertia: 1100.0,
            collective_min: 0.0,
            collective_max: 16.0_f64.to_radians(),
            cyclic_max: 0.14,
            airfoil: AirfoilModel::default(),
            azimuth_stations: 16,
            radial_stations: 8,
            inflow_iterations: 4,
            inflow_relaxation: 0.5,
            inflow_time_constant: 0.05,
        };

        let tail_rotor = RotorGeometry {
            hub_position: Vec3::new(-7.5, 0.0, -1.0),
            shaft_axis: Vec3::new(0.0, 1.0, 0.0),
            rotation: RotationSense::Clockwise,
            radius: 1.0,
            root_cutout: 0.15,
            chord: 0.2,
            blade_count: 2,
            twist: 0.0,
            lock_number: 3.0,
            inertia: 3.0,
            collective_min: -0.2,
            collective_max: 0.4,
            cyclic_max: 0.0,
            airfoil: AirfoilModel::default(),
            azimuth_stations: 8,
            radial_stations: 6,
            inflow_iterations: 4,
            inflow_relaxation: 0.5,
            inflow_time_constant: 0.05,
        };

        Self {
            name: "Light Utility".to_string(),
            mass: 2000.0,
            inertia: [[1800.0, 0.0, 0.0], [0.0, 6500.0, 0.0], [0.0, 0.0, 5500.0]],
            main_rotor,
            tail_rotor,
            engine: EngineConfig {
                rated_rotor_rpm: 390.0,
                max_torque: 1200.0,
                spool_up_time: 12.0,
                spool_down_time: 8.0,
                disengage_time: 0.5,
                governor_kp: 4000.0,
                governor_ki: 5000.0,
                sfc: 0.35,
                fuel_capacity: 300.0,
                auto_start: false,
            },
            drivetrain: DrivetrainConfig::default(),
            mixer: MixerConfig::default(),
            fuselage: FuselageConfig::default(),
            ground: GroundContact::default(),
            ground_effect: GroundEffect::default(),
            limits: LoadLimits::default(),
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        debug!("loaded aircraft configuration `{}`", config.name);
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("reading aircraft configuration from {}", path.display());
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("name", "must not be empty"));
        }
        require_positive("mass", self.mass)?;
        if self.inertia.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid("inertia", "must be finite"));
        }
        for axis in 0..3 {
            require_positive("inertia", self.inertia[axis][axis])?;
        }
        self.mass_properties()?;

        self.main_rotor.validate("main_rotor")?;
        self.tail_rotor.validate("tail_rotor")?;
        // Centred pedals with no torque must leave the tail at zero pitch.
        if self.tail_rotor.collective_min > 0.0 || self.tail_rotor.collective_max < 0.0 {
            return Err(ConfigError::invalid(
                "tail_rotor.collective_min",
                "tail collective range must include zero",
            ));
        }
        self.engine.validate()?;
        self.drivetrain.validate()?;
        self.mixer.validate()?;
        self.fuselage.validate()?;
        self.ground.validate()?;
        self.ground_effect.validate()?;
        require_positive("limits.max_force", self.limits.max_force)?;
        require_positive("limits.max_torque", self.limits.max_torque)
    }

    pub fn mass_properties(&self) -> Result<MassProperties, ConfigError> {
        MassProperties::from_rows(self.mass, &self.inertia)
            .ok_or_else(|| ConfigError::invalid("inertia", "tensor is singular"))
    }

    /// Full-throttle torque available at the main rotor shaft.
    pub fn max_shaft_torque(&self) -> f64 {
        self.engine.max_torque * self.drivetrain.engine_to_main_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_is_valid() {
        AircraftConfig::light_utility()
            .validate()
            .expect("built-in preset validates");
    }

    #[test]
    fn azimuth_stations_outside_range_are_rejected() {
        let mut config = AircraftConfig::light_utility();
        config.main_rotor.azimuth_stations = 40;
        match config.validate() {
            Err(ConfigError::InvalidParameter { name, .. }) => assert_eq!(name, "main_rotor.azimuth_stations"),
            other => panic!("expected invalid parameter, got {:?}", other),
        }
    }

    #[test]
    fn tail_collective_range_must_include_zero() {
        let mut config = AircraftConfig::light_utility();
        config.tail_rotor.collective_min = 0.05;
        match config.validate() {
            Err(ConfigError::InvalidParameter { name, .. }) => assert_eq!(name, "tail_rotor.collective_min"),
            other => panic!("expected invalid parameter, got {:?}", other),
        }
    }

    #[test]
    fn yaml_round_trip_keeps_values() {
        let config = AircraftConfig::light_utility();
        let text = serde_yaml::to_string(&config).expect("serializes");
        let parsed = AircraftConfig::from_yaml_str(&text).expect("parses");
        assert_eq!(parsed.main_rotor.blade_count, 4);
        assert_eq!(parsed.engine.rated_rotor_rpm, 390.0);
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = AircraftConfig::from_yaml_str("name: [unterminated").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
