use crate::aero::AtmosphereConfig;
use crate::config::error::{require_in_range, require_positive};
use crate::config::ConfigError;
use crate::control::{ControlInputs, StabilityAssistConfig};
use crate::math::{Quat, Vec3};
use crate::physics::AircraftState;
use crate::power::FailureKind;
use crate::sim::IntegrationMode;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A scripted run: initial conditions, a control schedule and timed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub dt: f64,
    pub duration: f64,
    #[serde(default)]
    pub integration: IntegrationMode,
    #[serde(default)]
    pub initial: InitialConditions,
    #[serde(default)]
    pub atmosphere: AtmosphereConfig,
    /// Control keyframes, linearly interpolated, sorted by time.
    #[serde(default)]
    pub controls: Vec<ControlKeyframe>,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
    /// Smooth keyframed inputs with this lerp speed (1/s) when set.
    #[serde(default)]
    pub input_smoothing: Option<f64>,
    /// Attitude and heading hold layered on the keyframed inputs.
    #[serde(default)]
    pub stability_assist: Option<StabilityAssistConfig>,
    /// Interval between status lines (s).
    #[serde(default = "default_status_interval")]
    pub status_interval: f64,
}

fn default_status_interval() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialConditions {
    pub position: Vec3,
    /// World (NED) velocity.
    pub velocity: Vec3,
    /// Roll, pitch and yaw in degrees.
    pub attitude_deg: [f64; 3],
    pub rotor_rpm: f64,
    /// Start with the engine spooled up and governing.
    pub engine_running: bool,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            position: Vec3::zero(),
            velocity: Vec3::zero(),
            attitude_deg: [0.0; 3],
            rotor_rpm: 0.0,
            engine_running: false,
        }
    }
}

impl InitialConditions {
    pub fn body_state(&self) -> AircraftState {
        let [roll, pitch, yaw] = self.attitude_deg;
        AircraftState {
            position: self.position,
            velocity: self.velocity,
            orientation: Quat::from_euler(roll.to_radians(), pitch.to_radians(), yaw.to_radians()),
            angular_velocity: Vec3::zero(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ControlKeyframe {
    pub time: f64,
    pub inputs: ControlInputs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EventAction {
    StartEngine,
    StopEngine,
    Failure { kind: FailureKind },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScenarioEvent {
    pub time: f64,
    #[serde(flatten)]
    pub action: EventAction,
}

impl ScenarioConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        debug!("loaded scenario `{}`", config.name);
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_in_range("dt", self.dt, 1e-4, 0.1)?;
        require_positive("duration", self.duration)?;
        require_positive("status_interval", self.status_interval)?;
        if let Some(speed) = self.input_smoothing {
            require_positive("input_smoothing", speed)?;
        }
        if let Some(assist) = &self.stability_assist {
            assist.validate()?;
        }
        if !self.initial.position.is_finite() || !self.initial.velocity.is_finite() {
            return Err(ConfigError::invalid("initial", "position and velocity must be finite"));
        }
        require_in_range("initial.rotor_rpm", self.initial.rotor_rpm, 0.0, 2000.0)?;
        if self.controls.windows(2).any(|w| w[1].time < w[0].time) {
            return Err(ConfigError::invalid("controls", "keyframes must be sorted by time"));
        }
        if self.controls.iter().any(|k| !k.time.is_finite()) || self.events.iter().any(|e| !e.time.is_finite()) {
            return Err(ConfigError::invalid("events", "times must be finite"));
        }
        self.atmosphere.validate()
    }

    /// Control inputs at `time`, interpolated between keyframes and held
    /// beyond the ends.
    pub fn controls_at(&self, time: f64) -> ControlInputs {
        let (first, last) = match (self.controls.first(), self.controls.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return ControlInputs::neutral(),
        };
        if time <= first.time {
            return first.inputs.clamped();
        }
        if time >= last.time {
            return last.inputs.clamped();
        }

        let i = self.controls.partition_point(|k| k.time <= time).max(1);
        let (a, b) = (&self.controls[i - 1], &self.controls[i]);
        let span = b.time - a.time;
        let t = if span > 0.0 { (time - a.time) / span } else { 1.0 };
        a.inputs.lerp(&b.inputs, t)
    }

    /// Hover at 50 m with the engine already running.
    pub fn hover_test() -> Self {
        Self {
            name: "hover".to_string(),
            dt: 0.01,
            duration: 20.0,
            integration: IntegrationMode::Internal,
            initial: InitialConditions {
                position: Vec3::new(0.0, 0.0, -50.0),
                rotor_rpm: 390.0,
                engine_running: true,
                ..InitialConditions::default()
            },
            atmosphere: AtmosphereConfig::calm(),
            controls: vec![ControlKeyframe {
                time: 0.0,
                inputs: ControlInputs::new(0.42, 0.0, 0.0, 0.0, 1.0),
            }],
            events: Vec::new(),
            input_smoothing: None,
            stability_assist: Some(StabilityAssistConfig::default()),
            status_interval: 1.0,
        }
    }

    /// Cold start on the ground, spool up, then raise the collective.
    pub fn takeoff_test() -> Self {
        Self {
            name: "takeoff".to_string(),
            dt: 0.01,
            duration: 30.0,
            integration: IntegrationMode::Internal,
            initial: InitialConditions::default(),
            atmosphere: AtmosphereConfig::calm(),
            controls: vec![
                ControlKeyframe {
                    time: 0.0,
                    inputs: ControlInputs::new(0.0, 0.0, 0.0, 0.0, 1.0),
                },
                ControlKeyframe {
                    time: 18.0,
                    inputs: ControlInputs::new(0.0, 0.0, 0.0, 0.0, 1.0),
                },
                ControlKeyframe {
                    time: 20.0,
                    inputs: ControlInputs::new(0.5, 0.0, 0.0, 0.0, 1.0),
                },
            ],
            events: vec![ScenarioEvent {
                time: 0.0,
                action: EventAction::StartEngine,
            }],
            input_smoothing: None,
            stability_assist: Some(StabilityAssistConfig::default()),
            status_interval: 1.0,
        }
    }

    /// Engine failure in a steady descent along a prescribed path.
    pub fn autorotation_test() -> Self {
        Self {
            name: "autorotation".to_string(),
            dt: 0.01,
            duration: 60.0,
            integration: IntegrationMode::External,
            initial: InitialConditions {
                position: Vec3::new(0.0, 0.0, -800.0),
                velocity: Vec3::new(30.0, 0.0, 10.0),
                rotor_rpm: 390.0,
                engine_running: true,
                ..InitialConditions::default()
            },
            atmosphere: AtmosphereConfig::calm(),
            controls: vec![
                ControlKeyframe {
                    time: 0.0,
                    inputs: ControlInputs::new(0.3, 0.0, 0.0, 0.0, 1.0),
                },
                ControlKeyframe {
                    time: 5.0,
                    inputs: ControlInputs::new(0.3, 0.0, 0.0, 0.0, 1.0),
                },
                ControlKeyframe {
                    time: 6.0,
                    inputs: ControlInputs::new(0.0, 0.0, 0.0, 0.0, 1.0),
                },
            ],
            events: vec![ScenarioEvent {
                time: 5.0,
                action: EventAction::Failure {
                    kind: FailureKind::EngineOut,
                },
            }],
            input_smoothing: None,
            stability_assist: None,
            status_interval: 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn presets_validate() {
        for scenario in [
            ScenarioConfig::hover_test(),
            ScenarioConfig::takeoff_test(),
            ScenarioConfig::autorotation_test(),
        ] {
            scenario.validate().expect("preset validates");
        }
    }

    #[test]
    fn keyframes_interpolate_and_hold() {
        let scenario = ScenarioConfig::takeoff_test();
        assert_eq!(scenario.controls_at(-1.0).collective, 0.0);
        assert_relative_eq!(scenario.controls_at(19.0).collective, 0.25, epsilon = 1e-12);
        assert_eq!(scenario.controls_at(100.0).collective, 0.5);
    }

    #[test]
    fn events_parse_from_yaml() {
        let text = r#"
name: failure drill
dt: 0.01
duration: 10.0
events:
  - time: 1.0
    action: start_engine
  - time: 4.0
    action: failure
    kind: tail_rotor_loss
"#;
        let scenario = ScenarioConfig::from_yaml_str(text).expect("parses");
        assert_eq!(scenario.integration, IntegrationMode::Internal);
        assert_eq!(scenario.events.len(), 2);
        assert_eq!(
            scenario.events[1].action,
            EventAction::Failure {
                kind: FailureKind::TailRotorLoss
            }
        );
    }

    #[test]
    fn unsorted_keyframes_are_rejected() {
        let mut scenario = ScenarioConfig::takeoff_test();
        scenario.controls.reverse();
        assert!(scenario.validate().is_err());
    }
}
