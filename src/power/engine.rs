use crate::config::error::{require_in_range, require_non_negative, require_positive};
use crate::config::ConfigError;
use crate::control::PidController;
use crate::math::{curve_sin, RPM_TO_RAD_PER_SEC};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    Off,
    Starting,
    Running,
    Stopping,
    Failed,
    Autorotating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    EngineOut,
    GovernorFault,
    TailRotorLoss,
}

/// Outcome of an engine or failure request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStatus {
    Accepted,
    Ignored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Governed main rotor speed (rev/min).
    pub rated_rotor_rpm: f64,
    /// Maximum torque at the engine output shaft (N m).
    pub max_torque: f64,
    pub spool_up_time: f64,
    pub spool_down_time: f64,
    /// Time for a failed engine to unload and disengage the freewheel.
    pub disengage_time: f64,
    /// Governor gains against main rotor speed error in rad/s, producing
    /// torque at the main rotor shaft.
    pub governor_kp: f64,
    pub governor_ki: f64,
    /// Specific fuel consumption (kg per kW h).
    pub sfc: f64,
    pub fuel_capacity: f64,
    /// Start the engine when collective is raised with the engine off.
    #[serde(default)]
    pub auto_start: bool,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("engine.rated_rotor_rpm", self.rated_rotor_rpm)?;
        require_positive("engine.max_torque", self.max_torque)?;
        require_positive("engine.spool_up_time", self.spool_up_time)?;
        require_positive("engine.spool_down_time", self.spool_down_time)?;
        require_positive("engine.disengage_time", self.disengage_time)?;
        require_non_negative("engine.governor_kp", self.governor_kp)?;
        require_non_negative("engine.governor_ki", self.governor_ki)?;
        require_in_range("engine.sfc", self.sfc, 0.0, 2.0)?;
        require_non_negative("engine.fuel_capacity", self.fuel_capacity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    pub mode: EngineMode,
    pub throttle: f64,
    /// Current governor reference (rev/min of the main rotor).
    pub target_rpm: f64,
    /// Torque delivered at the main rotor shaft (N m).
    pub torque: f64,
    pub fuel: f64,
    /// 0 = stopped, 1 = fully spooled.
    pub spool: f64,
    pub governor: PidController,
    pub governor_fault: bool,
    failure_elapsed: f64,
    failure_torque: f64,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            mode: EngineMode::Off,
            throttle: 0.0,
            target_rpm: 0.0,
            torque: 0.0,
            fuel: config.fuel_capacity,
            spool: 0.0,
            governor: PidController::new(config.governor_kp, config.governor_ki, 0.0)
                .with_limits(f64::MAX, f64::MAX),
            governor_fault: false,
            failure_elapsed: 0.0,
            failure_torque: 0.0,
        }
    }

    /// Engine already spooled up and governing at rated speed.
    pub fn running(config: &EngineConfig) -> Self {
        Self {
            mode: EngineMode::Running,
            throttle: 1.0,
            target_rpm: config.rated_rotor_rpm,
            spool: 1.0,
            ..Self::new(config)
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.mode, EngineMode::Failed | EngineMode::Autorotating)
    }

    pub fn request_start(&mut self) -> TransitionStatus {
        match self.mode {
            EngineMode::Off | EngineMode::Stopping => {
                self.set_mode(EngineMode::Starting);
                TransitionStatus::Accepted
            }
            _ => TransitionStatus::Ignored,
        }
    }

    pub fn request_stop(&mut self) -> TransitionStatus {
        match self.mode {
            EngineMode::Starting | EngineMode::Running => {
                self.set_mode(EngineMode::Stopping);
                TransitionStatus::Accepted
            }
            _ => TransitionStatus::Ignored,
        }
    }

    /// Engine-side failures. Tail rotor loss is a drivetrain failure and is
    /// not handled here.
    pub fn inject_failure(&mut self, kind: FailureKind) -> TransitionStatus {
        match kind {
            FailureKind::EngineOut => match self.mode {
                EngineMode::Starting | EngineMode::Running | EngineMode::Stopping => {
                    self.failure_elapsed = 0.0;
                    self.failure_torque = self.torque;
                    self.set_mode(EngineMode::Failed);
                    TransitionStatus::Accepted
                }
                _ => TransitionStatus::Ignored,
            },
            FailureKind::GovernorFault if !self.governor_fault && !self.is_failed() => {
                warn!("governor fault: torque command frozen at {:.0} N m", self.torque);
                self.governor_fault = true;
                TransitionStatus::Accepted
            }
            _ => TransitionStatus::Ignored,
        }
    }

    fn set_mode(&mut self, mode: EngineMode) {
        if self.mode != mode {
            info!("engine {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }
}

/// Result of one engine step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineStep {
    /// Torque delivered at the main rotor shaft (N m).
    pub torque: f64,
    pub fuel_flow: f64,
}

/// Advances the engine one tick.
///
/// `demanded_torque` is the aerodynamic load reflected to the main rotor
/// shaft and is fed forward by the governor. `max_shaft_torque` is the full
/// throttle torque at the main rotor shaft.
pub fn step(
    state: &mut EngineState,
    config: &EngineConfig,
    throttle: f64,
    demanded_torque: f64,
    rotor_rpm: f64,
    max_shaft_torque: f64,
    dt: f64,
) -> EngineStep {
    state.throttle = if throttle.is_finite() { throttle.clamp(0.0, 1.0) } else { 0.0 };
    let omega = rotor_rpm.max(0.0) * RPM_TO_RAD_PER_SEC;

    match state.mode {
        EngineMode::Off => {
            state.spool = 0.0;
            state.target_rpm = 0.0;
            state.governor.reset();
        }
        EngineMode::Starting => {
            state.spool = (state.spool + dt / config.spool_up_time).min(1.0);
            if state.spool >= 1.0 {
                state.set_mode(EngineMode::Running);
            }
        }
        EngineMode::Running => state.spool = 1.0,
        EngineMode::Stopping => {
            state.spool = (state.spool - dt / config.spool_down_time).max(0.0);
            if state.spool <= 0.0 {
                state.set_mode(EngineMode::Off);
                state.governor.reset();
            }
        }
        EngineMode::Failed => {
            state.failure_elapsed += dt;
            if state.failure_elapsed >= config.disengage_time {
                state.set_mode(EngineMode::Autorotating);
            }
        }
        EngineMode::Autorotating => {}
    }

    let available = if state.fuel > 0.0 {
        state.throttle * max_shaft_torque
    } else {
        0.0
    };

    let torque = match state.mode {
        EngineMode::Off => 0.0,
        EngineMode::Failed => {
            let remaining = 1.0 - state.failure_elapsed / config.disengage_time;
            state.failure_torque.max(0.0) * remaining.clamp(0.0, 1.0)
        }
        EngineMode::Autorotating => 0.0,
        _ if state.governor_fault => state.torque.min(available),
        EngineMode::Starting | EngineMode::Running | EngineMode::Stopping => {
            state.target_rpm = config.rated_rotor_rpm * curve_sin(state.spool);
            let error = state.target_rpm * RPM_TO_RAD_PER_SEC - omega;
            state.governor.set_output_range(0.0, available);
            state.governor.update_with_feed_forward(error, demanded_torque.max(0.0), dt)
        }
    };
    let torque = if torque.is_finite() { torque } else { 0.0 };
    state.torque = torque;

    let power_kw = torque * omega / 1000.0;
    let fuel_flow = config.sfc * power_kw / 3600.0;
    state.fuel = (state.fuel - fuel_flow * dt).max(0.0);

    EngineStep { torque, fuel_flow }
}
