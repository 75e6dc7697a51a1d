use crate::aero::{compute_fuselage_loads, Atmosphere, EnvironmentSample, RotorKind, RotorLoads, RotorModel, RotorState};
use crate::config::AircraftConfig;
use crate::control::{mix, ControlInputs};
use crate::math::Vec3;
use crate::physics::{accumulate_loads, sanitize_loads, AircraftState, Integrator, MassProperties, RungeKutta4};
use crate::power::{self, EngineMode, EngineState, FailureKind, TransitionStatus};
use crate::sim::SimError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MAX_TIMESTEP: f64 = 0.1;

/// Who owns the rigid-body integration, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMode {
    /// The core integrates and publishes the pose.
    #[default]
    Internal,
    /// The core only emits loads; the host supplies the body state.
    External,
}

/// Counters for conditions that were absorbed rather than reported as errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub sanitized_loads: u64,
    pub degenerate_rotor_evaluations: u64,
    pub rejected_ticks: u64,
    pub ignored_requests: u64,
    /// Touchdowns beyond the gear's sink rate or tilt limits.
    #[serde(default)]
    pub hard_contacts: u64,
}

/// Everything that evolves from tick to tick. Cloned to form a tick's
/// working copy and published wholesale on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimState {
    pub time: f64,
    pub body: AircraftState,
    pub main_rotor: RotorState,
    pub tail_rotor: RotorState,
    pub engine: EngineState,
    pub tail_rotor_lost: bool,
    pub on_ground: bool,
}

/// Serializable snapshot for save and restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub aircraft: String,
    pub state: SimState,
    pub controls: ControlInputs,
}

/// Loads produced by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickOutput {
    pub time: f64,
    /// Aerodynamic force and torque about the centre of gravity, gravity
    /// excluded.
    pub force_world: Vec3,
    pub torque_world: Vec3,
    pub force_body: Vec3,
    pub torque_body: Vec3,
    /// Upward force including weight (N); positive means the aircraft would
    /// accelerate upward.
    pub net_vertical_force: f64,
    pub main_rotor: RotorLoads,
    pub tail_rotor: RotorLoads,
    pub engine_torque: f64,
}

/// Read-only view of the published state.
#[derive(Debug, Clone, Copy)]
pub struct PublicState<'a> {
    pub time: f64,
    pub body: &'a AircraftState,
    pub main_rotor: &'a RotorState,
    pub tail_rotor: &'a RotorState,
    pub engine: &'a EngineState,
    pub controls: &'a ControlInputs,
    pub last_output: &'a TickOutput,
    pub diagnostics: &'a Diagnostics,
    pub tail_rotor_lost: bool,
    pub on_ground: bool,
}

/// One simulated helicopter: rotors, powerplant, mixer and rigid body stepped
/// in a fixed sequence each tick.
#[derive(Debug)]
pub struct Helicopter {
    config: Arc<AircraftConfig>,
    atmosphere: Arc<Atmosphere>,
    mass: MassProperties,
    mode: IntegrationMode,
    integrator: RungeKutta4,
    main_model: RotorModel,
    tail_model: RotorModel,
    state: SimState,
    controls: ControlInputs,
    last_output: TickOutput,
    diagnostics: Diagnostics,
}

impl Helicopter {
    pub fn new(config: Arc<AircraftConfig>, atmosphere: Arc<Atmosphere>, mode: IntegrationMode) -> Result<Self, SimError> {
        config.validate()?;
        atmosphere.config().validate()?;
        let mass = config.mass_properties()?;

        let mut body = AircraftState::new();
        body.position.z = -config.ground.rest_altitude(atmosphere.ground_elevation());

        let state = SimState {
            time: 0.0,
            body,
            main_rotor: RotorState::default(),
            tail_rotor: RotorState::default(),
            engine: EngineState::new(&config.engine),
            tail_rotor_lost: false,
            on_ground: true,
        };

        info!("created `{}` with {:?} integration", config.name, mode);

        Ok(Self {
            main_model: RotorModel::new(RotorKind::Main, &config.main_rotor),
            tail_model: RotorModel::new(RotorKind::Tail, &config.tail_rotor),
            config,
            atmosphere,
            mass,
            mode,
            integrator: RungeKutta4::new(),
            state,
            controls: ControlInputs::default(),
            last_output: TickOutput::default(),
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn config(&self) -> &AircraftConfig {
        &self.config
    }

    pub fn atmosphere(&self) -> &Atmosphere {
        &self.atmosphere
    }

    pub fn integration_mode(&self) -> IntegrationMode {
        self.mode
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn public_state(&self) -> PublicState<'_> {
        PublicState {
            time: self.state.time,
            body: &self.state.body,
            main_rotor: &self.state.main_rotor,
            tail_rotor: &self.state.tail_rotor,
            engine: &self.state.engine,
            controls: &self.controls,
            last_output: &self.last_output,
            diagnostics: &self.diagnostics,
            tail_rotor_lost: self.state.tail_rotor_lost,
            on_ground: self.state.on_ground,
        }
    }

    pub fn apply_control_inputs(&mut self, inputs: ControlInputs) {
        self.controls = inputs.clamped();
    }

    /// Places the aircraft. Allowed in either integration mode, typically
    /// before the first tick.
    pub fn set_initial_state(&mut self, body: AircraftState) -> Result<(), SimError> {
        self.state.body = Self::checked_body(body)?;
        self.state.on_ground = false;
        Ok(())
    }

    /// Supplies the host-integrated body state for the next tick.
    pub fn set_body_state(&mut self, body: AircraftState) -> Result<(), SimError> {
        if self.mode != IntegrationMode::External {
            return Err(SimError::WrongIntegrationMode("external"));
        }
        self.state.body = Self::checked_body(body)?;
        Ok(())
    }

    fn checked_body(mut body: AircraftState) -> Result<AircraftState, SimError> {
        if !body.is_finite() {
            return Err(SimError::InvalidState("non-finite component"));
        }
        body.orientation.renormalize();
        Ok(body)
    }

    /// Puts the engine straight into governed flight at rated speed.
    pub fn set_engine_running(&mut self) {
        self.state.engine = EngineState::running(&self.config.engine);
        self.set_rotor_rpm(self.config.engine.rated_rotor_rpm);
    }

    pub fn set_rotor_rpm(&mut self, rpm: f64) {
        let rpm = if rpm.is_finite() { rpm.max(0.0) } else { 0.0 };
        self.state.main_rotor.rpm = rpm;
        self.state.tail_rotor.rpm = if self.state.tail_rotor_lost {
            0.0
        } else {
            self.config.drivetrain.tail_rpm(rpm)
        };
    }

    pub fn request_engine_start(&mut self) -> TransitionStatus {
        let status = self.state.engine.request_start();
        self.count_ignored(status, "engine start");
        status
    }

    pub fn request_engine_stop(&mut self) -> TransitionStatus {
        let status = self.state.engine.request_stop();
        self.count_ignored(status, "engine stop");
        status
    }

    pub fn inject_failure(&mut self, kind: FailureKind) -> TransitionStatus {
        let status = match kind {
            FailureKind::TailRotorLoss if !self.state.tail_rotor_lost => {
                self.state.tail_rotor_lost = true;
                self.state.tail_rotor.rpm = 0.0;
                self.state.tail_rotor.induced_velocity = 0.0;
                TransitionStatus::Accepted
            }
            FailureKind::TailRotorLoss => TransitionStatus::Ignored,
            _ => self.state.engine.inject_failure(kind),
        };
        if status == TransitionStatus::Accepted {
            warn!("`{}`: injected {:?} at t={:.2}s", self.config.name, kind, self.state.time);
        }
        self.count_ignored(status, "failure injection");
        status
    }

    fn count_ignored(&mut self, status: TransitionStatus, what: &str) {
        if status == TransitionStatus::Ignored {
            self.diagnostics.ignored_requests += 1;
            info!("{} ignored in engine mode {:?}", what, self.state.engine.mode);
        }
    }

    pub fn save_state(&self) -> Snapshot {
        Snapshot {
            aircraft: self.config.name.clone(),
            state: self.state.clone(),
            controls: self.controls,
        }
    }

    pub fn restore_state(&mut self, snapshot: &Snapshot) -> Result<(), SimError> {
        let state = &snapshot.state;
        if !state.body.is_finite() || !state.time.is_finite() {
            return Err(SimError::InvalidState("snapshot holds non-finite values"));
        }
        if !(state.main_rotor.rpm >= 0.0) || !(state.tail_rotor.rpm >= 0.0) {
            return Err(SimError::InvalidState("snapshot holds negative rotor speed"));
        }
        self.state = state.clone();
        self.controls = snapshot.controls.clamped();
        Ok(())
    }

    /// Advances the simulation by `dt` seconds. On error nothing is published
    /// and the previous state remains current.
    pub fn tick(&mut self, dt: f64) -> Result<TickOutput, SimError> {
        if !dt.is_finite() || dt <= 0.0 || dt > MAX_TIMESTEP {
            return Err(SimError::InvalidTimestep(dt));
        }

        let config = Arc::clone(&self.config);
        let controls = self.controls;
        let mut next = self.state.clone();

        if config.engine.auto_start && next.engine.mode == EngineMode::Off && controls.collective > 0.0 {
            info!("`{}`: collective raised with engine off, starting", config.name);
            next.engine.request_start();
        }

        let commands = mix(&config.mixer, &config.main_rotor, &config.tail_rotor, &controls, next.main_rotor.torque);
        next.main_rotor.collective = commands.main.collective;
        next.main_rotor.cyclic_longitudinal = commands.main.cyclic_longitudinal;
        next.main_rotor.cyclic_lateral = commands.main.cyclic_lateral;
        next.tail_rotor.collective = commands.tail.collective;

        let body = next.body;
        let main_env = self.sample_at(&body, &config.main_rotor.hub_position, next.time);
        let main_velocity = Self::air_relative_velocity(&body, &config.main_rotor.hub_position, &main_env);
        let main_loads = self.main_model.compute_forces(
            &config.main_rotor,
            &next.main_rotor,
            &main_velocity,
            &main_env,
            &config.ground_effect,
            dt,
        );

        let tail_loads = if next.tail_rotor_lost {
            RotorLoads::default()
        } else {
            let tail_env = self.sample_at(&body, &config.tail_rotor.hub_position, next.time);
            let tail_velocity = Self::air_relative_velocity(&body, &config.tail_rotor.hub_position, &tail_env);
            self.tail_model.compute_forces(
                &config.tail_rotor,
                &next.tail_rotor,
                &tail_velocity,
                &tail_env,
                &config.ground_effect,
                dt,
            )
        };

        for loads in [&main_loads, &tail_loads] {
            if loads.degenerate {
                self.diagnostics.degenerate_rotor_evaluations += 1;
            }
        }
        Self::store_loads(&mut next.main_rotor, &main_loads);
        Self::store_loads(&mut next.tail_rotor, &tail_loads);

        let drivetrain = &config.drivetrain;
        let demanded = drivetrain.demanded_torque(main_loads.shaft_torque, tail_loads.shaft_torque);
        let engine = power::step(
            &mut next.engine,
            &config.engine,
            controls.throttle,
            demanded,
            next.main_rotor.rpm,
            config.max_shaft_torque(),
            dt,
        );
        let inertia = drivetrain.effective_inertia(
            config.main_rotor.inertia,
            config.tail_rotor.inertia,
            !next.tail_rotor_lost,
        );
        let rpm = drivetrain.advance_rpm(next.main_rotor.rpm, engine.torque, demanded, inertia, dt);
        next.main_rotor.rpm = rpm;
        next.tail_rotor.rpm = if next.tail_rotor_lost { 0.0 } else { drivetrain.tail_rpm(rpm) };
        next.main_rotor.advance_azimuth(config.main_rotor.rotation, dt);
        next.tail_rotor.advance_azimuth(config.tail_rotor.rotation, dt);

        let cg_env = self.atmosphere.sample(&body.position, next.time);
        let fuselage = compute_fuselage_loads(
            &config.fuselage,
            &Self::air_relative_velocity(&body, &Vec3::zero(), &cg_env),
            &body.angular_velocity,
            cg_env.density,
        );

        let (force, moment) = accumulate_loads(
            &[
                (main_loads.force, config.main_rotor.hub_position),
                (tail_loads.force, config.tail_rotor.hub_position),
                (fuselage.drag, Vec3::zero()),
            ],
            &[main_loads.moment, tail_loads.moment, fuselage.moment],
        );
        let loads = sanitize_loads(&force, &moment, &config.limits);
        self.diagnostics.sanitized_loads += u64::from(loads.substitutions);

        let force_world = body.body_to_world(&loads.force);
        let output = TickOutput {
            time: next.time + dt,
            force_world,
            torque_world: body.body_to_world(&loads.moment),
            force_body: loads.force,
            torque_body: loads.moment,
            net_vertical_force: -force_world.z - self.mass.weight(),
            main_rotor: main_loads,
            tail_rotor: tail_loads,
            engine_torque: engine.torque,
        };

        if self.mode == IntegrationMode::Internal {
            let mut integrated = self.integrator.integrate(&body, &loads.force, &loads.moment, &self.mass, dt);
            if !integrated.is_finite() {
                self.diagnostics.rejected_ticks += 1;
                warn!("`{}`: integration produced non-finite state at t={:.3}s", config.name, next.time);
                return Err(SimError::NumericalFault("rigid-body integration"));
            }
            let contact = config
                .ground
                .resolve(&mut integrated, self.atmosphere.ground_elevation(), dt);
            if contact.hard {
                self.diagnostics.hard_contacts += 1;
                warn!(
                    "`{}`: hard ground contact at t={:.3}s, sink {:.2} m/s, tilt {:.2} rad",
                    config.name, next.time, contact.impact_speed, contact.tilt
                );
            }
            next.on_ground = contact.in_contact;
            next.body = integrated;
        }

        next.time += dt;
        self.state = next;
        self.last_output = output;
        Ok(output)
    }

    fn sample_at(&self, body: &AircraftState, arm: &Vec3, time: f64) -> EnvironmentSample {
        let position = body.position + body.body_to_world(arm);
        self.atmosphere.sample(&position, time)
    }

    /// Velocity of a body-fixed point relative to the local air mass, body axes.
    fn air_relative_velocity(body: &AircraftState, arm: &Vec3, env: &EnvironmentSample) -> Vec3 {
        body.point_velocity(arm) - body.world_to_body(&env.air_velocity())
    }

    fn store_loads(rotor: &mut RotorState, loads: &RotorLoads) {
        rotor.induced_velocity = loads.induced_velocity;
        rotor.thrust = loads.thrust;
        rotor.torque = loads.shaft_torque;
        rotor.flap = loads.flap;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn helicopter(mode: IntegrationMode) -> Helicopter {
        Helicopter::new(
            Arc::new(AircraftConfig::light_utility()),
            Arc::new(Atmosphere::calm()),
            mode,
        )
        .expect("preset builds")
    }

    #[test]
    fn starts_at_rest_on_the_gear() {
        let heli = helicopter(IntegrationMode::Internal);
        let state = heli.public_state();
        assert!(state.on_ground);
        assert_relative_eq!(state.body.altitude(), heli.config().ground.gear_height);
        assert_eq!(state.engine.mode, EngineMode::Off);
    }

    #[test]
    fn bad_timestep_publishes_nothing() {
        let mut heli = helicopter(IntegrationMode::Internal);
        assert!(matches!(heli.tick(0.0), Err(SimError::InvalidTimestep(_))));
        assert!(matches!(heli.tick(f64::NAN), Err(SimError::InvalidTimestep(_))));
        assert!(matches!(heli.tick(0.5), Err(SimError::InvalidTimestep(_))));
        assert_eq!(heli.public_state().time, 0.0);
    }

    #[test]
    fn body_state_only_settable_in_external_mode() {
        let mut internal = helicopter(IntegrationMode::Internal);
        assert!(matches!(
            internal.set_body_state(AircraftState::at_altitude(10.0)),
            Err(SimError::WrongIntegrationMode(_))
        ));

        let mut external = helicopter(IntegrationMode::External);
        external.set_body_state(AircraftState::at_altitude(10.0)).expect("external accepts");
        let mut bad = AircraftState::new();
        bad.velocity.x = f64::INFINITY;
        assert!(external.set_body_state(bad).is_err());
        assert_relative_eq!(external.public_state().body.altitude(), 10.0);
    }

    #[test]
    fn invalid_requests_are_counted() {
        let mut heli = helicopter(IntegrationMode::Internal);
        assert_eq!(heli.request_engine_stop(), TransitionStatus::Ignored);
        assert_eq!(heli.request_engine_start(), TransitionStatus::Accepted);
        assert_eq!(heli.request_engine_start(), TransitionStatus::Ignored);
        assert_eq!(heli.diagnostics().ignored_requests, 2);
    }

    #[test]
    fn tail_rotor_loss_stops_tail_loads() {
        let mut heli = helicopter(IntegrationMode::External);
        heli.set_body_state(AircraftState::at_altitude(200.0)).expect("valid state");
        heli.set_engine_running();
        heli.apply_control_inputs(ControlInputs::new(0.4, 0.0, 0.0, 0.0, 1.0));
        heli.tick(0.01).expect("tick");
        assert!(heli.public_state().tail_rotor.rpm > 0.0);

        assert_eq!(heli.inject_failure(FailureKind::TailRotorLoss), TransitionStatus::Accepted);
        assert_eq!(heli.inject_failure(FailureKind::TailRotorLoss), TransitionStatus::Ignored);
        let out = heli.tick(0.01).expect("tick");
        assert_eq!(out.tail_rotor.force, Vec3::zero());
        assert_eq!(heli.public_state().tail_rotor.rpm, 0.0);
    }

    #[test]
    fn auto_start_on_collective() {
        let mut config = AircraftConfig::light_utility();
        config.engine.auto_start = true;
        let mut heli = Helicopter::new(Arc::new(config), Arc::new(Atmosphere::calm()), IntegrationMode::Internal)
            .expect("builds");
        heli.apply_control_inputs(ControlInputs::new(0.0, 0.0, 0.0, 0.0, 1.0));
        heli.tick(0.01).expect("tick");
        assert_eq!(heli.public_state().engine.mode, EngineMode::Off);

        heli.apply_control_inputs(ControlInputs::new(0.1, 0.0, 0.0, 0.0, 1.0));
        heli.tick(0.01).expect("tick");
        assert_eq!(heli.public_state().engine.mode, EngineMode::Starting);
    }

    #[test]
    fn snapshot_restores_identical_trajectory() {
        let mut heli = helicopter(IntegrationMode::Internal);
        heli.set_initial_state(AircraftState::at_altitude(100.0)).expect("valid");
        heli.set_engine_running();
        heli.apply_control_inputs(ControlInputs::new(0.45, 0.1, -0.05, 0.1, 1.0));
        for _ in 0..50 {
            heli.tick(0.01).expect("tick");
        }

        let snapshot = heli.save_state();
        let yaml = serde_yaml::to_string(&snapshot).expect("serializes");
        let first: Vec<TickOutput> = (0..50).map(|_| heli.tick(0.01).expect("tick")).collect();

        let restored: Snapshot = serde_yaml::from_str(&yaml).expect("parses");
        heli.restore_state(&restored).expect("restores");
        let second: Vec<TickOutput> = (0..50).map(|_| heli.tick(0.01).expect("tick")).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn invalid_atmosphere_is_rejected() {
        let mut atmosphere = crate::aero::AtmosphereConfig::calm();
        atmosphere.gust.wavelength = 0.0;
        let result = Helicopter::new(
            Arc::new(AircraftConfig::light_utility()),
            Arc::new(Atmosphere::new(atmosphere)),
            IntegrationMode::Internal,
        );
        assert!(matches!(
            result,
            Err(SimError::Config(crate::config::ConfigError::InvalidParameter { .. }))
        ));
    }

    #[test]
    fn overflowing_integration_is_rejected_without_publishing() {
        let mut heli = helicopter(IntegrationMode::Internal);
        let mut body = AircraftState::at_altitude(100.0);
        body.angular_velocity = Vec3::new(1e160, 1e160, 1e160);
        heli.set_initial_state(body).expect("finite state is accepted");
        let before = *heli.public_state().body;

        assert!(matches!(heli.tick(0.01), Err(SimError::NumericalFault(_))));
        assert_eq!(*heli.public_state().body, before);
        assert_eq!(heli.public_state().time, 0.0);
        assert_eq!(heli.diagnostics().rejected_ticks, 1);
    }

    #[test]
    fn hard_touchdown_is_counted() {
        let mut heli = helicopter(IntegrationMode::Internal);
        let mut body = AircraftState::at_altitude(heli.config().ground.gear_height + 0.01);
        body.velocity = Vec3::new(0.0, 0.0, 8.0);
        heli.set_initial_state(body).expect("valid state");

        heli.tick(0.01).expect("tick");
        assert!(heli.public_state().on_ground);
        assert_eq!(heli.diagnostics().hard_contacts, 1);

        heli.tick(0.01).expect("tick");
        assert_eq!(heli.diagnostics().hard_contacts, 1);
    }
}
