use crate::aero::Atmosphere;
use crate::config::{AircraftConfig, EventAction, ScenarioConfig};
use crate::control::{ControlInputs, Dampen, StabilityAssist};
use crate::physics::AircraftState;
use crate::sim::{FlightTelemetry, Helicopter, IntegrationMode, SimError};
use log::{info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Runs a scripted scenario against one helicopter: keyframed controls,
/// timed events and a telemetry log.
pub struct Simulator {
    pub helicopter: Helicopter,
    pub scenario: ScenarioConfig,
    pub running: bool,
    pub telemetry_log: Vec<FlightTelemetry>,
    next_event: usize,
    next_status: f64,
    smoothing: Option<InputSmoothing>,
    assist: Option<StabilityAssist>,
    /// Prescribed path for external integration: constant velocity, level.
    prescribed: AircraftState,
}

#[derive(Debug, Clone)]
struct InputSmoothing {
    collective: Dampen,
    cyclic_pitch: Dampen,
    cyclic_roll: Dampen,
    pedal: Dampen,
}

impl InputSmoothing {
    fn new(speed: f64) -> Self {
        Self {
            collective: Dampen::new(speed),
            cyclic_pitch: Dampen::new(speed),
            cyclic_roll: Dampen::new(speed),
            pedal: Dampen::new(speed),
        }
    }

    fn apply(&mut self, raw: ControlInputs, dt: f64) -> ControlInputs {
        ControlInputs::new(
            self.collective.update(raw.collective, dt),
            self.cyclic_pitch.update(raw.cyclic_pitch, dt),
            self.cyclic_roll.update(raw.cyclic_roll, dt),
            self.pedal.update(raw.pedal, dt),
            raw.throttle,
        )
    }
}

impl Simulator {
    pub fn new(aircraft: AircraftConfig, mut scenario: ScenarioConfig) -> Result<Self, SimError> {
        scenario.validate()?;
        scenario.events.sort_by(|a, b| a.time.total_cmp(&b.time));
        let atmosphere = Arc::new(Atmosphere::new(scenario.atmosphere.clone()));
        let mut helicopter = Helicopter::new(Arc::new(aircraft), atmosphere, scenario.integration)?;

        let initial = &scenario.initial;
        let body = initial.body_state();
        let rest = helicopter.config().ground.rest_altitude(helicopter.atmosphere().ground_elevation());
        if body.altitude() > rest || scenario.integration == IntegrationMode::External {
            helicopter.set_initial_state(body)?;
        }
        if initial.engine_running {
            helicopter.set_engine_running();
        }
        if initial.rotor_rpm > 0.0 {
            helicopter.set_rotor_rpm(initial.rotor_rpm);
        }
        helicopter.apply_control_inputs(scenario.controls_at(0.0));

        let prescribed = *helicopter.public_state().body;
        let smoothing = scenario.input_smoothing.map(InputSmoothing::new);
        let assist = scenario.stability_assist.map(StabilityAssist::new);

        Ok(Self {
            helicopter,
            scenario,
            running: false,
            telemetry_log: Vec::new(),
            next_event: 0,
            next_status: 0.0,
            smoothing,
            assist,
            prescribed,
        })
    }

    pub fn time(&self) -> f64 {
        self.helicopter.public_state().time
    }

    pub fn start(&mut self) {
        self.running = true;
        self.telemetry_log.clear();
        if let Some(assist) = self.assist.as_mut() {
            assist.reset();
        }

        info!("scenario `{}` started", self.scenario.name);
        info!("aircraft: {}", self.helicopter.config().name);
        info!(
            "initial altitude {:.1} m, {:?} integration",
            self.helicopter.public_state().body.altitude(),
            self.helicopter.integration_mode()
        );
    }

    /// Advances one scenario step. Returns `Ok(false)` once the scenario is
    /// over.
    pub fn step(&mut self) -> Result<bool, SimError> {
        let time = self.time();
        if !self.running || time >= self.scenario.duration - 1e-9 {
            return Ok(false);
        }
        let dt = self.scenario.dt;

        self.fire_events(time);

        let raw = self.scenario.controls_at(time);
        let mut inputs = match self.smoothing.as_mut() {
            Some(smoothing) => smoothing.apply(raw, dt),
            None => raw,
        };
        if let Some(assist) = self.assist.as_mut() {
            inputs = assist.apply(inputs, self.helicopter.public_state().body, dt);
        }
        self.helicopter.apply_control_inputs(inputs);

        if self.helicopter.integration_mode() == IntegrationMode::External {
            self.helicopter.set_body_state(self.prescribed)?;
        }

        self.helicopter.tick(dt)?;
        if self.helicopter.integration_mode() == IntegrationMode::External {
            self.advance_prescribed(dt);
        }

        let telemetry = FlightTelemetry::capture(&self.helicopter);
        if telemetry.time + 1e-9 >= self.next_status {
            self.print_status(&telemetry);
            self.next_status += self.scenario.status_interval;
        }

        let ground_contact_lost = telemetry.radar_altitude <= 0.0;
        self.telemetry_log.push(telemetry);
        if ground_contact_lost {
            warn!("scenario stopped: aircraft below terrain");
            self.running = false;
            return Ok(false);
        }

        Ok(true)
    }

    pub fn run(&mut self) -> Result<(), SimError> {
        self.start();
        while self.step()? {}
        self.finish();
        Ok(())
    }

    pub fn finish(&mut self) {
        self.running = false;

        let diagnostics = self.helicopter.diagnostics();
        info!("scenario `{}` completed", self.scenario.name);
        info!("total time {:.2} s, {} telemetry points", self.time(), self.telemetry_log.len());
        info!(
            "diagnostics: {} sanitized loads, {} degenerate rotor evaluations, {} rejected ticks, {} ignored requests, {} hard contacts",
            diagnostics.sanitized_loads,
            diagnostics.degenerate_rotor_evaluations,
            diagnostics.rejected_ticks,
            diagnostics.ignored_requests,
            diagnostics.hard_contacts
        );

        if let Some(last) = self.telemetry_log.last() {
            info!(
                "final: position ({:.1}, {:.1}, {:.1}) m, airspeed {:.1} kt, rotor {:.0} rpm, engine {:?}",
                last.position.x,
                last.position.y,
                last.position.z,
                last.lateral_airspeed_knots,
                last.main_rotor_rpm,
                last.engine_mode
            );
        }
    }

    fn fire_events(&mut self, time: f64) {
        while let Some(event) = self.scenario.events.get(self.next_event) {
            if event.time > time + 1e-9 {
                break;
            }
            let action = event.action;
            self.next_event += 1;

            let status = match action {
                EventAction::StartEngine => self.helicopter.request_engine_start(),
                EventAction::StopEngine => self.helicopter.request_engine_stop(),
                EventAction::Failure { kind } => self.helicopter.inject_failure(kind),
            };
            info!("t={:.2}s event {:?}: {:?}", time, action, status);
        }
    }

    /// The host side of external integration: the prescribed path keeps its
    /// velocity and attitude, only the position moves.
    fn advance_prescribed(&mut self, dt: f64) {
        self.prescribed.position = self.prescribed.position + self.prescribed.velocity * dt;
    }

    fn print_status(&self, telemetry: &FlightTelemetry) {
        let (roll, pitch, yaw) = telemetry.attitude;
        info!(
            "t={:6.1}s | Alt={:6.1}m | IAS={:5.1}kt | VS={:5.1}m/s | RPY=({:5.1},{:5.1},{:5.1}) deg",
            telemetry.time,
            telemetry.altitude,
            telemetry.lateral_airspeed_knots,
            telemetry.vertical_speed,
            roll.to_degrees(),
            pitch.to_degrees(),
            yaw.to_degrees()
        );
        info!(
            "         | Rotor={:5.1}rpm | Engine={:?} Q={:7.0}Nm | Fuel={:5.1}kg | g={:4.2}",
            telemetry.main_rotor_rpm,
            telemetry.engine_mode,
            telemetry.engine_torque,
            telemetry.fuel,
            telemetry.g_load
        );
    }

    pub fn export_telemetry(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let path = path.as_ref();
        let mut file = BufWriter::new(File::create(path)?);
        writeln!(file, "{}", FlightTelemetry::CSV_HEADER)?;
        for telemetry in &self.telemetry_log {
            writeln!(file, "{}", telemetry.csv_row())?;
        }
        file.flush()?;

        info!("telemetry exported to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::EngineMode;
    use approx::assert_relative_eq;

    #[test]
    fn hover_scenario_runs_and_exports() {
        let mut scenario = ScenarioConfig::hover_test();
        scenario.duration = 0.5;
        let mut sim = Simulator::new(AircraftConfig::light_utility(), scenario).expect("builds");
        sim.run().expect("runs");

        assert_eq!(sim.telemetry_log.len(), 50);
        assert_relative_eq!(sim.time(), 0.5, epsilon = 1e-9);

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("flight.csv");
        sim.export_telemetry(&path).expect("exports");
        let text = std::fs::read_to_string(&path).expect("readable");
        assert_eq!(text.lines().count(), 51);
        assert!(text.starts_with("time,"));
    }

    #[test]
    fn hover_preset_holds_attitude() {
        let mut scenario = ScenarioConfig::hover_test();
        scenario.duration = 5.0;
        let mut sim = Simulator::new(AircraftConfig::light_utility(), scenario).expect("builds");
        sim.run().expect("runs");

        assert_eq!(sim.telemetry_log.len(), 500);
        for telemetry in &sim.telemetry_log {
            let (roll, pitch, _) = telemetry.attitude;
            assert!(
                roll.abs() < 0.3 && pitch.abs() < 0.3,
                "attitude ({:.3}, {:.3}) rad at t={:.2}s",
                roll,
                pitch,
                telemetry.time
            );
        }
        assert!(!sim.helicopter.public_state().on_ground);
    }

    #[test]
    fn events_fire_in_time_order() {
        let mut scenario = ScenarioConfig::takeoff_test();
        scenario.duration = 0.2;
        scenario.events.push(crate::config::ScenarioEvent {
            time: 0.1,
            action: EventAction::StopEngine,
        });
        scenario.events.reverse();
        let mut sim = Simulator::new(AircraftConfig::light_utility(), scenario).expect("builds");
        sim.run().expect("runs");
        // Barely spooled when stopped, so it winds down within the run.
        assert_eq!(sim.helicopter.public_state().engine.mode, EngineMode::Off);
        assert_eq!(sim.helicopter.diagnostics().ignored_requests, 0);
    }

    #[test]
    fn external_scenario_follows_prescribed_path() {
        let mut scenario = ScenarioConfig::autorotation_test();
        scenario.duration = 1.0;
        let mut sim = Simulator::new(AircraftConfig::light_utility(), scenario).expect("builds");
        sim.run().expect("runs");
        let body = sim.helicopter.public_state().body;
        // The body state set before the last tick is one step behind the path.
        assert_relative_eq!(body.position.x, 30.0 * 0.99, epsilon = 1e-6);
        assert_relative_eq!(body.altitude(), 800.0 - 10.0 * 0.99, epsilon = 1e-6);
    }
}
