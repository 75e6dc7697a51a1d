use crate::math::{Vec3, GRAVITY, MPS_TO_KNOTS};
use crate::power::EngineMode;
use crate::sim::{Helicopter, TickOutput};
use serde::Serialize;

/// Cockpit-style readout derived from the published state.
#[derive(Debug, Clone, Serialize)]
pub struct FlightTelemetry {
    pub time: f64,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Roll, pitch and yaw (rad).
    pub attitude: (f64, f64, f64),
    pub angular_velocity: Vec3,
    /// Horizontal speed relative to the air mass (m/s).
    pub lateral_airspeed: f64,
    pub lateral_airspeed_knots: f64,
    /// Positive climbing (m/s).
    pub vertical_speed: f64,
    /// Degrees, [0, 360).
    pub heading: f64,
    pub altitude: f64,
    pub radar_altitude: f64,
    pub g_load: f64,
    pub main_rotor_rpm: f64,
    pub tail_rotor_rpm: f64,
    pub main_rotor_azimuth: f64,
    pub coning: f64,
    pub collective_pitch: f64,
    pub tail_collective_pitch: f64,
    pub engine_mode: EngineMode,
    pub engine_torque: f64,
    pub fuel: f64,
    pub main_rotor_thrust: f64,
    pub net_vertical_force: f64,
    pub on_ground: bool,
}

impl FlightTelemetry {
    pub fn capture(heli: &Helicopter) -> Self {
        let state = heli.public_state();
        let body = state.body;
        let env = heli.atmosphere().sample(&body.position, state.time);

        let air = body.velocity - env.air_velocity();
        let lateral_airspeed = (air.x * air.x + air.y * air.y).sqrt();
        let attitude = body.orientation.to_euler();

        Self {
            time: state.time,
            position: body.position,
            velocity: body.velocity,
            attitude,
            angular_velocity: body.angular_velocity,
            lateral_airspeed,
            lateral_airspeed_knots: lateral_airspeed * MPS_TO_KNOTS,
            vertical_speed: -body.velocity.z,
            heading: attitude.2.to_degrees().rem_euclid(360.0),
            altitude: body.altitude(),
            radar_altitude: env.height_above_ground.max(0.0),
            g_load: g_load(state.last_output, heli.config().mass),
            main_rotor_rpm: state.main_rotor.rpm,
            tail_rotor_rpm: state.tail_rotor.rpm,
            main_rotor_azimuth: state.main_rotor.azimuth,
            coning: state.main_rotor.flap_angle(),
            collective_pitch: state.main_rotor.collective,
            tail_collective_pitch: state.tail_rotor.collective,
            engine_mode: state.engine.mode,
            engine_torque: state.engine.torque,
            fuel: state.engine.fuel,
            main_rotor_thrust: state.main_rotor.thrust,
            net_vertical_force: state.last_output.net_vertical_force,
            on_ground: state.on_ground,
        }
    }

    pub const CSV_HEADER: &'static str = "time,x,y,z,vx,vy,vz,roll,pitch,yaw,airspeed_kt,vertical_speed,heading,\
radar_altitude,g_load,main_rpm,tail_rpm,azimuth,coning,collective,engine_mode,engine_torque,fuel";

    pub fn csv_row(&self) -> String {
        let (roll, pitch, yaw) = self.attitude;
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{:?},{},{}",
            self.time,
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
            roll,
            pitch,
            yaw,
            self.lateral_airspeed_knots,
            self.vertical_speed,
            self.heading,
            self.radar_altitude,
            self.g_load,
            self.main_rotor_rpm,
            self.tail_rotor_rpm,
            self.main_rotor_azimuth,
            self.coning,
            self.collective_pitch,
            self.engine_mode,
            self.engine_torque,
            self.fuel,
        )
    }
}

/// Load factor along the body vertical: 1 in steady hover, 0 in free fall.
fn g_load(output: &TickOutput, mass: f64) -> f64 {
    -output.force_body.z / (mass * GRAVITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aero::Atmosphere;
    use crate::config::AircraftConfig;
    use crate::math::Quat;
    use crate::physics::AircraftState;
    use crate::sim::IntegrationMode;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    #[test]
    fn derived_quantities() {
        let mut heli = Helicopter::new(
            Arc::new(AircraftConfig::light_utility()),
            Arc::new(Atmosphere::calm()),
            IntegrationMode::External,
        )
        .expect("preset builds");

        let mut body = AircraftState::at_altitude(120.0);
        body.velocity = Vec3::new(3.0, 4.0, -2.0);
        body.orientation = Quat::from_euler(0.0, 0.0, -std::f64::consts::FRAC_PI_2);
        heli.set_body_state(body).expect("valid state");

        let telemetry = FlightTelemetry::capture(&heli);
        assert_relative_eq!(telemetry.lateral_airspeed, 5.0, epsilon = 1e-12);
        assert_relative_eq!(telemetry.lateral_airspeed_knots, 5.0 * MPS_TO_KNOTS, epsilon = 1e-9);
        assert_relative_eq!(telemetry.vertical_speed, 2.0);
        assert_relative_eq!(telemetry.heading, 270.0, epsilon = 1e-9);
        assert_relative_eq!(telemetry.radar_altitude, 120.0, epsilon = 1e-9);
        assert_eq!(telemetry.csv_row().split(',').count(), FlightTelemetry::CSV_HEADER.split(',').count());
    }
}
