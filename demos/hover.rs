use rotary_wing::{
    aero::Atmosphere,
    control::{ControlInputs, CubicBezier, PidController, StabilityAssist, StabilityAssistConfig, VirtualThrottle},
    physics::AircraftState,
    sim::{FlightTelemetry, Helicopter, IntegrationMode},
    AircraftConfig,
};
use std::sync::Arc;

/// Host-side altitude hold: a PID on collective, shaped through a response
/// curve, with the throttle pushed up through a virtual throttle lever and
/// the stability assist holding attitude.
fn main() {
    env_logger::init();

    let config = Arc::new(AircraftConfig::light_utility());
    let atmosphere = Arc::new(Atmosphere::calm());
    let mut heli = match Helicopter::new(config, atmosphere, IntegrationMode::Internal) {
        Ok(heli) => heli,
        Err(e) => {
            eprintln!("failed to build helicopter: {}", e);
            return;
        }
    };

    let target_altitude = 30.0;
    if let Err(e) = heli.set_initial_state(AircraftState::at_altitude(target_altitude)) {
        eprintln!("bad initial state: {}", e);
        return;
    }
    heli.set_engine_running();

    let mut altitude_hold = PidController::new(0.08, 0.02, 0.12).with_limits(5.0, 0.5);
    let response = CubicBezier::new([0.0, 0.0], [0.3, 0.1], [0.7, 0.9], [1.0, 1.0]);
    let mut throttle = VirtualThrottle::default();
    let mut assist = StabilityAssist::new(StabilityAssistConfig::default());

    let dt = 0.01;
    println!("{}", FlightTelemetry::CSV_HEADER);
    for step in 0..2000 {
        let altitude = heli.public_state().body.altitude();
        let lever = (0.42 + altitude_hold.update(target_altitude - altitude, dt)).clamp(0.0, 1.0);
        let throttle_axis = if throttle.value() < 1.0 { 1.0 } else { 0.0 };

        let pilot = ControlInputs::new(response.y_for_x(lever), 0.0, 0.0, 0.0, throttle.update(throttle_axis, dt));
        let inputs = assist.apply(pilot, heli.public_state().body, dt);
        heli.apply_control_inputs(inputs);

        if let Err(e) = heli.tick(dt) {
            eprintln!("tick {} rejected: {}", step, e);
            return;
        }
        if step % 100 == 0 {
            println!("{}", FlightTelemetry::capture(&heli).csv_row());
        }
    }

    let last = FlightTelemetry::capture(&heli);
    eprintln!("\nHover results:");
    eprintln!("Final altitude: {:.2} m (target: {:.1} m)", last.altitude, target_altitude);
    eprintln!("Vertical speed: {:.3} m/s", last.vertical_speed);
    eprintln!("Rotor: {:.1} rpm, engine torque {:.0} N m", last.main_rotor_rpm, last.engine_torque);
}
