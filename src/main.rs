use log::{error, info};
use rotary_wing::{AircraftConfig, ScenarioConfig, SimError, Simulator};
use std::path::PathBuf;
use structopt::StructOpt;

/// Run a helicopter flight-dynamics scenario
#[derive(Debug, StructOpt)]
#[structopt(name = "rotary-wing")]
struct Opt {
    /// Aircraft configuration (YAML); defaults to the built-in light utility preset
    #[structopt(short, long, parse(from_os_str))]
    aircraft: Option<PathBuf>,

    /// Scenario file (YAML); overrides --preset
    #[structopt(short, long, parse(from_os_str))]
    scenario: Option<PathBuf>,

    /// Built-in scenario: hover, takeoff or autorotation
    #[structopt(short, long, default_value = "hover")]
    preset: String,

    /// Override the scenario duration (s)
    #[structopt(short, long)]
    duration: Option<f64>,

    /// Telemetry CSV output
    #[structopt(short, long, default_value = "flight_data.csv", parse(from_os_str))]
    output: PathBuf,
}

fn preset_scenario(name: &str) -> Option<ScenarioConfig> {
    match name {
        "hover" => Some(ScenarioConfig::hover_test()),
        "takeoff" => Some(ScenarioConfig::takeoff_test()),
        "autorotation" => Some(ScenarioConfig::autorotation_test()),
        _ => None,
    }
}

fn run(opt: &Opt) -> Result<(), SimError> {
    let aircraft = match &opt.aircraft {
        Some(path) => AircraftConfig::load(path)?,
        None => AircraftConfig::light_utility(),
    };

    let mut scenario = match &opt.scenario {
        Some(path) => ScenarioConfig::load(path)?,
        None => match preset_scenario(&opt.preset) {
            Some(scenario) => scenario,
            None => {
                error!("unknown preset `{}`, using hover", opt.preset);
                ScenarioConfig::hover_test()
            }
        },
    };
    if let Some(duration) = opt.duration {
        scenario.duration = duration;
    }

    info!("Rotary-wing flight dynamics");
    info!("aircraft: {}, scenario: {}", aircraft.name, scenario.name);

    let mut simulator = Simulator::new(aircraft, scenario)?;
    simulator.run()?;
    simulator.export_telemetry(&opt.output)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opt = Opt::from_args();

    if let Err(e) = run(&opt) {
        error!("simulation failed: {}", e);
        std::process::exit(1);
    }
}
