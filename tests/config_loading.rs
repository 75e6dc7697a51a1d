use rotary_wing::{AircraftConfig, ConfigError, ScenarioConfig};
use std::io::Write;

#[test]
fn aircraft_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    let text = serde_yaml::to_string(&AircraftConfig::light_utility()).expect("serializes");
    file.write_all(text.as_bytes()).expect("writes");

    let config = AircraftConfig::load(file.path()).expect("loads");
    assert_eq!(config.name, "Light Utility");
    assert_eq!(config.tail_rotor.blade_count, 2);
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.yaml");
    match AircraftConfig::load(&path) {
        Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected io error, got {:?}", other),
    }
}

#[test]
fn out_of_range_parameter_is_named() {
    let mut config = AircraftConfig::light_utility();
    config.main_rotor.radius = -1.0;
    let text = serde_yaml::to_string(&config).expect("serializes");
    match AircraftConfig::from_yaml_str(&text) {
        Err(ConfigError::InvalidParameter { name, .. }) => assert!(name.starts_with("main_rotor")),
        other => panic!("expected invalid parameter, got {:?}", other),
    }
}

#[test]
fn scenario_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"
name: cold start
dt: 0.02
duration: 30.0
controls:
  - time: 0.0
    inputs: {{ collective: 0.0, throttle: 1.0 }}
  - time: 20.0
    inputs: {{ collective: 0.45, throttle: 1.0 }}
events:
  - time: 0.0
    action: start_engine
"#
    )
    .expect("writes");

    let scenario = ScenarioConfig::load(file.path()).expect("loads");
    assert_eq!(scenario.controls.len(), 2);
    assert_eq!(scenario.controls_at(10.0).collective, 0.225);
}

#[test]
fn scenario_with_bad_timestep_is_rejected() {
    let mut scenario = ScenarioConfig::hover_test();
    scenario.dt = 0.5;
    let text = serde_yaml::to_string(&scenario).expect("serializes");
    assert!(matches!(
        ScenarioConfig::from_yaml_str(&text),
        Err(ConfigError::InvalidParameter { .. })
    ));
}
