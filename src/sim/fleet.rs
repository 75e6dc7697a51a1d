use crate::sim::{Helicopter, SimError, TickOutput};
use rayon::prelude::*;

/// Independent helicopters ticked in parallel. Instances share nothing
/// mutable, so results match ticking them one by one.
#[derive(Debug, Default)]
pub struct Fleet {
    members: Vec<Helicopter>,
    results: Vec<Result<TickOutput, SimError>>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, helicopter: Helicopter) -> usize {
        self.members.push(helicopter);
        self.members.len() - 1
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Helicopter> {
        self.members.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Helicopter> {
        self.members.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Helicopter> {
        self.members.iter()
    }

    /// Ticks every member by `dt`. A failing member keeps its previous state
    /// and reports its error in its own slot.
    pub fn tick(&mut self, dt: f64) -> &[Result<TickOutput, SimError>] {
        self.members
            .par_iter_mut()
            .map(|heli| heli.tick(dt))
            .collect_into_vec(&mut self.results);
        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aero::Atmosphere;
    use crate::config::AircraftConfig;
    use crate::control::ControlInputs;
    use crate::physics::AircraftState;
    use crate::sim::IntegrationMode;
    use std::sync::Arc;

    fn member(config: &Arc<AircraftConfig>, atmosphere: &Arc<Atmosphere>, collective: f64) -> Helicopter {
        let mut heli = Helicopter::new(Arc::clone(config), Arc::clone(atmosphere), IntegrationMode::Internal)
            .expect("preset builds");
        heli.set_initial_state(AircraftState::at_altitude(100.0)).expect("valid");
        heli.set_engine_running();
        heli.apply_control_inputs(ControlInputs::new(collective, 0.0, 0.0, 0.0, 1.0));
        heli
    }

    #[test]
    fn parallel_matches_sequential() {
        let config = Arc::new(AircraftConfig::light_utility());
        let atmosphere = Arc::new(Atmosphere::calm());
        let collectives = [0.2, 0.4, 0.6, 0.8];

        let mut fleet = Fleet::new();
        let mut solo: Vec<Helicopter> = Vec::new();
        for &c in &collectives {
            fleet.push(member(&config, &atmosphere, c));
            solo.push(member(&config, &atmosphere, c));
        }

        for _ in 0..20 {
            let results = fleet.tick(0.01);
            assert!(results.iter().all(|r| r.is_ok()));
            for heli in solo.iter_mut() {
                heli.tick(0.01).expect("tick");
            }
        }

        for (parallel, sequential) in fleet.iter().zip(&solo) {
            assert_eq!(parallel.public_state().body, sequential.public_state().body);
            assert_eq!(parallel.public_state().main_rotor, sequential.public_state().main_rotor);
        }
    }

    #[test]
    fn bad_timestep_is_reported_per_member() {
        let config = Arc::new(AircraftConfig::light_utility());
        let atmosphere = Arc::new(Atmosphere::calm());
        let mut fleet = Fleet::new();
        fleet.push(member(&config, &atmosphere, 0.4));
        fleet.push(member(&config, &atmosphere, 0.4));

        let results = fleet.tick(-1.0);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| matches!(r, Err(SimError::InvalidTimestep(_)))));
    }
}
