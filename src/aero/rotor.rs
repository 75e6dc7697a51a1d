use crate::aero::airfoil::AirfoilModel;
use crate::aero::atmosphere::EnvironmentSample;
use crate::aero::inflow::{momentum_induced_velocity, GroundEffect};
use crate::config::error::{require_in_range, require_positive};
use crate::config::ConfigError;
use crate::math::{Vec3, RPM_TO_RAD_PER_SEC};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Below this tip speed the rotor is treated as stopped.
const MIN_TIP_SPEED: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotorKind {
    Main,
    Tail,
}

/// Sense of rotation seen from the thrust side of the disc, looking back
/// along the shaft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationSense {
    CounterClockwise,
    Clockwise,
}

impl RotationSense {
    pub fn sign(&self) -> f64 {
        match self {
            Self::CounterClockwise => 1.0,
            Self::Clockwise => -1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotorGeometry {
    /// Hub position relative to the centre of gravity, body axes (m).
    pub hub_position: Vec3,
    /// Direction of positive thrust, body axes.
    pub shaft_axis: Vec3,
    pub rotation: RotationSense,
    pub radius: f64,
    /// Root cutout as a fraction of the radius.
    pub root_cutout: f64,
    pub chord: f64,
    pub blade_count: u32,
    /// Linear twist per unit r/R (rad), negative for washout.
    pub twist: f64,
    pub lock_number: f64,
    /// Polar moment of inertia of the rotor about its shaft (kg m^2).
    pub inertia: f64,
    /// Mechanical collective range at 0.75 R (rad).
    pub collective_min: f64,
    pub collective_max: f64,
    /// Cyclic amplitude limit (rad).
    pub cyclic_max: f64,
    #[serde(default)]
    pub airfoil: AirfoilModel,
    #[serde(default = "default_azimuth_stations")]
    pub azimuth_stations: usize,
    #[serde(default = "default_radial_stations")]
    pub radial_stations: usize,
    #[serde(default = "default_inflow_iterations")]
    pub inflow_iterations: usize,
    #[serde(default = "default_inflow_relaxation")]
    pub inflow_relaxation: f64,
    /// Dynamic inflow lag (s).
    #[serde(default = "default_inflow_time_constant")]
    pub inflow_time_constant: f64,
}

fn default_azimuth_stations() -> usize {
    16
}

fn default_radial_stations() -> usize {
    8
}

fn default_inflow_iterations() -> usize {
    4
}

fn default_inflow_relaxation() -> f64 {
    0.5
}

fn default_inflow_time_constant() -> f64 {
    0.05
}

impl RotorGeometry {
    pub fn diameter(&self) -> f64 {
        2.0 * self.radius
    }

    pub fn disc_area(&self) -> f64 {
        PI * self.radius * self.radius
    }

    pub fn validate(&self, prefix: &str) -> Result<(), ConfigError> {
        let name = |field: &str| format!("{}.{}", prefix, field);

        if !self.hub_position.is_finite() {
            return Err(ConfigError::invalid(name("hub_position"), "must be finite"));
        }
        let axis_len = self.shaft_axis.magnitude();
        if !axis_len.is_finite() || (axis_len - 1.0).abs() > 1e-3 {
            return Err(ConfigError::invalid(name("shaft_axis"), "must be a unit vector"));
        }
        require_positive(&name("radius"), self.radius)?;
        require_in_range(&name("root_cutout"), self.root_cutout, 0.0, 0.5)?;
        require_positive(&name("chord"), self.chord)?;
        if self.blade_count < 2 {
            return Err(ConfigError::invalid(name("blade_count"), "needs at least two blades"));
        }
        require_in_range(&name("twist"), self.twist, -0.6, 0.6)?;
        require_positive(&name("lock_number"), self.lock_number)?;
        require_positive(&name("inertia"), self.inertia)?;
        require_in_range(&name("collective_min"), self.collective_min, -0.5, 0.5)?;
        require_in_range(&name("collective_max"), self.collective_max, self.collective_min, 0.6)?;
        require_in_range(&name("cyclic_max"), self.cyclic_max, 0.0, 0.4)?;
        if !(8..=36).contains(&self.azimuth_stations) {
            return Err(ConfigError::invalid(name("azimuth_stations"), "must be within 8..=36"));
        }
        if !(2..=32).contains(&self.radial_stations) {
            return Err(ConfigError::invalid(name("radial_stations"), "must be within 2..=32"));
        }
        if !(1..=8).contains(&self.inflow_iterations) {
            return Err(ConfigError::invalid(name("inflow_iterations"), "must be within 1..=8"));
        }
        require_in_range(&name("inflow_relaxation"), self.inflow_relaxation, 0.05, 1.0)?;
        require_positive(&name("inflow_time_constant"), self.inflow_time_constant)?;
        self.airfoil.validate()
    }
}

/// Blade flapping as published to animation: coning plus tip-path-plane
/// tilt (forward and toward the reference lateral side), all in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BladeFlap {
    pub coning: f64,
    pub longitudinal: f64,
    pub lateral: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RotorState {
    pub rpm: f64,
    /// Collective at 0.75 R (rad).
    pub collective: f64,
    /// Cosine cyclic coefficient, peak at the reference (aft) azimuth (rad).
    pub cyclic_longitudinal: f64,
    /// Sine cyclic coefficient (rad).
    pub cyclic_lateral: f64,
    pub flap: BladeFlap,
    /// Induced velocity carried between ticks (m/s).
    pub induced_velocity: f64,
    /// Rotor azimuth for animation, wrapped to [0, 2 pi).
    pub azimuth: f64,
    pub thrust: f64,
    /// Aerodynamic shaft torque, positive when absorbing power (N m).
    pub torque: f64,
}

impl RotorState {
    pub fn omega(&self) -> f64 {
        self.rpm * RPM_TO_RAD_PER_SEC
    }

    pub fn flap_angle(&self) -> f64 {
        self.flap.coning
    }

    /// Advances the animation azimuth by one tick of rotation.
    pub fn advance_azimuth(&mut self, sense: RotationSense, dt: f64) {
        self.azimuth = (self.azimuth + sense.sign() * self.omega() * dt).rem_euclid(TAU);
    }
}

/// Loads produced by one rotor in body axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotorLoads {
    /// Force at the hub.
    pub force: Vec3,
    /// Hub moment including the shaft reaction on the airframe.
    pub moment: Vec3,
    /// Aerodynamic shaft torque, positive when absorbing power.
    pub shaft_torque: f64,
    pub induced_velocity: f64,
    pub thrust: f64,
    pub induced_power: f64,
    pub advance_ratio: f64,
    pub inflow_ratio: f64,
    pub flap: BladeFlap,
    /// Non-finite intermediate results were replaced.
    pub degenerate: bool,
}

#[derive(Debug, Clone, Copy)]
struct RotorBasis {
    /// Shaft axis, positive thrust.
    k: Vec3,
    /// Reference azimuth direction (psi = 0).
    i: Vec3,
    /// psi = 90 degrees, in the direction of rotation.
    j: Vec3,
}

impl RotorBasis {
    /// The reference azimuth points aft where the shaft allows it; for a
    /// shaft along the body x axis it falls back to body z.
    fn new(geometry: &RotorGeometry) -> Self {
        let k = geometry.shaft_axis.normalize();
        let aft = Vec3::new(-1.0, 0.0, 0.0);
        let candidate = aft - k * aft.dot(&k);
        let i = if candidate.magnitude() > 1e-3 {
            candidate.normalize()
        } else {
            let down = Vec3::new(0.0, 0.0, 1.0);
            (down - k * down.dot(&k)).normalize()
        };
        let j = k.cross(&i) * geometry.rotation.sign();
        Self { k, i, j }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Sweep {
    thrust: f64,
    torque: f64,
    inplane: Vec3,
    hub_moment: Vec3,
    finite: bool,
}

/// Blade-element model for one rotor disc. Holds the azimuth tables and
/// scratch space sized at construction, so evaluating loads never allocates.
#[derive(Debug, Clone)]
pub struct RotorModel {
    pub kind: RotorKind,
    basis: RotorBasis,
    azimuth_trig: Vec<(f64, f64)>,
    azimuth_thrust: Vec<f64>,
}

impl RotorModel {
    pub fn new(kind: RotorKind, geometry: &RotorGeometry) -> Self {
        let n = geometry.azimuth_stations.max(1);
        let azimuth_trig = (0..n)
            .map(|step| {
                let psi = TAU * step as f64 / n as f64;
                (psi.sin(), psi.cos())
            })
            .collect();

        Self {
            kind,
            basis: RotorBasis::new(geometry),
            azimuth_trig,
            azimuth_thrust: vec![0.0; n],
        }
    }

    /// Thrust carried by each azimuth station during the last evaluation.
    pub fn azimuth_thrust(&self) -> &[f64] {
        &self.azimuth_thrust
    }

    /// Evaluates rotor loads for one tick.
    ///
    /// `hub_velocity` is the velocity of the hub relative to the air mass in
    /// body axes. The induced velocity is solved with a fixed number of
    /// blade-element/momentum iterations seeded from `state`, then lagged by
    /// the dynamic inflow time constant over `dt`.
    pub fn compute_forces(
        &mut self,
        geometry: &RotorGeometry,
        state: &RotorState,
        hub_velocity: &Vec3,
        env: &EnvironmentSample,
        ground_effect: &GroundEffect,
        dt: f64,
    ) -> RotorLoads {
        let omega = state.omega().max(0.0);
        let tip_speed = omega * geometry.radius;
        let lag = 1.0 - (-dt.max(0.0) / geometry.inflow_time_constant).exp();
        let previous = if state.induced_velocity.is_finite() {
            state.induced_velocity
        } else {
            0.0
        };

        if tip_speed < MIN_TIP_SPEED {
            self.azimuth_thrust.iter_mut().for_each(|t| *t = 0.0);
            return RotorLoads {
                induced_velocity: previous * (1.0 - lag),
                degenerate: !state.induced_velocity.is_finite(),
                ..RotorLoads::default()
            };
        }

        let climb_speed = hub_velocity.dot(&self.basis.k);
        let inplane = *hub_velocity - self.basis.k * climb_speed;
        let inplane_speed = inplane.magnitude();
        let ge_factor = ground_effect.factor(env.height_above_ground, geometry.diameter());
        let area = geometry.disc_area();

        let mut induced = previous;
        for _ in 0..geometry.inflow_iterations {
            let sweep = self.sweep(geometry, state, omega, induced, hub_velocity, env);
            if !sweep.finite {
                break;
            }
            let target = ge_factor
                * momentum_induced_velocity(sweep.thrust, env.density, area, inplane_speed, climb_speed, induced);
            induced += geometry.inflow_relaxation * (target - induced);
        }
        let induced = previous + (induced - previous) * lag;

        let sweep = self.sweep(geometry, state, omega, induced, hub_velocity, env);
        if !sweep.finite || !induced.is_finite() {
            return RotorLoads {
                induced_velocity: if previous.is_finite() { previous } else { 0.0 },
                degenerate: true,
                ..RotorLoads::default()
            };
        }

        let sense = geometry.rotation.sign();
        let reaction = self.basis.k * (-sense * sweep.torque);
        let advance_ratio = inplane_speed / tip_speed;
        let inflow_ratio = (climb_speed + induced) / tip_speed;

        RotorLoads {
            force: self.basis.k * sweep.thrust + sweep.inplane,
            moment: sweep.hub_moment + reaction,
            shaft_torque: sweep.torque,
            induced_velocity: induced,
            thrust: sweep.thrust,
            induced_power: sweep.thrust * induced,
            advance_ratio,
            inflow_ratio,
            flap: self.flap(geometry, state, &inplane, advance_ratio, inflow_ratio),
            degenerate: false,
        }
    }

    fn sweep(
        &mut self,
        geometry: &RotorGeometry,
        state: &RotorState,
        omega: f64,
        induced: f64,
        hub_velocity: &Vec3,
        env: &EnvironmentSample,
    ) -> Sweep {
        let basis = self.basis;
        let stations = geometry.radial_stations.max(1);
        let span = geometry.radius * (1.0 - geometry.root_cutout);
        let dr = span / stations as f64;
        let weight = geometry.blade_count as f64 / self.azimuth_trig.len() as f64;
        let speed_of_sound = env.speed_of_sound.max(1.0);

        let v_i = hub_velocity.dot(&basis.i);
        let v_j = hub_velocity.dot(&basis.j);
        let u_p = induced + hub_velocity.dot(&basis.k);

        let mut sweep = Sweep::default();

        for (station, &(sin_psi, cos_psi)) in self.azimuth_trig.iter().enumerate() {
            let radial = basis.i * cos_psi + basis.j * sin_psi;
            let tangential = basis.j * cos_psi - basis.i * sin_psi;
            let edgewise = cos_psi * v_j - sin_psi * v_i;
            let cyclic = state.cyclic_longitudinal * cos_psi + state.cyclic_lateral * sin_psi;

            let mut thrust = 0.0;
            let mut drag = 0.0;
            let mut torque = 0.0;
            let mut thrust_moment = 0.0;

            for element in 0..stations {
                let r = geometry.radius * geometry.root_cutout + (element as f64 + 0.5) * dr;
                let u_t = omega * r + edgewise;
                let theta = state.collective + geometry.twist * (r / geometry.radius - 0.75) + cyclic;
                let phi = u_p.atan2(u_t);
                let speed_sq = u_t * u_t + u_p * u_p;
                let mach = speed_sq.sqrt() / speed_of_sound;

                let coefficients = geometry.airfoil.coefficients(theta - phi, mach);
                let q = 0.5 * env.density * speed_sq * geometry.chord * dr;
                let lift = q * coefficients.cl;
                let profile = q * coefficients.cd;

                let d_thrust = lift * phi.cos() - profile * phi.sin();
                let d_drag = lift * phi.sin() + profile * phi.cos();

                thrust += d_thrust;
                drag += d_drag;
                torque += d_drag * r;
                thrust_moment += d_thrust * r;
            }

            self.azimuth_thrust[station] = thrust * weight;
            sweep.thrust += thrust * weight;
            sweep.torque += torque * weight;
            sweep.inplane += tangential * (-drag * weight);
            sweep.hub_moment += radial.cross(&basis.k) * (thrust_moment * weight);
        }

        sweep.finite = sweep.thrust.is_finite()
            && sweep.torque.is_finite()
            && sweep.inplane.is_finite()
            && sweep.hub_moment.is_finite();
        sweep
    }

    /// Coning from the Lock number and, on the main rotor, tip-path-plane
    /// tilt from cyclic plus forward-flight blowback.
    fn flap(
        &self,
        geometry: &RotorGeometry,
        state: &RotorState,
        inplane: &Vec3,
        advance_ratio: f64,
        inflow_ratio: f64,
    ) -> BladeFlap {
        let mu = advance_ratio.min(0.5);
        let coning = (geometry.lock_number * (state.collective / 8.0 * (1.0 + mu * mu) - inflow_ratio / 6.0))
            .clamp(-0.2, 0.2);

        match self.kind {
            RotorKind::Main => {
                let blowback = 8.0 / 3.0 * mu * (state.collective - 0.75 * inflow_ratio) / (1.0 + 1.5 * mu * mu);
                let tilt = inplane.normalize() * -blowback;
                BladeFlap {
                    coning,
                    longitudinal: state.cyclic_longitudinal - tilt.dot(&self.basis.i),
                    lateral: -state.cyclic_lateral + tilt.dot(&self.basis.j),
                }
            }
            // Delta-3 coupling keeps the tail disc square to its shaft.
            RotorKind::Tail => BladeFlap {
                coning,
                longitudinal: 0.0,
                lateral: 0.0,
            },
        }
    }
}
