//! The decay network: a registry of nuclides advanced together by explicit Euler.

use crate::error::{require_positive, DecayError, Result};
use crate::nuclide::{Nuclide, NuclideSpec};
use crate::series::SeriesTable;
use crate::solvers::ExplicitEuler;
use crate::traits::{DynamicalSystem, Steppable};
use crate::units::{TimeSpec, TimeUnit};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything needed to build a [`DecayNetwork`], as read from a scenario file.
///
/// `timestep` and `duration` are optional here so that their absence is
/// reported as [`DecayError::MissingParameter`] by [`DecayNetwork::from_config`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub timestep: Option<TimeSpec>,
    #[serde(default)]
    pub duration: Option<TimeSpec>,
    #[serde(default)]
    pub nuclides: Vec<NuclideSpec>,
}

/// Largest number of steps a single network accepts.
///
/// Every nuclide keeps `total_steps + 1` samples in memory.
pub const MAX_STEPS: usize = 100_000_000;

/// floor(duration / dt), before any range check.
pub(crate) fn step_count(timestep_seconds: f64, duration_seconds: f64) -> f64 {
    (duration_seconds / timestep_seconds).floor()
}

#[derive(Debug, Clone)]
pub struct DecayNetwork {
    nuclides: Vec<Nuclide>,
    index: HashMap<String, usize>,
    timestep_seconds: f64,
    duration_seconds: f64,
    total_steps: usize,
}

impl DecayNetwork {
    pub fn new(timestep: &TimeSpec, duration: &TimeSpec) -> Result<Self> {
        let timestep_seconds = require_positive("timestep", timestep.to_seconds()?)?;
        let duration_seconds = require_positive("duration", duration.to_seconds()?)?;
        Self::from_seconds(timestep_seconds, duration_seconds)
    }

    pub fn from_seconds(timestep_seconds: f64, duration_seconds: f64) -> Result<Self> {
        let timestep_seconds = require_positive("timestep", timestep_seconds)?;
        let duration_seconds = require_positive("duration", duration_seconds)?;
        let ratio = step_count(timestep_seconds, duration_seconds);
        if ratio > MAX_STEPS as f64 {
            return Err(DecayError::InvalidParameter {
                name: "timestep",
                reason: format!(
                    "{timestep_seconds} s yields {ratio:e} steps over {duration_seconds} s, more than {MAX_STEPS}"
                ),
            });
        }
        let total_steps = ratio as usize;
        if total_steps == 0 {
            debug!(
                "Duration {duration_seconds} s is shorter than the timestep {timestep_seconds} s; only t = 0 will be recorded."
            );
        }

        Ok(Self {
            nuclides: Vec::new(),
            index: HashMap::new(),
            timestep_seconds,
            duration_seconds,
            total_steps,
        })
    }

    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        let timestep = config
            .timestep
            .as_ref()
            .ok_or(DecayError::MissingParameter("timestep"))?;
        let duration = config
            .duration
            .as_ref()
            .ok_or(DecayError::MissingParameter("duration"))?;
        let mut network = Self::new(timestep, duration)?;
        for spec in &config.nuclides {
            network.add_spec(spec)?;
        }
        Ok(network)
    }

    /// Builds a network in seconds from specs, each turned into a fresh nuclide.
    pub fn with_specs(
        timestep_seconds: f64,
        duration_seconds: f64,
        specs: &[NuclideSpec],
    ) -> Result<Self> {
        let mut network = Self::from_seconds(timestep_seconds, duration_seconds)?;
        for spec in specs {
            network.add_spec(spec)?;
        }
        Ok(network)
    }

    pub fn add_nuclide(&mut self, nuclide: Nuclide) -> Result<()> {
        if self.index.contains_key(nuclide.name()) {
            return Err(DecayError::DuplicateNuclide(nuclide.name().to_string()));
        }
        self.index.insert(nuclide.name().to_string(), self.nuclides.len());
        self.nuclides.push(nuclide);
        Ok(())
    }

    pub fn add_spec(&mut self, spec: &NuclideSpec) -> Result<()> {
        self.add_nuclide(spec.build()?)
    }

    pub fn nuclide(&self, name: &str) -> Option<&Nuclide> {
        self.index.get(name).map(|&idx| &self.nuclides[idx])
    }

    /// Registered nuclides in registration order.
    pub fn nuclides(&self) -> &[Nuclide] {
        &self.nuclides
    }

    pub fn len(&self) -> usize {
        self.nuclides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nuclides.is_empty()
    }

    pub fn timestep_seconds(&self) -> f64 {
        self.timestep_seconds
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Time of sample `step`, derived as `step * dt`.
    pub fn sample_time(&self, step: usize) -> f64 {
        step as f64 * self.timestep_seconds
    }

    /// Sample times `0, dt, ..., total_steps * dt`.
    pub fn sample_times(&self) -> Vec<f64> {
        (0..=self.total_steps).map(|step| self.sample_time(step)).collect()
    }

    /// (daughter, parent) pairs whose parent is not registered.
    pub fn unresolved_parents(&self) -> Vec<(&str, &str)> {
        self.nuclides
            .iter()
            .flat_map(|nuclide| {
                nuclide
                    .parents()
                    .iter()
                    .filter(|parent| !self.index.contains_key(parent.as_str()))
                    .map(move |parent| (nuclide.name(), parent.as_str()))
            })
            .collect()
    }

    /// Integrates every registered nuclide through `total_steps` explicit Euler steps.
    ///
    /// The run works on copies of the registered nuclides; the network itself is
    /// never mutated, so repeated runs are independent and identical.
    pub fn run(&self) -> DecayRun {
        for (daughter, parent) in self.unresolved_parents() {
            warn!(
                "Parent '{parent}' of nuclide '{daughter}' is not registered; its contribution is treated as zero."
            );
        }

        let mut nuclides = self.nuclides.clone();
        for nuclide in &mut nuclides {
            nuclide.reset(self.total_steps + 1);
        }

        let operator = DecayOperator::assemble(&nuclides, &self.index);
        let mut state: Vec<f64> = nuclides.iter().map(Nuclide::current_population).collect();
        debug_assert_eq!(state.len(), operator.dimension());
        let mut solver = ExplicitEuler::for_system(&operator);
        let mut t = 0.0;

        debug!(
            "Running {} nuclides for {} steps of {} s.",
            nuclides.len(),
            self.total_steps,
            self.timestep_seconds
        );

        for step in 1..=self.total_steps {
            solver.step(&operator, &mut t, &mut state, self.timestep_seconds);
            t = self.sample_time(step);
            for (nuclide, &value) in nuclides.iter_mut().zip(&state) {
                nuclide.commit(value);
            }
        }

        debug!("Run finished at t = {t} s.");

        DecayRun {
            timestep_seconds: self.timestep_seconds,
            total_steps: self.total_steps,
            nuclides,
            index: self.index.clone(),
        }
    }
}

/// Rate equations of a network with parents resolved to indices.
///
/// dN_i/dt = Σ_p λ_p N_p + P_i − λ_i N_i
#[derive(Debug, Clone)]
pub struct DecayOperator {
    decay_constants: Vec<f64>,
    production: Vec<f64>,
    parents: Vec<Vec<usize>>,
}

impl DecayOperator {
    /// Unregistered parent names are dropped, contributing nothing.
    pub fn assemble(nuclides: &[Nuclide], index: &HashMap<String, usize>) -> Self {
        Self {
            decay_constants: nuclides.iter().map(Nuclide::decay_constant).collect(),
            production: nuclides.iter().map(Nuclide::production_rate).collect(),
            parents: nuclides
                .iter()
                .map(|nuclide| {
                    nuclide
                        .parents()
                        .iter()
                        .filter_map(|parent| index.get(parent).copied())
                        .collect()
                })
                .collect(),
        }
    }
}

impl DynamicalSystem<f64> for DecayOperator {
    fn dimension(&self) -> usize {
        self.decay_constants.len()
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        for i in 0..x.len() {
            let parent_flux: f64 = self.parents[i]
                .iter()
                .map(|&p| self.decay_constants[p] * x[p])
                .sum();
            out[i] = parent_flux + self.production[i] - self.decay_constants[i] * x[i];
        }
    }
}

/// The outcome of one [`DecayNetwork::run`].
#[derive(Debug, Clone)]
pub struct DecayRun {
    timestep_seconds: f64,
    total_steps: usize,
    pub(crate) nuclides: Vec<Nuclide>,
    index: HashMap<String, usize>,
}

impl DecayRun {
    pub fn timestep_seconds(&self) -> f64 {
        self.timestep_seconds
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn nuclides(&self) -> &[Nuclide] {
        &self.nuclides
    }

    pub fn nuclide(&self, name: &str) -> Option<&Nuclide> {
        self.index.get(name).map(|&idx| &self.nuclides[idx])
    }

    pub fn sample_times(&self) -> Vec<f64> {
        (0..=self.total_steps)
            .map(|step| step as f64 * self.timestep_seconds)
            .collect()
    }

    /// Population of `name` at the recorded sample nearest to `time_seconds`.
    ///
    /// Times outside the simulated span clamp to the first or last sample.
    pub fn value_at(&self, name: &str, time_seconds: f64) -> Result<f64> {
        let nuclide = self
            .nuclide(name)
            .ok_or_else(|| DecayError::UnknownNuclide(name.to_string()))?;
        let series = nuclide.series();
        let last = series.len().saturating_sub(1);
        let step = (time_seconds / self.timestep_seconds).round();
        let idx = if step.is_nan() || step <= 0.0 {
            0
        } else {
            (step as usize).min(last)
        };
        Ok(series[idx])
    }

    /// Last recorded population of `name`.
    pub fn final_value(&self, name: &str) -> Result<f64> {
        self.nuclide(name)
            .map(Nuclide::current_population)
            .ok_or_else(|| DecayError::UnknownNuclide(name.to_string()))
    }

    /// (name, last recorded population) for every nuclide in registration order.
    pub fn final_values(&self) -> Vec<(String, f64)> {
        self.nuclides
            .iter()
            .map(|nuclide| (nuclide.name().to_string(), nuclide.current_population()))
            .collect()
    }

    /// Aligns every series into one table with its time column in `unit`.
    pub fn compile(&self, unit: TimeUnit) -> Result<SeriesTable> {
        SeriesTable::compile(self, unit)
    }
}
