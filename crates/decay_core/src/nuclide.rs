use crate::error::{require_positive, DecayError, Result};
use crate::units::TimeUnit;
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;

/// Construction parameters for a [`Nuclide`], as they appear in scenario files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuclideSpec {
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
    pub half_life: f64,
    #[serde(default = "seconds_label")]
    pub half_life_unit: String,
    #[serde(default)]
    pub initial_population: f64,
    #[serde(default)]
    pub production_rate: f64,
    /// Time unit of the production rate (atoms per `production_unit`).
    #[serde(default = "seconds_label")]
    pub production_unit: String,
}

fn seconds_label() -> String {
    TimeUnit::Seconds.label().to_string()
}

impl NuclideSpec {
    /// A spec with no parents, no initial population and no production.
    pub fn new(name: impl Into<String>, half_life: f64, half_life_unit: TimeUnit) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            half_life,
            half_life_unit: half_life_unit.label().to_string(),
            initial_population: 0.0,
            production_rate: 0.0,
            production_unit: seconds_label(),
        }
    }

    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_initial_population(mut self, n0: f64) -> Self {
        self.initial_population = n0;
        self
    }

    pub fn with_production(mut self, rate: f64, per: TimeUnit) -> Self {
        self.production_rate = rate;
        self.production_unit = per.label().to_string();
        self
    }

    /// Validates the spec and builds a fresh nuclide.
    pub fn build(&self) -> Result<Nuclide> {
        let half_life_unit: TimeUnit = self.half_life_unit.parse()?;
        let production_unit: TimeUnit = self.production_unit.parse()?;
        Nuclide::new(
            self.name.clone(),
            self.half_life,
            half_life_unit,
            Some(self.parents.clone()),
            self.initial_population,
            self.production_rate,
            production_unit,
        )
    }
}

/// A radioactive nuclide: fixed physical parameters plus its simulated history.
///
/// Everything is stored in seconds-based units. `n_current` and `series` are
/// only ever advanced by the network, one committed step at a time.
#[derive(Debug, Clone)]
pub struct Nuclide {
    name: String,
    parents: Vec<String>,
    half_life_seconds: f64,
    decay_constant: f64,
    production_rate: f64,
    n0: f64,
    n_current: f64,
    pub(crate) series: Vec<f64>,
}

impl Nuclide {
    pub fn new(
        name: impl Into<String>,
        half_life: f64,
        half_life_unit: TimeUnit,
        parents: Option<Vec<String>>,
        n0: f64,
        production_rate: f64,
        production_unit: TimeUnit,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(DecayError::InvalidParameter {
                name: "nuclide name",
                reason: "name must not be empty".to_string(),
            });
        }
        let half_life_seconds = require_positive("half-life", half_life_unit.to_seconds(half_life))?;
        if !n0.is_finite() {
            return Err(DecayError::InvalidParameter {
                name: "initial population",
                reason: format!("{n0} is not finite"),
            });
        }
        if !production_rate.is_finite() {
            return Err(DecayError::InvalidParameter {
                name: "production rate",
                reason: format!("{production_rate} is not finite"),
            });
        }

        Ok(Self {
            name,
            parents: parents.unwrap_or_default(),
            half_life_seconds,
            decay_constant: LN_2 / half_life_seconds,
            production_rate: production_unit.rate_per_second(production_rate),
            n0,
            n_current: n0,
            series: vec![n0],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn half_life_seconds(&self) -> f64 {
        self.half_life_seconds
    }

    /// λ = ln 2 / t½, per second.
    pub fn decay_constant(&self) -> f64 {
        self.decay_constant
    }

    /// External production in atoms per second.
    pub fn production_rate(&self) -> f64 {
        self.production_rate
    }

    pub fn initial_population(&self) -> f64 {
        self.n0
    }

    pub fn current_population(&self) -> f64 {
        self.n_current
    }

    /// Populations indexed by step number; entry `i` is the value at `i * dt`.
    pub fn series(&self) -> &[f64] {
        &self.series
    }

    pub(crate) fn reset(&mut self, capacity: usize) {
        self.n_current = self.n0;
        self.series.clear();
        self.series.reserve(capacity);
        self.series.push(self.n0);
    }

    pub(crate) fn commit(&mut self, value: f64) {
        self.n_current = value;
        self.series.push(value);
    }
}
