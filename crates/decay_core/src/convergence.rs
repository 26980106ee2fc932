//! Step-halving certification of a timestep.
//!
//! Two runs at `dt` and `dt / 2` are compared through the last recorded
//! population of every nuclide. When the largest absolute difference drops
//! below the tolerance, the finer timestep is accepted; otherwise `dt` is
//! halved again. Each network is built from the specs, so no state is
//! shared between runs.

use crate::error::{require_positive, DecayError, Result};
use crate::network::{step_count, DecayNetwork, DecayRun, MAX_STEPS};
use crate::nuclide::NuclideSpec;
use crate::units::TimeSpec;
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConvergenceSettings {
    /// Largest accepted infinity-norm difference between two successive runs.
    pub tolerance: f64,
    pub max_halvings: usize,
    /// Halving stops with an error once `dt / 2` would fall below this.
    #[serde(default)]
    pub min_timestep_seconds: Option<f64>,
    /// Halving stops with an error once the finer run would need more steps.
    /// Never above [`MAX_STEPS`].
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_steps() -> usize {
    MAX_STEPS
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            max_halvings: 40,
            min_timestep_seconds: None,
            max_steps: MAX_STEPS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceIteration {
    pub coarse_timestep_seconds: f64,
    pub fine_timestep_seconds: f64,
    pub max_difference: f64,
    /// Nuclide that attained `max_difference`.
    pub worst_nuclide: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceReport {
    /// The accepted (finer) timestep.
    pub timestep_seconds: f64,
    pub max_difference: f64,
    pub history: Vec<ConvergenceIteration>,
    pub query_time_seconds: f64,
    /// Every nuclide's population at the query time, from the accepted run.
    pub values: Vec<QueryValue>,
}

impl ConvergenceReport {
    pub fn halvings(&self) -> usize {
        self.history.len()
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value)
    }
}

/// Largest absolute difference between the final populations of nuclides
/// present in both runs, with the nuclide attaining it.
///
/// A NaN difference counts as infinite so a blown-up run can never converge.
pub fn final_value_difference(coarse: &DecayRun, fine: &DecayRun) -> (f64, Option<String>) {
    let mut worst = (0.0, None);
    for nuclide in coarse.nuclides() {
        let Some(other) = fine.nuclide(nuclide.name()) else {
            continue;
        };
        let mut difference = (nuclide.current_population() - other.current_population()).abs();
        if difference.is_nan() {
            difference = f64::INFINITY;
        }
        if worst.1.is_none() || difference > worst.0 {
            worst = (difference, Some(nuclide.name().to_string()));
        }
    }
    worst
}

pub fn check_convergence(
    specs: &[NuclideSpec],
    initial_timestep: &TimeSpec,
    stop_time: &TimeSpec,
    query_time: &TimeSpec,
    settings: &ConvergenceSettings,
) -> Result<ConvergenceReport> {
    let mut dt = require_positive("timestep", initial_timestep.to_seconds()?)?;
    let duration = require_positive("stop time", stop_time.to_seconds()?)?;
    let query_time_seconds = query_time.to_seconds()?;
    if !query_time_seconds.is_finite() {
        return Err(DecayError::InvalidParameter {
            name: "query time",
            reason: format!("{query_time_seconds} is not finite"),
        });
    }
    require_positive("tolerance", settings.tolerance)?;
    let min_timestep = settings
        .min_timestep_seconds
        .map(|min_dt| require_positive("minimum timestep", min_dt))
        .transpose()?;
    let max_steps = settings.max_steps.min(MAX_STEPS);
    if max_steps == 0 {
        return Err(DecayError::InvalidParameter {
            name: "max steps",
            reason: "at least one step is required".to_string(),
        });
    }
    if step_count(dt, duration) > max_steps as f64 {
        return Err(DecayError::InvalidParameter {
            name: "timestep",
            reason: format!("{dt} s needs more than {max_steps} steps over {duration} s"),
        });
    }
    if settings.max_halvings == 0 {
        return Err(DecayError::InvalidParameter {
            name: "max halvings",
            reason: "at least one halving is required".to_string(),
        });
    }

    let mut coarse = DecayNetwork::with_specs(dt, duration, specs)?.run();
    let mut history = Vec::new();
    let mut last_difference = f64::INFINITY;

    for halving in 1..=settings.max_halvings {
        let fine_dt = dt / 2.0;
        if let Some(min_dt) = min_timestep {
            if fine_dt < min_dt {
                debug!("Next timestep {fine_dt} s is below the floor {min_dt} s.");
                return Err(DecayError::NotConverged {
                    halvings: halving - 1,
                    difference: last_difference,
                });
            }
        }
        if step_count(fine_dt, duration) > max_steps as f64 {
            debug!("Next timestep {fine_dt} s needs more than {max_steps} steps.");
            return Err(DecayError::NotConverged {
                halvings: halving - 1,
                difference: last_difference,
            });
        }

        let fine = DecayNetwork::with_specs(fine_dt, duration, specs)?.run();
        let (difference, worst_nuclide) = final_value_difference(&coarse, &fine);
        info!(
            "Halving {halving}: dt {dt} s -> {fine_dt} s, max difference {difference:e} ({})",
            worst_nuclide.as_deref().unwrap_or("no nuclides")
        );
        history.push(ConvergenceIteration {
            coarse_timestep_seconds: dt,
            fine_timestep_seconds: fine_dt,
            max_difference: difference,
            worst_nuclide,
        });
        last_difference = difference;

        if difference < settings.tolerance {
            let values = fine
                .nuclides()
                .iter()
                .map(|nuclide| {
                    fine.value_at(nuclide.name(), query_time_seconds)
                        .map(|value| QueryValue {
                            name: nuclide.name().to_string(),
                            value,
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(ConvergenceReport {
                timestep_seconds: fine_dt,
                max_difference: difference,
                history,
                query_time_seconds,
                values,
            });
        }

        coarse = fine;
        dt = fine_dt;
    }

    Err(DecayError::NotConverged {
        halvings: settings.max_halvings,
        difference: last_difference,
    })
}
