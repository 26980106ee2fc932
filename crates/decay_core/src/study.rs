//! Error of a quantity of interest across timesteps, and its power-law fit.

use crate::analytic::{daughter_population, single_population};
use crate::error::DecayError;
use crate::network::DecayNetwork;
use crate::nuclide::{Nuclide, NuclideSpec};
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct QoiError {
    pub name: String,
    pub numerical: f64,
    pub reference: f64,
    pub abs_error: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudyPoint {
    pub timestep_seconds: f64,
    pub errors: Vec<QoiError>,
}

/// error ≈ coefficient · dt^order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerLawFit {
    pub coefficient: f64,
    pub order: f64,
}

impl PowerLawFit {
    pub fn predict(&self, timestep_seconds: f64) -> f64 {
        self.coefficient * timestep_seconds.powf(self.order)
    }

    /// Timestep at which the fitted error equals `target_error`.
    pub fn timestep_for(&self, target_error: f64) -> f64 {
        (target_error / self.coefficient).powf(1.0 / self.order)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NuclideFit {
    pub name: String,
    pub fit: PowerLawFit,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorStudy {
    pub qoi_time_seconds: f64,
    pub points: Vec<StudyPoint>,
    pub fits: Vec<NuclideFit>,
}

impl ErrorStudy {
    pub fn fit(&self, name: &str) -> Option<PowerLawFit> {
        self.fits
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.fit)
    }

    /// Absolute errors of `name`, one per timestep in study order.
    pub fn errors(&self, name: &str) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .filter_map(|point| {
                point
                    .errors
                    .iter()
                    .find(|error| error.name == name)
                    .map(|error| (point.timestep_seconds, error.abs_error))
            })
            .collect()
    }
}

/// Runs the chain once per timestep and compares every nuclide at the QOI time
/// against `reference(name, t)`. Nuclides without a reference are skipped.
pub fn timestep_study<F>(
    specs: &[NuclideSpec],
    duration_seconds: f64,
    timesteps: &[f64],
    qoi_time_seconds: f64,
    reference: F,
) -> Result<ErrorStudy>
where
    F: Fn(&str, f64) -> Option<f64>,
{
    if timesteps.is_empty() {
        bail!("At least one timestep is required.");
    }
    if !qoi_time_seconds.is_finite() || qoi_time_seconds < 0.0 || qoi_time_seconds > duration_seconds {
        bail!("QOI time {qoi_time_seconds} s must lie within [0, {duration_seconds}] s.");
    }

    let mut points = Vec::with_capacity(timesteps.len());
    for &dt in timesteps {
        let run = DecayNetwork::with_specs(dt, duration_seconds, specs)
            .with_context(|| format!("Failed to build network for timestep {dt} s."))?
            .run();

        let mut errors = Vec::new();
        for nuclide in run.nuclides() {
            let Some(reference) = reference(nuclide.name(), qoi_time_seconds) else {
                continue;
            };
            let numerical = run.value_at(nuclide.name(), qoi_time_seconds)?;
            errors.push(QoiError {
                name: nuclide.name().to_string(),
                numerical,
                reference,
                abs_error: (numerical - reference).abs(),
            });
        }
        debug!("Timestep {dt} s: {} QOI errors recorded.", errors.len());
        points.push(StudyPoint {
            timestep_seconds: dt,
            errors,
        });
    }

    let mut fits = Vec::new();
    for spec in specs {
        let samples: Vec<(f64, f64)> = points
            .iter()
            .filter_map(|point| {
                point
                    .errors
                    .iter()
                    .find(|error| error.name == spec.name)
                    .map(|error| (point.timestep_seconds, error.abs_error))
            })
            .collect();
        let (dts, errs): (Vec<f64>, Vec<f64>) = samples.into_iter().unzip();
        match fit_power_law(&dts, &errs) {
            Ok(fit) => {
                info!(
                    "{}: error ≈ {:.4e} · dt^{:.3}",
                    spec.name, fit.coefficient, fit.order
                );
                fits.push(NuclideFit {
                    name: spec.name.clone(),
                    fit,
                });
            }
            Err(err) => debug!("No power-law fit for {}: {err}", spec.name),
        }
    }

    Ok(ErrorStudy {
        qoi_time_seconds,
        points,
        fits,
    })
}

/// Least-squares fit of ln(error) = ln(C) + p·ln(dt).
///
/// Pairs with a non-positive or non-finite error are ignored; at least two
/// distinct timesteps must remain.
pub fn fit_power_law(timesteps: &[f64], errors: &[f64]) -> Result<PowerLawFit> {
    if timesteps.len() != errors.len() {
        bail!(
            "Timestep count ({}) does not match error count ({}).",
            timesteps.len(),
            errors.len()
        );
    }
    let samples: Vec<(f64, f64)> = timesteps
        .iter()
        .zip(errors)
        .filter(|(dt, err)| **dt > 0.0 && err.is_finite() && **err > 0.0)
        .map(|(dt, err)| (dt.ln(), err.ln()))
        .collect();
    if samples.len() < 2 {
        bail!("Power-law fit needs at least two positive errors.");
    }
    let first = samples[0].0;
    if samples.iter().all(|(x, _)| (x - first).abs() <= f64::EPSILON) {
        bail!("Power-law fit needs at least two distinct timesteps.");
    }

    let n = samples.len();
    let mut design = DMatrix::zeros(n, 2);
    let mut rhs = DVector::zeros(n);
    for (row, (x, y)) in samples.iter().enumerate() {
        design[(row, 0)] = 1.0;
        design[(row, 1)] = *x;
        rhs[row] = *y;
    }

    let solution = design
        .svd(true, true)
        .solve(&rhs, 1e-12)
        .map_err(|err| anyhow!("Least-squares solve failed: {err}"))?;

    Ok(PowerLawFit {
        coefficient: solution[0].exp(),
        order: solution[1],
    })
}

/// Closed-form populations for the parts of a chain that have one.
///
/// Covers nuclides without parents, and single-parent daughters whose parent
/// has no parents of its own when both start empty and the daughter has no
/// production of its own.
#[derive(Debug, Clone)]
pub struct AnalyticReference {
    nuclides: HashMap<String, Nuclide>,
}

impl AnalyticReference {
    /// Fails on the first invalid spec or repeated name.
    pub fn from_specs(specs: &[NuclideSpec]) -> crate::Result<Self> {
        let mut nuclides: HashMap<String, Nuclide> = HashMap::with_capacity(specs.len());
        for spec in specs {
            let nuclide = spec.build()?;
            if nuclides.contains_key(nuclide.name()) {
                return Err(DecayError::DuplicateNuclide(spec.name.clone()));
            }
            nuclides.insert(spec.name.clone(), nuclide);
        }
        Ok(Self { nuclides })
    }

    pub fn value(&self, name: &str, t: f64) -> Option<f64> {
        let nuclide = self.nuclides.get(name)?;
        match nuclide.parents() {
            [] => Some(single_population(
                nuclide.initial_population(),
                nuclide.decay_constant(),
                nuclide.production_rate(),
                t,
            )),
            [parent_name] => {
                let parent = self.nuclides.get(parent_name)?;
                let solvable = parent.parents().is_empty()
                    && parent.initial_population() == 0.0
                    && nuclide.initial_population() == 0.0
                    && nuclide.production_rate() == 0.0
                    && parent.decay_constant() != nuclide.decay_constant();
                solvable.then(|| {
                    daughter_population(
                        nuclide.decay_constant(),
                        parent.decay_constant(),
                        parent.production_rate(),
                        t,
                    )
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::TimeUnit;
    use approx::assert_relative_eq;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    fn chain_specs() -> Vec<NuclideSpec> {
        vec![
            NuclideSpec::new("A", 1.2, TimeUnit::Minutes).with_production(20000.0, TimeUnit::Minutes),
            NuclideSpec::new("B", 2.0, TimeUnit::Minutes).with_parents(["A"]),
        ]
    }

    #[test]
    fn fit_recovers_exact_power_law() {
        let dts = [0.1, 0.05, 0.01, 0.001];
        let errors: Vec<f64> = dts.iter().map(|dt: &f64| 3.0 * dt.powf(1.5)).collect();
        let fit = fit_power_law(&dts, &errors).unwrap();
        assert_relative_eq!(fit.order, 1.5, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficient, 3.0, max_relative = 1e-9);
        assert_relative_eq!(fit.predict(0.02), 3.0 * 0.02_f64.powf(1.5), max_relative = 1e-9);
        assert_relative_eq!(fit.timestep_for(fit.predict(0.02)), 0.02, max_relative = 1e-9);
    }

    #[test]
    fn fit_rejects_degenerate_input() {
        assert_err_contains(fit_power_law(&[0.1], &[1.0]), "at least two");
        assert_err_contains(fit_power_law(&[0.1, 0.1], &[1.0, 2.0]), "distinct");
        assert_err_contains(fit_power_law(&[0.1, 0.2], &[0.0, 0.0]), "at least two");
        assert_err_contains(fit_power_law(&[0.1, 0.2], &[1.0]), "does not match");
    }

    #[test]
    fn euler_study_shows_first_order_error() {
        let specs = chain_specs();
        let reference = AnalyticReference::from_specs(&specs).unwrap();
        let study = timestep_study(&specs, 1200.0, &[0.5, 0.25, 0.125], 300.0, |name, t| {
            reference.value(name, t)
        })
        .unwrap();

        assert_eq!(study.points.len(), 3);
        for name in ["A", "B"] {
            let errors = study.errors(name);
            assert_eq!(errors.len(), 3);
            assert!(errors.windows(2).all(|pair| pair[1].1 < pair[0].1));
            let fit = study.fit(name).unwrap();
            assert!((fit.order - 1.0).abs() < 0.05, "{name} order {}", fit.order);
        }

        // An error below one atom needs a timestep of a few hundredths of a second.
        let dt_b = study.fit("B").unwrap().timestep_for(1.0);
        assert!(dt_b > 0.005 && dt_b < 0.05, "dt {dt_b}");
    }

    #[test]
    fn study_rejects_bad_qoi_and_empty_timesteps() {
        let specs = chain_specs();
        assert_err_contains(
            timestep_study(&specs, 100.0, &[], 10.0, |_, _| None),
            "At least one timestep",
        );
        assert_err_contains(
            timestep_study(&specs, 100.0, &[1.0], 200.0, |_, _| None),
            "QOI time",
        );
        assert_err_contains(
            timestep_study(&specs, 100.0, &[-1.0], 10.0, |_, _| None),
            "timestep -1",
        );
    }

    #[test]
    fn nuclides_without_reference_are_skipped() {
        let study = timestep_study(&chain_specs(), 60.0, &[1.0, 0.5], 30.0, |name, t| {
            (name == "A").then(|| single_population(0.0, std::f64::consts::LN_2 / 72.0, 20000.0 / 60.0, t))
        })
        .unwrap();
        assert!(study.errors("B").is_empty());
        assert!(study.fit("B").is_none());
        assert!(study.fit("A").is_some());
    }

    #[test]
    fn reference_covers_roots_and_simple_daughters_only() {
        let specs = vec![
            NuclideSpec::new("A", 1.0, TimeUnit::Seconds).with_production(10.0, TimeUnit::Seconds),
            NuclideSpec::new("B", 2.0, TimeUnit::Seconds).with_parents(["A"]),
            NuclideSpec::new("C", 3.0, TimeUnit::Seconds).with_parents(["B"]),
            NuclideSpec::new("D", 4.0, TimeUnit::Seconds).with_parents(["A", "B"]),
        ];
        let reference = AnalyticReference::from_specs(&specs).unwrap();
        assert!(reference.value("A", 1.0).is_some());
        assert!(reference.value("B", 1.0).is_some());
        assert!(reference.value("C", 1.0).is_none());
        assert!(reference.value("D", 1.0).is_none());
        assert!(reference.value("Z", 1.0).is_none());
    }

    #[test]
    fn reference_rejects_repeated_names() {
        let specs = vec![
            NuclideSpec::new("A", 1.0, TimeUnit::Seconds).with_production(10.0, TimeUnit::Seconds),
            NuclideSpec::new("A", 5.0, TimeUnit::Seconds),
        ];
        assert!(matches!(
            AnalyticReference::from_specs(&specs),
            Err(DecayError::DuplicateNuclide(ref name)) if name == "A"
        ));
    }
}
