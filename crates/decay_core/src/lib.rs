//! The `decay_core` crate simulates radioactive decay chains with explicit Euler.
//!
//! Key components:
//! - **Units**: `TimeUnit` and `TimeSpec`, the single conversion table to seconds.
//! - **Network**: `NuclideSpec`/`Nuclide` records, `DecayNetwork` and its isolated `DecayRun`.
//! - **Solvers**: the generic `ExplicitEuler` stepper driven through `DynamicalSystem`.
//! - **Convergence**: step-halving certification of a timestep.
//! - **Study**: QOI error against closed-form populations and its power-law fit.
//! - **Export**: `<name>_data.csv` tables.
pub mod analytic;
pub mod convergence;
pub mod error;
pub mod export;
pub mod network;
pub mod nuclide;
pub mod series;
pub mod solvers;
pub mod study;
pub mod traits;
pub mod units;

pub use convergence::{check_convergence, ConvergenceReport, ConvergenceSettings};
pub use error::{DecayError, Result};
pub use export::{export_csv, ExportSettings};
pub use network::{DecayNetwork, DecayRun, NetworkConfig, MAX_STEPS};
pub use nuclide::{Nuclide, NuclideSpec};
pub use series::SeriesTable;
pub use study::{timestep_study, AnalyticReference, ErrorStudy, PowerLawFit};
pub use units::{TimeSpec, TimeUnit};
