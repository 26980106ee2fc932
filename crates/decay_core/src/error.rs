use thiserror::Error;

/// Errors raised by network construction, compilation, convergence and export.
#[derive(Debug, Error)]
pub enum DecayError {
    #[error("Must provide {0}.")]
    MissingParameter(&'static str),

    #[error("Unit '{unit}' is not valid. Valid options: seconds, minutes, hours, days, weeks, months, years.")]
    InvalidUnit { unit: String },

    #[error("Invalid {name}: {reason}.")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Nuclide '{0}' is already registered.")]
    DuplicateNuclide(String),

    #[error("Nuclide '{0}' is not registered.")]
    UnknownNuclide(String),

    #[error("Time samples for nuclide '{nuclide}' do not match solver times (expected {expected} samples, found {found}).")]
    Misaligned {
        nuclide: String,
        expected: usize,
        found: usize,
    },

    #[error("An output directory is required to export data.")]
    MissingExportDirectory,

    #[error("An output name is required to export data.")]
    MissingExportName,

    #[error("Step halving did not converge after {halvings} halvings (last difference {difference:e}).")]
    NotConverged { halvings: usize, difference: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, DecayError>;

/// Rejects non-finite or non-positive values for a named parameter.
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(DecayError::InvalidParameter {
            name,
            reason: format!("{value} is not finite"),
        });
    }
    if value <= 0.0 {
        return Err(DecayError::InvalidParameter {
            name,
            reason: format!("{value} must be positive"),
        });
    }
    Ok(value)
}
