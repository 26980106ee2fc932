//! Delimited text export of a compiled series table.

use crate::error::{DecayError, Result};
use crate::series::SeriesTable;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

pub const SIGNIFICANT_DIGITS: usize = 15;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSettings {
    pub directory: Option<PathBuf>,
    pub name: Option<String>,
}

impl ExportSettings {
    pub fn new(directory: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            directory: Some(directory.into()),
            name: Some(name.into()),
        }
    }

    /// `<directory>/<name>_data.csv`, or the missing-setting error.
    pub fn target_path(&self) -> Result<PathBuf> {
        let directory = self
            .directory
            .as_ref()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or(DecayError::MissingExportDirectory)?;
        let name = self
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or(DecayError::MissingExportName)?;
        Ok(directory.join(format!("{name}_data.csv")))
    }
}

/// Formats like C's `%.{digits}g`: shortest of fixed or exponent notation,
/// trailing zeros removed.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = digits.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Writes the header and every row of `table` as comma-separated records.
pub fn write_table<W: Write>(table: &SeriesTable, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.header())?;
    for row in table.rows() {
        csv_writer.write_record(
            row.iter()
                .map(|value| format_significant(*value, SIGNIFICANT_DIGITS)),
        )?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes `<name>_data.csv` into the configured directory, creating it if
/// needed. Both settings are checked before anything touches the filesystem.
pub fn export_csv(table: &SeriesTable, settings: &ExportSettings) -> Result<PathBuf> {
    let path = settings.target_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(&path)?;
    write_table(table, std::io::BufWriter::new(file))?;
    info!("Exported {} rows to {}", table.row_count(), path.display());
    Ok(path)
}
