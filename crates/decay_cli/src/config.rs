use anyhow::{Context, Result};
use decay_core::{DecayError, NetworkConfig, TimeUnit};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A scenario file: the network configuration plus presentation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(flatten)]
    pub network: NetworkConfig,
    /// Unit of the time column in printed and exported tables.
    #[serde(default = "default_output_unit")]
    pub output_unit: String,
}

fn default_output_unit() -> String {
    TimeUnit::Seconds.label().to_string()
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Failed to parse scenario file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn output_unit(&self) -> decay_core::Result<TimeUnit> {
        self.output_unit.parse()
    }

    pub fn duration_seconds(&self) -> decay_core::Result<f64> {
        self.network
            .duration
            .as_ref()
            .ok_or(DecayError::MissingParameter("duration"))?
            .to_seconds()
    }
}
