//! Time units shared by every constructor that accepts a (value, unit) pair.

use crate::error::{DecayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SECONDS_PER_MINUTE: f64 = 60.0;
pub const SECONDS_PER_HOUR: f64 = 3_600.0;
pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const SECONDS_PER_WEEK: f64 = 604_800.0;
pub const SECONDS_PER_MONTH: f64 = 2.628e6;
pub const SECONDS_PER_YEAR: f64 = 3.154e7;

/// A recognised time unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 7] = [
        TimeUnit::Seconds,
        TimeUnit::Minutes,
        TimeUnit::Hours,
        TimeUnit::Days,
        TimeUnit::Weeks,
        TimeUnit::Months,
        TimeUnit::Years,
    ];

    /// Length of one unit in seconds.
    pub fn seconds(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => SECONDS_PER_MINUTE,
            TimeUnit::Hours => SECONDS_PER_HOUR,
            TimeUnit::Days => SECONDS_PER_DAY,
            TimeUnit::Weeks => SECONDS_PER_WEEK,
            TimeUnit::Months => SECONDS_PER_MONTH,
            TimeUnit::Years => SECONDS_PER_YEAR,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Weeks => "weeks",
            TimeUnit::Months => "months",
            TimeUnit::Years => "years",
        }
    }

    /// Converts `value` expressed in this unit to seconds.
    pub fn to_seconds(self, value: f64) -> f64 {
        match self {
            TimeUnit::Seconds => value,
            _ => value * self.seconds(),
        }
    }

    /// Converts `seconds` to a value expressed in this unit.
    pub fn from_seconds(self, seconds: f64) -> f64 {
        match self {
            TimeUnit::Seconds => seconds,
            _ => seconds / self.seconds(),
        }
    }

    /// Converts a rate given per this unit into a rate per second.
    pub fn rate_per_second(self, rate: f64) -> f64 {
        self.from_seconds(rate)
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeUnit {
    type Err = DecayError;

    fn from_str(s: &str) -> Result<Self> {
        TimeUnit::ALL
            .into_iter()
            .find(|unit| unit.label() == s)
            .ok_or_else(|| DecayError::InvalidUnit {
                unit: s.to_string(),
            })
    }
}

/// A (value, unit) pair as it appears in configuration.
///
/// The unit is kept as text so an unrecognised unit surfaces as
/// [`DecayError::InvalidUnit`] when the value is used, not as a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpec {
    pub value: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    TimeUnit::Seconds.label().to_string()
}

impl TimeSpec {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    pub fn seconds(value: f64) -> Self {
        Self::new(value, TimeUnit::Seconds.label())
    }

    pub fn minutes(value: f64) -> Self {
        Self::new(value, TimeUnit::Minutes.label())
    }

    pub fn parsed_unit(&self) -> Result<TimeUnit> {
        self.unit.parse()
    }

    pub fn to_seconds(&self) -> Result<f64> {
        Ok(self.parsed_unit()?.to_seconds(self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unit_table_matches_fixed_factors() {
        assert_eq!(TimeUnit::Seconds.seconds(), 1.0);
        assert_eq!(TimeUnit::Minutes.seconds(), 60.0);
        assert_eq!(TimeUnit::Hours.seconds(), 3600.0);
        assert_eq!(TimeUnit::Days.seconds(), 86400.0);
        assert_eq!(TimeUnit::Weeks.seconds(), 604800.0);
        assert_eq!(TimeUnit::Months.seconds(), 2.628e6);
        assert_eq!(TimeUnit::Years.seconds(), 3.154e7);
    }

    #[test]
    fn parse_round_trips_labels() {
        for unit in TimeUnit::ALL {
            assert_eq!(unit.label().parse::<TimeUnit>().unwrap(), unit);
        }
    }

    #[test]
    fn parse_rejects_unknown_unit() {
        let err = "fortnights".parse::<TimeUnit>().unwrap_err();
        assert!(matches!(err, DecayError::InvalidUnit { ref unit } if unit == "fortnights"));
        assert!("Minutes".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn conversions_are_inverse() {
        let seconds = TimeUnit::Minutes.to_seconds(1.2);
        assert_relative_eq!(seconds, 72.0);
        assert_relative_eq!(TimeUnit::Minutes.from_seconds(seconds), 1.2);
        assert_relative_eq!(TimeUnit::Minutes.rate_per_second(20000.0), 20000.0 / 60.0);
    }

    #[test]
    fn time_spec_converts_and_reports_bad_unit() {
        assert_relative_eq!(TimeSpec::minutes(20.0).to_seconds().unwrap(), 1200.0);
        assert!(TimeSpec::new(1.0, "eons").to_seconds().is_err());
    }

    #[test]
    fn time_spec_unit_defaults_to_seconds() {
        let spec: TimeSpec = serde_json::from_str(r#"{"value": 3.0}"#).unwrap();
        assert_eq!(spec.unit, "seconds");
        assert_eq!(TimeUnit::default(), TimeUnit::Seconds);
        assert_eq!(spec.parsed_unit().unwrap(), TimeUnit::default());
    }
}
