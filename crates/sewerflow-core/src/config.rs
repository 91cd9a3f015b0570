//! Per-call configuration for the QC engine, gap detector and hydraulic
//! derivation.
//!
//! Nothing here is global: callers build a [`ProcessingConfig`] (usually from
//! TOML) and pass it into each entry point.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::hydraulics::{PipeGeometry, PipeShape};

pub const DEFAULT_SPIKE_THRESHOLD: f64 = 3.0;
pub const DEFAULT_FLATLINE_WINDOW: usize = 10;
pub const DEFAULT_FLATLINE_TOLERANCE: f64 = 0.001;
pub const DEFAULT_FREQUENCY_MINUTES: i64 = 15;

/// Expected sampling interval, written the pandas way (`15min`, `1h`, `30s`,
/// `1d`, `T`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExpectedFrequency(Duration);

impl ExpectedFrequency {
    pub fn new(step: Duration) -> Result<Self> {
        if step <= Duration::zero() {
            return Err(CoreError::Config(format!(
                "expected frequency must be positive, got {step}"
            )));
        }
        Ok(Self(step))
    }

    pub fn minutes(minutes: i64) -> Result<Self> {
        let step = Duration::try_minutes(minutes).ok_or_else(|| {
            CoreError::Config(format!("frequency of {minutes} minutes is out of range"))
        })?;
        Self::new(step)
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl Default for ExpectedFrequency {
    fn default() -> Self {
        Self(Duration::minutes(DEFAULT_FREQUENCY_MINUTES))
    }
}

impl std::str::FromStr for ExpectedFrequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (count, unit) = trimmed.split_at(split);

        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| CoreError::Config(format!("invalid frequency '{trimmed}'")))?
        };

        let step = match unit.trim() {
            "s" | "S" | "sec" | "secs" | "second" | "seconds" => Duration::try_seconds(count),
            "min" | "mins" | "minute" | "minutes" | "T" => Duration::try_minutes(count),
            "h" | "H" | "hr" | "hour" | "hours" => Duration::try_hours(count),
            "d" | "D" | "day" | "days" => Duration::try_days(count),
            other => {
                return Err(CoreError::Config(format!(
                    "unknown frequency unit '{other}' in '{trimmed}'"
                )))
            }
        };

        let step = step
            .ok_or_else(|| CoreError::Config(format!("frequency '{trimmed}' is out of range")))?;
        Self::new(step)
    }
}

impl TryFrom<String> for ExpectedFrequency {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ExpectedFrequency> for String {
    fn from(value: ExpectedFrequency) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ExpectedFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.num_seconds();
        if secs % 86_400 == 0 {
            write!(f, "{}d", secs / 86_400)
        } else if secs % 3_600 == 0 {
            write!(f, "{}h", secs / 3_600)
        } else if secs % 60 == 0 {
            write!(f, "{}min", secs / 60)
        } else {
            write!(f, "{secs}s")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QcConfig {
    /// Range check runs only when both bounds are set.
    pub min_val: Option<f64>,
    pub max_val: Option<f64>,
    pub spike_threshold: f64,
    pub flatline_window: usize,
    pub flatline_tolerance: f64,
    pub expected_frequency: ExpectedFrequency,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            min_val: None,
            max_val: None,
            spike_threshold: DEFAULT_SPIKE_THRESHOLD,
            flatline_window: DEFAULT_FLATLINE_WINDOW,
            flatline_tolerance: DEFAULT_FLATLINE_TOLERANCE,
            expected_frequency: ExpectedFrequency::default(),
        }
    }
}

impl QcConfig {
    pub fn with_range(mut self, min_val: f64, max_val: f64) -> Self {
        self.min_val = Some(min_val);
        self.max_val = Some(max_val);
        self
    }

    pub fn with_overrides(&self, overrides: &QcOverrides) -> QcConfig {
        QcConfig {
            min_val: overrides.min_val.or(self.min_val),
            max_val: overrides.max_val.or(self.max_val),
            spike_threshold: overrides.spike_threshold.unwrap_or(self.spike_threshold),
            flatline_window: overrides.flatline_window.unwrap_or(self.flatline_window),
            flatline_tolerance: overrides
                .flatline_tolerance
                .unwrap_or(self.flatline_tolerance),
            expected_frequency: overrides
                .expected_frequency
                .unwrap_or(self.expected_frequency),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.spike_threshold.is_finite() || self.spike_threshold <= 0.0 {
            return Err(CoreError::Config(format!(
                "spike_threshold must be a positive number, got {}",
                self.spike_threshold
            )));
        }
        if self.flatline_window < 2 {
            return Err(CoreError::Config(format!(
                "flatline_window must be at least 2, got {}",
                self.flatline_window
            )));
        }
        if !self.flatline_tolerance.is_finite() || self.flatline_tolerance < 0.0 {
            return Err(CoreError::Config(format!(
                "flatline_tolerance must be non-negative, got {}",
                self.flatline_tolerance
            )));
        }
        if let (Some(min), Some(max)) = (self.min_val, self.max_val) {
            if min > max {
                return Err(CoreError::Config(format!(
                    "min_val {min} is greater than max_val {max}"
                )));
            }
        }
        if self.expected_frequency.as_duration() <= Duration::zero() {
            return Err(CoreError::Config(
                "expected_frequency must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-parameter overrides layered over the shared [`QcConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QcOverrides {
    pub min_val: Option<f64>,
    pub max_val: Option<f64>,
    pub spike_threshold: Option<f64>,
    pub flatline_window: Option<usize>,
    pub flatline_tolerance: Option<f64>,
    pub expected_frequency: Option<ExpectedFrequency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HydraulicConfig {
    pub pipe_diameter_mm: Option<f64>,
    pub shape: PipeShape,
    pub depth_parameter: String,
    pub velocity_parameter: String,
    pub flow_parameter: String,
    /// Skip timestamps where any input series carries a non-OK flag.
    pub exclude_flagged: bool,
}

impl Default for HydraulicConfig {
    fn default() -> Self {
        Self {
            pipe_diameter_mm: None,
            shape: PipeShape::Circular,
            depth_parameter: "depth".to_string(),
            velocity_parameter: "velocity".to_string(),
            flow_parameter: "flow".to_string(),
            exclude_flagged: true,
        }
    }
}

impl HydraulicConfig {
    pub fn geometry(&self) -> Option<PipeGeometry> {
        self.pipe_diameter_mm.map(|diameter_mm| PipeGeometry {
            shape: self.shape,
            diameter_mm,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(diameter) = self.pipe_diameter_mm {
            if !diameter.is_finite() {
                return Err(CoreError::Config(format!(
                    "pipe_diameter_mm must be finite, got {diameter}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    pub qc: QcConfig,
    pub parameters: BTreeMap<String, QcOverrides>,
    pub hydraulics: HydraulicConfig,
}

impl ProcessingConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ProcessingConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Effective QC settings for one parameter.
    pub fn qc_for(&self, parameter: &str) -> QcConfig {
        match self.parameters.get(parameter) {
            Some(overrides) => self.qc.with_overrides(overrides),
            None => self.qc.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.qc.validate()?;
        for (parameter, overrides) in &self.parameters {
            self.qc
                .with_overrides(overrides)
                .validate()
                .map_err(|err| match err {
                    CoreError::Config(message) => {
                        CoreError::Config(format!("parameters.{parameter}: {message}"))
                    }
                    other => other,
                })?;
        }
        self.hydraulics.validate()
    }
}
