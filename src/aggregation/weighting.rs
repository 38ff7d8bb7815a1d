//! Weighting policies for interval aggregation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tracking::strategy_name;

/// How a slice's position inside its interval scales its similarities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum WeighFunction {
    /// Every slice counts the same.
    Uniform,
    /// `max(0, 1 - p * |d|)`.
    Linear,
    /// `exp(-d^2 / (2 p^2))`.
    #[default]
    Gaussian,
}

impl WeighFunction {
    /// Resolve a case-insensitive weighting function name.
    pub fn from_name(name: &str) -> std::result::Result<Self, ConfigError> {
        match strategy_name(name).as_str() {
            "uniform" | "flat" | "similarity" | "similarity-weighted" => Ok(Self::Uniform),
            "linear" | "linear-decay" => Ok(Self::Linear),
            "gaussian" | "gauss" => Ok(Self::Gaussian),
            _ => Err(ConfigError::UnknownStrategy {
                kind: "weighting function",
                name: name.to_string(),
            }),
        }
    }

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Linear => "linear",
            Self::Gaussian => "gaussian",
        }
    }

    /// Check that `param` suits this function.
    pub fn validate(&self, param: f32) -> std::result::Result<(), ConfigError> {
        if !param.is_finite() {
            return Err(ConfigError::Invalid(
                "weighting parameter must be finite".to_string(),
            ));
        }
        match self {
            Self::Uniform => Ok(()),
            Self::Linear if param < 0.0 => Err(ConfigError::Invalid(
                "linear weighting parameter must be >= 0".to_string(),
            )),
            Self::Gaussian if param <= 0.0 => Err(ConfigError::Invalid(
                "gaussian weighting parameter must be > 0".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Weight of a slice at `position` in an interval of `len` slices.
    pub fn weight(&self, position: usize, len: usize, param: f32) -> f32 {
        let center = len.saturating_sub(1) as f32 / 2.0;
        let distance = position as f32 - center;
        match self {
            Self::Uniform => 1.0,
            Self::Linear => (1.0 - param * distance.abs()).max(0.0),
            Self::Gaussian => (-(distance * distance) / (2.0 * param * param)).exp(),
        }
    }
}

impl FromStr for WeighFunction {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl TryFrom<String> for WeighFunction {
    type Error = ConfigError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::from_name(&s)
    }
}

impl fmt::Display for WeighFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
