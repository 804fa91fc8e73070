//! Run configuration, persisted as TOML.
//!
//! Every tunable of the pipeline lives here: window lengths, the virality and
//! spike-threshold parameters, routing penalties and forecast constants.
//! Every section and field is optional in the file; missing values take the
//! defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub windows: WindowConfig,
    pub virality: ViralityConfig,
    pub threshold: ThresholdConfig,
    pub routing: RoutingConfig,
    pub forecast: ForecastConfig,
}

/// Trailing window lengths used by the demand statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Most recent observations averaged as "current" demand.
    pub short: usize,
    /// Observations immediately before the short window, used as baseline.
    pub previous: usize,
    /// Observations used for the long-term volatility estimate.
    pub long_term: usize,
    /// Short window under viral escalation.
    pub viral_short: usize,
    /// Previous window under viral escalation.
    pub viral_previous: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            short: 3,
            previous: 5,
            long_term: 48,
            viral_short: 1,
            viral_previous: 2,
        }
    }
}

/// Parameters of the viral escalation check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViralityConfig {
    /// Growth ratio that triggers escalation when volatility is flat.
    pub base: f64,
    /// Weight of the short/long volatility ratio added to `base`.
    pub sensitivity: f64,
}

impl Default for ViralityConfig {
    fn default() -> Self {
        Self {
            base: 1.2,
            sensitivity: 1.0,
        }
    }
}

/// Bounds of the adaptive spike threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub min_base: f64,
    pub max_base: f64,
    pub min_volatility: f64,
    pub max_volatility: f64,
    /// Assumed volatility ceiling; sigma is normalized against it.
    pub max_sigma: f64,
    /// Floor substituted for any divisor smaller than it.
    pub epsilon: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_base: 0.5,
            max_base: 1.5,
            min_volatility: 0.3,
            max_volatility: 1.2,
            max_sigma: 100.0,
            epsilon: 1e-3,
        }
    }
}

/// How route sources are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sourcing {
    /// One run from the unique root of the network.
    #[default]
    MainSupplier,
    /// Each product is routed from its cheapest candidate supplier.
    PerProduct,
}

impl std::fmt::Display for Sourcing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MainSupplier => write!(f, "main-supplier"),
            Self::PerProduct => write!(f, "per-product"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Added to an edge's cost when its destination is spiking.
    pub spike_penalty: f64,
    pub sourcing: Sourcing,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            spike_penalty: 10.0,
            sourcing: Sourcing::MainSupplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Trailing observations averaged into the baseline forecast.
    pub window: usize,
    /// Forecast uplift per spiking node on a product's route.
    pub per_spike_increment: f64,
    /// Depletion estimates below this many periods raise the run warning.
    pub warning_threshold: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window: 24,
            per_spike_increment: 0.1,
            warning_threshold: 2,
        }
    }
}

impl TrendConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parse from a TOML string.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    /// Render as pretty TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Check that every parameter is usable.
    pub fn validate(&self) -> ConfigResult<()> {
        let w = &self.windows;
        positive("windows.short", w.short)?;
        positive("windows.previous", w.previous)?;
        positive("windows.long_term", w.long_term)?;
        positive("windows.viral_short", w.viral_short)?;
        positive("windows.viral_previous", w.viral_previous)?;

        finite_non_negative("virality.base", self.virality.base)?;
        finite_non_negative("virality.sensitivity", self.virality.sensitivity)?;

        let t = &self.threshold;
        finite_non_negative("threshold.min_base", t.min_base)?;
        finite_non_negative("threshold.min_volatility", t.min_volatility)?;
        ordered("threshold.max_base", t.min_base, t.max_base)?;
        ordered("threshold.max_volatility", t.min_volatility, t.max_volatility)?;
        finite_positive("threshold.max_sigma", t.max_sigma)?;
        finite_positive("threshold.epsilon", t.epsilon)?;

        finite_non_negative("routing.spike_penalty", self.routing.spike_penalty)?;

        positive("forecast.window", self.forecast.window)?;
        finite_non_negative(
            "forecast.per_spike_increment",
            self.forecast.per_spike_increment,
        )?;
        Ok(())
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        message: message.into(),
    }
}

fn positive(field: &str, value: usize) -> ConfigResult<()> {
    if value == 0 {
        return Err(invalid(field, "Window lengths must be at least 1."));
    }
    Ok(())
}

fn finite_non_negative(field: &str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field, format!("Expected a finite value >= 0, got {value}.")));
    }
    Ok(())
}

fn finite_positive(field: &str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, format!("Expected a finite value > 0, got {value}.")));
    }
    Ok(())
}

fn ordered(field: &str, min: f64, max: f64) -> ConfigResult<()> {
    if !max.is_finite() || max < min {
        return Err(invalid(
            field,
            format!("Upper bound {max} must be finite and >= lower bound {min}."),
        ));
    }
    Ok(())
}
