//! Trailing-window demand statistics.
//!
//! All averages and deviations use population formulas. Every divisor that
//! could approach zero goes through [`floored`].

use serde::{Deserialize, Serialize};

use crate::error::StatsError;

pub type StatsResult<T> = std::result::Result<T, StatsError>;

/// Short and previous window lengths for one statistics pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub short: usize,
    pub previous: usize,
}

impl WindowSpec {
    pub fn new(short: usize, previous: usize) -> Self {
        Self { short, previous }
    }

    /// Observations needed for both windows.
    pub fn required(&self) -> usize {
        self.short + self.previous
    }
}

/// Statistics of one product's demand history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Windows these statistics were computed with.
    pub windows: WindowSpec,
    /// Mean of the short (most recent) window.
    pub short_term_avg: f64,
    /// Mean of the window immediately preceding the short one.
    pub prev_avg: f64,
    /// Population std-dev over the short and previous windows together.
    pub sigma: f64,
    /// Population std-dev over the long-term window.
    pub long_term_sigma: f64,
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0.0 for an empty slice.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    // Rounding can leave a tiny negative variance.
    variance.max(0.0).sqrt()
}

/// `value` raised to at least `epsilon`, for use as a divisor.
pub fn floored(value: f64, epsilon: f64) -> f64 {
    value.max(epsilon)
}

/// Last `n` observations (or all of them if fewer).
pub fn tail(history: &[f64], n: usize) -> &[f64] {
    &history[history.len().saturating_sub(n)..]
}

/// Compute window statistics over `history`.
///
/// `long_term` bounds the volatility window; a shorter history uses every
/// observation. Fails when `history` cannot fill both windows.
pub fn window_stats(
    history: &[f64],
    windows: WindowSpec,
    long_term: usize,
) -> StatsResult<WindowStats> {
    let required = windows.required();
    if history.len() < required {
        return Err(StatsError::InsufficientHistory {
            required,
            available: history.len(),
        });
    }

    let combined = tail(history, required);
    let (previous, short) = combined.split_at(windows.previous);

    Ok(WindowStats {
        windows,
        short_term_avg: mean(short),
        prev_avg: mean(previous),
        sigma: population_std_dev(combined),
        long_term_sigma: population_std_dev(tail(history, long_term)),
    })
}
