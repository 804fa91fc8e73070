//! Demand forecast and stock-depletion estimates.
//!
//! The baseline forecast is the mean of recent demand. It is scaled up by
//! the number of spiking nodes on the product's supply route, and the
//! adjusted rate determines how many periods the current stock lasts.

use serde::{Deserialize, Serialize};

use crate::detect::SpikeSnapshot;
use crate::stats;

/// Mean of the last `min(history.len(), window)` observations.
pub fn baseline_forecast(history: &[f64], window: usize) -> f64 {
    stats::mean(stats::tail(history, window))
}

/// Count spiking nodes on a route, skipping the route's source.
///
/// `route` runs source first, product last; the product itself counts.
pub fn spike_exposure<S: AsRef<str>>(route: &[S], snapshot: &SpikeSnapshot) -> usize {
    route
        .iter()
        .skip(1)
        .filter(|node| snapshot.is_spiking(node.as_ref()))
        .count()
}

/// `baseline * (1 + per_spike_increment * exposure)`.
pub fn adjusted_forecast(baseline: f64, exposure: usize, per_spike_increment: f64) -> f64 {
    baseline * (1.0 + per_spike_increment * exposure as f64)
}

/// Projected time until stock runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Depletion {
    /// Whole periods of demand the stock covers.
    Periods(u64),
    /// Demand is zero; the stock never runs out.
    Never,
}

impl Depletion {
    /// `floor(stock / forecast)`, or `Never` for a non-positive forecast.
    pub fn estimate(stock: f64, forecast: f64) -> Self {
        if forecast > 0.0 && forecast.is_finite() {
            // Float-to-int casts saturate, so a huge ratio stays finite.
            Depletion::Periods((stock.max(0.0) / forecast).floor() as u64)
        } else {
            Depletion::Never
        }
    }

    pub fn periods(&self) -> Option<u64> {
        match self {
            Depletion::Periods(n) => Some(*n),
            Depletion::Never => None,
        }
    }

    /// Whether the estimate is finite and strictly below `threshold`.
    pub fn is_below(&self, threshold: u64) -> bool {
        matches!(self, Depletion::Periods(n) if *n < threshold)
    }
}

impl std::fmt::Display for Depletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Depletion::Periods(n) => write!(f, "{n} periods"),
            Depletion::Never => write!(f, "never"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_uses_trailing_window() {
        let history: Vec<f64> = (1..=30).map(f64::from).collect();
        // Last 24 of 1..=30 are 7..=30.
        assert_eq!(baseline_forecast(&history, 24), 18.5);
        assert_eq!(baseline_forecast(&[10.0, 20.0], 24), 15.0);
    }

    #[test]
    fn exposure_skips_source_counts_product() {
        let snapshot = SpikeSnapshot::from_names(["Kitchen", "Burger", "Fries"]);
        assert_eq!(spike_exposure(&["Kitchen", "Burger", "Fries"], &snapshot), 2);
        assert_eq!(spike_exposure(&["Kitchen", "Soda"], &snapshot), 0);
        assert_eq!(spike_exposure::<&str>(&[], &snapshot), 0);
    }

    #[test]
    fn adjustment_scales_per_spike() {
        assert_eq!(adjusted_forecast(40.0, 0, 0.1), 40.0);
        assert!((adjusted_forecast(40.0, 2, 0.1) - 48.0).abs() < 1e-9);
    }

    #[test]
    fn depletion_floors_ratio() {
        assert_eq!(Depletion::estimate(100.0, 46.31), Depletion::Periods(2));
        assert_eq!(Depletion::estimate(0.0, 5.0), Depletion::Periods(0));
    }

    #[test]
    fn zero_forecast_never_depletes() {
        assert_eq!(Depletion::estimate(100.0, 0.0), Depletion::Never);
        assert!(!Depletion::Never.is_below(2));
        assert_eq!(Depletion::Never.periods(), None);
    }

    #[test]
    fn depletion_non_increasing_in_forecast() {
        let mut last = Depletion::Never;
        for forecast in [0.0, 0.5, 1.0, 3.0, 7.5, 20.0, 100.0, 1000.0] {
            let d = Depletion::estimate(100.0, forecast);
            assert!(d <= last, "{d} > {last} at forecast {forecast}");
            last = d;
        }
    }

    #[test]
    fn warning_threshold_is_strict() {
        assert!(Depletion::Periods(1).is_below(2));
        assert!(!Depletion::Periods(2).is_below(2));
    }
}
