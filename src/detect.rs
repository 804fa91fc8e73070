//! Spike and virality detection.
//!
//! Detection runs in two stages:
//!
//! - **Virality**: if short-term demand grew faster than a volatility-scaled
//!   ratio over the previous window, the statistics are recomputed on the
//!   shorter viral windows so an abrupt surge is not smoothed away.
//! - **Spike**: the (possibly recomputed) short-term average is compared with
//!   an adaptive threshold `prev_avg + k * sigma`, where `k` is interpolated
//!   between configured bounds by the normalized volatility.
//!
//! The sensitivity works on normalized sigma, not raw sigma:
//! `t = clamp(sigma / max_sigma, 0, 1)` and
//! `k = lerp(min_base, max_base, t) + lerp(min_volatility, max_volatility, t) * t`.
//! Scaling the volatility factor by raw sigma would push the threshold of any
//! history with a sigma in the tens far above its own short-term average, so
//! a sharp ramp could never register.
//!
//! The per-product flags are frozen into a [`SpikeSnapshot`] that later
//! stages read without ever mutating.

use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ThresholdConfig, TrendConfig, ViralityConfig};
use crate::product::Product;
use crate::stats::{self, StatsResult, WindowSpec, WindowStats};

/// Outcome of running the detector on one history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Statistics the spike decision was made on.
    pub stats: WindowStats,
    /// Whether viral escalation replaced the normal windows.
    pub viral: bool,
    /// `short_term_avg / prev_avg` on the normal windows.
    pub growth_ratio: f64,
    /// Ratio above which escalation triggers.
    pub viral_threshold: f64,
    /// Sensitivity multiplier `k`.
    pub sensitivity: f64,
    /// `prev_avg + k * sigma`.
    pub dynamic_threshold: f64,
    pub is_spike: bool,
}

/// Two-tier adaptive spike detector.
#[derive(Debug, Clone)]
pub struct SpikeDetector {
    normal: WindowSpec,
    viral: WindowSpec,
    long_term: usize,
    virality: ViralityConfig,
    threshold: ThresholdConfig,
}

impl SpikeDetector {
    pub fn new(config: &TrendConfig) -> Self {
        let w = &config.windows;
        Self {
            normal: WindowSpec::new(w.short, w.previous),
            viral: WindowSpec::new(w.viral_short, w.viral_previous),
            long_term: w.long_term,
            virality: config.virality.clone(),
            threshold: config.threshold.clone(),
        }
    }

    /// Judge one demand history.
    pub fn detect(&self, history: &[f64]) -> StatsResult<Detection> {
        let eps = self.threshold.epsilon;
        let normal = stats::window_stats(history, self.normal, self.long_term)?;

        let viral_threshold = self.virality.base
            + self.virality.sensitivity
                * (normal.sigma / stats::floored(normal.long_term_sigma, eps));
        let growth_ratio = normal.short_term_avg / stats::floored(normal.prev_avg, eps);
        let viral = growth_ratio > viral_threshold;

        let used = if viral {
            WindowStats {
                // Volatility of the full history stays the reference.
                long_term_sigma: normal.long_term_sigma,
                ..stats::window_stats(history, self.viral, self.long_term)?
            }
        } else {
            normal
        };

        let sensitivity = self.sensitivity(used.sigma);
        let dynamic_threshold = used.prev_avg + sensitivity * used.sigma;

        Ok(Detection {
            stats: used,
            viral,
            growth_ratio,
            viral_threshold,
            sensitivity,
            dynamic_threshold,
            is_spike: used.short_term_avg > dynamic_threshold,
        })
    }

    /// Sensitivity `k` for a given volatility.
    ///
    /// `t = sigma / max_sigma` clamped to `[0, 1]` drives both interpolations,
    /// so `k` always lies in `[min_base, max_base + max_volatility]`.
    pub fn sensitivity(&self, sigma: f64) -> f64 {
        let th = &self.threshold;
        let t = (sigma / stats::floored(th.max_sigma, th.epsilon)).clamp(0.0, 1.0);
        let base_sensitivity = lerp(th.min_base, th.max_base, t);
        let volatility_factor = lerp(th.min_volatility, th.max_volatility, t);
        base_sensitivity + volatility_factor * t
    }
}

fn lerp(min: f64, max: f64, t: f64) -> f64 {
    min + (max - min) * t
}

/// Frozen set of spiking product names for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpikeSnapshot {
    spiking: BTreeSet<String>,
}

impl SpikeSnapshot {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            spiking: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` is a spiking product. Unknown names never spike.
    pub fn is_spiking(&self, name: &str) -> bool {
        self.spiking.contains(name)
    }

    pub fn len(&self) -> usize {
        self.spiking.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spiking.is_empty()
    }

    /// Spiking names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.spiking.iter().map(String::as_str)
    }
}

/// Run the detector over every product in parallel.
///
/// Returns the per-product outcomes in input order together with the snapshot
/// built from them. Each product only reads its own history.
pub fn detect_all<'a>(
    products: &'a [Product],
    detector: &SpikeDetector,
) -> (SpikeSnapshot, Vec<(&'a Product, StatsResult<Detection>)>) {
    let outcomes: Vec<(&Product, StatsResult<Detection>)> = products
        .par_iter()
        .map(|product| (product, detector.detect(&product.history)))
        .collect();

    let snapshot = SpikeSnapshot::from_names(
        outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, Ok(d) if d.is_spike))
            .map(|(product, _)| product.name.as_str()),
    );
    (snapshot, outcomes)
}
