//! Run outputs.
//!
//! Everything a run produces is collected into a [`RunReport`] owned by the
//! caller. Reports serialize to JSON for export.

use serde::{Deserialize, Serialize};

use crate::detect::{Detection, SpikeSnapshot};
use crate::forecast::Depletion;
use crate::graph::SourceResolution;

/// Cheapest spike-adjusted supply route to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Route {
    Path {
        /// First node of `nodes`.
        source: String,
        /// Node names from the source to the product.
        nodes: Vec<String>,
        /// Sum of adjusted edge costs along the route.
        cost: f64,
    },
    NoPath,
}

impl Route {
    pub fn nodes(&self) -> &[String] {
        match self {
            Route::Path { nodes, .. } => nodes,
            Route::NoPath => &[],
        }
    }

    pub fn is_path(&self) -> bool {
        matches!(self, Route::Path { .. })
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Path { nodes, cost, .. } => write!(f, "{} (cost {cost:.2})", nodes.join(" -> ")),
            Route::NoPath => write!(f, "no path"),
        }
    }
}

/// Per-product outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReport {
    pub name: String,
    pub is_spike: bool,
    /// `None` when the history was too short to judge.
    pub detection: Option<Detection>,
    pub baseline_forecast: f64,
    /// Spiking nodes on the route, source excluded.
    pub spike_exposure: usize,
    pub adjusted_forecast: f64,
    pub depletion: Depletion,
    pub route: Route,
}

/// Non-fatal conditions met during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// Spike detection skipped; baseline forecast only.
    InsufficientHistory {
        product: String,
        required: usize,
        available: usize,
    },
    /// No supply route reaches the product; baseline forecast only.
    NoPath { product: String },
    /// Main-supplier sourcing was requested but the network has zero roots
    /// (an empty network included) or several; products were routed
    /// independently instead.
    DegenerateMainSupplier {
        reason: String,
        candidates: Vec<String>,
    },
}

impl std::fmt::Display for RunWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunWarning::InsufficientHistory {
                product,
                required,
                available,
            } => write!(
                f,
                "{product}: spike detection skipped, {available} of {required} observations"
            ),
            RunWarning::NoPath { product } => write!(f, "{product}: no supply path"),
            RunWarning::DegenerateMainSupplier { reason, .. } => {
                write!(f, "{reason}; falling back to per-product sourcing")
            }
        }
    }
}

/// A product excluded from the run because its data was malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductFailure {
    pub product: String,
    pub reason: String,
}

/// The product expected to run out first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarliestDepletion {
    pub product: String,
    pub periods: u64,
}

/// Complete result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Reports in input order.
    pub products: Vec<ProductReport>,
    /// Products flagged as spiking.
    pub spiking: SpikeSnapshot,
    /// True if any product depletes within the warning threshold.
    pub depletion_warning: bool,
    pub earliest_depletion: Option<EarliestDepletion>,
    pub sources: SourceResolution,
    pub warnings: Vec<RunWarning>,
    pub failures: Vec<ProductFailure>,
}

impl RunReport {
    pub fn product(&self, name: &str) -> Option<&ProductReport> {
        self.products.iter().find(|p| p.name == name)
    }

    /// Pretty JSON rendering of the whole report.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
