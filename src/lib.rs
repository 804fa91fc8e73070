// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # trendpath
//!
//! Spike-aware demand forecasting over a supply network.
//!
//! Given hourly demand history per product and a weighted directed graph from
//! suppliers to products, a run decides which products are spiking, routes
//! every product along its cheapest spike-penalized supply path, scales the
//! demand forecast by the spikes on that path, and estimates when stock runs
//! out.
//!
//! ## Architecture
//!
//! - **Statistics** (`stats`): trailing-window means and population deviations
//! - **Detection** (`detect`): two-tier adaptive spike / viral detection
//! - **Supply graph** (`graph`): petgraph network, frozen spike-adjusted costs,
//!   bounded Bellman-Ford
//! - **Forecast** (`forecast`): route-adjusted forecasts and depletion estimates
//! - **Pipeline** (`pipeline`): one forward pass producing a [`pipeline::RunReport`]
//!
//! ## Library usage
//!
//! ```no_run
//! use trendpath::config::TrendConfig;
//! use trendpath::graph::SupplyGraph;
//! use trendpath::pipeline::TrendPipeline;
//! use trendpath::product::Product;
//!
//! let mut graph = SupplyGraph::new();
//! graph.add_edge("Kitchen", "Burger", 5.0).unwrap();
//! let products = vec![Product::new(
//!     "Burger",
//!     vec![10.0, 12.0, 11.0, 13.0, 50.0, 55.0, 60.0, 65.0, 70.0, 75.0],
//!     100.0,
//! )];
//!
//! let pipeline = TrendPipeline::new(TrendConfig::default()).unwrap();
//! let report = pipeline.run(&products, &graph);
//! println!("depletion warning: {}", report.depletion_warning);
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod forecast;
pub mod graph;
pub mod input;
pub mod pipeline;
pub mod product;
pub mod stats;
