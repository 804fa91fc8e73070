//! Processing pipeline: one forward pass from demand history to depletion.
//!
//! Stages run strictly in order, with no feedback:
//!
//! 1. validate products (malformed ones are isolated as failures),
//! 2. detect spikes in parallel and freeze the flags into a snapshot,
//! 3. freeze spike-adjusted edge costs from the snapshot,
//! 4. compute shortest paths from the resolved source(s) in parallel,
//! 5. adjust forecasts by route spike exposure and estimate depletion.

pub mod report;

use std::collections::HashSet;
use std::path::Path;

use petgraph::graph::NodeIndex;
use rayon::prelude::*;

use crate::config::{ConfigResult, Sourcing, TrendConfig};
use crate::detect::{self, SpikeDetector, SpikeSnapshot};
use crate::error::{InputError, StatsError, TrendResult};
use crate::forecast::{self, Depletion};
use crate::graph::bellman_ford::{self, ShortestPaths};
use crate::graph::cost::CostModel;
use crate::graph::{SourceResolution, SupplyGraph};
use crate::input::TrendInput;
use crate::product::Product;

pub use report::{
    EarliestDepletion, ProductFailure, ProductReport, Route, RunReport, RunWarning,
};

/// Configured pipeline, reusable across runs.
#[derive(Debug, Clone)]
pub struct TrendPipeline {
    config: TrendConfig,
    detector: SpikeDetector,
}

impl TrendPipeline {
    /// Create a pipeline. Fails if the configuration is unusable.
    pub fn new(config: TrendConfig) -> ConfigResult<Self> {
        config.validate()?;
        let detector = SpikeDetector::new(&config);
        Ok(Self { config, detector })
    }

    /// Run the full pipeline once.
    ///
    /// Never fails as a whole: malformed products become
    /// [`ProductFailure`]s and degenerate conditions become [`RunWarning`]s.
    pub fn run(&self, products: &[Product], graph: &SupplyGraph) -> RunReport {
        tracing::info!(
            products = products.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            sourcing = %self.config.routing.sourcing,
            "starting trendpath run"
        );

        let mut warnings = Vec::new();
        let (valid, failures) = partition_valid(products);

        // Stage 1-2: detection, frozen into a snapshot before any routing.
        let (snapshot, outcomes) = detect::detect_all(&valid, &self.detector);
        for (product, outcome) in &outcomes {
            match outcome {
                Ok(d) => tracing::debug!(
                    product = %product.name,
                    viral = d.viral,
                    spike = d.is_spike,
                    short_term_avg = d.stats.short_term_avg,
                    threshold = d.dynamic_threshold,
                    "detection"
                ),
                Err(StatsError::InsufficientHistory {
                    required,
                    available,
                }) => warnings.push(RunWarning::InsufficientHistory {
                    product: product.name.clone(),
                    required: *required,
                    available: *available,
                }),
            }
        }

        // Stage 3: costs for this run only.
        let costs = CostModel::freeze(graph, &snapshot, self.config.routing.spike_penalty);

        // Stage 4: shortest paths from every source this run needs.
        let (sources, candidates, fallback) = self.resolve_sources(graph, &mut warnings);
        let independent = matches!(sources, SourceResolution::PerProduct { .. });
        let runs = shortest_paths_from(graph, &costs, &candidates);
        // Only computed if some product is out of reach of every candidate.
        let mut fallback_runs: Option<Vec<ShortestPaths>> = None;

        // Stage 5: forecasts and depletion.
        let mut reports = Vec::with_capacity(outcomes.len());
        for (product, outcome) in outcomes {
            let mut route = best_route(graph, &runs, &costs, &product.name, independent);
            if !route.is_path() && !fallback.is_empty() {
                let extra = fallback_runs
                    .get_or_insert_with(|| shortest_paths_from(graph, &costs, &fallback));
                route = best_route(graph, extra, &costs, &product.name, true);
            }
            if !route.is_path() {
                warnings.push(RunWarning::NoPath {
                    product: product.name.clone(),
                });
            }
            reports.push(self.report(product, outcome.ok(), route, &snapshot));
        }

        for warning in &warnings {
            tracing::warn!("{warning}");
        }

        let threshold = self.config.forecast.warning_threshold;
        let depletion_warning = reports.iter().any(|r| r.depletion.is_below(threshold));
        let earliest_depletion = reports
            .iter()
            .filter_map(|r| {
                r.depletion.periods().map(|periods| EarliestDepletion {
                    product: r.name.clone(),
                    periods,
                })
            })
            .min_by_key(|e| e.periods);

        tracing::info!(
            products = reports.len(),
            spiking = snapshot.len(),
            failures = failures.len(),
            warnings = warnings.len(),
            depletion_warning,
            "trendpath run complete"
        );

        RunReport {
            products: reports,
            spiking: snapshot,
            depletion_warning,
            earliest_depletion,
            sources,
            warnings,
            failures,
        }
    }

    /// Decide which nodes the shortest-path runs start from.
    ///
    /// Returns the resolution, the candidate sources, and the fallback
    /// sources tried for products no candidate reaches. Per-product sourcing
    /// prefers supplier roots; every other node with outgoing edges is a
    /// fallback. A network without roots uses all of those nodes directly.
    fn resolve_sources(
        &self,
        graph: &SupplyGraph,
        warnings: &mut Vec<RunWarning>,
    ) -> (SourceResolution, Vec<NodeIndex>, Vec<NodeIndex>) {
        if self.config.routing.sourcing == Sourcing::MainSupplier {
            match graph.main_supplier() {
                Ok(main) => {
                    let resolution = SourceResolution::MainSupplier {
                        name: graph.name(main).to_string(),
                    };
                    return (resolution, vec![main], Vec::new());
                }
                Err(e) => warnings.push(RunWarning::DegenerateMainSupplier {
                    reason: e.to_string(),
                    candidates: names(graph, &graph.supplier_roots()),
                }),
            }
        }

        let roots = graph.supplier_roots();
        let (candidates, fallback) = if roots.is_empty() {
            (graph.nodes_with_outgoing(), Vec::new())
        } else {
            let hubs = graph
                .nodes_with_outgoing()
                .into_iter()
                .filter(|n| !roots.contains(n))
                .collect();
            (roots, hubs)
        };
        let resolution = SourceResolution::PerProduct {
            candidates: names(graph, &candidates),
            fallback: names(graph, &fallback),
        };
        (resolution, candidates, fallback)
    }

    fn report(
        &self,
        product: &Product,
        detection: Option<detect::Detection>,
        route: Route,
        snapshot: &SpikeSnapshot,
    ) -> ProductReport {
        let fc = &self.config.forecast;
        let baseline = forecast::baseline_forecast(&product.history, fc.window);
        let exposure = forecast::spike_exposure(route.nodes(), snapshot);
        let adjusted = forecast::adjusted_forecast(baseline, exposure, fc.per_spike_increment);

        ProductReport {
            name: product.name.clone(),
            is_spike: snapshot.is_spiking(&product.name),
            detection,
            baseline_forecast: baseline,
            spike_exposure: exposure,
            adjusted_forecast: adjusted,
            depletion: Depletion::estimate(product.stock, adjusted),
            route,
        }
    }
}

/// Load the configuration (defaults when `config` is `None`) and the input
/// document from disk, then run the pipeline once.
pub fn run_files(input: &Path, config: Option<&Path>) -> TrendResult<RunReport> {
    let config = match config {
        Some(path) => TrendConfig::load(path)?,
        None => TrendConfig::default(),
    };
    let pipeline = TrendPipeline::new(config)?;
    let (products, graph) = TrendInput::load(input)?.into_parts()?;
    Ok(pipeline.run(&products, &graph))
}

/// One shortest-path run per source, in parallel over the same frozen costs.
fn shortest_paths_from(
    graph: &SupplyGraph,
    costs: &CostModel,
    sources: &[NodeIndex],
) -> Vec<ShortestPaths> {
    sources
        .par_iter()
        .map(|&source| bellman_ford::shortest_paths(graph, costs, source))
        .collect()
}

/// Split products into usable ones and failures, keeping input order.
fn partition_valid(products: &[Product]) -> (Vec<Product>, Vec<ProductFailure>) {
    let mut seen = HashSet::new();
    let mut valid = Vec::with_capacity(products.len());
    let mut failures = Vec::new();

    for product in products {
        let checked = product.validate().map_err(|e| e.to_string()).and_then(|()| {
            if seen.insert(product.name.as_str()) {
                Ok(())
            } else {
                Err(InputError::DuplicateProduct {
                    name: product.name.clone(),
                }
                .to_string())
            }
        });
        match checked {
            Ok(()) => valid.push(product.clone()),
            Err(reason) => {
                tracing::warn!(product = %product.name, %reason, "product excluded from run");
                failures.push(ProductFailure {
                    product: product.name.clone(),
                    reason,
                });
            }
        }
    }
    (valid, failures)
}

/// Cheapest route to `product` over all runs; ties go to the earlier run.
///
/// With `independent` routing a product is never its own source.
fn best_route(
    graph: &SupplyGraph,
    runs: &[ShortestPaths],
    costs: &CostModel,
    product: &str,
    independent: bool,
) -> Route {
    let Some(target) = graph.node(product) else {
        return Route::NoPath;
    };

    let mut best: Option<(&ShortestPaths, Vec<NodeIndex>, f64)> = None;
    for run in runs {
        if independent && run.source() == target {
            continue;
        }
        let Some(edges) = run.edges_to(graph, target) else {
            continue;
        };
        let Some(path) = run.nodes_along(graph, &edges) else {
            continue;
        };
        let cost = costs.path_cost(&edges);
        if best.as_ref().is_none_or(|(_, _, c)| cost < *c) {
            best = Some((run, path, cost));
        }
    }

    match best {
        Some((run, path, cost)) => Route::Path {
            source: graph.name(run.source()).to_string(),
            nodes: names(graph, &path),
            cost,
        },
        None => Route::NoPath,
    }
}

fn names(graph: &SupplyGraph, nodes: &[NodeIndex]) -> Vec<String> {
    nodes.iter().map(|&n| graph.name(n).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, GraphError, TrendError};

    const BURGER: [f64; 10] = [10.0, 12.0, 11.0, 13.0, 50.0, 55.0, 60.0, 65.0, 70.0, 75.0];

    fn pipeline() -> TrendPipeline {
        TrendPipeline::new(TrendConfig::default()).unwrap()
    }

    fn per_product() -> TrendPipeline {
        let mut config = TrendConfig::default();
        config.routing.sourcing = Sourcing::PerProduct;
        TrendPipeline::new(config).unwrap()
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = TrendConfig::default();
        config.windows.short = 0;
        assert!(TrendPipeline::new(config).is_err());
    }

    #[test]
    fn malformed_product_is_isolated() {
        let mut g = SupplyGraph::new();
        g.add_edge("Kitchen", "Burger", 5.0).unwrap();
        g.add_edge("Kitchen", "Broken", 1.0).unwrap();
        let products = vec![
            Product::new("Broken", vec![1.0, f64::NAN], 10.0),
            Product::new("Burger", BURGER.to_vec(), 100.0),
        ];
        let report = pipeline().run(&products, &g);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].product, "Broken");
        assert_eq!(report.products.len(), 1);
        assert!(report.product("Burger").unwrap().is_spike);
    }

    #[test]
    fn duplicate_product_is_a_failure() {
        let mut g = SupplyGraph::new();
        g.add_edge("Kitchen", "Soda", 3.0).unwrap();
        let products = vec![
            Product::new("Soda", vec![5.0; 10], 60.0),
            Product::new("Soda", vec![6.0; 10], 60.0),
        ];
        let report = pipeline().run(&products, &g);
        assert_eq!(report.products.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.product("Soda").unwrap().baseline_forecast, 5.0);
    }

    #[test]
    fn short_history_warns_and_uses_baseline() {
        let mut g = SupplyGraph::new();
        g.add_edge("Kitchen", "Wrap", 2.0).unwrap();
        let products = vec![Product::new("Wrap", vec![4.0, 6.0, 8.0], 30.0)];
        let report = pipeline().run(&products, &g);

        let wrap = report.product("Wrap").unwrap();
        assert!(!wrap.is_spike);
        assert!(wrap.detection.is_none());
        assert_eq!(wrap.baseline_forecast, 6.0);
        assert_eq!(wrap.adjusted_forecast, 6.0);
        assert_eq!(wrap.depletion, Depletion::Periods(5));
        assert!(report.warnings.contains(&RunWarning::InsufficientHistory {
            product: "Wrap".into(),
            required: 8,
            available: 3,
        }));
    }

    #[test]
    fn ambiguous_supplier_falls_back_to_per_product() {
        let mut g = SupplyGraph::new();
        g.add_edge("Kitchen", "Burger", 5.0).unwrap();
        g.add_edge("Farm", "Burger", 2.0).unwrap();
        g.add_edge("Bakery", "Bun", 1.0).unwrap();
        let products = vec![
            Product::new("Burger", vec![20.0; 10], 100.0),
            Product::new("Bun", vec![10.0; 10], 100.0),
        ];
        let report = pipeline().run(&products, &g);

        assert!(matches!(
            report.warnings[0],
            RunWarning::DegenerateMainSupplier { .. }
        ));
        assert_eq!(
            report.sources,
            SourceResolution::PerProduct {
                candidates: vec!["Bakery".into(), "Farm".into(), "Kitchen".into()],
                fallback: vec![],
            }
        );
        assert_eq!(
            report.product("Burger").unwrap().route.nodes(),
            ["Farm", "Burger"]
        );
        assert_eq!(report.product("Bun").unwrap().route.nodes(), ["Bakery", "Bun"]);
    }

    #[test]
    fn per_product_ties_go_to_first_source_by_name() {
        let mut g = SupplyGraph::new();
        g.add_edge("North", "Soda", 3.0).unwrap();
        g.add_edge("East", "Soda", 3.0).unwrap();
        let products = vec![Product::new("Soda", vec![5.0; 10], 60.0)];
        let report = per_product().run(&products, &g);
        assert!(report.warnings.is_empty());
        match &report.product("Soda").unwrap().route {
            Route::Path { source, .. } => assert_eq!(source, "East"),
            Route::NoPath => panic!("expected a route"),
        }
    }

    #[test]
    fn rootless_cycle_routes_from_other_nodes() {
        let mut g = SupplyGraph::new();
        g.add_edge("Depot", "Soda", 4.0).unwrap();
        g.add_edge("Soda", "Depot", 1.0).unwrap();
        let products = vec![Product::new("Soda", vec![5.0; 10], 60.0)];
        let report = per_product().run(&products, &g);
        assert_eq!(report.product("Soda").unwrap().route.nodes(), ["Depot", "Soda"]);
    }

    #[test]
    fn empty_network_reports_degenerate_supplier() {
        let products = vec![Product::new("Burger", BURGER.to_vec(), 100.0)];
        let report = pipeline().run(&products, &SupplyGraph::new());

        assert_eq!(
            report.warnings[0],
            RunWarning::DegenerateMainSupplier {
                reason: GraphError::NoMainSupplier.to_string(),
                candidates: vec![],
            }
        );
        assert!(report.warnings.contains(&RunWarning::NoPath {
            product: "Burger".into()
        }));
        assert_eq!(
            report.sources,
            SourceResolution::PerProduct {
                candidates: vec![],
                fallback: vec![],
            }
        );
    }

    #[test]
    fn rootless_cycle_under_main_supplier_warns_and_routes() {
        let mut g = SupplyGraph::new();
        g.add_edge("Depot", "Soda", 4.0).unwrap();
        g.add_edge("Soda", "Depot", 1.0).unwrap();
        let products = vec![Product::new("Soda", vec![5.0; 10], 60.0)];
        let report = pipeline().run(&products, &g);

        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            &report.warnings[0],
            RunWarning::DegenerateMainSupplier { candidates, .. } if candidates.is_empty()
        ));
        assert_eq!(report.product("Soda").unwrap().route.nodes(), ["Depot", "Soda"]);
    }

    #[test]
    fn product_behind_a_cycle_routes_from_fallback_hub() {
        let mut g = SupplyGraph::new();
        g.add_edge("Kitchen", "Burger", 5.0).unwrap();
        g.add_edge("Hub", "Relay", 1.0).unwrap();
        g.add_edge("Relay", "Hub", 1.0).unwrap();
        g.add_edge("Relay", "Soda", 1.0).unwrap();
        let products = vec![
            Product::new("Burger", vec![20.0; 10], 100.0),
            Product::new("Soda", vec![5.0; 10], 60.0),
        ];
        let report = per_product().run(&products, &g);

        assert!(report.warnings.is_empty());
        assert_eq!(
            report.sources,
            SourceResolution::PerProduct {
                candidates: vec!["Kitchen".into()],
                fallback: vec!["Hub".into(), "Relay".into()],
            }
        );
        assert_eq!(
            report.product("Burger").unwrap().route.nodes(),
            ["Kitchen", "Burger"]
        );
        match &report.product("Soda").unwrap().route {
            Route::Path {
                source,
                nodes,
                cost,
            } => {
                assert_eq!(source, "Relay");
                assert_eq!(nodes, &["Relay", "Soda"]);
                assert_eq!(*cost, 1.0);
            }
            Route::NoPath => panic!("expected a route"),
        }
    }

    #[test]
    fn run_files_loads_config_and_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("input.json");
        std::fs::write(
            &input,
            r#"{"products": {"Soda": {"stock": 60.0, "history": [5, 5, 5, 5, 5, 5, 5, 5]}},
                "edges": [{"from": "Kitchen", "to": "Soda", "cost": 3.0}]}"#,
        )
        .unwrap();

        let report = run_files(&input, None).unwrap();
        assert_eq!(report.product("Soda").unwrap().depletion, Depletion::Periods(12));

        let err = run_files(&dir.path().join("absent.json"), None).unwrap_err();
        assert!(matches!(err, TrendError::Input(InputError::Read { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[windows]\nshort = 0\n").unwrap();
        let err = run_files(&input, Some(&bad)).unwrap_err();
        assert!(matches!(err, TrendError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn earliest_depletion_picks_smallest_estimate() {
        let mut g = SupplyGraph::new();
        g.add_edge("Kitchen", "Soda", 3.0).unwrap();
        g.add_edge("Kitchen", "Fries", 4.0).unwrap();
        g.add_edge("Kitchen", "Ice", 1.0).unwrap();
        let products = vec![
            Product::new("Soda", vec![5.0; 10], 60.0),
            Product::new("Fries", vec![10.0; 10], 15.0),
            Product::new("Ice", vec![0.0; 10], 15.0),
        ];
        let report = pipeline().run(&products, &g);
        assert_eq!(
            report.earliest_depletion,
            Some(EarliestDepletion {
                product: "Fries".into(),
                periods: 1
            })
        );
        assert!(report.depletion_warning);
        assert_eq!(report.product("Ice").unwrap().depletion, Depletion::Never);
    }

    #[test]
    fn report_serializes_to_json() {
        let mut g = SupplyGraph::new();
        g.add_edge("Kitchen", "Burger", 5.0).unwrap();
        let products = vec![Product::new("Burger", BURGER.to_vec(), 100.0)];
        let json = pipeline().run(&products, &g).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["products"][0]["name"], "Burger");
        assert_eq!(value["products"][0]["route"]["kind"], "path");
        assert_eq!(value["sources"]["kind"], "main-supplier");
    }
}
