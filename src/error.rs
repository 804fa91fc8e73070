//! Rich diagnostic error types for trendpath.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for trendpath.
///
/// Wraps the errors that can abort a run before it starts, preserving the full
/// diagnostic chain (error codes, help text, source spans) through to the user.
/// Product, stats and graph-resolution problems never abort a run; they surface
/// as failures and warnings in the report.
#[derive(Debug, Error, Diagnostic)]
pub enum TrendError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Input(#[from] InputError),
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(trendpath::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(trendpath::config::parse),
        help(
            "Check the TOML syntax. Every section is optional; \
             run `trendpath config` to print a complete default file."
        )
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(trendpath::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {field}: {message}")]
    #[diagnostic(
        code(trendpath::config::invalid),
        help("Fix `{field}` in the configuration. {message}")
    )]
    Invalid { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InputError {
    #[error("failed to read input: {path}")]
    #[diagnostic(
        code(trendpath::input::read),
        help("Ensure the input file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse input: {message}")]
    #[diagnostic(
        code(trendpath::input::parse),
        help(
            "The input must be a JSON object with a `products` map from name \
             to `stock` and `history`, and an `edges` list of `from`, `to`, `cost`."
        )
    )]
    Parse { message: String },

    #[error("duplicate product: {name}")]
    #[diagnostic(
        code(trendpath::input::duplicate_product),
        help("Product names must be unique. Merge or rename the duplicate entry.")
    )]
    DuplicateProduct { name: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Product errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum ProductError {
    #[error("product name is empty")]
    #[diagnostic(
        code(trendpath::product::empty_name),
        help("Every product needs a non-empty, unique name.")
    )]
    EmptyName,

    #[error("product \"{name}\" has no demand history")]
    #[diagnostic(
        code(trendpath::product::empty_history),
        help("Provide at least one demand observation so a baseline forecast can be computed.")
    )]
    EmptyHistory { name: String },

    #[error("product \"{name}\" has an invalid observation at index {index}: {value}")]
    #[diagnostic(
        code(trendpath::product::invalid_observation),
        help("Demand observations must be finite and non-negative.")
    )]
    InvalidObservation {
        name: String,
        index: usize,
        value: f64,
    },

    #[error("product \"{name}\" has an invalid stock level: {stock}")]
    #[diagnostic(
        code(trendpath::product::invalid_stock),
        help("Stock must be finite and non-negative.")
    )]
    InvalidStock { name: String, stock: f64 },
}

// ---------------------------------------------------------------------------
// Stats errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum StatsError {
    #[error("insufficient history: need {required} observations, have {available}")]
    #[diagnostic(
        code(trendpath::stats::insufficient_history),
        help(
            "Spike detection needs at least `windows.short + windows.previous` \
             observations. The product still receives a baseline forecast."
        )
    )]
    InsufficientHistory { required: usize, available: usize },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum GraphError {
    #[error("invalid cost {cost} on edge {from} -> {to}")]
    #[diagnostic(
        code(trendpath::graph::invalid_cost),
        help("Edge costs must be finite and non-negative.")
    )]
    InvalidCost { from: String, to: String, cost: f64 },

    #[error("no main supplier: no node has outgoing edges without incoming ones")]
    #[diagnostic(
        code(trendpath::graph::no_main_supplier),
        help(
            "The network is empty, or every node with outgoing edges also has \
             incoming edges. Add supply edges or use `routing.sourcing = \"per-product\"`."
        )
    )]
    NoMainSupplier,

    #[error("ambiguous main supplier: {} candidates ({})", .candidates.len(), .candidates.join(", "))]
    #[diagnostic(
        code(trendpath::graph::ambiguous_main_supplier),
        help(
            "More than one node has outgoing edges and no incoming ones. \
             Connect the suppliers under one root or use `routing.sourcing = \"per-product\"`."
        )
    )]
    AmbiguousMainSupplier { candidates: Vec<String> },
}

/// Convenience result type using [`TrendError`].
pub type TrendResult<T> = std::result::Result<T, TrendError>;
