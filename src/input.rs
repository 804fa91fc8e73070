//! JSON input documents.
//!
//! ```json
//! {
//!   "products": {
//!     "Burger": { "stock": 100, "history": [10, 12, 11, 13, 50] }
//!   },
//!   "edges": [
//!     { "from": "Kitchen", "to": "Burger", "cost": 5.0 }
//!   ]
//! }
//! ```
//!
//! Product validation is deliberately left to the pipeline so one bad
//! product does not reject the whole document.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::graph::{SupplyEdge, SupplyGraph};
use crate::product::Product;

pub type InputResult<T> = std::result::Result<T, InputError>;

/// Stock and demand history of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub stock: f64,
    pub history: Vec<f64>,
}

/// A complete run input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendInput {
    #[serde(default)]
    pub products: BTreeMap<String, ProductInput>,
    #[serde(default)]
    pub edges: Vec<SupplyEdge>,
}

impl TrendInput {
    /// Read and parse a JSON file.
    pub fn load(path: &Path) -> InputResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| InputError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> InputResult<Self> {
        serde_json::from_str(content).map_err(|e| InputError::Parse {
            message: e.to_string(),
        })
    }

    /// Build an input from products and edges, rejecting duplicate names.
    pub fn from_parts(products: &[Product], edges: &[SupplyEdge]) -> InputResult<Self> {
        let mut map = BTreeMap::new();
        for p in products {
            let entry = ProductInput {
                stock: p.stock,
                history: p.history.clone(),
            };
            if map.insert(p.name.clone(), entry).is_some() {
                return Err(InputError::DuplicateProduct {
                    name: p.name.clone(),
                });
            }
        }
        Ok(Self {
            products: map,
            edges: edges.to_vec(),
        })
    }

    /// Split into products (sorted by name) and the supply graph.
    pub fn into_parts(self) -> InputResult<(Vec<Product>, SupplyGraph)> {
        let graph = SupplyGraph::from_edges(self.edges)?;
        let products = self
            .products
            .into_iter()
            .map(|(name, p)| Product::new(name, p.history, p.stock))
            .collect();
        Ok((products, graph))
    }
}
