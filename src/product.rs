//! Inventory items tracked by the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::ProductError;

/// A product: its demand history and current stock.
///
/// Products are inputs only. Spike flags and depletion estimates are run
/// outputs and live in [`crate::detect::SpikeSnapshot`] and
/// [`crate::pipeline::ProductReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique name; also the product's node name in the supply graph.
    pub name: String,
    /// Chronological demand observations, oldest first.
    pub history: Vec<f64>,
    /// Units currently in stock.
    pub stock: f64,
}

impl Product {
    pub fn new(name: impl Into<String>, history: Vec<f64>, stock: f64) -> Self {
        Self {
            name: name.into(),
            history,
            stock,
        }
    }

    /// Reject data the pipeline cannot compute with.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() {
            return Err(ProductError::EmptyName);
        }
        if self.history.is_empty() {
            return Err(ProductError::EmptyHistory {
                name: self.name.clone(),
            });
        }
        if let Some((index, &value)) = self
            .history
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(ProductError::InvalidObservation {
                name: self.name.clone(),
                index,
                value,
            });
        }
        if !self.stock.is_finite() || self.stock < 0.0 {
            return Err(ProductError::InvalidStock {
                name: self.name.clone(),
                stock: self.stock,
            });
        }
        Ok(())
    }
}
