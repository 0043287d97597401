//! Deterministic synthetic response `y = Σ x_d`.

#![allow(missing_docs)]

use crate::core::errors::{AsbError, Result};
use crate::simulator::Simulator;

/// Linear benchmark simulator; any linear surrogate recovers it exactly.
#[derive(Debug, Clone, Copy)]
pub struct LinearResponse {
    dimensions: usize,
}

impl LinearResponse {
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Simulator for LinearResponse {
    fn name(&self) -> &str {
        "synthetic-linear"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn evaluate(&self, point: &[f64]) -> Result<f64> {
        if point.len() != self.dimensions {
            return Err(AsbError::DimensionMismatch {
                context: "synthetic-linear",
                expected: self.dimensions,
                actual: point.len(),
                index: 0,
            });
        }
        Ok(point.iter().sum())
    }
}
