//! Surrogate models behind a uniform fit/predict contract.
//!
//! A [`Surrogate`] is an unfitted model description; fitting it on a
//! [`TrainingSet`] yields a [`FittedSurrogate`] that predicts one scalar per
//! design point, in input order.

#![allow(missing_docs)]

pub mod boosting;
pub mod kriging;
pub mod linear;

use crate::core::errors::{AsbError, Result};
use crate::core::space::DesignPoint;

pub use boosting::GradientBoosting;
pub use kriging::Kriging;
pub use linear::LinearRegression;

/// Design points paired with their simulator responses.
///
/// Construction guarantees equal lengths and a single shared dimensionality, so
/// every surrogate fitted on the same set sees identical data.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    inputs: Vec<DesignPoint>,
    targets: Vec<f64>,
    dimensions: usize,
}

impl TrainingSet {
    pub fn new(inputs: Vec<DesignPoint>, targets: Vec<f64>) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(AsbError::LengthMismatch {
                context: "training set responses".to_string(),
                expected: inputs.len(),
                actual: targets.len(),
            });
        }
        let Some(first) = inputs.first() else {
            return Err(AsbError::InvalidInput {
                details: "training set must contain at least one point".to_string(),
            });
        };
        let dimensions = first.len();
        check_dimensions(&inputs, dimensions, "training set")?;
        if let Some(index) = targets.iter().position(|y| !y.is_finite()) {
            return Err(AsbError::InvalidInput {
                details: format!("training response {index} is not finite"),
            });
        }
        Ok(Self {
            inputs,
            targets,
            dimensions,
        })
    }

    #[must_use]
    pub fn inputs(&self) -> &[DesignPoint] {
        &self.inputs
    }

    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// An unfitted surrogate configuration.
pub trait Surrogate {
    /// Label used for this surrogate in reports and the error matrix.
    fn name(&self) -> &str;

    fn fit(&self, data: &TrainingSet) -> Result<Box<dyn FittedSurrogate>>;
}

/// A trained surrogate.
pub trait FittedSurrogate: Send + Sync {
    fn name(&self) -> &str;

    /// Dimensionality of the training inputs.
    fn dimensions(&self) -> usize;

    /// Predict one value per point. Wrong-dimensional points fail with
    /// [`AsbError::DimensionMismatch`].
    fn predict(&self, points: &[DesignPoint]) -> Result<Vec<f64>>;
}

/// Reject any point whose length differs from `expected`, naming the first offender.
pub fn check_dimensions(points: &[DesignPoint], expected: usize, context: &'static str) -> Result<()> {
    match points.iter().position(|p| p.len() != expected) {
        Some(index) => Err(AsbError::DimensionMismatch {
            context,
            expected,
            actual: points[index].len(),
            index,
        }),
        None => Ok(()),
    }
}
