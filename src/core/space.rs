//! Bounded parameter spaces and design points.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::core::errors::{AsbError, Result};

/// One coordinate vector inside a [`ParameterSpace`].
pub type DesignPoint = Vec<f64>;

/// Closed interval `[low, high]` for a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub low: f64,
    pub high: f64,
}

impl Interval {
    #[must_use]
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    /// Affine map from `[0, 1]` onto the interval, clamped against rounding.
    #[must_use]
    pub fn scale(&self, raw: f64) -> f64 {
        (self.low + raw * (self.high - self.low)).min(self.high).max(self.low)
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.low..=self.high).contains(&value)
    }
}

/// A named parameter with its support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(flatten)]
    pub bounds: Interval,
}

/// Ordered hyper-rectangle of `D` parameter intervals.
///
/// Construction guarantees every interval is finite and `low <= high`, so every
/// scaled sample lies inside the rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Parameter>", into = "Vec<Parameter>")]
pub struct ParameterSpace {
    parameters: Vec<Parameter>,
}

impl ParameterSpace {
    pub fn new(parameters: Vec<Parameter>) -> Result<Self> {
        if parameters.is_empty() {
            return Err(AsbError::InvalidConfig {
                details: "parameter space must have at least one dimension".to_string(),
            });
        }
        for p in &parameters {
            let Interval { low, high } = p.bounds;
            if !low.is_finite() || !high.is_finite() {
                return Err(AsbError::InvalidConfig {
                    details: format!("parameter {} has non-finite bounds [{low}, {high}]", p.name),
                });
            }
            if low > high {
                return Err(AsbError::InvalidConfig {
                    details: format!("parameter {} has low {low} > high {high}", p.name),
                });
            }
        }
        Ok(Self { parameters })
    }

    /// Build from `(name, low, high)` triples.
    pub fn from_bounds<S: Into<String>>(bounds: impl IntoIterator<Item = (S, f64, f64)>) -> Result<Self> {
        Self::new(
            bounds
                .into_iter()
                .map(|(name, low, high)| Parameter {
                    name: name.into(),
                    bounds: Interval::new(low, high),
                })
                .collect(),
        )
    }

    /// Unit hyper-cube `[0, 1]^dimensions` with parameters named `x0..`.
    pub fn unit_cube(dimensions: usize) -> Result<Self> {
        Self::from_bounds((0..dimensions).map(|d| (format!("x{d}"), 0.0, 1.0)))
    }

    /// Support of the islands growth model.
    #[must_use]
    pub fn islands() -> Self {
        Self {
            parameters: [
                ("rho", 0.0, 10.0),
                ("alpha", 0.8, 2.0),
                ("phi", 0.0, 1.0),
                ("pi", 0.0, 1.0),
                ("eps", 0.0, 1.0),
            ]
            .into_iter()
            .map(|(name, low, high)| Parameter {
                name: name.to_string(),
                bounds: Interval::new(low, high),
            })
            .collect(),
        }
    }

    /// Support of the Game of Life grid-size experiment.
    #[must_use]
    pub fn game_of_life() -> Self {
        Self {
            parameters: vec![Parameter {
                name: "gridSize".to_string(),
                bounds: Interval::new(0.0, 500.0),
            }],
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.parameters.len()
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    /// Scale a raw `[0, 1]^D` sample into the space, dimension by dimension.
    pub fn scale(&self, raw: &[f64]) -> Result<DesignPoint> {
        self.check_dimensions(raw, 0)?;
        Ok(self
            .parameters
            .iter()
            .zip(raw)
            .map(|(p, &r)| p.bounds.scale(r))
            .collect())
    }

    /// Componentwise membership test.
    #[must_use]
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.dimensions()
            && self
                .parameters
                .iter()
                .zip(point)
                .all(|(p, &v)| p.bounds.contains(v))
    }

    fn check_dimensions(&self, point: &[f64], index: usize) -> Result<()> {
        if point.len() == self.dimensions() {
            Ok(())
        } else {
            Err(AsbError::DimensionMismatch {
                context: "parameter space",
                expected: self.dimensions(),
                actual: point.len(),
                index,
            })
        }
    }
}

impl TryFrom<Vec<Parameter>> for ParameterSpace {
    type Error = AsbError;

    fn try_from(value: Vec<Parameter>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ParameterSpace> for Vec<Parameter> {
    fn from(value: ParameterSpace) -> Self {
        value.parameters
    }
}
