//! Ordinary least squares with an intercept, solved through the SVD.

#![allow(missing_docs)]

use nalgebra::{DMatrix, DVector};

use crate::core::errors::{AsbError, Result};
use crate::core::space::DesignPoint;
use crate::surrogate::{FittedSurrogate, Surrogate, TrainingSet, check_dimensions};

const NAME: &str = "Linear";

#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRegression;

impl Surrogate for LinearRegression {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&self, data: &TrainingSet) -> Result<Box<dyn FittedSurrogate>> {
        let n = data.len();
        let d = data.dimensions();
        let design = DMatrix::from_fn(n, d + 1, |i, j| if j == 0 { 1.0 } else { data.inputs()[i][j - 1] });
        let targets = DVector::from_column_slice(data.targets());
        // Rank-deficient designs get the minimum-norm solution.
        let coefficients = design
            .svd(true, true)
            .solve(&targets, 1e-12)
            .map_err(|details| AsbError::ModelFit {
                surrogate: NAME.to_string(),
                details: details.to_string(),
            })?;
        Ok(Box::new(FittedLinear {
            intercept: coefficients[0],
            slopes: coefficients.iter().skip(1).copied().collect(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedLinear {
    intercept: f64,
    slopes: Vec<f64>,
}

impl FittedLinear {
    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    #[must_use]
    pub fn slopes(&self) -> &[f64] {
        &self.slopes
    }
}

impl FittedSurrogate for FittedLinear {
    fn name(&self) -> &str {
        NAME
    }

    fn dimensions(&self) -> usize {
        self.slopes.len()
    }

    fn predict(&self, points: &[DesignPoint]) -> Result<Vec<f64>> {
        check_dimensions(points, self.slopes.len(), "linear prediction")?;
        Ok(points
            .iter()
            .map(|x| self.intercept + x.iter().zip(&self.slopes).map(|(a, b)| a * b).sum::<f64>())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_linear_response() {
        let x: Vec<DesignPoint> = (0..8)
            .map(|i| {
                let t = f64::from(i);
                vec![t / 8.0, (t * 3.0) % 5.0 / 5.0, (t * 7.0) % 3.0 / 3.0]
            })
            .collect();
        let y: Vec<f64> = x.iter().map(|p| 2.0 + p[0] - 3.0 * p[1] + 0.5 * p[2]).collect();
        let model = LinearRegression.fit(&TrainingSet::new(x, y).unwrap()).unwrap();
        let pred = model.predict(&[vec![0.2, 0.4, 0.6]]).unwrap();
        assert!((pred[0] - (2.0 + 0.2 - 1.2 + 0.3)).abs() < 1e-9, "{pred:?}");
    }

    #[test]
    fn single_point_fit_is_flat_through_it() {
        let data = TrainingSet::new(vec![vec![1.0, 2.0]], vec![5.0]).unwrap();
        let model = LinearRegression.fit(&data).unwrap();
        assert!((model.predict(&[vec![1.0, 2.0]]).unwrap()[0] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn wrong_dimension_rejected() {
        let data = TrainingSet::new(vec![vec![0.0], vec![1.0]], vec![0.0, 1.0]).unwrap();
        let model = LinearRegression.fit(&data).unwrap();
        assert!(model.predict(&[vec![0.0, 1.0]]).is_err());
    }
}
