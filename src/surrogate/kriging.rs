//! Kriging: Gaussian-process regression with an isotropic squared-exponential kernel.
//!
//! Inputs are min-max scaled by the training ranges and targets are
//! standardised. The length scale is picked from a fixed log-spaced grid by
//! maximising the concentrated log marginal likelihood, with the signal variance
//! at its closed-form maximum. Everything is deterministic given the data.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use crate::core::config::KrigingConfig;
use crate::core::errors::{AsbError, Result};
use crate::core::space::DesignPoint;
use crate::surrogate::{FittedSurrogate, Surrogate, TrainingSet, check_dimensions};

const NAME: &str = "Kriging";
const MAX_NUGGET_ESCALATIONS: usize = 8;

#[derive(Debug, Clone)]
pub struct Kriging {
    config: KrigingConfig,
}

impl Kriging {
    #[must_use]
    pub const fn new(config: KrigingConfig) -> Self {
        Self { config }
    }

    fn length_scale_grid(&self) -> Vec<f64> {
        let (lo, hi) = (self.config.length_scale_min.ln(), self.config.length_scale_max.ln());
        let points = self.config.grid_points.max(1);
        if points == 1 || lo == hi {
            return vec![self.config.length_scale_min];
        }
        (0..points)
            .map(|i| (lo + (hi - lo) * i as f64 / (points - 1) as f64).exp())
            .collect()
    }
}

impl Default for Kriging {
    fn default() -> Self {
        Self::new(KrigingConfig::default())
    }
}

/// Per-dimension affine map of the training box onto `[0, 1]`.
#[derive(Debug, Clone)]
struct UnitScaler {
    lows: Vec<f64>,
    widths: Vec<f64>,
}

impl UnitScaler {
    fn fit(points: &[DesignPoint], dimensions: usize) -> Self {
        let mut lows = vec![f64::INFINITY; dimensions];
        let mut highs = vec![f64::NEG_INFINITY; dimensions];
        for point in points {
            for (d, &v) in point.iter().enumerate() {
                lows[d] = lows[d].min(v);
                highs[d] = highs[d].max(v);
            }
        }
        let widths = lows
            .iter()
            .zip(&highs)
            .map(|(lo, hi)| if hi > lo { hi - lo } else { 1.0 })
            .collect();
        Self { lows, widths }
    }

    fn apply(&self, point: &[f64]) -> Vec<f64> {
        point
            .iter()
            .zip(self.lows.iter().zip(&self.widths))
            .map(|(v, (lo, w))| (v - lo) / w)
            .collect()
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn rbf(sq_dist: f64, length_scale: f64) -> f64 {
    (-sq_dist / (2.0 * length_scale * length_scale)).exp()
}

/// Cholesky factor of `K + nugget * I`, growing the nugget tenfold on failure.
fn factorise(sq_dists: &DMatrix<f64>, length_scale: f64, nugget: f64) -> Option<(Cholesky<f64, Dyn>, f64)> {
    let n = sq_dists.nrows();
    let mut jitter = nugget;
    for _ in 0..=MAX_NUGGET_ESCALATIONS {
        let k = DMatrix::from_fn(n, n, |i, j| {
            rbf(sq_dists[(i, j)], length_scale) + if i == j { jitter } else { 0.0 }
        });
        if let Some(chol) = k.cholesky() {
            return Some((chol, jitter));
        }
        jitter = if jitter > 0.0 { jitter * 10.0 } else { 1e-10 };
    }
    None
}

struct Candidate {
    length_scale: f64,
    nugget: f64,
    log_likelihood: f64,
    chol: Cholesky<f64, Dyn>,
    weights: DVector<f64>,
    signal_variance: f64,
}

impl Surrogate for Kriging {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&self, data: &TrainingSet) -> Result<Box<dyn FittedSurrogate>> {
        Ok(Box::new(self.fit_kriging(data)?))
    }
}

impl Kriging {
    /// Fit and keep the concrete type, for callers that want predictive variance.
    pub fn fit_kriging(&self, data: &TrainingSet) -> Result<FittedKriging> {
        let n = data.len();
        let scaler = UnitScaler::fit(data.inputs(), data.dimensions());
        let inputs: Vec<Vec<f64>> = data.inputs().iter().map(|p| scaler.apply(p)).collect();

        let y_mean = data.targets().iter().sum::<f64>() / n as f64;
        let y_var = data.targets().iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() / n as f64;
        let y_std = if y_var > 0.0 { y_var.sqrt() } else { 1.0 };
        let z = DVector::from_iterator(n, data.targets().iter().map(|y| (y - y_mean) / y_std));

        let sq_dists = DMatrix::from_fn(n, n, |i, j| squared_distance(&inputs[i], &inputs[j]));

        let mut best: Option<Candidate> = None;
        for length_scale in self.length_scale_grid() {
            let Some((chol, nugget)) = factorise(&sq_dists, length_scale, self.config.nugget) else {
                continue;
            };
            let weights = chol.solve(&z);
            let signal_variance = (z.dot(&weights) / n as f64).max(f64::MIN_POSITIVE);
            let log_det: f64 = chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>() * 2.0;
            let log_likelihood = -0.5 * (n as f64 * signal_variance.ln() + log_det);
            if !log_likelihood.is_finite() {
                continue;
            }
            if best
                .as_ref()
                .is_none_or(|b| log_likelihood > b.log_likelihood)
            {
                best = Some(Candidate {
                    length_scale,
                    nugget,
                    log_likelihood,
                    chol,
                    weights,
                    signal_variance,
                });
            }
        }

        let best = best.ok_or_else(|| AsbError::ModelFit {
            surrogate: NAME.to_string(),
            details: format!(
                "covariance matrix not positive definite for any length scale in [{}, {}]",
                self.config.length_scale_min, self.config.length_scale_max
            ),
        })?;

        Ok(FittedKriging {
            scaler,
            inputs,
            y_mean,
            y_std,
            length_scale: best.length_scale,
            nugget: best.nugget,
            signal_variance: best.signal_variance,
            log_likelihood: best.log_likelihood,
            chol: best.chol,
            weights: best.weights,
        })
    }
}

/// Trained Kriging model.
#[derive(Debug, Clone)]
pub struct FittedKriging {
    scaler: UnitScaler,
    inputs: Vec<Vec<f64>>,
    y_mean: f64,
    y_std: f64,
    length_scale: f64,
    nugget: f64,
    signal_variance: f64,
    log_likelihood: f64,
    chol: Cholesky<f64, Dyn>,
    weights: DVector<f64>,
}

impl FittedKriging {
    /// Selected length scale, in unit-scaled input coordinates.
    #[must_use]
    pub const fn length_scale(&self) -> f64 {
        self.length_scale
    }

    /// Diagonal jitter that made the covariance factorisable.
    #[must_use]
    pub const fn nugget(&self) -> f64 {
        self.nugget
    }

    #[must_use]
    pub const fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    fn cross_covariance(&self, point: &[f64]) -> DVector<f64> {
        let scaled = self.scaler.apply(point);
        DVector::from_iterator(
            self.inputs.len(),
            self.inputs
                .iter()
                .map(|x| rbf(squared_distance(&scaled, x), self.length_scale)),
        )
    }

    /// Posterior mean and variance per point, on the original response scale.
    pub fn predict_with_variance(&self, points: &[DesignPoint]) -> Result<Vec<(f64, f64)>> {
        check_dimensions(points, self.dimensions(), "kriging prediction")?;
        Ok(points
            .iter()
            .map(|point| {
                let k = self.cross_covariance(point);
                let mean = self.y_mean + self.y_std * k.dot(&self.weights);
                let explained = k.dot(&self.chol.solve(&k));
                let variance =
                    (self.signal_variance * (1.0 + self.nugget - explained)).max(0.0) * self.y_std * self.y_std;
                (mean, variance)
            })
            .collect())
    }
}

impl FittedSurrogate for FittedKriging {
    fn name(&self) -> &str {
        NAME
    }

    fn dimensions(&self) -> usize {
        self.scaler.lows.len()
    }

    fn predict(&self, points: &[DesignPoint]) -> Result<Vec<f64>> {
        check_dimensions(points, self.dimensions(), "kriging prediction")?;
        Ok(points
            .iter()
            .map(|point| self.y_mean + self.y_std * self.cross_covariance(point).dot(&self.weights))
            .collect())
    }
}
