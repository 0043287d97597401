//! Monte Carlo error aggregation over contiguous out-of-sample blocks.
//!
//! The held-out set of length `L` is cut into `L / T` blocks in index order;
//! block `i` covers `[i*T, (i+1)*T)`. Each block is one trial and yields one MSE
//! per surrogate. The evaluator is pure: same inputs, same matrix.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::collections::HashSet;

use serde::Serialize;

use crate::core::errors::{AsbError, Result};

/// Mean squared error of two equal-length slices; `0` for empty input.
#[must_use]
pub fn mean_squared_error(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p) * (t - p))
        .sum::<f64>()
        / truth.len() as f64
}

/// Per-surrogate, per-trial MSE. Row order follows the prediction input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMatrix {
    labels: Vec<String>,
    rows: Vec<Vec<f64>>,
    trial_size: usize,
}

/// Dispersion of one surrogate's per-trial errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub surrogate: String,
    pub trials: usize,
    pub mean: f64,
    /// Sample variance (`n - 1` denominator); `0` for a single trial.
    pub variance: f64,
    pub min: f64,
    pub max: f64,
}

impl ErrorSummary {
    fn from_trials(surrogate: &str, errors: &[f64]) -> Self {
        let n = errors.len();
        let mean = if n == 0 {
            0.0
        } else {
            errors.iter().sum::<f64>() / n as f64
        };
        let variance = if n < 2 {
            0.0
        } else {
            errors.iter().map(|e| (e - mean) * (e - mean)).sum::<f64>() / (n - 1) as f64
        };
        Self {
            surrogate: surrogate.to_string(),
            trials: n,
            mean,
            variance,
            min: errors.iter().copied().fold(f64::INFINITY, f64::min),
            max: errors.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Legend label, e.g. `Kriging: Mean 0.01234, Variance 0.00010`.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{}: Mean {:.5}, Variance {:.5}",
            self.surrogate, self.mean, self.variance
        )
    }
}

impl ErrorMatrix {
    /// Assemble a matrix from already-computed rows (e.g. read back from disk).
    pub fn from_rows(labels: Vec<String>, rows: Vec<Vec<f64>>, trial_size: usize) -> Result<Self> {
        if labels.len() != rows.len() {
            return Err(AsbError::LengthMismatch {
                context: "error matrix labels".to_string(),
                expected: rows.len(),
                actual: labels.len(),
            });
        }
        let trials = rows.first().map_or(0, Vec::len);
        for (label, row) in labels.iter().zip(&rows) {
            if row.len() != trials {
                return Err(AsbError::LengthMismatch {
                    context: format!("error matrix row {label}"),
                    expected: trials,
                    actual: row.len(),
                });
            }
        }
        ensure_unique(&labels)?;
        Ok(Self {
            labels,
            rows,
            trial_size,
        })
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// `(surrogates, trials)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.rows.first().map_or(0, Vec::len))
    }

    #[must_use]
    pub const fn trial_size(&self) -> usize {
        self.trial_size
    }

    /// Per-trial errors for one surrogate.
    #[must_use]
    pub fn row(&self, surrogate: &str) -> Option<&[f64]> {
        self.labels
            .iter()
            .position(|l| l == surrogate)
            .map(|i| self.rows[i].as_slice())
    }

    #[must_use]
    pub fn summaries(&self) -> Vec<ErrorSummary> {
        self.labels
            .iter()
            .zip(&self.rows)
            .map(|(label, row)| ErrorSummary::from_trials(label, row))
            .collect()
    }
}

fn ensure_unique(labels: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(AsbError::InvalidInput {
                details: format!("duplicate surrogate label {label:?}"),
            });
        }
    }
    Ok(())
}

/// Build the error matrix for every `(label, predictions)` pair.
///
/// Fails with [`AsbError::Partition`] unless `y_true` is a non-empty exact
/// multiple of `trial_size`, and with [`AsbError::LengthMismatch`] when a
/// prediction vector does not cover every held-out point.
pub fn evaluate(y_true: &[f64], predictions: &[(String, Vec<f64>)], trial_size: usize) -> Result<ErrorMatrix> {
    let len = y_true.len();
    if trial_size == 0 || len == 0 || len % trial_size != 0 {
        return Err(AsbError::Partition { len, trial_size });
    }
    for (label, predicted) in predictions {
        if predicted.len() != len {
            return Err(AsbError::LengthMismatch {
                context: format!("predictions of {label}"),
                expected: len,
                actual: predicted.len(),
            });
        }
    }
    let labels: Vec<String> = predictions.iter().map(|(label, _)| label.clone()).collect();
    ensure_unique(&labels)?;

    let rows = predictions
        .iter()
        .map(|(_, predicted)| {
            y_true
                .chunks_exact(trial_size)
                .zip(predicted.chunks_exact(trial_size))
                .map(|(truth, block)| mean_squared_error(truth, block))
                .collect()
        })
        .collect();

    Ok(ErrorMatrix {
        labels,
        rows,
        trial_size,
    })
}
