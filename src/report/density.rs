//! Gaussian kernel density estimates of per-trial errors.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::f64::consts::PI;

use serde::Serialize;

/// Sampled density curve over an evenly spaced grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityCurve {
    pub bandwidth: f64,
    pub points: Vec<(f64, f64)>,
}

impl DensityCurve {
    #[must_use]
    pub fn peak(&self) -> f64 {
        self.points.iter().map(|p| p.1).fold(0.0, f64::max)
    }

    #[must_use]
    pub fn x_range(&self) -> Option<(f64, f64)> {
        Some((self.points.first()?.0, self.points.last()?.0))
    }
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor();
    let frac = pos - lo;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let i = lo as usize;
    match sorted.get(i + 1) {
        Some(next) => sorted[i] + frac * (next - sorted[i]),
        None => sorted[i],
    }
}

/// Scott-style bandwidth `1.059 * min(sd, IQR / 1.349) * n^(-1/5)`.
///
/// Degenerate samples (one value, or no spread) fall back to a width scaled to
/// the magnitude of the data so the curve stays drawable.
#[must_use]
pub fn scott_bandwidth(samples: &[f64]) -> f64 {
    let n = samples.len();
    let fallback = |centre: f64| (centre.abs() * 0.1).max(1e-6);
    if n < 2 {
        return fallback(samples.first().copied().unwrap_or(0.0));
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    let sd = (samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt();
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);
    let spread = if iqr > 0.0 { sd.min(iqr / 1.349) } else { sd };
    if spread > 0.0 {
        1.059 * spread * (n as f64).powf(-0.2)
    } else {
        fallback(mean)
    }
}

/// Evaluate the KDE on `resolution` points spanning three bandwidths past the data.
#[must_use]
pub fn gaussian_kde(samples: &[f64], resolution: usize) -> DensityCurve {
    let bandwidth = scott_bandwidth(samples);
    if samples.is_empty() || resolution == 0 {
        return DensityCurve {
            bandwidth,
            points: Vec::new(),
        };
    }
    let lo = samples.iter().copied().fold(f64::INFINITY, f64::min) - 3.0 * bandwidth;
    let hi = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max) + 3.0 * bandwidth;
    let norm = 1.0 / (samples.len() as f64 * bandwidth * (2.0 * PI).sqrt());
    let step = if resolution > 1 {
        (hi - lo) / (resolution - 1) as f64
    } else {
        0.0
    };
    let points = (0..resolution)
        .map(|i| {
            let x = lo + step * i as f64;
            let density: f64 = samples
                .iter()
                .map(|s| (-0.5 * ((x - s) / bandwidth).powi(2)).exp())
                .sum();
            (x, density * norm)
        })
        .collect();
    DensityCurve { bandwidth, points }
}
