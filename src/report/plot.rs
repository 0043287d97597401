//! SVG comparison plot: one KDE curve of per-trial MSE per surrogate.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::fs;
use std::path::Path;

use plotters::prelude::*;

use crate::core::errors::{AsbError, Result};
use crate::evaluation::ErrorMatrix;
use crate::report::density::gaussian_kde;

const TITLE: &str = "Out-Of-Sample Prediction Performance";
const X_LABEL: &str = "Mean-Squared Error";
const RESOLUTION: usize = 400;

/// Render the error distributions of every surrogate in `matrix` to `path`.
pub fn render_comparison(matrix: &ErrorMatrix, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| AsbError::io(parent, source))?;
    }
    draw(matrix, path).map_err(|err| AsbError::Render {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

fn draw(matrix: &ErrorMatrix, path: &Path) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let curves: Vec<_> = matrix
        .summaries()
        .into_iter()
        .zip(matrix.rows())
        .map(|(summary, row)| (summary.label(), gaussian_kde(row, RESOLUTION)))
        .collect();

    let (mut x_min, mut x_max, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY, 0.0f64);
    for (_, curve) in &curves {
        if let Some((lo, hi)) = curve.x_range() {
            x_min = x_min.min(lo);
            x_max = x_max.max(hi);
        }
        y_max = y_max.max(curve.peak());
    }
    if !x_min.is_finite() || !x_max.is_finite() || x_min >= x_max {
        (x_min, x_max) = (0.0, 1.0);
    }
    if y_max <= 0.0 {
        y_max = 1.0;
    }

    let root = SVGBackend::new(path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(TITLE, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(20)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max * 1.1)?;

    chart
        .configure_mesh()
        .x_desc(X_LABEL)
        .disable_y_mesh()
        .y_labels(0)
        .draw()?;

    for (i, (label, curve)) in curves.iter().enumerate() {
        let color = Palette99::pick(i).mix(0.9);
        chart
            .draw_series(LineSeries::new(curve.points.iter().copied(), &color))?
            .label(label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
