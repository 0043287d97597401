//! Plain-text summary of per-surrogate error statistics.

#![allow(missing_docs)]

use std::fmt::Write as _;

use crate::evaluation::ErrorSummary;

/// Artifact name of the comparison plot for a training budget.
#[must_use]
pub fn plot_file_name(budget: usize) -> String {
    format!("xgboost_kriging_ba_comparison_{budget}.svg")
}

/// Fixed-width table with one row per surrogate.
#[must_use]
pub fn render_summary_table(summaries: &[ErrorSummary]) -> String {
    let width = summaries
        .iter()
        .map(|s| s.surrogate.len())
        .max()
        .unwrap_or(0)
        .max("surrogate".len());
    let mut out = format!(
        "{:<width$}  {:>6}  {:>12}  {:>12}  {:>12}  {:>12}\n",
        "surrogate", "trials", "mean", "variance", "min", "max"
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<width$}  {:>6}  {:>12.5}  {:>12.5}  {:>12.5}  {:>12.5}",
            s.surrogate, s.trials, s.mean, s.variance, s.min, s.max
        );
    }
    out
}
