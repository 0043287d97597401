//! Human and machine renderings of benchmark results.

#![allow(missing_docs)]

pub mod density;
#[cfg(feature = "plot")]
pub mod plot;
pub mod summary;

pub use summary::{plot_file_name, render_summary_table};
