//! Out-of-sample error estimation.

#![allow(missing_docs)]

pub mod monte_carlo;

pub use monte_carlo::{ErrorMatrix, ErrorSummary, evaluate, mean_squared_error};
