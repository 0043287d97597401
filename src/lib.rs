#![forbid(unsafe_code)]

//! ABM surrogate bench (asb): compares cheap surrogate models of expensive
//! agent-based simulators by out-of-sample prediction error.
//!
//! A run goes through four phases:
//! 1. **Design**: a Sobol training design over the model's parameter space
//! 2. **Simulation**: the simulator evaluated at every training and held-out point
//! 3. **Fit**: Kriging and gradient-boosted trees trained on the same data
//! 4. **Evaluation**: Monte Carlo MSE over contiguous blocks of held-out points
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use abm_surrogate_bench::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use abm_surrogate_bench::core::config::Config;
//! use abm_surrogate_bench::sampling::dedup::filter_disjoint;
//! ```

pub mod prelude;

pub mod core;
pub mod evaluation;
pub mod logger;
pub mod persistence;
pub mod pipeline;
pub mod report;
pub mod sampling;
pub mod simulator;
pub mod surrogate;
