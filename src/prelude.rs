//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use abm_surrogate_bench::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, DataMode, ModelKind};
pub use crate::core::errors::{AsbError, Result};
pub use crate::core::space::{DesignPoint, Interval, Parameter, ParameterSpace};

// Sampling
pub use crate::sampling::dedup::filter_disjoint;
pub use crate::sampling::design::{candidate_stream, generate_candidate_pool, generate_design};
pub use crate::sampling::sobol::SobolSequence;

// Simulators
pub use crate::simulator::Simulator;
pub use crate::simulator::batch::BatchEvaluator;
pub use crate::simulator::connector::{Connector, RunSummary, run_single};
pub use crate::simulator::islands::IslandsModel;
pub use crate::simulator::life::GameOfLife;
pub use crate::simulator::synthetic::LinearResponse;

// Surrogates
pub use crate::surrogate::{
    FittedSurrogate, GradientBoosting, Kriging, LinearRegression, Surrogate, TrainingSet,
};

// Evaluation, persistence, pipeline
pub use crate::evaluation::{ErrorMatrix, ErrorSummary, evaluate, mean_squared_error};
pub use crate::logger::jsonl::{JsonlConfig, JsonlWriter};
pub use crate::persistence::{Artifact, ArtifactStore};
pub use crate::pipeline::{BenchmarkReport, Pipeline};
