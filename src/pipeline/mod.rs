//! End-to-end benchmark orchestration.

#![allow(missing_docs)]

pub mod runner;

pub use runner::{BenchmarkReport, Datasets, Pipeline, build_simulator, build_surrogates};
