//! ASB-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, AsbError>;

/// Top-level error type for the surrogate benchmark.
///
/// None of these are recovered locally: the pipeline aborts on the first error and
/// surfaces it with enough context (stage, index, counts) to diagnose.
#[derive(Debug, Error)]
pub enum AsbError {
    #[error("[ASB-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[ASB-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[ASB-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error(
        "[ASB-2001] candidate pool exhausted: required {required} disjoint points, \
         {available} survived deduplication (shortfall {shortfall})"
    )]
    InsufficientPool {
        required: usize,
        available: usize,
        shortfall: usize,
    },

    #[error(
        "[ASB-2002] out-of-sample length {len} is not a positive multiple of trial size {trial_size}"
    )]
    Partition { len: usize, trial_size: usize },

    #[error("[ASB-2003] dimension mismatch in {context}: expected {expected}, got {actual} at index {index}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
        index: usize,
    },

    #[error("[ASB-2004] length mismatch in {context}: expected {expected}, got {actual}")]
    LengthMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("[ASB-2005] invalid input: {details}")]
    InvalidInput { details: String },

    #[error("[ASB-3001] simulation failure in stage {stage} at point {index}: {details}")]
    SimulationFailure {
        stage: &'static str,
        index: usize,
        details: String,
    },

    #[error("[ASB-3002] unknown simulator model: {name}")]
    UnknownModel { name: String },

    #[error("[ASB-3101] surrogate {surrogate} failed to fit: {details}")]
    ModelFit {
        surrogate: String,
        details: String,
    },

    #[error("[ASB-4001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[ASB-4002] malformed artifact {path}: {details}")]
    Artifact { path: PathBuf, details: String },

    #[error("[ASB-4003] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[ASB-4101] plot rendering failed for {path}: {details}")]
    Render { path: PathBuf, details: String },
}

impl AsbError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "ASB-1001",
            Self::MissingConfig { .. } => "ASB-1002",
            Self::ConfigParse { .. } => "ASB-1003",
            Self::InsufficientPool { .. } => "ASB-2001",
            Self::Partition { .. } => "ASB-2002",
            Self::DimensionMismatch { .. } => "ASB-2003",
            Self::LengthMismatch { .. } => "ASB-2004",
            Self::InvalidInput { .. } => "ASB-2005",
            Self::SimulationFailure { .. } => "ASB-3001",
            Self::UnknownModel { .. } => "ASB-3002",
            Self::ModelFit { .. } => "ASB-3101",
            Self::Serialization { .. } => "ASB-4001",
            Self::Artifact { .. } => "ASB-4002",
            Self::Io { .. } => "ASB-4003",
            Self::Render { .. } => "ASB-4101",
        }
    }

    /// Whether the failure comes from the caller's inputs rather than the environment.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::InvalidInput { .. }
                | Self::UnknownModel { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for AsbError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for AsbError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for AsbError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<csv::Error> for AsbError {
    fn from(value: csv::Error) -> Self {
        Self::Serialization {
            context: "csv",
            details: value.to_string(),
        }
    }
}
