//! CSV artifacts for datasets and error matrices.

#![allow(missing_docs)]

pub mod csv_store;

pub use csv_store::{Artifact, ArtifactStore, CachedData};
